use super::Float;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

const RUNNING_BIT: u64 = 1 << 32;
const SEQ_SHIFT: u32 = 33;
const SEQ_MASK: u32 = (1 << 31) - 1;

/// Immutable copy of the control-side parameters, as seen by the audio side.
///
/// Packs into a single `u64`: the low 32 bits hold the frequency as `f32`
/// bits, bit 32 the running flag and the top 31 bits a publication sequence
/// number.
#[derive(Clone, Copy, PartialEq)]
pub struct ParameterSnapshot {
    frequency: f32,
    running: bool,
    seq: u32,
}

impl ParameterSnapshot {
    pub fn new(frequency: Float, running: bool) -> ParameterSnapshot {
        ParameterSnapshot{frequency: frequency as f32, running, seq: 0}
    }

    pub fn frequency(&self) -> Float {
        self.frequency as Float
    }

    pub fn running(&self) -> bool {
        self.running
    }

    /// Publication counter, wraps after 2^31 updates.
    pub fn seq(&self) -> u32 {
        self.seq
    }

    fn with_frequency(&self, frequency: Float) -> ParameterSnapshot {
        ParameterSnapshot{frequency: frequency as f32, running: self.running, seq: self.next_seq()}
    }

    fn with_running(&self, running: bool) -> ParameterSnapshot {
        ParameterSnapshot{frequency: self.frequency, running, seq: self.next_seq()}
    }

    fn next_seq(&self) -> u32 {
        self.seq.wrapping_add(1) & SEQ_MASK
    }

    fn pack(&self) -> u64 {
        let mut bits = self.frequency.to_bits() as u64;
        if self.running {
            bits |= RUNNING_BIT;
        }
        bits | ((self.seq & SEQ_MASK) as u64) << SEQ_SHIFT
    }

    fn unpack(bits: u64) -> ParameterSnapshot {
        let frequency = f32::from_bits(bits as u32);
        let running = bits & RUNNING_BIT != 0;
        let seq = (bits >> SEQ_SHIFT) as u32 & SEQ_MASK;
        ParameterSnapshot{frequency, running, seq}
    }
}

impl fmt::Debug for ParameterSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{} {:.2} Hz {}", self.seq, self.frequency, if self.running { "running" } else { "stopped" })
    }
}

/// The one shared object between control and audio context.
///
/// Readers never wait: `load` is a single atomic read. Writers replace the
/// whole snapshot with a compare-and-swap, so concurrent controllers never
/// lose each other's field updates.
pub struct SnapshotSlot {
    current: AtomicU64,
}

impl SnapshotSlot {
    pub fn new(initial: ParameterSnapshot) -> SnapshotSlot {
        SnapshotSlot{current: AtomicU64::new(initial.pack())}
    }

    pub fn load(&self) -> ParameterSnapshot {
        ParameterSnapshot::unpack(self.current.load(Ordering::Acquire))
    }

    pub fn publish_frequency(&self, frequency: Float) -> ParameterSnapshot {
        self.update(|s| s.with_frequency(frequency))
    }

    pub fn publish_running(&self, running: bool) -> ParameterSnapshot {
        self.update(|s| s.with_running(running))
    }

    fn update<F>(&self, change: F) -> ParameterSnapshot
        where F: Fn(&ParameterSnapshot) -> ParameterSnapshot
    {
        let mut current = self.current.load(Ordering::Acquire);
        loop {
            let next = change(&ParameterSnapshot::unpack(current));
            match self.current.compare_exchange_weak(current, next.pack(), Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => return next,
                Err(actual) => current = actual,
            }
        }
    }
}

#[cfg(test)]
#[test]
fn test_pack_unpack() {
    let s = ParameterSnapshot{frequency: 440.0, running: true, seq: SEQ_MASK};
    assert_eq!(ParameterSnapshot::unpack(s.pack()), s);
    let s = ParameterSnapshot{frequency: 19999.5, running: false, seq: 7};
    assert_eq!(ParameterSnapshot::unpack(s.pack()), s);
}

#[test]
fn test_publish_keeps_other_field() {
    let slot = SnapshotSlot::new(ParameterSnapshot::new(440.0, false));
    slot.publish_running(true);
    let s = slot.publish_frequency(880.0);
    assert_eq!(s.frequency(), 880.0);
    assert!(s.running());
    assert_eq!(s.seq(), 2);
    assert_eq!(slot.load(), s);
}

#[test]
fn test_seq_wraps() {
    let slot = SnapshotSlot::new(ParameterSnapshot{frequency: 100.0, running: false, seq: SEQ_MASK});
    let s = slot.publish_running(true);
    assert_eq!(s.seq(), 0);
    assert_eq!(s.frequency(), 100.0);
}

#[test]
fn test_concurrent_publishers_count_every_update() {
    use std::sync::Arc;
    use std::thread::spawn;

    let slot = Arc::new(SnapshotSlot::new(ParameterSnapshot::new(440.0, false)));
    let handles: Vec<_> = (0..4).map(|i| {
        let slot = slot.clone();
        spawn(move || {
            for n in 0..1000 {
                if n % 2 == 0 {
                    slot.publish_frequency(100.0 + i as Float);
                } else {
                    slot.publish_running(n % 4 == 1);
                }
            }
        })
    }).collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(slot.load().seq(), 4000);
}
