use super::Float;
use super::SampleGenerator;
use super::oscillator::{OscillatorCore, OscillatorState};
use super::parameter::{ParameterSnapshot, SnapshotSlot};
use super::ramp::VoiceState;

use std::sync::Arc;

/// Audio-side half of a tone generator.
///
/// Owns the oscillator and is moved into the audio callback. Control changes
/// arrive only through the snapshot slot and are applied once per block,
/// before the first sample of the block is rendered.
pub struct Voice {
    core: OscillatorCore,
    slot: Arc<SnapshotSlot>,
    last_seq: Option<u32>,
}

impl Voice {
    pub fn new(core: OscillatorCore, slot: Arc<SnapshotSlot>) -> Voice {
        Voice{core, slot, last_seq: None}
    }

    /// Silences the voice immediately and rewinds the phase. The next
    /// snapshot read re-applies the current control state.
    pub fn reset(&mut self) {
        self.core.reset();
        self.last_seq = None;
    }

    pub fn state(&self) -> &OscillatorState {
        self.core.state()
    }

    pub fn voice_state(&self) -> VoiceState {
        self.core.voice_state()
    }

    pub fn frequency(&self) -> Float {
        self.core.state().frequency
    }

    pub fn ramp_length(&self) -> u32 {
        self.core.ramp_length()
    }

    /// Latest snapshot the voice has seen or will see on the next block.
    pub fn pending_snapshot(&self) -> ParameterSnapshot {
        self.slot.load()
    }

    fn apply_snapshot(&mut self) {
        let snapshot = self.slot.load();
        if self.last_seq == Some(snapshot.seq()) {
            return;
        }
        self.last_seq = Some(snapshot.seq());
        self.core.set_frequency(snapshot.frequency());
        if snapshot.running() {
            self.core.start();
        } else {
            self.core.stop();
        }
    }
}

impl SampleGenerator for Voice {
    fn produce_block(&mut self, out: &mut [f32]) {
        self.apply_snapshot();
        self.core.produce_block(out);
    }

    fn sample_rate(&self) -> u32 {
        self.core.sample_rate()
    }
}

#[cfg(test)]
use super::config::ToneConfig;

#[cfg(test)]
#[test]
fn test_changes_wait_for_block_boundary() {
    let config = ToneConfig::default();
    let slot = Arc::new(SnapshotSlot::new(ParameterSnapshot::new(440.0, false)));
    let mut voice = Voice::new(OscillatorCore::new(&config), slot.clone());

    slot.publish_running(true);
    slot.publish_frequency(1000.0);
    assert_eq!(voice.voice_state(), VoiceState::Idle);
    assert_eq!(voice.frequency(), 440.0);

    let mut block = [0.0f32; 16];
    voice.produce_block(&mut block);
    assert_eq!(voice.voice_state(), VoiceState::RampingUp);
    assert_eq!(voice.frequency(), 1000.0);
}

#[test]
fn test_latest_snapshot_wins() {
    let config = ToneConfig::default();
    let slot = Arc::new(SnapshotSlot::new(ParameterSnapshot::new(440.0, false)));
    let mut voice = Voice::new(OscillatorCore::new(&config), slot.clone());

    slot.publish_running(true);
    slot.publish_running(false);
    let mut block = [0.0f32; 16];
    voice.produce_block(&mut block);
    assert_eq!(voice.voice_state(), VoiceState::Idle);
    assert!(block.iter().all(|s| *s == 0.0));
}

#[test]
fn test_reset_reapplies_control_state() {
    let config = ToneConfig::default();
    let slot = Arc::new(SnapshotSlot::new(ParameterSnapshot::new(440.0, true)));
    let mut voice = Voice::new(OscillatorCore::new(&config), slot);
    let mut block = [0.0f32; 512];
    voice.produce_block(&mut block);
    assert_eq!(voice.voice_state(), VoiceState::Steady);

    voice.reset();
    assert_eq!(voice.voice_state(), VoiceState::Idle);
    assert_eq!(voice.state().phase, 0.0);
    voice.produce_block(&mut block[..1]);
    assert_eq!(voice.voice_state(), VoiceState::RampingUp);
}
