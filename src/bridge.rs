use super::SampleGenerator;
use super::ToneError;

use log::info;

/// Largest number of frames rendered per `produce_block` call.
pub const BLOCK_SIZE: usize = 512;

/// Writes a mono sample source into interleaved device buffers.
///
/// Device buffers are cut into blocks of at most `BLOCK_SIZE` frames, each
/// rendered into a fixed scratch buffer and copied to every channel, so the
/// callback never allocates.
pub struct OutputBridge<G: SampleGenerator> {
    source: G,
    channels: usize,
    block: [f32; BLOCK_SIZE],
}

impl<G: SampleGenerator> OutputBridge<G> {
    pub fn new(source: G, device_rate: u32, channels: u16) -> Result<OutputBridge<G>, ToneError> {
        if device_rate != source.sample_rate() {
            return Err(ToneError::SampleRateMismatch{expected: source.sample_rate(), requested: device_rate});
        }
        if channels == 0 {
            return Err(ToneError::InvalidConfig("output needs at least one channel".to_string()));
        }
        info!("Output bridge: {} Hz, {} channel(s)", device_rate, channels);
        Ok(OutputBridge{source, channels: channels as usize, block: [0.0; BLOCK_SIZE]})
    }

    /// Fills an interleaved buffer. A trailing partial frame is zeroed.
    pub fn write(&mut self, output: &mut [f32]) {
        let channels = self.channels;
        for chunk in output.chunks_mut(BLOCK_SIZE * channels) {
            let frames = chunk.len() / channels;
            let block = &mut self.block[..frames];
            self.source.produce_block(block);
            for (frame, sample) in chunk.chunks_exact_mut(channels).zip(block.iter()) {
                for out in frame.iter_mut() {
                    *out = *sample;
                }
            }
            for out in chunk[frames * channels..].iter_mut() {
                *out = 0.0;
            }
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn source(&self) -> &G {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut G {
        &mut self.source
    }
}

#[cfg(test)]
struct Counter {
    next: f32,
    block_sizes: Vec<usize>,
}

#[cfg(test)]
impl SampleGenerator for Counter {
    fn produce_block(&mut self, out: &mut [f32]) {
        self.block_sizes.push(out.len());
        for sample in out.iter_mut() {
            self.next += 1.0;
            *sample = self.next;
        }
    }

    fn sample_rate(&self) -> u32 {
        48000
    }
}

#[cfg(test)]
fn counter() -> Counter {
    Counter{next: 0.0, block_sizes: Vec::new()}
}

#[test]
fn test_rate_mismatch_is_reported_up_front() {
    match OutputBridge::new(counter(), 44100, 2) {
        Err(ToneError::SampleRateMismatch{expected, requested}) => {
            assert_eq!(expected, 48000);
            assert_eq!(requested, 44100);
        }
        _ => panic!("expected a sample rate mismatch"),
    }
    assert!(OutputBridge::new(counter(), 48000, 0).is_err());
}

#[test]
fn test_stereo_fan_out() {
    let mut bridge = OutputBridge::new(counter(), 48000, 2).unwrap();
    let mut buffer = [0.0f32; 8];
    bridge.write(&mut buffer);
    assert_eq!(buffer, [1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 4.0, 4.0]);
}

#[test]
fn test_large_buffer_is_split_into_blocks() {
    let mut bridge = OutputBridge::new(counter(), 48000, 1).unwrap();
    let mut buffer = vec![0.0f32; BLOCK_SIZE * 2 + 10];
    bridge.write(&mut buffer);
    assert_eq!(bridge.source().block_sizes, vec![BLOCK_SIZE, BLOCK_SIZE, 10]);
    assert_eq!(buffer[BLOCK_SIZE * 2 + 9], (BLOCK_SIZE * 2 + 10) as f32);
}

#[test]
fn test_partial_frame_is_zeroed() {
    let mut bridge = OutputBridge::new(counter(), 48000, 2).unwrap();
    let mut buffer = [9.0f32; 5];
    bridge.write(&mut buffer);
    assert_eq!(buffer, [1.0, 1.0, 2.0, 2.0, 0.0]);
}

#[test]
fn test_voice_through_bridge() {
    use super::ToneGenerator;
    use super::ramp::VoiceState;

    let (ctrl, voice) = ToneGenerator::with_sample_rate(44100).unwrap();
    let mut bridge = OutputBridge::new(voice, 44100, 2).unwrap();
    ctrl.play();
    let mut buffer = vec![0.0f32; 2 * 1024];
    bridge.write(&mut buffer);
    assert_eq!(bridge.source().voice_state(), VoiceState::Steady);
    assert!(buffer.chunks(2).all(|f| f[0] == f[1]));
    assert!(buffer.iter().all(|s| s.abs() <= 1.0));
}
