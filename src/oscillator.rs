use super::Float;
use super::SampleGenerator;
use super::ramp::{Ramp, VoiceState};
use super::config::{ToneConfig, Waveform};

/// Distance kept below Nyquist when clamping, in Hz.
pub const NYQUIST_MARGIN: Float = 1.0;

/// Forces `freq` into the playable range `[floor, sample_rate / 2 - NYQUIST_MARGIN]`.
///
/// Zero, negative and NaN inputs land on the floor, +inf on the ceiling.
/// The floor wins when the ceiling falls below it.
pub fn clamp_frequency(freq: Float, sample_rate: Float, floor: Float) -> Float {
    let ceiling = (sample_rate / 2.0 - NYQUIST_MARGIN).max(floor);
    if freq.is_nan() || freq <= 0.0 {
        return floor;
    }
    freq.max(floor).min(ceiling)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OscillatorState {
    pub phase: Float,       // Position in the current cycle, [0, 1)
    pub frequency: Float,
    pub sample_rate: Float,
    pub amplitude: Float,   // Amplitude reached at the end of the last block
    pub running: bool,
}

/// Continuous single-voice oscillator with click-free start and stop.
pub struct OscillatorCore {
    state: OscillatorState,
    rate: u32,
    floor: Float,
    waveform: Waveform,
    ramp: Ramp,
}

impl OscillatorCore {
    pub fn new(config: &ToneConfig) -> OscillatorCore {
        let sample_rate = config.sample_rate as Float;
        let floor = config.min_frequency;
        let state = OscillatorState{
            phase: 0.0,
            frequency: clamp_frequency(config.initial_frequency, sample_rate, floor),
            sample_rate,
            amplitude: 0.0,
            running: false,
        };
        let ramp = Ramp::new(config.amplitude, config.ramp_samples());
        OscillatorCore{state, rate: config.sample_rate, floor, waveform: config.waveform, ramp}
    }

    pub fn reset(&mut self) {
        self.ramp.reset();
        self.state.phase = 0.0;
        self.state.amplitude = 0.0;
        self.state.running = false;
    }

    /// Sets the frequency used from the next sample on. Phase is kept.
    /// Returns the frequency actually applied after clamping.
    pub fn set_frequency(&mut self, freq: Float) -> Float {
        self.state.frequency = clamp_frequency(freq, self.state.sample_rate, self.floor);
        self.state.frequency
    }

    pub fn start(&mut self) {
        self.ramp.start();
        self.state.running = self.ramp.is_running();
    }

    pub fn stop(&mut self) {
        self.ramp.stop();
        self.state.running = self.ramp.is_running();
        self.state.amplitude = self.ramp.amplitude();
    }

    pub fn state(&self) -> &OscillatorState {
        &self.state
    }

    pub fn voice_state(&self) -> VoiceState {
        self.ramp.state()
    }

    pub fn ramp_length(&self) -> u32 {
        self.ramp.length()
    }

    pub fn target_amplitude(&self) -> Float {
        self.ramp.target()
    }

    fn render(&mut self, out: &mut [f32]) {
        let increment = self.state.frequency / self.state.sample_rate;
        let mut written = 0;
        for sample in out.iter_mut() {
            if !self.ramp.is_running() {
                break;
            }
            let amplitude = self.ramp.next_value();
            *sample = (amplitude * self.waveform.value(self.state.phase)) as f32;
            self.state.phase += increment;
            if self.state.phase >= 1.0 {
                self.state.phase -= 1.0;
            }
            written += 1;
        }
        for sample in out[written..].iter_mut() {
            *sample = 0.0;
        }
        self.state.amplitude = self.ramp.amplitude();
        self.state.running = self.ramp.is_running();
    }
}

impl SampleGenerator for OscillatorCore {
    fn produce_block(&mut self, out: &mut [f32]) {
        self.render(out);
        if out.iter().any(|s| !s.is_finite()) {
            for sample in out.iter_mut() {
                *sample = 0.0;
            }
        }
    }

    fn sample_rate(&self) -> u32 {
        self.rate
    }
}

#[cfg(test)]
fn steady_core(frequency: Float) -> OscillatorCore {
    let mut config = ToneConfig::default();
    config.ramp_ms = 0.0;
    let mut core = OscillatorCore::new(&config);
    core.set_frequency(frequency);
    core.start();
    core
}

#[test]
fn test_clamp_frequency() {
    assert_eq!(clamp_frequency(440.0, 44100.0, 20.0), 440.0);
    assert_eq!(clamp_frequency(0.0, 44100.0, 20.0), 20.0);
    assert_eq!(clamp_frequency(-100.0, 44100.0, 20.0), 20.0);
    assert_eq!(clamp_frequency(5.0, 44100.0, 20.0), 20.0);
    assert_eq!(clamp_frequency(std::f64::NAN, 44100.0, 20.0), 20.0);
    assert_eq!(clamp_frequency(std::f64::NEG_INFINITY, 44100.0, 20.0), 20.0);
    assert_eq!(clamp_frequency(30000.0, 44100.0, 20.0), 22049.0);
    assert_eq!(clamp_frequency(std::f64::INFINITY, 44100.0, 20.0), 22049.0);
    assert_eq!(clamp_frequency(0.3, 1.0, 0.25), 0.25); // Ceiling of -0.5 Hz
}

#[test]
fn test_tiny_sample_rate_keeps_phase_in_range() {
    let mut config = ToneConfig::new(1);
    config.min_frequency = 0.25;
    config.ramp_ms = 0.0;
    let mut core = OscillatorCore::new(&config);
    assert!(core.set_frequency(0.3) > 0.0);
    core.start();
    let mut block = [0.0f32; 4];
    core.produce_block(&mut block);
    let phase = core.state().phase;
    assert!(phase >= 0.0 && phase < 1.0);
}

#[test]
fn test_non_finite_block_becomes_silence() {
    let mut config = ToneConfig::default();
    config.amplitude = std::f64::NAN;
    let mut core = OscillatorCore::new(&config);
    core.start();
    let mut block = [1.0f32; 8];
    core.produce_block(&mut block);
    assert_eq!(block, [0.0f32; 8]);
}

#[test]
fn test_idle_is_silent_and_keeps_phase() {
    let mut core = OscillatorCore::new(&ToneConfig::default());
    let mut block = [1.0f32; 64];
    core.produce_block(&mut block);
    assert!(block.iter().all(|s| *s == 0.0));
    assert_eq!(core.state().phase, 0.0);
    assert!(!core.state().running);
}

#[test]
fn test_phase_wraps() {
    let mut core = steady_core(11000.0);
    let mut block = [0.0f32; 1000];
    core.produce_block(&mut block);
    let phase = core.state().phase;
    assert!(phase >= 0.0 && phase < 1.0);
}

#[test]
fn test_frequency_change_keeps_phase() {
    let mut core = steady_core(440.0);
    let mut block = [0.0f32; 100];
    core.produce_block(&mut block);
    let phase = core.state().phase;
    core.set_frequency(880.0);
    assert_eq!(core.state().phase, phase);
    core.produce_block(&mut block);
    // First sample of the new block continues from the old phase
    let expected = (2.0 * std::f64::consts::PI * phase).sin() as f32;
    assert!((block[0] - expected).abs() < 1e-6);
}

#[test]
fn test_steady_output_is_periodic() {
    use rand::{Rng, SeedableRng};
    use rand::rngs::StdRng;

    let mut rng = StdRng::seed_from_u64(0x70e);
    for _ in 0..50 {
        let freq: Float = rng.gen_range(20.5..22049.0);
        let mut core = steady_core(freq);
        let mut block = [0.0f32; 2048];
        core.produce_block(&mut block);
        let period = 44100.0 / freq;
        for (i, sample) in block.iter().enumerate() {
            let phase = (i as Float / period).fract();
            let expected = (2.0 * std::f64::consts::PI * phase).sin();
            assert!((*sample as Float - expected).abs() < 1e-4, "{} Hz, sample {}", freq, i);
        }
    }
}

#[test]
fn test_deterministic() {
    let mut a = steady_core(1234.5);
    let mut b = steady_core(1234.5);
    let mut block_a = [0.0f32; 500];
    let mut block_b = [0.0f32; 500];
    a.produce_block(&mut block_a);
    b.produce_block(&mut block_b);
    assert_eq!(block_a[..], block_b[..]);
}

#[test]
fn test_ramp_slew_is_bounded() {
    let config = ToneConfig::default();
    let mut core = OscillatorCore::new(&config);
    let freq = core.set_frequency(2000.0);
    let bound = config.amplitude / config.ramp_samples() as Float
        + config.amplitude * 2.0 * std::f64::consts::PI * freq / config.sample_rate as Float
        + 1e-6;

    let mut samples = vec![0.0f32; 600];
    core.start();
    core.produce_block(&mut samples[..300]);
    core.stop();
    core.produce_block(&mut samples[300..]);
    for pair in samples.windows(2) {
        assert!(((pair[1] - pair[0]) as Float).abs() <= bound);
    }
    assert_eq!(core.voice_state(), VoiceState::Idle);
}

#[test]
fn test_stop_finishes_ramp_before_silence() {
    let config = ToneConfig::default();
    let mut core = OscillatorCore::new(&config);
    core.start();
    let mut block = [0.0f32; 1000];
    core.produce_block(&mut block);
    assert_eq!(core.voice_state(), VoiceState::Steady);
    core.stop();
    assert!(core.state().running);
    let mut tail = [0.0f32; 100];
    core.produce_block(&mut tail);
    assert!(tail.iter().any(|s| *s != 0.0));
    assert_eq!(core.voice_state(), VoiceState::RampingDown);
    core.produce_block(&mut tail);
    core.produce_block(&mut tail);
    assert_eq!(core.voice_state(), VoiceState::Idle);
    assert!(!core.state().running);
}

#[test]
fn test_reset() {
    let mut core = steady_core(440.0);
    let mut block = [0.0f32; 10];
    core.produce_block(&mut block);
    core.reset();
    assert_eq!(core.state().phase, 0.0);
    assert!(!core.state().running);
    assert_eq!(core.voice_state(), VoiceState::Idle);
    assert_eq!(core.state().frequency, 440.0);
}
