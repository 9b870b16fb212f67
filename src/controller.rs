use super::Float;
use super::ToneError;
use super::config::ToneConfig;
use super::oscillator::{clamp_frequency, OscillatorCore};
use super::parameter::{ParameterSnapshot, SnapshotSlot};
use super::voice::Voice;

use log::{debug, info, warn};

use std::sync::Arc;

/// Control-side half of a tone generator.
///
/// Every call publishes a fresh snapshot and returns at once; the voice
/// picks the change up at its next block boundary.
#[derive(Clone)]
pub struct ParameterController {
    slot: Arc<SnapshotSlot>,
    sample_rate: u32,
    floor: Float,
}

impl ParameterController {
    /// Sets the tone frequency in Hz. Out of range input is clamped to the
    /// playable range instead of being rejected. Returns the published
    /// value, which travels as `f32`.
    pub fn set_frequency(&self, freq: Float) -> Float {
        if !(freq.is_finite() && freq > 0.0) {
            warn!("{}, clamping", ToneError::InvalidFrequency(freq));
        }
        let clamped = clamp_frequency(freq, self.sample_rate as Float, self.floor);
        if freq.is_finite() && freq > 0.0 && clamped != freq {
            warn!("Frequency {} Hz outside playable range, using {} Hz", freq, clamped);
        }
        let snapshot = self.slot.publish_frequency(clamped);
        debug!("Published {:?}", snapshot);
        snapshot.frequency()
    }

    pub fn play(&self) {
        let snapshot = self.slot.publish_running(true);
        debug!("Published {:?}", snapshot);
    }

    pub fn stop(&self) {
        let snapshot = self.slot.publish_running(false);
        debug!("Published {:?}", snapshot);
    }

    pub fn frequency(&self) -> Float {
        self.slot.load().frequency()
    }

    /// Play intent. The voice may still be ramping in either direction.
    pub fn is_playing(&self) -> bool {
        self.slot.load().running()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn snapshot(&self) -> ParameterSnapshot {
        self.slot.load()
    }
}

pub struct ToneGenerator;

impl ToneGenerator {
    /// Creates a tone generator and splits it into its control and audio
    /// halves.
    pub fn init(config: &ToneConfig) -> Result<(ParameterController, Voice), ToneError> {
        config.validate()?;
        let core = OscillatorCore::new(config);
        let frequency = core.state().frequency;
        let slot = Arc::new(SnapshotSlot::new(ParameterSnapshot::new(frequency, false)));
        let controller = ParameterController{slot: slot.clone(), sample_rate: config.sample_rate, floor: config.min_frequency};
        let voice = Voice::new(core, slot);
        info!("Tone generator at {} Hz sample rate, {:?} wave, {} sample ramp",
              config.sample_rate, config.waveform, config.ramp_samples());
        Ok((controller, voice))
    }

    /// `init` with default settings at the given sample rate.
    pub fn with_sample_rate(sample_rate: u32) -> Result<(ParameterController, Voice), ToneError> {
        ToneGenerator::init(&ToneConfig::new(sample_rate))
    }
}

#[cfg(test)]
use super::SampleGenerator;
#[cfg(test)]
use super::ramp::VoiceState;

#[cfg(test)]
fn render(voice: &mut Voice, num_samples: usize) -> Vec<f32> {
    let mut samples = vec![0.0f32; num_samples];
    voice.produce_block(&mut samples);
    samples
}

#[test]
fn test_init_rejects_bad_config() {
    assert!(ToneGenerator::with_sample_rate(0).is_err());
}

#[test]
fn test_set_frequency_clamps() {
    let (ctrl, _voice) = ToneGenerator::with_sample_rate(44100).unwrap();
    assert_eq!(ctrl.set_frequency(0.0), 20.0);
    assert_eq!(ctrl.set_frequency(-5.0), 20.0);
    assert_eq!(ctrl.set_frequency(std::f64::NAN), 20.0);
    assert_eq!(ctrl.set_frequency(50000.0), 22049.0);
    assert_eq!(ctrl.frequency(), 22049.0);
}

#[test]
fn test_set_frequency_returns_published_value() {
    let (ctrl, _voice) = ToneGenerator::with_sample_rate(44100).unwrap();
    let applied = ctrl.set_frequency(1000.1);
    assert_eq!(applied, ctrl.frequency());
    assert_eq!(applied, 1000.1f32 as Float);
}

#[test]
fn test_stop_keeps_frequency() {
    let (ctrl, mut voice) = ToneGenerator::with_sample_rate(44100).unwrap();
    ctrl.set_frequency(660.0);
    ctrl.play();
    render(&mut voice, 1000);
    ctrl.stop();
    render(&mut voice, 1000);
    assert!(!ctrl.is_playing());
    assert_eq!(ctrl.frequency(), 660.0);
    assert_eq!(voice.frequency(), 660.0);
    assert_eq!(voice.voice_state(), VoiceState::Idle);
}

#[test]
fn test_play_sine_440() {
    let (ctrl, mut voice) = ToneGenerator::with_sample_rate(44100).unwrap();
    ctrl.set_frequency(440.0);
    ctrl.play();
    let samples = render(&mut voice, 44100);
    let ramp = voice.ramp_length() as usize;

    assert_eq!(samples[0], 0.0);
    assert!(samples[..ramp].iter().all(|s| s.abs() < 1.0));
    let peak = samples[ramp..].iter().fold(0.0f32, |m, s| m.max(s.abs()));
    assert!((peak - 1.0).abs() < 1e-3);
    assert_eq!(voice.voice_state(), VoiceState::Steady);

    // Sign changes every half period of 44100 / 440 samples
    let half_period = 44100.0 / 880.0;
    let crossings: Vec<usize> = (2..samples.len())
        .filter(|&i| (samples[i - 1] < 0.0) != (samples[i] < 0.0))
        .collect();
    assert_eq!(crossings.len(), 879);
    for (k, index) in crossings.iter().enumerate() {
        let expected = ((k + 1) as Float * half_period).ceil();
        assert!((*index as Float - expected).abs() <= 1.0, "crossing {} at {}", k, index);
    }
}

#[test]
fn test_play_is_idempotent_when_steady() {
    let (ctrl_a, mut voice_a) = ToneGenerator::with_sample_rate(44100).unwrap();
    let (ctrl_b, mut voice_b) = ToneGenerator::with_sample_rate(44100).unwrap();
    ctrl_a.play();
    ctrl_b.play();
    render(&mut voice_a, 1024);
    render(&mut voice_b, 1024);
    assert_eq!(voice_a.voice_state(), VoiceState::Steady);

    ctrl_a.play();
    let a = render(&mut voice_a, 1024);
    let b = render(&mut voice_b, 1024);
    assert_eq!(voice_a.voice_state(), VoiceState::Steady);
    assert_eq!(a, b);
}

#[test]
fn test_frequency_round_trip() {
    let (ctrl_a, mut voice_a) = ToneGenerator::with_sample_rate(44100).unwrap();
    let (ctrl_b, mut voice_b) = ToneGenerator::with_sample_rate(44100).unwrap();
    ctrl_a.set_frequency(440.0);
    ctrl_a.set_frequency(880.0);
    ctrl_a.set_frequency(440.0);
    ctrl_b.set_frequency(440.0);
    ctrl_a.play();
    ctrl_b.play();
    let a = render(&mut voice_a, 4410);
    let b = render(&mut voice_b, 4410);
    assert_eq!(voice_a.frequency(), voice_b.frequency());
    assert_eq!(a, b);

    // Switch through 880 Hz while running and come back
    ctrl_a.set_frequency(880.0);
    render(&mut voice_a, 300);
    ctrl_a.set_frequency(440.0);
    let a = render(&mut voice_a, 4410);
    let b = render(&mut voice_b, 4410);
    assert_eq!(voice_a.frequency(), 440.0);
    // Same shape, shifted in phase: equal energy and peak
    let energy = |s: &[f32]| s.iter().map(|x| (*x as Float).powi(2)).sum::<Float>();
    assert!((energy(&a) - energy(&b)).abs() / energy(&b) < 1e-2);
    let peak = |s: &[f32]| s.iter().fold(0.0f32, |m, x| m.max(x.abs()));
    assert!((peak(&a) - peak(&b)).abs() < 1e-3);
}

#[test]
fn test_stop_during_ramp_up() {
    let (ctrl, mut voice) = ToneGenerator::with_sample_rate(44100).unwrap();
    let ramp = voice.ramp_length() as usize;
    let at = (ramp as Float * 0.3).round() as usize;
    ctrl.play();
    render(&mut voice, at);
    assert_eq!(voice.voice_state(), VoiceState::RampingUp);
    let amplitude = voice.state().amplitude;
    assert!((amplitude - 0.3).abs() < 0.01);

    ctrl.stop();
    let mut block = [0.0f32; 1];
    voice.produce_block(&mut block);
    assert_eq!(voice.voice_state(), VoiceState::RampingDown);
    assert!(voice.state().amplitude < amplitude);
    assert!(voice.state().amplitude > amplitude * 0.9);

    render(&mut voice, ramp - 2);
    assert_eq!(voice.voice_state(), VoiceState::RampingDown);
    render(&mut voice, 1);
    assert_eq!(voice.voice_state(), VoiceState::Idle);
    assert_eq!(voice.state().amplitude, 0.0);
}

#[test]
fn test_controller_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    fn assert_send<T: Send>() {}
    assert_send_sync::<ParameterController>();
    assert_send::<Voice>();
}
