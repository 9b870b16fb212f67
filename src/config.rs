use super::Float;
use super::ToneError;
use super::oscillator::NYQUIST_MARGIN;

use log::info;
use serde::{Serialize, Deserialize};

use std::fs::File;
use std::io::BufReader;
use std::io::prelude::*;
use std::path::Path;

/// Shape of a single oscillator cycle. Both shapes are continuous, so a
/// frequency change never produces a step in the output.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Triangle,
}

impl Default for Waveform {
    fn default() -> Self {
        Waveform::Sine
    }
}

impl Waveform {
    /// Value of the waveform at `phase` in [0, 1).
    pub fn value(&self, phase: Float) -> Float {
        match self {
            Waveform::Sine => (2.0 * std::f64::consts::PI * phase).sin(),
            Waveform::Triangle => {
                // Starts at 0 rising, like the sine
                if phase < 0.25 {
                    4.0 * phase
                } else if phase < 0.75 {
                    2.0 - 4.0 * phase
                } else {
                    4.0 * phase - 4.0
                }
            }
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ToneConfig {
    pub sample_rate: u32,
    pub initial_frequency: Float,
    pub amplitude: Float,
    pub ramp_ms: Float,
    pub min_frequency: Float,
    pub waveform: Waveform,
    pub output_file: String,
}

impl Default for ToneConfig {
    fn default() -> Self {
        ToneConfig{
            sample_rate: 44100,
            initial_frequency: 440.0,
            amplitude: 1.0,
            ramp_ms: 5.0,
            min_frequency: 20.0,
            waveform: Waveform::Sine,
            output_file: "tone_output.txt".to_string(),
        }
    }
}

impl ToneConfig {
    pub fn new(sample_rate: u32) -> ToneConfig {
        ToneConfig{sample_rate, ..Default::default()}
    }

    pub fn load(filename: &Path) -> Result<ToneConfig, ToneError> {
        let file = File::open(filename)?;
        let mut reader = BufReader::new(file);
        let mut serialized = String::new();
        reader.read_to_string(&mut serialized)?;
        let config: ToneConfig = serde_json::from_str(&serialized)?;
        config.validate()?;
        info!("Loaded config from {}", filename.display());
        Ok(config)
    }

    pub fn save(&self, filename: &Path) -> Result<(), ToneError> {
        let mut file = File::create(filename)?;
        let serialized = serde_json::to_string_pretty(&self)?;
        file.write_all(serialized.as_bytes())?;
        Ok(())
    }

    pub fn nyquist(&self) -> Float {
        self.sample_rate as Float / 2.0
    }

    /// Length of the start/stop ramp in samples. Zero means an immediate step.
    pub fn ramp_samples(&self) -> u32 {
        (self.ramp_ms * self.sample_rate as Float / 1000.0).round() as u32
    }

    pub fn validate(&self) -> Result<(), ToneError> {
        if self.sample_rate == 0 {
            return Err(ToneError::InvalidConfig("sample_rate must be positive".to_string()));
        }
        if !(self.amplitude >= 0.0 && self.amplitude <= 1.0) {
            return Err(ToneError::InvalidConfig(format!("amplitude {} outside [0, 1]", self.amplitude)));
        }
        if !(self.ramp_ms.is_finite() && self.ramp_ms >= 0.0) {
            return Err(ToneError::InvalidConfig(format!("ramp_ms {} must be a non-negative number", self.ramp_ms)));
        }
        let ceiling = self.nyquist() - NYQUIST_MARGIN;
        if ceiling <= 0.0 {
            return Err(ToneError::InvalidConfig(format!("sample_rate {} leaves no playable range", self.sample_rate)));
        }
        if !(self.min_frequency.is_finite() && self.min_frequency > 0.0 && self.min_frequency < ceiling) {
            return Err(ToneError::InvalidConfig(format!("min_frequency {} must lie in (0, {})", self.min_frequency, ceiling)));
        }
        Ok(())
    }
}

#[cfg(test)]
#[test]
fn test_defaults_are_valid() {
    let config = ToneConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.ramp_samples(), 221); // 5 ms at 44.1 kHz
}

#[test]
fn test_validate_rejects() {
    let mut config = ToneConfig::new(0);
    assert!(config.validate().is_err());

    config = ToneConfig::default();
    config.amplitude = 1.5;
    assert!(config.validate().is_err());

    config = ToneConfig::default();
    config.ramp_ms = -1.0;
    assert!(config.validate().is_err());

    config = ToneConfig::new(40);
    assert!(config.validate().is_err()); // Floor of 20 Hz is at Nyquist

    config = ToneConfig::new(41);
    assert!(config.validate().is_err()); // Floor above the clamping ceiling of 19.5 Hz

    config = ToneConfig::new(2);
    config.min_frequency = 0.25;
    assert!(config.validate().is_err()); // No room below Nyquist at all
}

#[test]
fn test_partial_json_uses_defaults() {
    let config: ToneConfig = serde_json::from_str(r#"{"sample_rate": 48000, "waveform": "triangle"}"#).unwrap();
    assert_eq!(config.sample_rate, 48000);
    assert_eq!(config.waveform, Waveform::Triangle);
    assert_eq!(config.initial_frequency, 440.0);
}

#[test]
fn test_save_and_load() {
    let path = std::env::temp_dir().join(format!("tonegen_config_{}.json", std::process::id()));
    let mut config = ToneConfig::new(48000);
    config.ramp_ms = 10.0;
    config.save(&path).unwrap();
    let loaded = ToneConfig::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_waveform_values() {
    let eps = 1e-12;
    assert!(Waveform::Sine.value(0.0).abs() < eps);
    assert!((Waveform::Sine.value(0.25) - 1.0).abs() < eps);
    assert!(Waveform::Triangle.value(0.0).abs() < eps);
    assert!((Waveform::Triangle.value(0.25) - 1.0).abs() < eps);
    assert!(Waveform::Triangle.value(0.5).abs() < eps);
    assert!((Waveform::Triangle.value(0.75) + 1.0).abs() < eps);
}
