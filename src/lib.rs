//! Single-voice tone generator.
//!
//! The control side ([`ParameterController`]) publishes frequency and
//! play/stop intent through a wait-free snapshot slot. The audio side
//! ([`Voice`]) picks up the latest snapshot at each block boundary and
//! renders a click-free oscillator into whatever buffer the output bridge
//! hands it.

pub mod bridge;
pub mod command;
pub mod config;
pub mod controller;
#[cfg(feature = "device")]
pub mod engine;
pub mod error;
pub mod oscillator;
pub mod parameter;
pub mod ramp;
pub mod sample_generator;
pub mod voice;

pub type Float = f64;

pub use bridge::{OutputBridge, BLOCK_SIZE};
pub use command::Command;
pub use config::{ToneConfig, Waveform};
pub use controller::{ParameterController, ToneGenerator};
#[cfg(feature = "device")]
pub use engine::Engine;
pub use error::ToneError;
pub use oscillator::{clamp_frequency, OscillatorCore, OscillatorState};
pub use parameter::{ParameterSnapshot, SnapshotSlot};
pub use ramp::{Ramp, VoiceState};
pub use sample_generator::SampleGenerator;
pub use voice::Voice;
