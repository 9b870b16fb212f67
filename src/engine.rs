use super::bridge::OutputBridge;
use super::SampleGenerator;
use super::ToneError;
use super::voice::Voice;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Sender;
use log::info;

/// Plays a voice through the default output device.
pub struct Engine {
    // The stream must be held to keep the audio running.
    _stream: cpal::Stream,
    sample_rate: u32,
    channels: u16,
}

impl Engine {
    /// Opens the default output device at the voice's sample rate and starts
    /// the stream. Stream errors reported by the driver are sent to `errors`.
    pub fn start(voice: Voice, errors: Sender<String>) -> Result<Engine, ToneError> {
        let host = cpal::default_host();
        info!("Chose host {:?}", host.id());
        let device = host.default_output_device()
            .ok_or_else(|| ToneError::Device("no default output device".to_string()))?;
        info!("Chose device {:?}", device.name());

        let sample_rate = voice.sample_rate();
        let ranges: Vec<cpal::SupportedStreamConfigRange> = device.supported_output_configs()
            .map_err(|e| ToneError::Device(e.to_string()))?
            .filter(|r| r.min_sample_rate().0 <= sample_rate && sample_rate <= r.max_sample_rate().0)
            .collect();
        if ranges.is_empty() {
            let default = device.default_output_config().map_err(|e| ToneError::Device(e.to_string()))?;
            return Err(ToneError::SampleRateMismatch{expected: sample_rate, requested: default.sample_rate().0});
        }
        let range = ranges.into_iter()
            .find(|r| r.sample_format() == cpal::SampleFormat::F32)
            .ok_or_else(|| ToneError::Device(format!("no f32 output format at {} Hz", sample_rate)))?;

        let config: cpal::StreamConfig = range.with_sample_rate(cpal::SampleRate(sample_rate)).into();
        let channels = config.channels;
        let mut bridge = OutputBridge::new(voice, config.sample_rate.0, channels)?;

        let stream = device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| bridge.write(data),
            move |err| {
                let _ = errors.send(err.to_string());
            },
            None,
        ).map_err(|e| ToneError::Device(e.to_string()))?;
        stream.play().map_err(|e| ToneError::Device(e.to_string()))?;
        info!("Stream running: {} Hz, {} channel(s)", sample_rate, channels);

        Ok(Engine{_stream: stream, sample_rate, channels})
    }

    pub fn get_sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn get_channels(&self) -> u16 {
        self.channels
    }
}
