use super::Float;

use failure::Fail;

#[derive(Debug, Fail)]
pub enum ToneError {
    /// Non-positive or non-finite frequency. Recovered by clamping, only
    /// ever logged.
    #[fail(display = "invalid frequency {} Hz", _0)]
    InvalidFrequency(Float),

    #[fail(display = "sample rate mismatch: voice runs at {} Hz, output requested {} Hz", expected, requested)]
    SampleRateMismatch { expected: u32, requested: u32 },

    #[fail(display = "invalid configuration: {}", _0)]
    InvalidConfig(String),

    #[fail(display = "unknown command: {}", _0)]
    Parse(String),

    #[fail(display = "audio device error: {}", _0)]
    Device(String),

    #[fail(display = "I/O error: {}", _0)]
    Io(#[cause] std::io::Error),

    #[fail(display = "config format error: {}", _0)]
    Json(#[cause] serde_json::Error),
}

impl From<std::io::Error> for ToneError {
    fn from(err: std::io::Error) -> Self {
        ToneError::Io(err)
    }
}

impl From<serde_json::Error> for ToneError {
    fn from(err: serde_json::Error) -> Self {
        ToneError::Json(err)
    }
}

#[cfg(test)]
#[test]
fn test_display() {
    let err = ToneError::SampleRateMismatch{expected: 44100, requested: 48000};
    assert_eq!(format!("{}", err), "sample rate mismatch: voice runs at 44100 Hz, output requested 48000 Hz");
    assert_eq!(format!("{}", ToneError::InvalidFrequency(-3.0)), "invalid frequency -3 Hz");
}
