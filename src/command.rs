use super::Float;
use super::ToneError;

use std::str::FromStr;

/// Longest span a single `render` command may ask for.
pub const MAX_RENDER_MS: Float = 600_000.0;

/// One line of input to the command driver.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    Frequency(Float),
    Play,
    Stop,
    Status,
    Render(Float), // Milliseconds to pull from the voice
    Quit,
}

impl FromStr for Command {
    type Err = ToneError;

    fn from_str(line: &str) -> Result<Command, ToneError> {
        let mut words = line.split_whitespace();
        let verb = words.next().unwrap_or("").to_lowercase();
        let arg = words.next();
        if words.next().is_some() {
            return Err(ToneError::Parse(line.trim().to_string()));
        }
        let number = |arg: Option<&str>| -> Result<Float, ToneError> {
            arg.and_then(|a| a.parse::<Float>().ok())
               .ok_or_else(|| ToneError::Parse(line.trim().to_string()))
        };
        match (verb.as_str(), arg) {
            ("freq", _) | ("f", _) => Ok(Command::Frequency(number(arg)?)),
            ("render", _) | ("r", _) => {
                let ms = number(arg)?;
                if !(ms.is_finite() && ms >= 0.0 && ms <= MAX_RENDER_MS) {
                    return Err(ToneError::Parse(line.trim().to_string()));
                }
                Ok(Command::Render(ms))
            }
            ("play", None) | ("p", None) => Ok(Command::Play),
            ("stop", None) | ("s", None) => Ok(Command::Stop),
            ("status", None) => Ok(Command::Status),
            ("quit", None) | ("q", None) | ("exit", None) => Ok(Command::Quit),
            _ => Err(ToneError::Parse(line.trim().to_string())),
        }
    }
}

#[cfg(test)]
#[test]
fn test_parse_commands() {
    assert_eq!("freq 440".parse::<Command>().unwrap(), Command::Frequency(440.0));
    assert_eq!("  F   -20.5 ".parse::<Command>().unwrap(), Command::Frequency(-20.5));
    assert_eq!("play".parse::<Command>().unwrap(), Command::Play);
    assert_eq!("STOP".parse::<Command>().unwrap(), Command::Stop);
    assert_eq!("status".parse::<Command>().unwrap(), Command::Status);
    assert_eq!("render 250".parse::<Command>().unwrap(), Command::Render(250.0));
    assert_eq!("q".parse::<Command>().unwrap(), Command::Quit);
}

#[test]
fn test_parse_errors() {
    assert!("".parse::<Command>().is_err());
    assert!("freq".parse::<Command>().is_err());
    assert!("freq abc".parse::<Command>().is_err());
    assert!("play now".parse::<Command>().is_err());
    assert!("render -5".parse::<Command>().is_err());
    assert!("render 1e300".parse::<Command>().is_err());
    assert!("render 600001".parse::<Command>().is_err());
    assert_eq!("render 600000".parse::<Command>().unwrap(), Command::Render(MAX_RENDER_MS));
    assert!("freq 1 2".parse::<Command>().is_err());
    assert!("volume 3".parse::<Command>().is_err());
}
