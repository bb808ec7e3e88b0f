//! File-backed sensors
//!
//! Host stand-ins for the presence and light drivers. Each read reopens the
//! file, so anything that rewrites it (a sysfs GPIO `value` node, a script,
//! a test) drives the node.
//!
//! - presence: `0` or `1`, surrounding whitespace ignored
//! - light: a decimal lux value
//!
//! An unreadable or unparsable light file reads as NaN, which the classifier
//! discards. An unreadable presence file is a pin error.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use edgewatch_core::LightSensor;
use embedded_hal::digital::{self, ErrorKind, ErrorType, InputPin};
use thiserror::Error;

/// Presence input read errors
#[derive(Error, Debug)]
pub enum PresenceReadError {
    /// File could not be read
    #[error("presence input unreadable: {0}")]
    Io(io::ErrorKind),
    /// File did not contain `0` or `1`
    #[error("presence input is not 0 or 1")]
    Invalid,
}

impl digital::Error for PresenceReadError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Presence input backed by a `0`/`1` file
#[derive(Debug, Clone)]
pub struct FilePresence {
    path: PathBuf,
}

impl FilePresence {
    /// Input reading `path`
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    fn read_level(&self) -> Result<bool, PresenceReadError> {
        let raw = fs::read_to_string(&self.path).map_err(|e| PresenceReadError::Io(e.kind()))?;
        match raw.trim() {
            "1" => Ok(true),
            "0" => Ok(false),
            _ => Err(PresenceReadError::Invalid),
        }
    }
}

impl ErrorType for FilePresence {
    type Error = PresenceReadError;
}

impl InputPin for FilePresence {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.read_level()
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.read_level().map(|high| !high)
    }
}

/// Illuminance sensor backed by a decimal file
#[derive(Debug, Clone)]
pub struct FileLight {
    path: PathBuf,
}

impl FileLight {
    /// Sensor reading `path`
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }
}

impl LightSensor for FileLight {
    fn read_lux(&mut self) -> f32 {
        fs::read_to_string(&self.path)
            .ok()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(f32::NAN)
    }
}
