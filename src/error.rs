// THEORY:
// Every failure the engine can report lives here. The taxonomy is small on
// purpose: an image either decodes or it does not (`DecodeError`), microclimate
// inputs are either usable or rejected before scoring (`ValidationError`), and
// the external reading store is either reachable or not (`StoreError`).
//
// Note what is *not* an error: an empty reading history is a normal "no data"
// outcome, and missing or negative pest counts are clamped to zero by the
// scoring code rather than rejected.

use std::io;
use thiserror::Error;

/// The trap photograph could not be read or decoded. Fatal to that call.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("image decode failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("image read failed: {0}")]
    Io(#[from] io::Error),

    #[error("image has no pixels ({width}x{height})")]
    Empty { width: u32, height: u32 },

    /// The blocking task running the decode was cancelled or panicked.
    #[error("segmentation task aborted: {0}")]
    Aborted(String),
}

/// A microclimate input was missing or not a usable number.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// The external reading store could not be reached or returned garbage.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("reading store unavailable: {0}")]
    Unavailable(String),

    #[error("reading store IO: {0}")]
    Io(#[from] io::Error),

    #[error("reading store snapshot is malformed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration file existed but could not be used.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config IO: {0}")]
    Io(#[from] io::Error),

    #[error("config parse: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("config serialize: {0}")]
    TomlSer(#[from] toml::ser::Error),
}
