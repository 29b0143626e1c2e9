//! Audio codec contract
//!
//! Decoding and encoding live outside the core. Concrete codecs implement
//! [`AudioCodec`] and are wired around the processor by the application.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::types::{AudioProperties, Waveform};

/// Errors that can occur while loading or saving audio
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Failed to read audio file: {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write audio file: {path}: {message}")]
    Write { path: PathBuf, message: String },

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("Decoding failed: {0}")]
    Decode(String),

    #[error("Resampling failed: {0}")]
    Resample(String),

    #[error("Unsupported encoder setting: {0}")]
    UnsupportedSetting(String),
}

/// Loads files into waveforms and writes waveforms back to files
pub trait AudioCodec {
    /// Decode `path`, converted to `sample_rate`
    ///
    /// Returns the waveform together with a snapshot of its properties.
    fn load(&self, path: &Path, sample_rate: u32)
        -> Result<(Waveform, AudioProperties), CodecError>;

    /// Encode `waveform` to `path`
    ///
    /// `bitrate` is in bits per second. Encoders without a bitrate setting
    /// reject `Some` with [`CodecError::UnsupportedSetting`].
    fn save(
        &self,
        path: &Path,
        waveform: &Waveform,
        sample_rate: u32,
        bitrate: Option<u32>,
    ) -> Result<(), CodecError>;

    /// File extension written by `save`, without the dot
    fn extension(&self) -> &'static str;
}
