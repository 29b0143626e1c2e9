//! Separation error types

use std::path::PathBuf;
use thiserror::Error;

use stemify_core::{CodecError, ProcessError};

/// Errors that can occur during audio separation
#[derive(Error, Debug)]
pub enum SeparationError {
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Model download failed: {0}")]
    ModelDownloadFailed(String),

    #[error("Input file not found: {0:?}")]
    InputNotFound(PathBuf),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("Failed to create project folder: {path}")]
    ProjectDirError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, SeparationError>;
