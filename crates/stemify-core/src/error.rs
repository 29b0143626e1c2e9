//! Processing error types

use thiserror::Error;

use crate::engine::EngineError;

/// Errors that abort a processing run
///
/// A wrong stem count from the engine is not an error: the run stops and the
/// partial tracks are returned with [`crate::processor::Outcome::TrackCountMismatch`].
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, ProcessError>;
