//! Stemify Core - windowed inference for stem separation
//!
//! Separates long recordings with models that only accept short, fixed-size
//! inputs: the input is cut into overlapping windows, each window is run
//! through an [`InferenceEngine`], and interior slices of the outputs are
//! stitched back into full-length tracks.
//!
//! ```text
//! Waveform ─► WindowPlan ─► loop { extract_segment ─► engine ─► copy_segment } ─► tracks
//!                                        │
//!                                        └─► ProgressObserver
//! ```
//!
//! Model runtimes and audio codecs are injected through the
//! [`InferenceEngine`] and [`AudioCodec`] traits; this crate does no I/O.

pub mod codec;
pub mod engine;
pub mod error;
pub mod observer;
pub mod processor;
pub mod segment;
pub mod types;
pub mod window;

pub use codec::{AudioCodec, CodecError};
pub use engine::{EngineError, EngineLease, EngineLifecycle, InferenceEngine};
pub use error::ProcessError;
pub use observer::{ObserverHandle, ProgressObserver};
pub use processor::{AudioProcessor, Outcome, ProcessorConfig, Separation};
pub use types::*;
pub use window::WindowPlan;
