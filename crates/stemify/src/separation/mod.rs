//! Audio stem separation
//!
//! Wires the windowed processor from `stemify-core` to concrete pieces: an
//! ONNX Runtime engine, a symphonia/hound/flacenc codec and an on-disk model cache.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  SeparationService                       │
//! │  • Locates / downloads the model                        │
//! │  • Decodes and converts the input                       │
//! │  • Writes stems into a project folder                   │
//! └─────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │            AudioProcessor (stemify-core)                 │
//! │  • Overlapping windows, keep-slice stitching            │
//! │  • Progress via weakly held ProgressObserver            │
//! └─────────────────────────────────────────────────────────┘
//!                              │
//!               ┌──────────────┴──────────────┐
//!               ▼                              ▼
//!     ┌─────────────────────┐        ┌─────────────────┐
//!     │ OrtInferenceEngine  │        │ SymphoniaCodec  │
//!     │  (InferenceEngine)  │        │  (AudioCodec)   │
//!     └─────────────────────┘        └─────────────────┘
//! ```

mod codec;
mod config;
mod engine;
mod error;
mod model;
mod observer;
mod service;

pub use codec::{remix_channels, resample, SymphoniaCodec};
pub use config::{ModelType, OutputFormat, SeparationConfig};
pub use engine::{EngineParameters, OrtInferenceEngine};
pub use error::SeparationError;
pub use model::{DownloadProgress, ModelManager};
pub use observer::CallbackObserver;
pub use service::{SeparationReport, SeparationService};
