//! Stemify - split songs into stems with windowed ONNX inference
//!
//! The windowing and stitching live in `stemify-core`; this crate supplies
//! the model cache, the ONNX Runtime engine, audio file I/O, project folders
//! and configuration.

pub mod config;
pub mod project;
pub mod separation;

pub use config::StemifyConfig;
pub use separation::{SeparationReport, SeparationService};
