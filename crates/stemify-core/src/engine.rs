//! Inference engine contract
//!
//! The processor never talks to a model runtime directly. It drives anything
//! implementing [`InferenceEngine`] through a fixed per-window sequence:
//!
//! ```text
//! init() → execute(window) → take_results() → shutdown()
//! ```
//!
//! Every successful `init()` is paired with exactly one `shutdown()`, also
//! when `execute()` fails. [`EngineLease`] enforces that pairing.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Waveform;

/// Errors raised by an inference engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Engine initialization failed: {0}")]
    Init(String),

    #[error("Engine execution failed: {0}")]
    Exec(String),

    #[error("Engine used before init()")]
    NotInitialized,
}

/// A model runtime that separates one fixed-size window per call
///
/// Results are returned in a fixed, caller-known stem order.
pub trait InferenceEngine {
    /// Prepare the engine to accept one window
    fn init(&mut self) -> Result<(), EngineError>;

    /// Run one forward pass over `window`
    fn execute(&mut self, window: &Waveform) -> Result<(), EngineError>;

    /// Move out the per-stem outputs of the last `execute()`
    fn take_results(&mut self) -> Vec<Waveform>;

    /// Release per-window resources
    ///
    /// Called exactly once per successful `init()`.
    fn shutdown(&mut self);

    /// Engine name for logging
    fn name(&self) -> &str {
        "engine"
    }
}

/// When the processor initializes and releases the engine
///
/// `PerWindow` re-initializes around every window, trading throughput for a
/// lifecycle where nothing survives between windows. `Persistent` keeps one
/// initialized engine for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EngineLifecycle {
    #[default]
    PerWindow,
    Persistent,
}

impl EngineLifecycle {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::PerWindow => "Per window",
            Self::Persistent => "Persistent",
        }
    }
}

/// An initialized engine that is shut down when dropped
pub struct EngineLease<'a, E: InferenceEngine + ?Sized> {
    engine: &'a mut E,
}

impl<'a, E: InferenceEngine + ?Sized> EngineLease<'a, E> {
    /// Initialize `engine`; on failure nothing needs releasing
    pub fn acquire(engine: &'a mut E) -> Result<Self, EngineError> {
        engine.init()?;
        Ok(Self { engine })
    }

    /// Execute one window and collect its outputs
    pub fn run(&mut self, window: &Waveform) -> Result<Vec<Waveform>, EngineError> {
        self.engine.execute(window)?;
        Ok(self.engine.take_results())
    }
}

impl<E: InferenceEngine + ?Sized> Drop for EngineLease<'_, E> {
    fn drop(&mut self) {
        self.engine.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingEngine {
        inits: usize,
        shutdowns: usize,
        fail_init: bool,
        fail_exec: bool,
    }

    impl InferenceEngine for CountingEngine {
        fn init(&mut self) -> Result<(), EngineError> {
            if self.fail_init {
                return Err(EngineError::Init("no model".to_string()));
            }
            self.inits += 1;
            Ok(())
        }

        fn execute(&mut self, _window: &Waveform) -> Result<(), EngineError> {
            if self.fail_exec {
                return Err(EngineError::Exec("bad shape".to_string()));
            }
            Ok(())
        }

        fn take_results(&mut self) -> Vec<Waveform> {
            vec![Waveform::silence(1, 2)]
        }

        fn shutdown(&mut self) {
            self.shutdowns += 1;
        }
    }

    #[test]
    fn test_lease_releases_after_run() {
        let mut engine = CountingEngine::default();
        {
            let mut lease = EngineLease::acquire(&mut engine).unwrap();
            let results = lease.run(&Waveform::silence(4, 2)).unwrap();
            assert_eq!(results.len(), 1);
        }
        assert_eq!(engine.inits, 1);
        assert_eq!(engine.shutdowns, 1);
    }

    #[test]
    fn test_lease_releases_on_exec_failure() {
        let mut engine = CountingEngine {
            fail_exec: true,
            ..Default::default()
        };
        {
            let mut lease = EngineLease::acquire(&mut engine).unwrap();
            assert!(matches!(
                lease.run(&Waveform::silence(4, 2)),
                Err(EngineError::Exec(_))
            ));
        }
        assert_eq!(engine.shutdowns, 1);
    }

    #[test]
    fn test_failed_init_is_not_released() {
        let mut engine = CountingEngine {
            fail_init: true,
            ..Default::default()
        };
        assert!(EngineLease::acquire(&mut engine).is_err());
        assert_eq!(engine.shutdowns, 0);
    }

    #[test]
    fn test_lifecycle_serde_names() {
        assert_eq!(
            serde_yaml::to_string(&EngineLifecycle::PerWindow).unwrap().trim(),
            "per-window"
        );
        let parsed: EngineLifecycle = serde_yaml::from_str("persistent").unwrap();
        assert_eq!(parsed, EngineLifecycle::Persistent);
    }
}
