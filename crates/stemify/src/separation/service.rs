//! Separation service - turns an audio file into a folder of stems
//!
//! The `SeparationService` is the main entry point for stem separation.
//! It handles:
//! - Locating (and optionally downloading) the model
//! - Decoding the input and converting it to the model's format
//! - Running the windowed processor with the configured engine
//! - Writing one file per stem into a fresh project folder

use std::path::{Path, PathBuf};
use std::sync::Arc;

use stemify_core::{
    AudioCodec, AudioProcessor, AudioProperties, InferenceEngine, Outcome, ProgressObserver,
};

use super::codec::{remix_channels, SymphoniaCodec};
use super::config::SeparationConfig;
use super::engine::{EngineParameters, OrtInferenceEngine};
use super::error::{Result, SeparationError};
use super::model::{DownloadProgress, ModelManager};
use crate::project::create_project_dir;

/// What a finished run produced
#[derive(Debug, Clone)]
pub struct SeparationReport {
    /// Project folder holding the stems
    pub project_dir: PathBuf,
    /// One file per stem, in model output order
    pub stem_files: Vec<PathBuf>,
    /// How the processor run ended
    pub outcome: Outcome,
    /// Properties of the decoded input after conversion
    pub properties: AudioProperties,
    /// Number of inference calls made
    pub windows_processed: usize,
}

/// Main service for audio stem separation
///
/// Example usage:
/// ```ignore
/// let service = SeparationService::new()?;
/// let report = service.process_file("song.mp3".as_ref(), "out".as_ref(), None)?;
/// ```
pub struct SeparationService {
    /// Current separation config
    config: SeparationConfig,
    /// Model cache
    model_manager: ModelManager,
    /// Decoder, and encoder for the configured output format
    codec: SymphoniaCodec,
}

impl SeparationService {
    /// Create a new separation service with default config
    pub fn new() -> Result<Self> {
        Self::with_config(SeparationConfig::default())
    }

    /// Create a separation service with custom config
    pub fn with_config(mut config: SeparationConfig) -> Result<Self> {
        config.validate();

        let model_manager = match &config.model_dir {
            Some(dir) => ModelManager::with_cache_dir(dir.clone()),
            None => ModelManager::new()?,
        };

        Ok(Self {
            model_manager,
            codec: SymphoniaCodec::new(config.output_format),
            config,
        })
    }

    /// Update configuration
    pub fn set_config(&mut self, mut config: SeparationConfig) {
        config.validate();

        if config.model_dir != self.config.model_dir {
            if let Some(dir) = &config.model_dir {
                self.model_manager = ModelManager::with_cache_dir(dir.clone());
            }
        }
        if config.output_format != self.codec.format() {
            self.codec = SymphoniaCodec::new(config.output_format);
        }

        self.config = config;
    }

    /// Get current configuration
    pub fn config(&self) -> &SeparationConfig {
        &self.config
    }

    /// Get the model manager (for cache operations)
    pub fn model_manager(&self) -> &ModelManager {
        &self.model_manager
    }

    /// Check if the configured model is cached
    pub fn is_model_ready(&self) -> bool {
        self.model_manager.is_model_available(self.config.model)
    }

    /// Ensure the model is available, downloading it if a URL is configured
    pub fn ensure_model_downloaded(&self, progress: Option<DownloadProgress>) -> Result<PathBuf> {
        self.model_manager
            .ensure_model(self.config.model, self.config.model_url.as_deref(), progress)
    }

    /// Separate an audio file into stems
    ///
    /// # Arguments
    /// * `input_path` - Path to the input audio file
    /// * `output_dir` - Directory in which the project folder is created
    /// * `observer` - Optional observer for processing progress
    ///
    /// A run that ends early still writes its stems; check
    /// [`SeparationReport::outcome`].
    pub fn process_file(
        &self,
        input_path: &Path,
        output_dir: &Path,
        observer: Option<Arc<dyn ProgressObserver>>,
    ) -> Result<SeparationReport> {
        if !input_path.exists() {
            return Err(SeparationError::InputNotFound(input_path.to_path_buf()));
        }

        let model_path = self.ensure_model_downloaded(None)?;
        let mut engine =
            OrtInferenceEngine::new(EngineParameters::for_model(self.config.model, model_path));

        self.process_with_engine(input_path, output_dir, &mut engine, observer)
    }

    /// Separate an audio file using the given engine
    pub fn process_with_engine<E: InferenceEngine + ?Sized>(
        &self,
        input_path: &Path,
        output_dir: &Path,
        engine: &mut E,
        observer: Option<Arc<dyn ProgressObserver>>,
    ) -> Result<SeparationReport> {
        let config = &self.config;
        let model = config.model;
        config.check_output().map_err(SeparationError::InvalidConfig)?;

        log::info!(
            "Separating {:?} with {} model ({})",
            input_path,
            model.display_name(),
            engine.name()
        );

        let (decoded, _) = self.codec.load(input_path, config.sample_rate)?;
        let waveform = remix_channels(&decoded, config.channels);
        drop(decoded);
        let properties = waveform.properties(config.sample_rate);

        let mut processor = AudioProcessor::new(config.processor_config());
        if let Some(observer) = &observer {
            processor.set_observer(observer);
        }

        let separation = processor.process(&waveform, engine, model.stem_count())?;

        match separation.outcome {
            Outcome::Completed => {}
            Outcome::StoppedEarly { frames_written } => log::warn!(
                "Separation stopped early after {} of {} frames",
                frames_written,
                properties.frame_count
            ),
            Outcome::TrackCountMismatch {
                expected, found, ..
            } => log::warn!(
                "Model returned {} stems instead of {}; writing partial stems",
                found,
                expected
            ),
        }

        let project_dir = create_project_dir(output_dir, input_path).map_err(|source| {
            SeparationError::ProjectDirError {
                path: output_dir.to_path_buf(),
                source,
            }
        })?;

        let mut stem_files = Vec::with_capacity(separation.tracks.len());
        for (stem, track) in model.stem_names().iter().zip(&separation.tracks) {
            let path = project_dir.join(format!("{}.{}", stem, self.codec.extension()));
            self.codec
                .save(&path, track, config.sample_rate, config.bitrate)?;
            log::debug!("Wrote {:?}", path);
            stem_files.push(path);
        }

        log::info!(
            "Wrote {} stems to {:?}",
            stem_files.len(),
            project_dir
        );

        Ok(SeparationReport {
            project_dir,
            stem_files,
            outcome: separation.outcome,
            properties,
            windows_processed: separation.windows_processed,
        })
    }
}
