//! Separation configuration types

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use stemify_core::{EngineLifecycle, ProcessorConfig, DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE};

/// Configuration for audio stem separation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeparationConfig {
    /// Which model to use
    pub model: ModelType,

    /// Inference window length in seconds (affects memory usage)
    pub window_seconds: f32,

    /// Sample rate audio is converted to before inference
    pub sample_rate: u32,

    /// Channel count the model expects
    pub channels: usize,

    /// File format stems are written in
    pub output_format: OutputFormat,

    /// Encoder bitrate in bits per second, for formats that take one
    pub bitrate: Option<u32>,

    /// Re-initialize the engine per window or keep it loaded for the run
    pub engine_lifecycle: EngineLifecycle,

    /// Override for the model cache directory
    pub model_dir: Option<PathBuf>,

    /// URL to fetch the model from when it is not cached
    pub model_url: Option<String>,
}

impl Default for SeparationConfig {
    fn default() -> Self {
        Self {
            model: ModelType::Spleeter2Stems,
            window_seconds: 4.0,
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            output_format: OutputFormat::Wav,
            bitrate: None,
            engine_lifecycle: EngineLifecycle::PerWindow,
            model_dir: None,
            model_url: None,
        }
    }
}

impl SeparationConfig {
    /// Validate configuration values
    pub fn validate(&mut self) {
        if !self.window_seconds.is_finite() {
            self.window_seconds = 4.0;
        }
        self.window_seconds = self.window_seconds.clamp(0.5, 60.0);
        self.channels = self.channels.clamp(1, 8);
        if self.sample_rate == 0 {
            self.sample_rate = DEFAULT_SAMPLE_RATE;
        }
    }

    /// Check that the output settings can be honored by the encoder
    pub fn check_output(&self) -> Result<(), String> {
        self.output_format.check_bitrate(self.bitrate)
    }

    /// Processor settings derived from this configuration
    pub fn processor_config(&self) -> ProcessorConfig {
        ProcessorConfig {
            window_seconds: self.window_seconds,
            sample_rate: self.sample_rate,
            engine_lifecycle: self.engine_lifecycle,
            ..ProcessorConfig::default()
        }
    }
}

/// Available separation models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ModelType {
    /// Vocals and accompaniment
    #[default]
    Spleeter2Stems,

    /// Vocals, drums, bass, piano and other
    Spleeter5Stems,
}

impl ModelType {
    /// Display name for UI
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Spleeter2Stems => "2 Stems",
            Self::Spleeter5Stems => "5 Stems",
        }
    }

    /// Description for UI
    pub fn description(&self) -> &'static str {
        match self {
            Self::Spleeter2Stems => "Vocals and accompaniment - fastest",
            Self::Spleeter5Stems => "Vocals, drums, bass, piano and other",
        }
    }

    /// Model filename inside the cache directory
    pub fn filename(&self) -> &'static str {
        match self {
            Self::Spleeter2Stems => "spleeter_2stems.onnx",
            Self::Spleeter5Stems => "spleeter_5stems.onnx",
        }
    }

    /// Stem names in the order the model outputs them
    pub fn stem_names(&self) -> &'static [&'static str] {
        match self {
            Self::Spleeter2Stems => &["vocals", "accompaniment"],
            Self::Spleeter5Stems => &["vocals", "drums", "bass", "piano", "other"],
        }
    }

    /// Number of output stems
    pub fn stem_count(&self) -> usize {
        self.stem_names().len()
    }

    /// Name of the model's input tensor
    pub fn input_tensor_name(&self) -> &'static str {
        "waveform"
    }

    /// Names of the model's output tensors, one per stem
    pub fn output_tensor_names(&self) -> Vec<String> {
        self.stem_names()
            .iter()
            .map(|stem| format!("waveform_{}", stem))
            .collect()
    }

    /// All available models
    pub fn all() -> &'static [Self] {
        &[Self::Spleeter2Stems, Self::Spleeter5Stems]
    }
}

impl FromStr for ModelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "2" | "2stems" | "2-stems" | "spleeter2-stems" => Ok(Self::Spleeter2Stems),
            "5" | "5stems" | "5-stems" | "spleeter5-stems" => Ok(Self::Spleeter5Stems),
            other => Err(format!("unknown model '{}', expected 2stems or 5stems", other)),
        }
    }
}

/// File format for written stems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// 32-bit float WAV
    #[default]
    Wav,

    /// 24-bit FLAC
    Flac,
}

impl OutputFormat {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Wav => "WAV",
            Self::Flac => "FLAC",
        }
    }

    /// File extension, without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Flac => "flac",
        }
    }

    /// Whether the encoder accepts a target bitrate
    pub fn supports_bitrate(&self) -> bool {
        match self {
            Self::Wav | Self::Flac => false,
        }
    }

    /// Reject a bitrate the encoder cannot use
    pub fn check_bitrate(&self, bitrate: Option<u32>) -> Result<(), String> {
        match bitrate {
            Some(bitrate) if !self.supports_bitrate() => Err(format!(
                "{} output is lossless and does not take a bitrate (got {})",
                self.display_name(),
                bitrate
            )),
            _ => Ok(()),
        }
    }

    pub fn all() -> &'static [Self] {
        &[Self::Wav, Self::Flac]
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wav" => Ok(Self::Wav),
            "flac" => Ok(Self::Flac),
            other => Err(format!("unknown output format '{}', expected wav or flac", other)),
        }
    }
}
