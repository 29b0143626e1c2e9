//! Stemify command line tool
//!
//! ```text
//! stemify <input> [--model 2stems|5stems] [--output DIR] [--config FILE]
//!                 [--format wav|flac] [--window SECS] [--keep-warm]
//! ```
//!
//! Set RUST_LOG=debug for per-window output.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use stemify::config::{default_config_path, load_config, StemifyConfig};
use stemify::separation::{CallbackObserver, ModelType, OutputFormat, SeparationService};
use stemify_core::{EngineLifecycle, Outcome, ProgressObserver};

const USAGE: &str = "\
Usage: stemify <input> [options]

Options:
  --model <2stems|5stems>  Separation model (default from config)
  --output <DIR>           Directory for the project folder
  --config <FILE>          Config file (default ~/.config/stemify/config.yaml)
  --format <wav|flac>      Stem file format (default from config)
  --window <SECS>          Inference window length in seconds
  --keep-warm              Keep the model loaded for the whole run
  -h, --help               Show this help";

/// Parsed command line
#[derive(Debug, Default)]
struct Args {
    input: Option<PathBuf>,
    model: Option<ModelType>,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
    format: Option<OutputFormat>,
    window_seconds: Option<f32>,
    keep_warm: bool,
    help: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let mut value = |flag: &str| {
            args.next()
                .with_context(|| format!("{} requires a value", flag))
        };

        match arg.as_str() {
            "-h" | "--help" => parsed.help = true,
            "--keep-warm" => parsed.keep_warm = true,
            "--model" => {
                let model = value("--model")?;
                parsed.model = Some(model.parse().map_err(anyhow::Error::msg)?);
            }
            "--output" => parsed.output = Some(PathBuf::from(value("--output")?)),
            "--config" => parsed.config = Some(PathBuf::from(value("--config")?)),
            "--format" => {
                let format = value("--format")?;
                parsed.format = Some(format.parse().map_err(anyhow::Error::msg)?);
            }
            "--window" => {
                let secs = value("--window")?;
                parsed.window_seconds = Some(
                    secs.parse()
                        .with_context(|| format!("Invalid window length: {}", secs))?,
                );
            }
            flag if flag.starts_with("--") => bail!("Unknown option: {}", flag),
            _ if parsed.input.is_none() => parsed.input = Some(PathBuf::from(&arg)),
            _ => bail!("Unexpected argument: {}", arg),
        }
    }

    Ok(parsed)
}

/// Config file values with command line overrides applied
fn effective_config(args: &Args) -> StemifyConfig {
    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let mut config: StemifyConfig = load_config(&config_path);

    if let Some(model) = args.model {
        config.separation.model = model;
    }
    if let Some(format) = args.format {
        config.separation.output_format = format;
    }
    if let Some(secs) = args.window_seconds {
        config.separation.window_seconds = secs;
    }
    if args.keep_warm {
        config.separation.engine_lifecycle = EngineLifecycle::Persistent;
    }
    if let Some(output) = &args.output {
        config.output_dir = output.clone();
    }
    config.separation.validate();
    config
}

fn console_observer() -> Arc<dyn ProgressObserver> {
    Arc::new(
        CallbackObserver::new()
            .on_start(|| log::info!("Processing started"))
            .on_progress(|p| log::info!("Progress: {:.0}%", p * 100.0))
            .on_finish(|| log::info!("Processing finished"))
            .on_error(|message| log::error!("Processing failed: {}", message)),
    )
}

fn run(args: Args) -> Result<Outcome> {
    let input = args.input.clone().context("No input file given")?;
    let config = effective_config(&args);

    log::info!(
        "Model: {}, output: {}, window: {}s, engine lifecycle: {}",
        config.separation.model.display_name(),
        config.separation.output_format.display_name(),
        config.separation.window_seconds,
        config.separation.engine_lifecycle.display_name()
    );

    let service = SeparationService::with_config(config.separation.clone())
        .context("Failed to create separation service")?;

    let observer = console_observer();
    let report = service
        .process_file(&input, &config.output_dir, Some(observer))
        .with_context(|| format!("Failed to separate {:?}", input))?;

    println!("{}", report.project_dir.display());
    for file in &report.stem_files {
        println!("  {}", file.display());
    }

    Ok(report.outcome)
}

fn main() -> ExitCode {
    // Initialize logger - set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}\n\n{}", e, USAGE);
            return ExitCode::from(2);
        }
    };

    if args.help {
        println!("{}", USAGE);
        return ExitCode::SUCCESS;
    }

    match run(args) {
        Ok(Outcome::Completed) => ExitCode::SUCCESS,
        Ok(outcome) => {
            log::warn!("Stems are incomplete: {:?}", outcome);
            ExitCode::from(3)
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_full_command_line() {
        let parsed = parse_args(args(&[
            "song.mp3", "--model", "5stems", "--output", "out", "--format", "flac", "--window",
            "6", "--keep-warm",
        ]))
        .unwrap();

        assert_eq!(parsed.input, Some(PathBuf::from("song.mp3")));
        assert_eq!(parsed.model, Some(ModelType::Spleeter5Stems));
        assert_eq!(parsed.output, Some(PathBuf::from("out")));
        assert_eq!(parsed.format, Some(OutputFormat::Flac));
        assert_eq!(parsed.window_seconds, Some(6.0));
        assert!(parsed.keep_warm);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_args(args(&["--model"])).is_err());
        assert!(parse_args(args(&["--model", "3stems"])).is_err());
        assert!(parse_args(args(&["--window", "abc"])).is_err());
        assert!(parse_args(args(&["--format", "mp3"])).is_err());
        assert!(parse_args(args(&["a.wav", "b.wav"])).is_err());
        assert!(parse_args(args(&["--verbose"])).is_err());
    }

    #[test]
    fn test_overrides_apply() {
        let dir = tempfile::tempdir().unwrap();
        let parsed = Args {
            config: Some(dir.path().join("missing.yaml")),
            window_seconds: Some(120.0),
            keep_warm: true,
            format: Some(OutputFormat::Flac),
            output: Some(dir.path().to_path_buf()),
            ..Default::default()
        };

        let config = effective_config(&parsed);
        assert_eq!(config.separation.window_seconds, 60.0);
        assert_eq!(config.separation.engine_lifecycle, EngineLifecycle::Persistent);
        assert_eq!(config.separation.output_format, OutputFormat::Flac);
        assert_eq!(config.output_dir, dir.path());
    }
}
