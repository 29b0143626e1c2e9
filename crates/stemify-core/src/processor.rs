//! Windowed inference orchestration
//!
//! `AudioProcessor::process` splits an arbitrarily long waveform into
//! overlapping windows, runs the engine once per window, keeps an interior
//! slice of each window's output and stitches the slices into full-length
//! tracks. See [`crate::window`] for the slice layout.
//!
//! ## Termination
//!
//! The loop runs while output frames remain and stops early, without an
//! error, when a window or keep-slice comes out empty (only possible with a
//! zero-length window or an engine returning less audio than it was given).
//! After such a stop, one trailing window covering the rest of the input is
//! run and its leading frames fill the gap as far as they reach.
//!
//! An engine returning the wrong number of stems ends the run immediately;
//! the tracks stitched so far are returned with
//! [`Outcome::TrackCountMismatch`]. Engine init/exec failures are returned as
//! errors.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::engine::{EngineError, EngineLease, EngineLifecycle, InferenceEngine};
use crate::error::{ProcessError, Result};
use crate::observer::{ObserverHandle, ProgressObserver};
use crate::segment::{copy_segment, extract_segment};
use crate::types::{Waveform, DEFAULT_SAMPLE_RATE};
use crate::window::WindowPlan;

/// Configuration for one processor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Length of each inference window in seconds
    pub window_seconds: f32,

    /// Sample rate of the waveforms handed to `process`
    pub sample_rate: u32,

    /// Minimum progress increase between two progress notifications
    pub progress_threshold: f32,

    /// When the engine is initialized and released
    pub engine_lifecycle: EngineLifecycle,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            window_seconds: 4.0,
            sample_rate: DEFAULT_SAMPLE_RATE,
            progress_threshold: 0.05,
            engine_lifecycle: EngineLifecycle::PerWindow,
        }
    }
}

impl ProcessorConfig {
    /// Window plan for this configuration
    pub fn plan(&self) -> WindowPlan {
        WindowPlan::new(self.window_seconds, self.sample_rate)
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every output frame was written
    Completed,

    /// The run stopped on an empty window or keep-slice; frames from
    /// `frames_written` onward are silent
    StoppedEarly { frames_written: usize },

    /// The engine returned `found` stems instead of `expected`; the run was
    /// abandoned after `frames_written` frames
    TrackCountMismatch {
        expected: usize,
        found: usize,
        frames_written: usize,
    },
}

impl Outcome {
    /// Check if the run wrote every frame
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Output of one processing run
#[derive(Debug, Clone)]
pub struct Separation {
    /// One track per stem, each shaped like the input
    pub tracks: Vec<Waveform>,
    /// How the run ended
    pub outcome: Outcome,
    /// Number of inference calls made
    pub windows_processed: usize,
}

/// Per-run cursor state
#[derive(Debug)]
struct Cursor {
    /// Frames already finalized in the output
    result_pos: usize,
    /// Input frame where the next window begins
    window_start: usize,
    is_first_window: bool,
    last_reported_progress: f32,
}

impl Cursor {
    fn new() -> Self {
        Self {
            result_pos: 0,
            window_start: 0,
            is_first_window: true,
            last_reported_progress: 0.0,
        }
    }
}

/// Drives the engine according to the configured lifecycle
enum WindowRunner<'a, E: InferenceEngine + ?Sized> {
    PerWindow(&'a mut E),
    Persistent(EngineLease<'a, E>),
}

impl<'a, E: InferenceEngine + ?Sized> WindowRunner<'a, E> {
    fn new(engine: &'a mut E, lifecycle: EngineLifecycle) -> std::result::Result<Self, EngineError> {
        Ok(match lifecycle {
            EngineLifecycle::PerWindow => Self::PerWindow(engine),
            EngineLifecycle::Persistent => Self::Persistent(EngineLease::acquire(engine)?),
        })
    }

    fn run(&mut self, window: &Waveform) -> std::result::Result<Vec<Waveform>, EngineError> {
        match self {
            Self::PerWindow(engine) => {
                let mut lease = EngineLease::acquire(&mut **engine)?;
                lease.run(window)
            }
            Self::Persistent(lease) => lease.run(window),
        }
    }
}

/// Windowed inference orchestrator
///
/// Single-threaded: windows are processed strictly in order, one engine call
/// at a time.
#[derive(Debug, Default)]
pub struct AudioProcessor {
    config: ProcessorConfig,
    observer: ObserverHandle,
}

impl AudioProcessor {
    pub fn new(config: ProcessorConfig) -> Self {
        Self {
            config,
            observer: ObserverHandle::none(),
        }
    }

    /// Attach an observer without taking ownership of it
    pub fn with_observer(mut self, observer: &Arc<dyn ProgressObserver>) -> Self {
        self.set_observer(observer);
        self
    }

    pub fn set_observer(&mut self, observer: &Arc<dyn ProgressObserver>) {
        self.observer = ObserverHandle::new(observer);
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Separate `input` into `num_tracks` tracks using `engine`
    ///
    /// Every returned track has the input's frame and channel count.
    pub fn process<E: InferenceEngine + ?Sized>(
        &self,
        input: &Waveform,
        engine: &mut E,
        num_tracks: usize,
    ) -> Result<Separation> {
        if num_tracks == 0 {
            return Err(ProcessError::InvalidInput(
                "At least one output track is required".to_string(),
            ));
        }

        self.observer.start();

        let plan = self.config.plan();
        let total_frames = input.frame_count();
        let channels = input.channel_count();

        log::info!(
            "AudioProcessor: {} frames x {} ch, {} tracks, window {} / step {} frames (~{} windows, {} lifecycle, engine {})",
            total_frames,
            channels,
            num_tracks,
            plan.window_frames,
            plan.step_frames,
            plan.estimated_windows(total_frames),
            self.config.engine_lifecycle.display_name(),
            engine.name()
        );

        let mut tracks = vec![Waveform::silence(total_frames, channels); num_tracks];
        let mut runner = WindowRunner::new(engine, self.config.engine_lifecycle)?;
        let mut cursor = Cursor::new();
        let mut windows_processed = 0;

        while cursor.result_pos < total_frames {
            let current_progress = cursor.result_pos as f32 / total_frames as f32;
            if current_progress - cursor.last_reported_progress >= self.config.progress_threshold {
                self.observer.progress(current_progress);
                cursor.last_reported_progress = current_progress;
            }

            let window_end = (cursor.window_start + plan.window_frames).min(total_frames);
            let window_frames = window_end.saturating_sub(cursor.window_start);
            if window_frames == 0 {
                log::debug!("Empty window at frame {}, leaving loop", cursor.window_start);
                break;
            }

            let segment = extract_segment(input, cursor.window_start, window_frames);
            let results = runner.run(&segment)?;
            windows_processed += 1;

            if results.len() != num_tracks {
                return Ok(self.abort_on_mismatch(
                    tracks,
                    num_tracks,
                    results.len(),
                    cursor.result_pos,
                    windows_processed,
                ));
            }

            let output_frames = results[0].frame_count();
            let remaining = total_frames - cursor.result_pos;
            let (extract_start, extract_frames) = if cursor.is_first_window {
                cursor.is_first_window = false;
                (0, plan.first_take_frames.min(output_frames).min(remaining))
            } else {
                let start = plan.regular_offset_frames;
                let frames = plan
                    .regular_take_frames
                    .min(output_frames.saturating_sub(start))
                    .min(remaining);
                (start, frames)
            };

            if extract_start >= output_frames || extract_frames == 0 {
                log::warn!(
                    "Window at frame {} produced {} frames, nothing to keep from offset {}",
                    cursor.window_start,
                    output_frames,
                    extract_start
                );
                break;
            }

            log::debug!(
                "Window {}: input [{}, {}), keep [{}, {}) -> output {}",
                windows_processed,
                cursor.window_start,
                window_end,
                extract_start,
                extract_start + extract_frames,
                cursor.result_pos
            );

            for (track, result) in tracks.iter_mut().zip(&results) {
                copy_segment(result, extract_start, extract_frames, track, cursor.result_pos);
            }

            cursor.result_pos += extract_frames;
            cursor.window_start += plan.step_frames;

            if cursor.window_start >= total_frames {
                break;
            }
        }

        if cursor.result_pos < total_frames && cursor.window_start < total_frames {
            let remaining = total_frames - cursor.result_pos;
            let segment = extract_segment(
                input,
                cursor.window_start,
                total_frames - cursor.window_start,
            );
            let results = runner.run(&segment)?;
            windows_processed += 1;

            if results.len() != num_tracks {
                return Ok(self.abort_on_mismatch(
                    tracks,
                    num_tracks,
                    results.len(),
                    cursor.result_pos,
                    windows_processed,
                ));
            }

            let copy_frames = remaining.min(results[0].frame_count());
            log::debug!(
                "Trailing window: input [{}, {}), keep [0, {}) -> output {}",
                cursor.window_start,
                total_frames,
                copy_frames,
                cursor.result_pos
            );
            for (track, result) in tracks.iter_mut().zip(&results) {
                copy_segment(result, 0, copy_frames, track, cursor.result_pos);
            }
            cursor.result_pos += copy_frames;
        }

        drop(runner);

        let outcome = if cursor.result_pos >= total_frames {
            Outcome::Completed
        } else {
            log::warn!(
                "Stopped after {} of {} frames; the rest of each track is silent",
                cursor.result_pos,
                total_frames
            );
            Outcome::StoppedEarly {
                frames_written: cursor.result_pos,
            }
        };

        self.observer.progress(1.0);
        self.observer.finish();

        log::info!(
            "AudioProcessor: finished after {} inference calls",
            windows_processed
        );

        Ok(Separation {
            tracks,
            outcome,
            windows_processed,
        })
    }

    fn abort_on_mismatch(
        &self,
        tracks: Vec<Waveform>,
        expected: usize,
        found: usize,
        frames_written: usize,
        windows_processed: usize,
    ) -> Separation {
        let message = format!(
            "The number of returned tracks is inconsistent. Expected {}, but got {}",
            expected, found
        );
        log::warn!("{}", message);
        self.observer.error(&message);

        Separation {
            tracks,
            outcome: Outcome::TrackCountMismatch {
                expected,
                found,
                frames_written,
            },
            windows_processed,
        }
    }
}
