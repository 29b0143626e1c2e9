//! Window planning for overlap-discard inference
//!
//! The models only produce reliable output away from the edges of their input
//! window, so each window keeps an interior slice of its output and windows
//! overlap by half their length:
//!
//! ```text
//!  input   |=================================================|
//!  win 0   [-------- keep 3/4 --------|xxxx]
//!  win 1             [xxxx|--- keep 1/2 ---|xxxx]
//!  win 2                       [xxxx|--- keep 1/2 ---|xxxx]
//!                    ^ step ^
//! ```
//!
//! The first window has no predecessor, so it keeps a larger leading slice
//! (3/4) to cover time zero. Every later window keeps the half that starts a
//! quarter of the way in, which tiles the timeline exactly once.

/// Frame counts derived from a window duration and sample rate
///
/// Immutable for the duration of one processing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPlan {
    /// Length of every inference window
    pub window_frames: usize,
    /// Distance between the starts of consecutive windows
    pub step_frames: usize,
    /// Frames kept from the start of the first window's output
    pub first_take_frames: usize,
    /// Frames kept from every later window's output
    pub regular_take_frames: usize,
    /// Offset into a later window's output where its keep-slice starts
    pub regular_offset_frames: usize,
}

impl WindowPlan {
    /// Derive the plan for `window_seconds` at `sample_rate`
    ///
    /// Truncates to whole frames. A non-finite or negative duration yields an
    /// all-zero plan, which the processor treats as a degenerate window.
    pub fn new(window_seconds: f32, sample_rate: u32) -> Self {
        let window_frames = if window_seconds.is_finite() && window_seconds > 0.0 {
            (window_seconds as f64 * sample_rate as f64) as usize
        } else {
            0
        };
        Self::from_window_frames(window_frames)
    }

    /// Derive the plan from a window length already expressed in frames
    pub fn from_window_frames(window_frames: usize) -> Self {
        let step_frames = window_frames / 2;
        Self {
            window_frames,
            step_frames,
            first_take_frames: window_frames * 3 / 4,
            regular_take_frames: step_frames,
            regular_offset_frames: step_frames / 2,
        }
    }

    /// Number of full-loop windows needed for `total_frames`, excluding a
    /// trailing partial window
    ///
    /// Only used for logging; the processor drives itself from cursors.
    pub fn estimated_windows(&self, total_frames: usize) -> usize {
        if total_frames == 0 || self.step_frames == 0 {
            return usize::from(total_frames > 0);
        }
        total_frames.div_ceil(self.step_frames)
    }
}
