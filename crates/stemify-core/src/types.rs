//! Common types for Stemify
//!
//! This module contains the fundamental audio container shared by the
//! windowing core, the inference engine and the codec.

use std::fmt;

/// Default sample rate the separation models are trained on (44.1kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Default channel count fed to the models (stereo)
pub const DEFAULT_CHANNELS: usize = 2;

/// Audio sample type
pub type Sample = f32;

/// Channel-interleaved multi-channel audio
///
/// Samples are stored as `[frame0_ch0, frame0_ch1, frame1_ch0, ...]`, so the
/// sample of frame `f` on channel `c` lives at `f * channels + c`.
///
/// The frame count is always derived from the sample container, which keeps
/// `samples.len() == frame_count * channel_count` true for every waveform
/// regardless of where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    samples: Vec<Sample>,
    channels: usize,
}

impl Waveform {
    /// Create a silent waveform of `frames` frames
    ///
    /// A channel count of zero is raised to one.
    pub fn silence(frames: usize, channels: usize) -> Self {
        let channels = channels.max(1);
        Self {
            samples: vec![0.0; frames * channels],
            channels,
        }
    }

    /// Wrap interleaved samples
    ///
    /// A trailing partial frame is dropped. A channel count of zero is raised
    /// to one.
    pub fn from_interleaved(mut samples: Vec<Sample>, channels: usize) -> Self {
        let channels = channels.max(1);
        let whole = samples.len() - samples.len() % channels;
        if whole != samples.len() {
            log::debug!(
                "Waveform::from_interleaved: dropping {} samples of a partial frame",
                samples.len() - whole
            );
            samples.truncate(whole);
        }
        Self { samples, channels }
    }

    /// Number of frames (samples per channel)
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels
    }

    /// Number of interleaved channels
    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels
    }

    /// Check if the waveform holds no frames
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[inline]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    #[inline]
    pub fn samples_mut(&mut self) -> &mut [Sample] {
        &mut self.samples
    }

    /// Sample at `frame` on `channel`, if in bounds
    #[inline]
    pub fn get(&self, frame: usize, channel: usize) -> Option<Sample> {
        if channel >= self.channels {
            return None;
        }
        self.samples.get(frame * self.channels + channel).copied()
    }

    /// Snapshot of this waveform's shape
    pub fn properties(&self, sample_rate: u32) -> AudioProperties {
        AudioProperties {
            frame_count: self.frame_count() as u64,
            channel_count: self.channels as u64,
            sample_rate,
        }
    }
}

/// Read-only summary of a waveform's shape
///
/// This is a snapshot: it does not track later changes to the waveform it
/// was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AudioProperties {
    /// Number of frames (samples per channel)
    pub frame_count: u64,
    /// Number of channels
    pub channel_count: u64,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioProperties {
    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count as f64 / self.sample_rate as f64
    }
}

impl fmt::Display for AudioProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AudioProperties{{channels: {}, frames: {}, sample_rate: {}}}",
            self.channel_count, self.frame_count, self.sample_rate
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_shape() {
        let wf = Waveform::silence(10, 2);
        assert_eq!(wf.frame_count(), 10);
        assert_eq!(wf.channel_count(), 2);
        assert_eq!(wf.samples().len(), 20);
        assert!(wf.samples().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_zero_channels_raised_to_mono() {
        let wf = Waveform::silence(4, 0);
        assert_eq!(wf.channel_count(), 1);
        assert_eq!(wf.frame_count(), 4);
    }

    #[test]
    fn test_partial_frame_dropped() {
        let wf = Waveform::from_interleaved(vec![1.0, 2.0, 3.0, 4.0, 5.0], 2);
        assert_eq!(wf.frame_count(), 2);
        assert_eq!(wf.samples(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_interleaved_indexing() {
        let wf = Waveform::from_interleaved(vec![0.1, 0.2, 0.3, 0.4], 2);
        assert_eq!(wf.get(1, 0), Some(0.3));
        assert_eq!(wf.get(1, 1), Some(0.4));
        assert_eq!(wf.get(2, 0), None);
        assert_eq!(wf.get(0, 2), None);
    }

    #[test]
    fn test_properties_snapshot() {
        let mut wf = Waveform::silence(44100, 2);
        let props = wf.properties(44100);
        wf.samples_mut()[0] = 1.0;
        assert_eq!(props.frame_count, 44100);
        assert_eq!(props.channel_count, 2);
        assert!((props.duration_secs() - 1.0).abs() < 1e-9);
        assert_eq!(
            props.to_string(),
            "AudioProperties{channels: 2, frames: 44100, sample_rate: 44100}"
        );
    }
}
