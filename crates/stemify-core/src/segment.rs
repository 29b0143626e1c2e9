//! Window extraction and result stitching
//!
//! `extract_segment` cuts a fixed-length, zero-padded window out of the input
//! so the engine always sees the length it expects. `copy_segment` places a
//! slice of an inference result into an output track. Neither raises errors:
//! out-of-range reads become silence and out-of-range writes are skipped.

use crate::types::Waveform;

/// Extract `frames` frames of `src` starting at `start_frame`
///
/// The result always has exactly `frames` frames and `src`'s channel count.
/// Anything past the end of `src` is zero-filled.
pub fn extract_segment(src: &Waveform, start_frame: usize, frames: usize) -> Waveform {
    let channels = src.channel_count();
    let mut segment = Waveform::silence(frames, channels);

    let available = src.frame_count();
    if start_frame < available {
        let copy_frames = frames.min(available - start_frame);
        let from = start_frame * channels;
        let to = (start_frame + copy_frames) * channels;
        segment.samples_mut()[..to - from].copy_from_slice(&src.samples()[from..to]);
    }

    segment
}

/// Copy `frames` frames of `src` from `src_start` into `dst` at `dst_start`
///
/// Only the channels both waveforms share are copied. Frames that would read
/// past `src` or write past `dst` are skipped. `dst` is never read and never
/// resized.
pub fn copy_segment(
    src: &Waveform,
    src_start: usize,
    frames: usize,
    dst: &mut Waveform,
    dst_start: usize,
) {
    let src_channels = src.channel_count();
    let dst_channels = dst.channel_count();
    let channels = src_channels.min(dst_channels);

    // Clamp the frame range once instead of bounds-checking every sample
    let src_avail = src.frame_count().saturating_sub(src_start);
    let dst_avail = dst.frame_count().saturating_sub(dst_start);
    let frames = frames.min(src_avail).min(dst_avail);
    if frames == 0 {
        return;
    }

    let src_samples = src.samples();
    let dst_samples = dst.samples_mut();

    if src_channels == dst_channels {
        let from = src_start * src_channels;
        let to = dst_start * dst_channels;
        let len = frames * src_channels;
        dst_samples[to..to + len].copy_from_slice(&src_samples[from..from + len]);
        return;
    }

    for f in 0..frames {
        let src_base = (src_start + f) * src_channels;
        let dst_base = (dst_start + f) * dst_channels;
        dst_samples[dst_base..dst_base + channels]
            .copy_from_slice(&src_samples[src_base..src_base + channels]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Stereo ramp where frame `f` holds `[f, -f]`
    fn ramp(frames: usize) -> Waveform {
        let samples = (0..frames)
            .flat_map(|f| [f as f32, -(f as f32)])
            .collect();
        Waveform::from_interleaved(samples, 2)
    }

    #[test]
    fn test_extract_inside() {
        let src = ramp(10);
        let seg = extract_segment(&src, 2, 3);
        assert_eq!(seg.frame_count(), 3);
        assert_eq!(seg.samples(), &[2.0, -2.0, 3.0, -3.0, 4.0, -4.0]);
    }

    #[test]
    fn test_extract_pads_tail_with_silence() {
        let src = ramp(4);
        let seg = extract_segment(&src, 2, 4);
        assert_eq!(seg.frame_count(), 4);
        assert_eq!(seg.samples(), &[2.0, -2.0, 3.0, -3.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_extract_past_end_is_silent() {
        let src = ramp(4);
        let seg = extract_segment(&src, 4, 3);
        assert_eq!(seg.frame_count(), 3);
        assert_eq!(seg.channel_count(), 2);
        assert!(seg.samples().iter().all(|&s| s == 0.0));

        let seg = extract_segment(&src, 100, 2);
        assert!(seg.samples().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_extract_zero_length() {
        let seg = extract_segment(&ramp(4), 1, 0);
        assert!(seg.is_empty());
        assert_eq!(seg.channel_count(), 2);
    }

    #[test]
    fn test_copy_into_offset() {
        let src = ramp(6);
        let mut dst = Waveform::silence(6, 2);
        copy_segment(&src, 1, 2, &mut dst, 3);
        assert_eq!(
            dst.samples(),
            &[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, -1.0, 2.0, -2.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_copy_truncates_at_destination_end() {
        let src = ramp(10);
        let mut dst = Waveform::silence(4, 2);
        copy_segment(&src, 0, 10, &mut dst, 2);
        assert_eq!(dst.frame_count(), 4);
        assert_eq!(dst.samples(), &[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, -1.0]);
    }

    #[test]
    fn test_copy_truncates_at_source_end() {
        let src = ramp(3);
        let mut dst = Waveform::silence(6, 2);
        copy_segment(&src, 2, 4, &mut dst, 0);
        assert_eq!(dst.get(0, 0), Some(2.0));
        assert_eq!(dst.get(1, 0), Some(0.0));

        // Start entirely past the source: nothing written
        let mut dst = Waveform::silence(2, 2);
        copy_segment(&src, 5, 2, &mut dst, 0);
        assert!(dst.samples().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_copy_shared_channels_only() {
        let mono = Waveform::from_interleaved(vec![1.0, 2.0, 3.0], 1);
        let mut stereo = Waveform::silence(3, 2);
        copy_segment(&mono, 0, 3, &mut stereo, 0);
        assert_eq!(stereo.samples(), &[1.0, 0.0, 2.0, 0.0, 3.0, 0.0]);

        let src = ramp(2);
        let mut mono = Waveform::silence(2, 1);
        copy_segment(&src, 0, 2, &mut mono, 0);
        assert_eq!(mono.samples(), &[0.0, 1.0]);
    }
}
