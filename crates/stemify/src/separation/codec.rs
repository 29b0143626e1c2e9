//! Audio file I/O for separation
//!
//! - Decoding: Symphonia (MP3, FLAC, WAV, OGG, AAC, ...)
//! - Sample rate conversion: Rubato sinc resampler
//! - Encoding: Hound for 32-bit float WAV, flacenc for 24-bit FLAC

use std::fs::File;
use std::path::Path;

use stemify_core::{AudioCodec, AudioProperties, CodecError, Waveform};
use symphonia::core::audio::{AudioBufferRef, SampleBuffer};

use super::config::OutputFormat;

/// FLAC stems are written at this bit depth
const FLAC_BITS_PER_SAMPLE: usize = 24;

/// Codec built on Symphonia, Rubato, Hound and flacenc
///
/// Decoding accepts anything Symphonia reads; stems are written in the
/// configured [`OutputFormat`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaCodec {
    format: OutputFormat,
}

impl SymphoniaCodec {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }
}

impl AudioCodec for SymphoniaCodec {
    fn load(
        &self,
        path: &Path,
        sample_rate: u32,
    ) -> Result<(Waveform, AudioProperties), CodecError> {
        let (samples, source_rate, channels) = decode_audio(path)?;
        log::info!(
            "Decoded {:?}: {} samples, {}Hz, {} channels",
            path.file_name().unwrap_or_default(),
            samples.len(),
            source_rate,
            channels
        );

        let waveform = Waveform::from_interleaved(samples, channels);
        let waveform = resample(&waveform, source_rate, sample_rate)?;
        let properties = waveform.properties(sample_rate);
        log::info!("Loaded {}", properties);

        Ok((waveform, properties))
    }

    fn save(
        &self,
        path: &Path,
        waveform: &Waveform,
        sample_rate: u32,
        bitrate: Option<u32>,
    ) -> Result<(), CodecError> {
        self.format
            .check_bitrate(bitrate)
            .map_err(CodecError::UnsupportedSetting)?;

        log::debug!("Writing {:?} as {}", path, self.format.display_name());
        match self.format {
            OutputFormat::Wav => write_wav(path, waveform, sample_rate),
            OutputFormat::Flac => write_flac(path, waveform, sample_rate),
        }
    }

    fn extension(&self) -> &'static str {
        self.format.extension()
    }
}

/// Write 32-bit float WAV
fn write_wav(path: &Path, waveform: &Waveform, sample_rate: u32) -> Result<(), CodecError> {
    use hound::{SampleFormat, WavSpec, WavWriter};

    let write_err = |e: hound::Error| CodecError::Write {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let spec = WavSpec {
        channels: waveform.channel_count() as u16,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path, spec).map_err(write_err)?;
    for &sample in waveform.samples() {
        writer.write_sample(sample).map_err(write_err)?;
    }
    writer.finalize().map_err(write_err)?;

    Ok(())
}

/// Write 24-bit FLAC
fn write_flac(path: &Path, waveform: &Waveform, sample_rate: u32) -> Result<(), CodecError> {
    use flacenc::component::BitRepr;
    use flacenc::error::Verify;

    let write_err = |message: String| CodecError::Write {
        path: path.to_path_buf(),
        message,
    };

    let scale = ((1i32 << (FLAC_BITS_PER_SAMPLE - 1)) - 1) as f32;
    let ints: Vec<i32> = waveform
        .samples()
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * scale).round() as i32)
        .collect();

    let config = flacenc::config::Encoder::default()
        .into_verified()
        .map_err(|(_, e)| write_err(format!("Invalid FLAC encoder config: {:?}", e)))?;
    let source = flacenc::source::MemSource::from_samples(
        &ints,
        waveform.channel_count(),
        FLAC_BITS_PER_SAMPLE,
        sample_rate as usize,
    );
    let stream = flacenc::encode_with_fixed_block_size(&config, source, config.block_size)
        .map_err(|e| write_err(format!("FLAC encoding failed: {:?}", e)))?;

    let mut sink = flacenc::bitsink::ByteSink::new();
    stream
        .write(&mut sink)
        .map_err(|e| write_err(format!("FLAC serialization failed: {:?}", e)))?;

    std::fs::write(path, sink.as_slice()).map_err(|e| write_err(e.to_string()))
}

/// Convert `waveform` to `channels` channels
///
/// Output channel `c` takes input channel `min(c, last)`: mono is duplicated
/// to every channel, surplus input channels are dropped.
pub fn remix_channels(waveform: &Waveform, channels: usize) -> Waveform {
    let channels = channels.max(1);
    let src_channels = waveform.channel_count();
    if src_channels == channels {
        return waveform.clone();
    }

    log::info!("Remixing {} -> {} channels", src_channels, channels);
    let samples = waveform
        .samples()
        .chunks_exact(src_channels)
        .flat_map(|frame| (0..channels).map(move |c| frame[c.min(src_channels - 1)]))
        .collect();
    Waveform::from_interleaved(samples, channels)
}

/// Decode an audio file to interleaved f32 samples using Symphonia
fn decode_audio(path: &Path) -> Result<(Vec<f32>, u32, usize), CodecError> {
    use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
    use symphonia::core::errors::Error as SymphoniaError;
    use symphonia::core::formats::FormatOptions;
    use symphonia::core::io::MediaSourceStream;
    use symphonia::core::meta::MetadataOptions;
    use symphonia::core::probe::Hint;

    let file = File::open(path).map_err(|e| CodecError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| CodecError::UnsupportedFormat(e.to_string()))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| CodecError::UnsupportedFormat("No audio track found".to_string()))?;

    let track_id = track.id;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| CodecError::UnsupportedFormat("Unknown sample rate".to_string()))?;

    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count())
        .unwrap_or(2);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| CodecError::UnsupportedFormat(e.to_string()))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => {
                log::warn!("Error reading packet: {}", e);
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                log::warn!("Skipping undecodable packet: {}", e);
                continue;
            }
            Err(e) => return Err(CodecError::Decode(e.to_string())),
        };

        channels = decoded.spec().channels.count();
        samples.extend_from_slice(interleave(&mut sample_buf, decoded));
    }

    Ok((samples, sample_rate, channels))
}

/// Interleave a decoded packet through `sample_buf`
///
/// The buffer is (re)allocated whenever the packet could hold more samples
/// than it, so packets may grow mid-stream.
fn interleave<'a>(
    sample_buf: &'a mut Option<SampleBuffer<f32>>,
    decoded: AudioBufferRef<'_>,
) -> &'a [f32] {
    let spec = *decoded.spec();
    let needed = decoded.capacity() * spec.channels.count();
    let too_small = sample_buf.as_ref().map_or(true, |buf| buf.capacity() < needed);
    if too_small {
        *sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
    }

    match sample_buf {
        Some(buf) => {
            buf.copy_interleaved_ref(decoded);
            buf.samples()
        }
        None => &[],
    }
}

/// Resample a waveform to `target_rate`
///
/// Uses Rubato's SincFixedIn on every channel. Returns a clone when the rates
/// already match. The resampler delay is trimmed from the front so the output
/// stays time-aligned with the input.
pub fn resample(
    waveform: &Waveform,
    source_rate: u32,
    target_rate: u32,
) -> Result<Waveform, CodecError> {
    if source_rate == target_rate || waveform.is_empty() {
        return Ok(waveform.clone());
    }
    if source_rate == 0 || target_rate == 0 {
        return Err(CodecError::Resample(format!(
            "Invalid sample rates {} -> {}",
            source_rate, target_rate
        )));
    }

    use rubato::{
        Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType,
        WindowFunction,
    };

    let channels = waveform.channel_count();
    let frames = waveform.frame_count();
    let ratio = target_rate as f64 / source_rate as f64;
    let chunk_size = 1024;

    log::info!("Resampling {}Hz -> {}Hz ({} frames)", source_rate, target_rate, frames);

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, chunk_size, channels)
        .map_err(|e| CodecError::Resample(format!("Failed to create resampler: {}", e)))?;

    // Deinterleave
    let planar: Vec<Vec<f32>> = (0..channels)
        .map(|c| {
            waveform
                .samples()
                .iter()
                .skip(c)
                .step_by(channels)
                .copied()
                .collect()
        })
        .collect();

    let delay = resampler.output_delay();
    let expected_len = (frames as u64 * target_rate as u64 / source_rate as u64) as usize;
    let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(expected_len + delay); channels];
    let mut pos = 0;

    // Keep feeding (silence past the end) until the delayed tail is flushed
    while output[0].len() < expected_len + delay {
        let chunk: Vec<Vec<f32>> = planar
            .iter()
            .map(|channel| {
                let mut chunk = vec![0.0f32; chunk_size];
                if pos < frames {
                    let end = (pos + chunk_size).min(frames);
                    chunk[..end - pos].copy_from_slice(&channel[pos..end]);
                }
                chunk
            })
            .collect();

        let resampled = resampler
            .process(&chunk, None)
            .map_err(|e| CodecError::Resample(format!("Resample failed: {}", e)))?;

        for (out, channel) in output.iter_mut().zip(resampled) {
            out.extend_from_slice(&channel);
        }
        pos += chunk_size;
    }

    // Trim delay and tail, then interleave
    let mut samples = Vec::with_capacity(expected_len * channels);
    for frame in delay..delay + expected_len {
        for channel in &output {
            samples.push(channel[frame]);
        }
    }

    Ok(Waveform::from_interleaved(samples, channels))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remix_mono_to_stereo() {
        let mono = Waveform::from_interleaved(vec![0.1, 0.2, 0.3], 1);
        let stereo = remix_channels(&mono, 2);
        assert_eq!(stereo.channel_count(), 2);
        assert_eq!(stereo.samples(), &[0.1, 0.1, 0.2, 0.2, 0.3, 0.3]);
    }

    #[test]
    fn test_remix_drops_surplus_channels() {
        let quad = Waveform::from_interleaved(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0], 4);
        let stereo = remix_channels(&quad, 2);
        assert_eq!(stereo.samples(), &[1.0, 2.0, 5.0, 6.0]);
    }

    #[test]
    fn test_remix_same_layout_is_identity() {
        let stereo = Waveform::from_interleaved(vec![1.0, 2.0], 2);
        assert_eq!(remix_channels(&stereo, 2), stereo);
    }

    #[test]
    fn test_resample_same_rate() {
        let wf = Waveform::from_interleaved(vec![1.0, 2.0, 3.0, 4.0], 2);
        let result = resample(&wf, 44100, 44100).unwrap();
        assert_eq!(result, wf);
    }

    #[test]
    fn test_resample_duration_preserved() {
        // 1 second of 440Hz stereo at 48kHz
        let sr = 48000;
        let samples: Vec<f32> = (0..sr)
            .flat_map(|i| {
                let s = (2.0 * std::f32::consts::PI * 440.0 * i as f32 / sr as f32).sin();
                [s, s]
            })
            .collect();
        let wf = Waveform::from_interleaved(samples, 2);

        let result = resample(&wf, sr as u32, 44100).unwrap();
        assert_eq!(result.channel_count(), 2);
        assert_eq!(result.frame_count(), 44100);
    }

    #[test]
    fn test_save_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stem.wav");
        let wf = Waveform::from_interleaved(vec![0.5, -0.5, 0.25, -0.25], 2);

        let codec = SymphoniaCodec::new(OutputFormat::Wav);
        assert_eq!(codec.extension(), "wav");
        codec.save(&path, &wf, 44100, None).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.spec().sample_rate, 44100);
        let samples: Vec<f32> = reader.into_samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0.5, -0.5, 0.25, -0.25]);
    }

    #[test]
    fn test_load_wav_roundtrip_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.wav");
        let wf = Waveform::from_interleaved(vec![0.1; 2 * 4410], 2);

        let codec = SymphoniaCodec::default();
        codec.save(&path, &wf, 44100, None).unwrap();
        let (loaded, props) = codec.load(&path, 44100).unwrap();

        assert_eq!(props.channel_count, 2);
        assert_eq!(props.frame_count, 4410);
        assert_eq!(props.sample_rate, 44100);
        assert_eq!(loaded.frame_count(), 4410);
    }

    #[test]
    fn test_flac_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stem.flac");
        let samples: Vec<f32> = (0..2 * 10_000)
            .map(|i| ((i % 100) as f32 / 100.0) - 0.5)
            .collect();
        let wf = Waveform::from_interleaved(samples.clone(), 2);

        let codec = SymphoniaCodec::new(OutputFormat::Flac);
        assert_eq!(codec.extension(), "flac");
        codec.save(&path, &wf, 44100, None).unwrap();

        let header = std::fs::read(&path).unwrap();
        assert_eq!(&header[..4], b"fLaC");

        let (loaded, props) = codec.load(&path, 44100).unwrap();
        assert_eq!(props.channel_count, 2);
        assert_eq!(props.frame_count, 10_000);
        for (got, want) in loaded.samples().iter().zip(&samples) {
            assert!((got - want).abs() < 1e-4, "{} vs {}", got, want);
        }
    }

    #[test]
    fn test_bitrate_rejected_for_lossless_formats() {
        let dir = tempfile::tempdir().unwrap();
        let wf = Waveform::from_interleaved(vec![0.0; 4], 2);

        for format in OutputFormat::all() {
            let codec = SymphoniaCodec::new(*format);
            let path = dir.path().join(format!("stem.{}", codec.extension()));
            let result = codec.save(&path, &wf, 44100, Some(192_000));
            assert!(matches!(result, Err(CodecError::UnsupportedSetting(_))));
            assert!(!path.exists());
        }
    }

    #[test]
    fn test_interleave_grows_buffer_for_larger_packets() {
        use symphonia::core::audio::{AsAudioBufferRef, AudioBuffer, Channels, Signal, SignalSpec};

        let spec = SignalSpec::new(44100, Channels::FRONT_LEFT | Channels::FRONT_RIGHT);
        let packet = |frames: usize, left: f32| {
            let mut buf = AudioBuffer::<f32>::new(frames as u64, spec);
            buf.render_reserved(Some(frames));
            buf.chan_mut(0).fill(left);
            buf
        };

        let small = packet(256, 0.25);
        let large = packet(1024, 0.5);
        let mut sample_buf = None;

        let first = interleave(&mut sample_buf, small.as_audio_buffer_ref()).to_vec();
        assert_eq!(first.len(), 512);
        assert_eq!(&first[..2], &[0.25, 0.0]);

        let second = interleave(&mut sample_buf, large.as_audio_buffer_ref()).to_vec();
        assert_eq!(second.len(), 2048);
        assert_eq!(&second[2046..], &[0.5, 0.0]);

        // A smaller packet reuses the grown buffer
        let third = interleave(&mut sample_buf, small.as_audio_buffer_ref()).to_vec();
        assert_eq!(third.len(), 512);
        assert_eq!(sample_buf.as_ref().map(|b| b.capacity()), Some(2048));
    }

    #[test]
    fn test_load_missing_file() {
        let codec = SymphoniaCodec::default();
        let result = codec.load(Path::new("/nonexistent/input.mp3"), 44100);
        assert!(matches!(result, Err(CodecError::Read { .. })));
    }
}
