//! Audio input normalization
//!
//! Turns any supported audio source (file path, uploaded bytes, live PCM
//! buffer) into the canonical waveform the model accepts: mono f32 at
//! 16 kHz. Container/codec resolution prefers an explicit hint, falls
//! back to magic-byte sniffing, and on ambiguity attempts a single decode
//! and fails on the first decoder error.

use std::io::Cursor;
use std::path::PathBuf;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL, CODEC_TYPE_OPUS};
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use taigi_common::{Result, TaigiError};
use tracing::{debug, warn};

/// Sample rate required by the model input contract
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Supported audio file extensions
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "aac", "flac", "m4a", "mp3", "mp4", "mpeg", "mpga", "oga", "ogg", "wav", "webm",
];

/// Check if file extension is supported
pub fn is_supported_audio(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Audio container/codec family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
    Flac,
    Ogg,
    /// MP4/M4A/AAC family
    Mp4,
    Webm,
}

impl AudioFormat {
    /// Canonical extension used as a decode hint
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
            Self::Flac => "flac",
            Self::Ogg => "ogg",
            Self::Mp4 => "m4a",
            Self::Webm => "webm",
        }
    }

    /// Resolve a format from a file extension or bare hint string
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "wav" => Some(Self::Wav),
            "mp3" | "mpga" | "mpeg" => Some(Self::Mp3),
            "flac" => Some(Self::Flac),
            "ogg" | "oga" => Some(Self::Ogg),
            "m4a" | "mp4" | "aac" => Some(Self::Mp4),
            "webm" => Some(Self::Webm),
            _ => None,
        }
    }
}

/// Identify a format from file signature bytes
///
/// Pure function of the leading bytes; returns None when no known
/// signature matches.
pub fn sniff_format(bytes: &[u8]) -> Option<AudioFormat> {
    if bytes.len() < 12 {
        return None;
    }

    if &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE" {
        return Some(AudioFormat::Wav);
    }
    if &bytes[0..4] == b"fLaC" {
        return Some(AudioFormat::Flac);
    }
    if &bytes[0..4] == b"OggS" {
        return Some(AudioFormat::Ogg);
    }
    if &bytes[4..8] == b"ftyp" {
        return Some(AudioFormat::Mp4);
    }
    // EBML header (webm/mkv)
    if bytes[0..4] == [0x1A, 0x45, 0xDF, 0xA3] {
        return Some(AudioFormat::Webm);
    }
    if &bytes[0..3] == b"ID3" {
        return Some(AudioFormat::Mp3);
    }
    // Bare MPEG audio frame sync
    if bytes[0] == 0xFF && (bytes[1] & 0xE0) == 0xE0 {
        return Some(AudioFormat::Mp3);
    }

    None
}

/// A raw audio input, consumed by exactly one normalization call
#[derive(Debug)]
pub enum AudioSource {
    /// Audio file on disk; extension doubles as the format hint
    FilePath(PathBuf),

    /// In-memory bytes (e.g. an HTTP upload) with an optional declared
    /// extension hint
    ByteBuffer {
        bytes: Vec<u8>,
        hint: Option<String>,
    },

    /// Already-decoded PCM from a capture device, interleaved when
    /// multi-channel
    LiveStream {
        samples: Vec<f32>,
        sample_rate: u32,
        channels: u16,
    },
}

/// Normalization options
#[derive(Debug, Clone, Default)]
pub struct NormalizeOptions {
    /// Trim leading/trailing silence; off by default so speech at the
    /// boundaries is never clipped
    pub trim_silence: bool,
}

/// Canonical decoded waveform: mono f32 at [`TARGET_SAMPLE_RATE`]
///
/// Only constructed through [`normalize`] (or [`NormalizedAudio::from_mono_16k`]
/// for already-canonical samples), so sample rate and channel count always
/// match the model contract.
#[derive(Debug, Clone)]
pub struct NormalizedAudio {
    samples: Vec<f32>,
}

impl NormalizedAudio {
    /// Wrap samples that are already mono 16 kHz
    pub fn from_mono_16k(samples: Vec<f32>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        TARGET_SAMPLE_RATE
    }

    pub fn channels(&self) -> u16 {
        1
    }

    /// Duration in seconds
    pub fn duration(&self) -> f32 {
        self.samples.len() as f32 / TARGET_SAMPLE_RATE as f32
    }
}

/// Normalize an audio source into the model's input shape
pub fn normalize(source: AudioSource, opts: &NormalizeOptions) -> Result<NormalizedAudio> {
    let samples = match source {
        AudioSource::FilePath(path) => {
            if !path.exists() {
                return Err(TaigiError::not_found(format!(
                    "Audio file not found: {}",
                    path.display()
                )));
            }
            let hint = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_string());
            let bytes = std::fs::read(&path)?;
            decode_bytes(&bytes, hint.as_deref())?
        }
        AudioSource::ByteBuffer { bytes, hint } => decode_bytes(&bytes, hint.as_deref())?,
        AudioSource::LiveStream {
            samples,
            sample_rate,
            channels,
        } => {
            if samples.is_empty() {
                return Err(TaigiError::decode("empty audio source"));
            }
            if channels == 0 {
                return Err(TaigiError::decode("live stream declares zero channels"));
            }
            let mono = downmix(&samples, channels as usize);
            if sample_rate != TARGET_SAMPLE_RATE {
                resample(&mono, sample_rate, TARGET_SAMPLE_RATE)?
            } else {
                mono
            }
        }
    };

    if samples.is_empty() {
        return Err(TaigiError::decode("decoded audio has zero duration"));
    }

    let samples = if opts.trim_silence {
        trim_silence(samples)
    } else {
        samples
    };

    debug!(
        samples = samples.len(),
        duration_secs = samples.len() as f32 / TARGET_SAMPLE_RATE as f32,
        "Audio normalized to 16kHz mono"
    );

    Ok(NormalizedAudio { samples })
}

/// Decode container bytes into mono samples at the target rate
fn decode_bytes(bytes: &[u8], declared: Option<&str>) -> Result<Vec<f32>> {
    if bytes.is_empty() {
        return Err(TaigiError::decode("empty audio source"));
    }

    let hinted = declared.and_then(AudioFormat::from_extension);
    let sniffed = sniff_format(bytes);

    // Prefer the explicit hint; on contradiction attempt the decode anyway
    // and let the first decoder error settle it.
    let resolved = match (hinted, sniffed) {
        (Some(h), Some(s)) if h != s => {
            warn!(
                "Declared format '{}' contradicts signature '{}'; attempting decode as declared",
                h.extension(),
                s.extension()
            );
            Some(h)
        }
        (Some(h), _) => Some(h),
        (None, s) => s,
    };

    let mut hint = Hint::new();
    if let Some(format) = resolved {
        hint.with_extension(format.extension());
    }

    let cursor = Cursor::new(bytes.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| TaigiError::decode(format!("unrecognized or invalid header: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| TaigiError::decode("no audio track found"))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    // Browser recordings (webm/ogg) carry Opus, which symphonia demuxes
    // but cannot decode; those packets go straight to libopus.
    if codec_params.codec == CODEC_TYPE_OPUS {
        let packets = collect_track_packets(format.as_mut(), track_id)?;
        return decode_opus_packets(&packets);
    }

    let source_rate = codec_params
        .sample_rate
        .ok_or_else(|| TaigiError::decode("unknown sample rate"))?;
    let channels = codec_params.channels.map(|c| c.count()).unwrap_or(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| TaigiError::decode(format!("codec init failed: {}", e)))?;

    let mut mono: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(TaigiError::decode(format!("packet read: {}", e))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder
            .decode(&packet)
            .map_err(|e| TaigiError::decode(format!("corrupt audio data: {}", e)))?;

        let spec = *decoded.spec();
        let num_frames = decoded.frames();
        if num_frames == 0 {
            continue;
        }

        let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        if channels > 1 {
            for frame in sample_buf.samples().chunks(channels) {
                mono.push(frame.iter().sum::<f32>() / channels as f32);
            }
        } else {
            mono.extend_from_slice(sample_buf.samples());
        }
    }

    if mono.is_empty() {
        return Err(TaigiError::decode("no audio samples decoded"));
    }

    if source_rate != TARGET_SAMPLE_RATE {
        mono = resample(&mono, source_rate, TARGET_SAMPLE_RATE)?;
    }

    Ok(mono)
}

/// Drain every packet of one track from a demuxed container
fn collect_track_packets(
    format: &mut dyn FormatReader,
    track_id: u32,
) -> Result<Vec<Box<[u8]>>> {
    let mut packets = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(TaigiError::decode(format!("packet read: {}", e))),
        };

        if packet.track_id() == track_id {
            packets.push(packet.data);
        }
    }

    Ok(packets)
}

/// Longest Opus frame is 120 ms
const MAX_OPUS_FRAME_SAMPLES: usize = TARGET_SAMPLE_RATE as usize * 120 / 1000;

/// Decode raw Opus packets to mono samples at the target rate
///
/// libopus resamples to the requested output rate itself and a mono
/// decoder downmixes multi-channel streams, so the result needs no
/// further conversion.
fn decode_opus_packets<P: AsRef<[u8]>>(packets: &[P]) -> Result<Vec<f32>> {
    let mut decoder =
        opus::Decoder::new(TARGET_SAMPLE_RATE, opus::Channels::Mono)
            .map_err(|e| TaigiError::decode(format!("opus decoder init: {}", e)))?;

    let mut frame = vec![0.0f32; MAX_OPUS_FRAME_SAMPLES];
    let mut mono = Vec::new();

    for packet in packets {
        let data = packet.as_ref();

        // Some demuxers pass the stream headers through as packets
        if data.is_empty() || data.starts_with(b"OpusHead") || data.starts_with(b"OpusTags") {
            continue;
        }

        let decoded = decoder
            .decode_float(data, &mut frame, false)
            .map_err(|e| TaigiError::decode(format!("corrupt opus data: {}", e)))?;
        mono.extend_from_slice(&frame[..decoded]);
    }

    if mono.is_empty() {
        return Err(TaigiError::decode("no audio samples decoded"));
    }

    Ok(mono)
}

/// Average interleaved channels into mono
///
/// Averaging rather than dropping channels keeps signal that lives on
/// only one side of a stereo recording.
fn downmix(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Resample mono audio with a sinc interpolator
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    use rubato::{
        Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
    };

    if from_rate == to_rate {
        return Ok(samples.to_vec());
    }

    debug!("Resampling from {}Hz to {}Hz", from_rate, to_rate);

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = to_rate as f64 / from_rate as f64;
    let chunk_size = 1024;

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, chunk_size, 1)
        .map_err(|e| TaigiError::decode(format!("resampler init: {}", e)))?;

    let mut output = Vec::with_capacity((samples.len() as f64 * ratio) as usize + chunk_size);

    for chunk in samples.chunks(chunk_size) {
        let input = if chunk.len() < chunk_size {
            let mut padded = chunk.to_vec();
            padded.resize(chunk_size, 0.0);
            padded
        } else {
            chunk.to_vec()
        };

        let result = resampler
            .process(&[input], None)
            .map_err(|e| TaigiError::decode(format!("resample: {}", e)))?;

        if let Some(channel) = result.first() {
            output.extend_from_slice(channel);
        }
    }

    let expected_len = (samples.len() as f64 * ratio) as usize;
    output.truncate(expected_len);

    Ok(output)
}

/// Amplitude below which a sample counts as silence for trimming
const SILENCE_THRESHOLD: f32 = 1e-3;

/// Drop leading/trailing silence
///
/// All-silence input is returned unchanged so trimming can never produce
/// an empty waveform.
fn trim_silence(samples: Vec<f32>) -> Vec<f32> {
    let first = samples.iter().position(|s| s.abs() > SILENCE_THRESHOLD);
    let last = samples.iter().rposition(|s| s.abs() > SILENCE_THRESHOLD);

    match (first, last) {
        (Some(first), Some(last)) => samples[first..=last].to_vec(),
        _ => samples,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build PCM16 WAV bytes for tests
    fn make_wav(samples: &[f32], sample_rate: u32, channels: u16) -> Vec<u8> {
        let data_len = (samples.len() * 2) as u32;
        let byte_rate = sample_rate * channels as u32 * 2;
        let block_align = channels * 2;

        let mut bytes = Vec::with_capacity(44 + data_len as usize);
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVE");
        bytes.extend_from_slice(b"fmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
        bytes.extend_from_slice(&channels.to_le_bytes());
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&byte_rate.to_le_bytes());
        bytes.extend_from_slice(&block_align.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        for s in samples {
            let v = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes
    }

    fn sine(freq: f32, seconds: f32, rate: u32) -> Vec<f32> {
        let n = (seconds * rate as f32) as usize;
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin() * 0.5)
            .collect()
    }

    fn rms(samples: &[f32]) -> f32 {
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
    }

    #[test]
    fn test_is_supported_audio() {
        use std::path::Path;
        assert!(is_supported_audio(Path::new("test.wav")));
        assert!(is_supported_audio(Path::new("test.MP3")));
        assert!(is_supported_audio(Path::new("test.webm")));
        assert!(!is_supported_audio(Path::new("test.txt")));
        assert!(!is_supported_audio(Path::new("test")));
    }

    #[test]
    fn test_sniff_format_signatures() {
        let wav = make_wav(&[0.0; 32], 16_000, 1);
        assert_eq!(sniff_format(&wav), Some(AudioFormat::Wav));

        let mut flac = b"fLaC".to_vec();
        flac.extend_from_slice(&[0u8; 16]);
        assert_eq!(sniff_format(&flac), Some(AudioFormat::Flac));

        let mut ogg = b"OggS".to_vec();
        ogg.extend_from_slice(&[0u8; 16]);
        assert_eq!(sniff_format(&ogg), Some(AudioFormat::Ogg));

        let mut m4a = vec![0, 0, 0, 24];
        m4a.extend_from_slice(b"ftypM4A ");
        m4a.extend_from_slice(&[0u8; 8]);
        assert_eq!(sniff_format(&m4a), Some(AudioFormat::Mp4));

        let mut webm = vec![0x1A, 0x45, 0xDF, 0xA3];
        webm.extend_from_slice(&[0u8; 16]);
        assert_eq!(sniff_format(&webm), Some(AudioFormat::Webm));

        let mut mp3 = b"ID3".to_vec();
        mp3.extend_from_slice(&[0u8; 16]);
        assert_eq!(sniff_format(&mp3), Some(AudioFormat::Mp3));

        assert_eq!(sniff_format(b"not audio at all"), None);
        assert_eq!(sniff_format(&[]), None);
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(AudioFormat::from_extension("wav"), Some(AudioFormat::Wav));
        assert_eq!(AudioFormat::from_extension(".M4A"), Some(AudioFormat::Mp4));
        assert_eq!(AudioFormat::from_extension("oga"), Some(AudioFormat::Ogg));
        assert_eq!(AudioFormat::from_extension("txt"), None);
    }

    #[test]
    fn test_normalize_wav_preserves_duration() {
        let signal = sine(440.0, 1.0, TARGET_SAMPLE_RATE);
        let wav = make_wav(&signal, TARGET_SAMPLE_RATE, 1);

        let audio = normalize(
            AudioSource::ByteBuffer {
                bytes: wav,
                hint: Some("wav".to_string()),
            },
            &NormalizeOptions::default(),
        )
        .unwrap();

        assert_eq!(audio.sample_rate(), TARGET_SAMPLE_RATE);
        assert_eq!(audio.channels(), 1);
        // Within one sample-frame of the source duration
        let diff = (audio.samples().len() as i64 - signal.len() as i64).abs();
        assert!(diff <= 1, "duration drifted by {} frames", diff);
    }

    #[test]
    fn test_stereo_downmix_preserves_energy() {
        // Identical signal on both channels: the mono RMS must match the
        // per-channel average RMS, proving no channel is dropped.
        let signal = sine(220.0, 0.5, TARGET_SAMPLE_RATE);
        let mut interleaved = Vec::with_capacity(signal.len() * 2);
        for s in &signal {
            interleaved.push(*s);
            interleaved.push(*s);
        }
        let wav = make_wav(&interleaved, TARGET_SAMPLE_RATE, 2);

        let audio = normalize(
            AudioSource::ByteBuffer {
                bytes: wav,
                hint: Some("wav".to_string()),
            },
            &NormalizeOptions::default(),
        )
        .unwrap();

        let mono_rms = rms(audio.samples());
        let channel_rms = rms(&signal);
        assert!(
            (mono_rms - channel_rms).abs() / channel_rms < 0.05,
            "mono RMS {} deviates from channel RMS {}",
            mono_rms,
            channel_rms
        );
    }

    #[test]
    fn test_downmix_averages_not_drops() {
        // Signal only on the left channel survives at half amplitude
        let interleaved = vec![0.8, 0.0, 0.8, 0.0, 0.8, 0.0];
        let mono = downmix(&interleaved, 2);
        assert_eq!(mono.len(), 3);
        for s in mono {
            assert!((s - 0.4).abs() < 1e-6);
        }
    }

    #[test]
    fn test_empty_input_is_decode_error() {
        let err = normalize(
            AudioSource::ByteBuffer {
                bytes: Vec::new(),
                hint: None,
            },
            &NormalizeOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind_tag(), "decode_error");
    }

    #[test]
    fn test_corrupt_wav_header_is_decode_error() {
        // Valid extension hint, garbage header bytes
        let bytes = vec![0xDE, 0xAD, 0xBE, 0xEF, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];
        let err = normalize(
            AudioSource::ByteBuffer {
                bytes,
                hint: Some("wav".to_string()),
            },
            &NormalizeOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind_tag(), "decode_error");
        assert!(err.to_string().contains("invalid header"));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = normalize(
            AudioSource::FilePath(PathBuf::from("/nonexistent/audio.wav")),
            &NormalizeOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind_tag(), "not_found");
    }

    #[test]
    fn test_live_stream_empty_is_decode_error() {
        let err = normalize(
            AudioSource::LiveStream {
                samples: Vec::new(),
                sample_rate: 48_000,
                channels: 1,
            },
            &NormalizeOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind_tag(), "decode_error");
    }

    #[test]
    fn test_live_stream_is_resampled_and_downmixed() {
        let signal = sine(440.0, 1.0, 48_000);
        let mut interleaved = Vec::with_capacity(signal.len() * 2);
        for s in &signal {
            interleaved.push(*s);
            interleaved.push(*s);
        }

        let audio = normalize(
            AudioSource::LiveStream {
                samples: interleaved,
                sample_rate: 48_000,
                channels: 2,
            },
            &NormalizeOptions::default(),
        )
        .unwrap();

        let expected = TARGET_SAMPLE_RATE as i64;
        let diff = (audio.samples().len() as i64 - expected).abs();
        assert!(diff <= 2, "expected ~{} samples, got {}", expected, audio.samples().len());
    }

    #[test]
    fn test_resample_44100_to_16000_length() {
        let signal = sine(440.0, 1.0, 44_100);
        let resampled = resample(&signal, 44_100, 16_000).unwrap();
        let diff = (resampled.len() as i64 - 16_000).abs();
        assert!(diff <= 2, "got {} samples", resampled.len());
    }

    #[test]
    fn test_opus_packets_decode_to_target_rate() {
        // Round-trip through libopus the way a browser recording arrives:
        // 20ms frames, decoded mono at the model rate.
        let mut encoder =
            opus::Encoder::new(TARGET_SAMPLE_RATE, opus::Channels::Mono, opus::Application::Voip)
                .unwrap();

        let signal = sine(440.0, 1.0, TARGET_SAMPLE_RATE);
        let frame = TARGET_SAMPLE_RATE as usize / 50;
        let mut packets = Vec::new();
        for chunk in signal.chunks(frame) {
            if chunk.len() < frame {
                break;
            }
            let mut buf = vec![0u8; 4000];
            let n = encoder.encode_float(chunk, &mut buf).unwrap();
            buf.truncate(n);
            packets.push(buf);
        }
        assert!(packets.len() >= 49);

        let decoded = decode_opus_packets(&packets).unwrap();
        let diff = (decoded.len() as i64 - signal.len() as i64).abs();
        assert!(diff <= frame as i64, "duration drifted by {} samples", diff);
        assert!(rms(&decoded) > 0.05, "decoded signal is near-silent");
    }

    #[test]
    fn test_opus_header_packets_are_skipped() {
        // Header-only input decodes no audio and reports a decode error
        // instead of feeding the headers to libopus.
        let packets: Vec<&[u8]> = vec![b"OpusHead\x01\x02", b"OpusTags"];
        let err = decode_opus_packets(&packets).unwrap_err();
        assert_eq!(err.kind_tag(), "decode_error");
    }

    #[test]
    fn test_trim_silence() {
        let mut samples = vec![0.0f32; 1000];
        samples.extend(vec![0.5f32; 100]);
        samples.extend(vec![0.0f32; 1000]);

        let trimmed = trim_silence(samples);
        assert_eq!(trimmed.len(), 100);

        // All-silence input survives trimming unchanged
        let silent = vec![0.0f32; 500];
        assert_eq!(trim_silence(silent).len(), 500);
    }

    #[test]
    fn test_hint_contradicting_signature_still_decodes() {
        // Real WAV bytes declared as mp3: one decode attempt is made and,
        // because symphonia probes by content, it still succeeds.
        let signal = sine(440.0, 0.2, TARGET_SAMPLE_RATE);
        let wav = make_wav(&signal, TARGET_SAMPLE_RATE, 1);

        let result = normalize(
            AudioSource::ByteBuffer {
                bytes: wav,
                hint: Some("mp3".to_string()),
            },
            &NormalizeOptions::default(),
        );
        assert!(result.is_ok());
    }
}
