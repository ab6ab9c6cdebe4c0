//! Audio decoding using symphonia
//!
//! Whole tracks are decoded from an in-memory buffer to interleaved stereo
//! f32. Mono is duplicated; more than two channels are folded into left and
//! right by channel parity.

use crate::error::{Error, Result};
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// A fully decoded track
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Interleaved stereo samples `[L, R, L, R, ...]`
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn frames(&self) -> usize {
        self.samples.len() / 2
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }
}

/// Decode `bytes`, using `extension` as a container hint
pub fn decode_bytes(bytes: Vec<u8>, extension: Option<&str>) -> Result<DecodedAudio> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| Error::Decode(format!("Unsupported format: {}", e)))?;
    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| Error::Decode("No audio track found".to_string()))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let mut sample_rate = codec_params.sample_rate.unwrap_or(44100);

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| Error::Decode(format!("Unsupported codec: {}", e)))?;

    let mut samples = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(Error::Decode(format!("Reading packet failed: {}", e))),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                // Corrupt frame, keep going
                warn!("Skipping undecodable packet: {}", e);
                continue;
            }
            Err(e) => return Err(Error::Decode(format!("Decoding failed: {}", e))),
        };

        let spec = *decoded.spec();
        sample_rate = spec.rate;
        let channels = spec.channels.count();
        let too_small = sample_buf
            .as_ref()
            .map_or(true, |buf| buf.capacity() < decoded.capacity() * channels);
        if too_small {
            sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
        }
        let Some(buf) = sample_buf.as_mut() else {
            continue;
        };
        buf.copy_interleaved_ref(decoded);
        append_stereo(&mut samples, buf.samples(), channels);
    }

    debug!(
        "Decoded {} frames at {}Hz",
        samples.len() / 2,
        sample_rate
    );
    Ok(DecodedAudio { samples, sample_rate })
}

/// Append interleaved `input` with `channels` channels as stereo
fn append_stereo(out: &mut Vec<f32>, input: &[f32], channels: usize) {
    match channels {
        0 => {}
        1 => {
            out.reserve(input.len() * 2);
            for &sample in input {
                out.push(sample);
                out.push(sample);
            }
        }
        2 => out.extend_from_slice(input),
        n => {
            let scale = 2.0 / n as f32;
            out.reserve(input.len() / n * 2);
            for frame in input.chunks_exact(n) {
                let (mut left, mut right) = (0.0f32, 0.0f32);
                for (ch, sample) in frame.iter().enumerate() {
                    if ch % 2 == 0 {
                        left += sample;
                    } else {
                        right += sample;
                    }
                }
                out.push(left * scale);
                out.push(right * scale);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(channels: u16, sample_rate: u32, frames: usize) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for i in 0..frames {
                for _ in 0..channels {
                    writer.write_sample(((i % 100) as i16) * 100).unwrap();
                }
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_decode_stereo_wav() {
        let decoded = decode_bytes(wav_bytes(2, 44100, 44100), Some("wav")).unwrap();
        assert_eq!(decoded.sample_rate, 44100);
        assert_eq!(decoded.frames(), 44100);
        assert!((decoded.duration_secs() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_decode_mono_is_duplicated() {
        let decoded = decode_bytes(wav_bytes(1, 22050, 2205), None).unwrap();
        assert_eq!(decoded.frames(), 2205);
        assert_eq!(decoded.samples[2], decoded.samples[3]);
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let result = decode_bytes(vec![0u8; 64], Some("mp3"));
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[test]
    fn test_multichannel_fold() {
        let mut out = Vec::new();
        append_stereo(&mut out, &[1.0, 0.0, 1.0, 0.0], 4);
        assert_eq!(out, vec![1.0, 0.0]);
    }
}
