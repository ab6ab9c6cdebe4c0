//! Sample rate conversion using rubato
//!
//! Decoded tracks are converted once, at load time, to the output sink's
//! rate.

use crate::error::{Error, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use tracing::debug;

/// Frames handed to rubato per call
const CHUNK_FRAMES: usize = 4096;

pub struct Resampler;

impl Resampler {
    /// Resample interleaved `input` from `input_rate` to `output_rate`
    ///
    /// Returns a copy when the rates already match.
    pub fn resample(input: &[f32], input_rate: u32, output_rate: u32, channels: usize) -> Result<Vec<f32>> {
        if input_rate == output_rate || input.is_empty() {
            return Ok(input.to_vec());
        }
        if channels == 0 || input_rate == 0 || output_rate == 0 {
            return Err(Error::Decode(format!(
                "cannot resample {} channels from {}Hz to {}Hz",
                channels, input_rate, output_rate
            )));
        }

        let ratio = output_rate as f64 / input_rate as f64;
        let mut resampler = FastFixedIn::<f32>::new(ratio, 1.0, PolynomialDegree::Septic, CHUNK_FRAMES, channels)
            .map_err(|e| Error::Decode(format!("Failed to create resampler: {}", e)))?;

        let planar = Self::deinterleave(input, channels);
        let total_frames = planar[0].len();
        let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity((total_frames as f64 * ratio) as usize + 16); channels];

        let mut offset = 0;
        while offset + CHUNK_FRAMES <= total_frames {
            let chunk: Vec<&[f32]> = planar.iter().map(|c| &c[offset..offset + CHUNK_FRAMES]).collect();
            let processed = resampler
                .process(&chunk, None)
                .map_err(|e| Error::Decode(format!("Resampling failed: {}", e)))?;
            for (out, part) in output.iter_mut().zip(processed) {
                out.extend(part);
            }
            offset += CHUNK_FRAMES;
        }

        if offset < total_frames {
            let chunk: Vec<&[f32]> = planar.iter().map(|c| &c[offset..]).collect();
            let processed = resampler
                .process_partial(Some(chunk.as_slice()), None)
                .map_err(|e| Error::Decode(format!("Resampling failed: {}", e)))?;
            for (out, part) in output.iter_mut().zip(processed) {
                out.extend(part);
            }
        }

        // The last partial chunk is zero padded by rubato
        let expected = (total_frames as f64 * ratio).round() as usize;
        for channel in output.iter_mut() {
            channel.truncate(expected);
        }

        debug!(
            "Resampled {} frames {}Hz -> {} frames {}Hz",
            total_frames,
            input_rate,
            output[0].len(),
            output_rate
        );
        Ok(Self::interleave(&output))
    }

    /// `[L, R, L, R]` -> `[[L, L], [R, R]]`
    fn deinterleave(samples: &[f32], channels: usize) -> Vec<Vec<f32>> {
        let frames = samples.len() / channels;
        let mut planar = vec![Vec::with_capacity(frames); channels];
        for frame in samples.chunks_exact(channels) {
            for (ch, sample) in frame.iter().enumerate() {
                planar[ch].push(*sample);
            }
        }
        planar
    }

    fn interleave(planar: &[Vec<f32>]) -> Vec<f32> {
        let Some(first) = planar.first() else {
            return Vec::new();
        };
        let frames = planar.iter().map(Vec::len).min().unwrap_or(first.len());
        let mut interleaved = Vec::with_capacity(frames * planar.len());
        for i in 0..frames {
            for channel in planar {
                interleaved.push(channel[i]);
            }
        }
        interleaved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deinterleave_and_back() {
        let interleaved = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let planar = Resampler::deinterleave(&interleaved, 2);
        assert_eq!(planar, vec![vec![1.0, 3.0, 5.0], vec![2.0, 4.0, 6.0]]);
        assert_eq!(Resampler::interleave(&planar), interleaved);
    }

    #[test]
    fn test_same_rate_is_copy() {
        let input = vec![0.1, 0.2, 0.3, 0.4];
        assert_eq!(Resampler::resample(&input, 44100, 44100, 2).unwrap(), input);
    }

    #[test]
    fn test_resample_length_tracks_ratio() {
        let input_rate = 48000;
        let frames = 10_000;
        let mut input = Vec::with_capacity(frames * 2);
        for i in 0..frames {
            let t = i as f32 / input_rate as f32;
            let sample = (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5;
            input.push(sample);
            input.push(sample);
        }

        let output = Resampler::resample(&input, input_rate, 44100, 2).unwrap();
        let expected = (frames as f64 * 44100.0 / input_rate as f64) as usize;
        let got = output.len() / 2;
        assert!(
            got + 200 >= expected && got <= expected + 200,
            "expected ~{} frames, got {}",
            expected,
            got
        );
    }
}
