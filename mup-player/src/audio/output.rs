//! Audio output
//!
//! A `Playhead` holds the decoded track, the read position, the volume and
//! any running fade. An output sink pulls frames from it on its own thread:
//! the system device through cpal with the `device-output` feature, or a
//! wall-clock sink that renders into a scratch buffer at real-time pace.

use crate::audio::backend::{SessionErrorKind, SessionEvents};
use crate::audio::decode::DecodedAudio;
use crate::audio::fade::VolumeRamp;
use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

/// Rate used by the clock sink
pub const CLOCK_SAMPLE_RATE: u32 = 44100;

/// What happened during one render call
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RenderReport {
    /// Track reached its end in this block
    pub ended: bool,
    /// Token of a fade that finished in this block
    pub fade_completed: Option<u64>,
}

/// Render-side state of one session
#[derive(Debug)]
pub struct PlayheadState {
    pub track: Option<DecodedAudio>,
    /// Read position in frames
    pub position: f64,
    pub playing: bool,
    pub volume: f32,
    pub ramp: Option<VolumeRamp>,
    pub rate: f32,
    pub ended: bool,
    /// Seek requested before the track was decoded, in seconds
    pub pending_seek: Option<f64>,
}

impl PlayheadState {
    pub fn new(volume: f32, rate: f32) -> Self {
        Self {
            track: None,
            position: 0.0,
            playing: false,
            volume,
            ramp: None,
            rate,
            ended: false,
            pending_seek: None,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.track.as_ref().map(|t| t.sample_rate).unwrap_or(CLOCK_SAMPLE_RATE)
    }

    pub fn position_secs(&self) -> f64 {
        self.position / self.sample_rate() as f64
    }

    pub fn duration_secs(&self) -> f64 {
        self.track.as_ref().map(DecodedAudio::duration_secs).unwrap_or(0.0)
    }

    /// Current gain, including a running fade
    pub fn effective_volume(&self) -> f32 {
        self.ramp.as_ref().map(VolumeRamp::current).unwrap_or(self.volume)
    }

    pub fn seek(&mut self, secs: f64) {
        let frames = self.track.as_ref().map(DecodedAudio::frames).unwrap_or(0) as f64;
        self.position = (secs.max(0.0) * self.sample_rate() as f64).min(frames);
        self.ended = false;
    }

    /// Fill `out` (interleaved, `channels` wide) and advance
    pub fn render(&mut self, out: &mut [f32], channels: usize) -> RenderReport {
        let mut report = RenderReport::default();
        if channels == 0 {
            return report;
        }

        for frame in out.chunks_mut(channels) {
            let (left, right) = self.next_frame(&mut report);

            let gain = match self.ramp.as_mut() {
                Some(ramp) => {
                    let gain = ramp.step();
                    if ramp.is_complete() {
                        self.volume = ramp.target();
                        report.fade_completed = Some(ramp.token());
                        self.ramp = None;
                    }
                    gain
                }
                None => self.volume,
            };

            if channels == 1 {
                frame[0] = ((left + right) * 0.5 * gain).clamp(-1.0, 1.0);
            } else {
                frame[0] = (left * gain).clamp(-1.0, 1.0);
                frame[1] = (right * gain).clamp(-1.0, 1.0);
                for extra in frame.iter_mut().skip(2) {
                    *extra = 0.0;
                }
            }
        }
        report
    }

    fn next_frame(&mut self, report: &mut RenderReport) -> (f32, f32) {
        if !self.playing || self.ended {
            return (0.0, 0.0);
        }
        let Some(track) = self.track.as_ref() else {
            return (0.0, 0.0);
        };

        let index = self.position as usize;
        if index >= track.frames() {
            self.playing = false;
            self.ended = true;
            report.ended = true;
            return (0.0, 0.0);
        }
        let sample = (track.samples[index * 2], track.samples[index * 2 + 1]);
        self.position += self.rate.max(0.0) as f64;
        sample
    }
}

/// Shared handle to a `PlayheadState`
#[derive(Debug, Clone)]
pub struct Playhead(Arc<Mutex<PlayheadState>>);

impl Playhead {
    pub fn new(volume: f32, rate: f32) -> Self {
        Self(Arc::new(Mutex::new(PlayheadState::new(volume, rate))))
    }

    /// Lock the state; a poisoned lock is still usable
    pub fn lock(&self) -> MutexGuard<'_, PlayheadState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Render a block and forward what happened to the engine
    pub fn render_and_report(&self, out: &mut [f32], channels: usize, events: &SessionEvents) {
        let report = self.lock().render(out, channels);
        if let Some(token) = report.fade_completed {
            events.fade_complete(token);
        }
        if report.ended {
            events.ended();
        }
    }
}

/// Running output sink; dropping it stops the sink thread
pub struct OutputHandle {
    stop: Arc<AtomicBool>,
    sample_rate: u32,
}

impl OutputHandle {
    /// Start the sink for `playhead`
    pub fn start(playhead: Playhead, events: SessionEvents) -> Result<Self> {
        #[cfg(feature = "device-output")]
        {
            device::start(playhead, events)
        }
        #[cfg(not(feature = "device-output"))]
        {
            clock::start(playhead, events)
        }
    }

    /// Frames per second the sink consumes
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl Drop for OutputHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

#[cfg_attr(feature = "device-output", allow(dead_code))]
mod clock {
    use super::*;
    use std::time::Instant;

    const BLOCK: Duration = Duration::from_millis(10);

    pub(super) fn start(playhead: Playhead, events: SessionEvents) -> Result<OutputHandle> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);

        std::thread::Builder::new()
            .name("mup-clock-sink".to_string())
            .spawn(move || {
                let mut scratch = Vec::new();
                let mut last = Instant::now();
                let mut carry = 0.0f64;
                while !thread_stop.load(Ordering::SeqCst) {
                    std::thread::sleep(BLOCK);
                    let now = Instant::now();
                    carry += now.duration_since(last).as_secs_f64() * CLOCK_SAMPLE_RATE as f64;
                    last = now;
                    let frames = carry as usize;
                    carry -= frames as f64;
                    scratch.resize(frames * 2, 0.0);
                    playhead.render_and_report(&mut scratch, 2, &events);
                }
                debug!("Clock sink stopped");
            })
            .map_err(|e| Error::AudioOutput(format!("Failed to start clock sink: {}", e)))?;

        Ok(OutputHandle {
            stop,
            sample_rate: CLOCK_SAMPLE_RATE,
        })
    }
}

#[cfg(feature = "device-output")]
mod device {
    use super::*;
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::{FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
    use std::sync::mpsc;
    use tracing::{error, info};

    pub(super) fn start(playhead: Playhead, events: SessionEvents) -> Result<OutputHandle> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let (ready_tx, ready_rx) = mpsc::channel::<std::result::Result<u32, String>>();

        // cpal streams are not Send everywhere; the stream lives and dies on this thread
        std::thread::Builder::new()
            .name("mup-device-sink".to_string())
            .spawn(move || {
                let stream = match open_stream(playhead, events) {
                    Ok((stream, rate)) => {
                        let _ = ready_tx.send(Ok(rate));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                while !thread_stop.load(Ordering::SeqCst) {
                    std::thread::sleep(Duration::from_millis(20));
                }
                drop(stream);
                debug!("Device sink stopped");
            })
            .map_err(|e| Error::AudioOutput(format!("Failed to start device sink: {}", e)))?;

        let sample_rate = ready_rx
            .recv()
            .map_err(|_| Error::AudioOutput("Device sink exited during setup".to_string()))?
            .map_err(Error::AudioOutput)?;

        Ok(OutputHandle { stop, sample_rate })
    }

    fn open_stream(playhead: Playhead, events: SessionEvents) -> Result<(Stream, u32)> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))?;
        let supported = device
            .default_output_config()
            .map_err(|e| Error::AudioOutput(format!("Failed to get default config: {}", e)))?;
        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.config();
        let rate = config.sample_rate.0;
        info!(
            "Audio device {} at {}Hz, {} channels, {:?}",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            rate,
            config.channels,
            sample_format
        );

        let stream = match sample_format {
            SampleFormat::F32 => build::<f32>(&device, &config, playhead, events)?,
            SampleFormat::I16 => build::<i16>(&device, &config, playhead, events)?,
            SampleFormat::U16 => build::<u16>(&device, &config, playhead, events)?,
            other => {
                return Err(Error::AudioOutput(format!("Unsupported sample format: {:?}", other)));
            }
        };
        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {}", e)))?;
        Ok((stream, rate))
    }

    fn build<T>(
        device: &cpal::Device,
        config: &StreamConfig,
        playhead: Playhead,
        events: SessionEvents,
    ) -> Result<Stream>
    where
        T: SizedSample + FromSample<f32>,
    {
        let channels = config.channels as usize;
        let error_events = events.clone();
        let mut scratch: Vec<f32> = Vec::new();

        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    scratch.resize(data.len(), 0.0);
                    playhead.render_and_report(&mut scratch, channels, &events);
                    for (out, sample) in data.iter_mut().zip(scratch.iter()) {
                        *out = T::from_sample(*sample);
                    }
                },
                move |err| {
                    error!("Audio stream error: {}", err);
                    error_events.error(SessionErrorKind::Output, err.to_string());
                },
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(frames: usize) -> DecodedAudio {
        DecodedAudio {
            samples: (0..frames * 2).map(|i| (i / 2) as f32 / frames as f32).collect(),
            sample_rate: 10,
        }
    }

    #[test]
    fn test_paused_renders_silence() {
        let mut state = PlayheadState::new(1.0, 1.0);
        state.track = Some(track(10));
        let mut out = vec![1.0; 8];
        state.render(&mut out, 2);
        assert!(out.iter().all(|s| *s == 0.0));
        assert_eq!(state.position, 0.0);
    }

    #[test]
    fn test_render_advances_and_reports_end() {
        let mut state = PlayheadState::new(1.0, 1.0);
        state.track = Some(track(4));
        state.playing = true;

        let mut out = vec![0.0; 6];
        let report = state.render(&mut out, 2);
        assert!(!report.ended);
        assert_eq!(state.position, 3.0);

        let report = state.render(&mut out, 2);
        assert!(report.ended);
        assert!(!state.playing);
    }

    #[test]
    fn test_rate_scales_position() {
        let mut state = PlayheadState::new(1.0, 2.0);
        state.track = Some(track(100));
        state.playing = true;
        let mut out = vec![0.0; 20];
        state.render(&mut out, 2);
        assert_eq!(state.position, 20.0);
        assert_eq!(state.position_secs(), 2.0);
    }

    #[test]
    fn test_fade_completion_sets_volume() {
        let mut state = PlayheadState::new(0.0, 1.0);
        state.ramp = Some(VolumeRamp::new(0.0, 0.5, 3, 9));
        let mut out = vec![0.0; 8];
        let report = state.render(&mut out, 2);
        assert_eq!(report.fade_completed, Some(9));
        assert_eq!(state.volume, 0.5);
        assert!(state.ramp.is_none());
    }

    #[test]
    fn test_seek_clamps_to_track() {
        let mut state = PlayheadState::new(1.0, 1.0);
        state.track = Some(track(10));
        state.seek(5.0);
        assert_eq!(state.position, 10.0);
        state.seek(0.3);
        assert_eq!(state.position, 3.0);
    }
}
