//! Device backend
//!
//! Each session fetches its source, decodes and resamples it to the output
//! rate on a blocking thread, then hands the samples to the playhead that the
//! output sink is already pulling from. Rate changes speed and pitch together.

use crate::audio::backend::{
    AudioBackend, AudioSession, PlayableSource, SessionErrorKind, SessionEvents, SessionRequest,
};
use crate::audio::decode::{decode_bytes, DecodedAudio};
use crate::audio::fade::VolumeRamp;
use crate::audio::fetch::fetch_source;
use crate::audio::output::{OutputHandle, Playhead};
use crate::audio::resampler::Resampler;
use crate::error::Result;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Backend that plays through `OutputHandle`
#[derive(Debug, Clone, Default)]
pub struct DeviceBackend {
    client: reqwest::Client,
}

impl DeviceBackend {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl AudioBackend for DeviceBackend {
    fn open(&self, request: SessionRequest, events: SessionEvents) -> Result<Box<dyn AudioSession>> {
        let playhead = Playhead::new(request.volume, request.rate);
        let output = OutputHandle::start(playhead.clone(), events.clone())?;
        let load = tokio::spawn(load_track(
            self.client.clone(),
            request.source,
            output.sample_rate(),
            playhead.clone(),
            events.clone(),
        ));

        Ok(Box::new(DeviceSession {
            playhead,
            _output: output,
            load,
            events,
        }))
    }
}

async fn load_track(
    client: reqwest::Client,
    source: PlayableSource,
    output_rate: u32,
    playhead: Playhead,
    events: SessionEvents,
) {
    let bytes = match fetch_source(&client, &source).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Fetch failed: {}", e);
            events.error(e.kind, e.message);
            return;
        }
    };

    let extension = source.extension();
    let decoded = tokio::task::spawn_blocking(move || -> Result<DecodedAudio> {
        let decoded = decode_bytes(bytes, extension.as_deref())?;
        if decoded.sample_rate == output_rate {
            return Ok(decoded);
        }
        let samples = Resampler::resample(&decoded.samples, decoded.sample_rate, output_rate, 2)?;
        Ok(DecodedAudio {
            samples,
            sample_rate: output_rate,
        })
    })
    .await;

    let track = match decoded {
        Ok(Ok(track)) => track,
        Ok(Err(e)) => {
            events.error(SessionErrorKind::Decode, e.to_string());
            return;
        }
        Err(e) => {
            events.error(SessionErrorKind::Decode, format!("Decode task failed: {}", e));
            return;
        }
    };

    let duration = track.duration_secs();
    debug!("Track decoded: {:.1}s at {}Hz", duration, track.sample_rate);
    let playing = {
        let mut state = playhead.lock();
        state.track = Some(track);
        if let Some(secs) = state.pending_seek.take() {
            state.seek(secs);
        }
        state.playing
    };

    events.loaded(duration);
    if playing {
        events.started();
    }
}

/// Live session on the device backend
pub struct DeviceSession {
    playhead: Playhead,
    _output: OutputHandle,
    load: JoinHandle<()>,
    events: SessionEvents,
}

impl AudioSession for DeviceSession {
    fn play(&mut self) {
        let mut state = self.playhead.lock();
        let resumed = !state.playing && state.track.is_some();
        state.playing = true;
        state.ended = false;
        drop(state);
        if resumed {
            self.events.started();
        }
    }

    fn pause(&mut self) {
        self.playhead.lock().playing = false;
    }

    fn is_playing(&self) -> bool {
        self.playhead.lock().playing
    }

    fn is_loaded(&self) -> bool {
        self.playhead.lock().track.is_some()
    }

    fn seek(&mut self, secs: f64) {
        let mut state = self.playhead.lock();
        if state.track.is_some() {
            state.seek(secs);
        } else {
            state.pending_seek = Some(secs.max(0.0));
        }
    }

    fn position(&self) -> f64 {
        let state = self.playhead.lock();
        match state.pending_seek {
            Some(secs) if state.track.is_none() => secs,
            _ => state.position_secs(),
        }
    }

    fn duration(&self) -> f64 {
        self.playhead.lock().duration_secs()
    }

    fn set_volume(&mut self, volume: f32) {
        let mut state = self.playhead.lock();
        state.ramp = None;
        state.volume = volume.clamp(0.0, 1.0);
    }

    fn volume(&self) -> f32 {
        self.playhead.lock().effective_volume()
    }

    fn set_rate(&mut self, rate: f32) {
        self.playhead.lock().rate = rate;
    }

    fn fade(&mut self, from: f32, to: f32, duration: Duration, token: u64) {
        let mut state = self.playhead.lock();
        let rate = state.sample_rate() as f64;
        let frames = (duration.as_secs_f64() * rate).round() as u64;
        if frames == 0 {
            state.ramp = None;
            state.volume = to;
            drop(state);
            self.events.fade_complete(token);
            return;
        }
        state.ramp = Some(VolumeRamp::new(from, to, frames, token));
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        self.load.abort();
    }
}
