//! Fire-and-forget persistence
//!
//! The engine never waits on storage while running. Writes are queued to one
//! writer task so they land in the order they were issued; shutdown closes
//! the queue and waits for it to drain.

use crate::db::PlaybackStore;
use mup_common::models::{PlayMode, Song};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// One queued write
#[derive(Debug, Clone)]
pub enum PersistOp {
    Playlist {
        songs: Vec<Song>,
        original: Option<Vec<Song>>,
    },
    Position {
        index: Option<usize>,
        mode: PlayMode,
        time: f64,
    },
    History(Song),
    Levels {
        volume: f32,
        rate: f32,
    },
}

/// Handle to the writer task
#[derive(Debug)]
pub struct PersistenceWriter {
    tx: Option<mpsc::UnboundedSender<PersistOp>>,
    task: Option<JoinHandle<()>>,
}

impl PersistenceWriter {
    /// Start the writer task for `store`
    pub fn spawn(store: Arc<dyn PlaybackStore>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<PersistOp>();

        let task = tokio::spawn(async move {
            while let Some(op) = rx.recv().await {
                let result = match &op {
                    PersistOp::Playlist { songs, original } => {
                        store.save_playlist(songs, original.as_deref()).await
                    }
                    PersistOp::Position { index, mode, time } => {
                        store.save_position(*index, *mode, *time).await
                    }
                    PersistOp::History(song) => store.append_history(song).await,
                    PersistOp::Levels { volume, rate } => store.save_levels(*volume, *rate).await,
                };
                if let Err(e) = result {
                    warn!("Persisting {} failed: {}", op_name(&op), e);
                }
            }
            debug!("Persistence writer stopped");
        });

        Self {
            tx: Some(tx),
            task: Some(task),
        }
    }

    /// Stop accepting writes and wait until every queued one has landed
    pub async fn close(&mut self) {
        self.tx = None;
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Persistence writer ended abnormally: {}", e);
            }
        }
    }

    pub fn submit(&self, op: PersistOp) {
        let Some(tx) = &self.tx else {
            warn!("Persistence writer is closed, dropping {} write", op_name(&op));
            return;
        };
        if tx.send(op).is_err() {
            warn!("Persistence writer is gone, dropping write");
        }
    }

    pub fn playlist(&self, songs: &[Song], original: Option<&[Song]>) {
        self.submit(PersistOp::Playlist {
            songs: songs.to_vec(),
            original: original.map(<[Song]>::to_vec),
        });
    }

    pub fn position(&self, index: Option<usize>, mode: PlayMode, time: f64) {
        self.submit(PersistOp::Position { index, mode, time });
    }

    pub fn history(&self, song: &Song) {
        self.submit(PersistOp::History(song.clone()));
    }

    pub fn levels(&self, volume: f32, rate: f32) {
        self.submit(PersistOp::Levels { volume, rate });
    }
}

fn op_name(op: &PersistOp) -> &'static str {
    match op {
        PersistOp::Playlist { .. } => "playlist",
        PersistOp::Position { .. } => "position",
        PersistOp::History(_) => "history",
        PersistOp::Levels { .. } => "levels",
    }
}
