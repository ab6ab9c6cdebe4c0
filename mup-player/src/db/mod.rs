//! Database access layer
//!
//! SQLite holds two things: runtime settings (`settings`, key/value text)
//! and persisted playback documents (`kv_store`, key/JSON value).

pub mod init;
pub mod settings;
pub mod store;

pub use init::{connect, init_schema};
pub use store::{PersistedSession, PlaybackStore, SqliteStore};
