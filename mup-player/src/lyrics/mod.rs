//! Lyric parsing and time-to-line resolution

pub mod local;
pub mod parser;
pub mod resolver;

pub use parser::{build_song_lyric, parse_lrc, parse_yrc};
pub use resolver::{resolve_lyric_index, LyricCursor};
