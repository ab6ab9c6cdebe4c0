//! Music API payloads to domain songs
//!
//! Accepts both the current (`ar`/`al`/`dt`) and the legacy
//! (`artists`/`album`/`duration`) song shapes, and items wrapped in a
//! `songInfo` object as returned by the heartbeat list.

use mup_common::models::{AlbumRef, ArtistRef, Platform, Song, SongId, SongSource};
use serde_json::Value;

/// Numeric or string id
pub fn json_id(value: &Value) -> Option<SongId> {
    match value {
        Value::Number(n) => n.as_u64().map(SongId::from).or_else(|| Some(SongId::new(n.to_string()))),
        Value::String(s) if !s.is_empty() => Some(SongId::new(s.clone())),
        _ => None,
    }
}

fn first_present<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|k| value.get(*k)).find(|v| !v.is_null())
}

fn parse_artists(value: &Value) -> Vec<ArtistRef> {
    first_present(value, &["ar", "artists"])
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|a| {
                    let name = a.get("name")?.as_str()?;
                    Some(ArtistRef {
                        id: a.get("id").and_then(json_id),
                        name: name.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Parse one catalogue song
pub fn parse_song(value: &Value, platform: Platform) -> Option<Song> {
    let value = value.get("songInfo").unwrap_or(value);
    let id = value.get("id").and_then(json_id)?;
    let name = value.get("name")?.as_str()?.to_string();

    let album_value = first_present(value, &["al", "album"]);
    let album = album_value.and_then(|al| {
        Some(AlbumRef {
            id: al.get("id").and_then(json_id),
            name: al.get("name")?.as_str()?.to_string(),
        })
    });
    let cover = album_value
        .and_then(|al| al.get("picUrl"))
        .and_then(Value::as_str)
        .map(str::to_string);

    Some(Song {
        id,
        name,
        artists: parse_artists(value),
        album,
        duration_ms: first_present(value, &["dt", "duration"])
            .and_then(Value::as_u64)
            .unwrap_or(0),
        source: SongSource::Streamed,
        path: None,
        platform: Some(platform),
        program_id: None,
        cover,
    })
}

/// Parse a radio program; resolution goes through its main track
pub fn parse_radio_program(value: &Value, platform: Platform) -> Option<Song> {
    let id = value.get("id").and_then(json_id)?;
    let name = value.get("name")?.as_str()?.to_string();
    let main = value.get("mainSong");
    let program_id = main
        .and_then(|m| m.get("id"))
        .or_else(|| value.get("mainTrackId"))
        .and_then(json_id)?;

    Some(Song {
        id,
        name,
        artists: main.map(parse_artists).unwrap_or_default(),
        album: None,
        duration_ms: value.get("duration").and_then(Value::as_u64).unwrap_or(0),
        source: SongSource::RadioProgram,
        path: None,
        platform: Some(platform),
        program_id: Some(program_id),
        cover: value
            .get("coverUrl")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Parse a list of songs, skipping malformed entries
pub fn parse_songs(list: Option<&Value>, platform: Platform) -> Vec<Song> {
    list.and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|v| parse_song(v, platform)).collect())
        .unwrap_or_default()
}
