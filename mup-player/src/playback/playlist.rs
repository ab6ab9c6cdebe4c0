//! Playlist and shuffle management
//!
//! Owns the visible song order, the current index and, while shuffle is
//! active, a snapshot of the pre-shuffle order. The snapshot exists exactly
//! when the visible order is a shuffle permutation.

use mup_common::models::{Song, SongId};
use rand::Rng;

/// Result of `Playlist::remove_at`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// A non-current entry was removed; the index was repaired
    Removed,
    /// The current entry was removed; the caller must reload the new current song
    RemovedCurrent,
    /// The list became empty; the caller must fully reset
    Emptied,
    /// Index out of range; nothing changed
    OutOfRange,
}

#[derive(Debug, Clone, Default)]
pub struct Playlist {
    songs: Vec<Song>,
    /// Pre-shuffle order, present only while shuffled
    original: Option<Vec<Song>>,
    index: Option<usize>,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn current(&self) -> Option<&Song> {
        self.index.and_then(|i| self.songs.get(i))
    }

    pub fn get(&self, index: usize) -> Option<&Song> {
        self.songs.get(index)
    }

    pub fn position_of(&self, id: &SongId) -> Option<usize> {
        self.songs.iter().position(|s| &s.id == id)
    }

    pub fn is_shuffled(&self) -> bool {
        self.original.is_some()
    }

    /// Pre-shuffle order while shuffled
    pub fn original(&self) -> Option<&[Song]> {
        self.original.as_deref()
    }

    /// Replace the list atomically
    ///
    /// The index is kept as long as it still points inside the new list.
    /// Any shuffle snapshot is discarded: the new order is not a permutation
    /// of it.
    pub fn set_playlist(&mut self, songs: Vec<Song>) {
        self.songs = songs;
        self.original = None;
        self.index = self.index.filter(|&i| i < self.songs.len());
    }

    /// Replace the list while shuffle is active: `songs` becomes the
    /// snapshot and the visible order a permutation of it
    pub fn set_playlist_shuffled<R: Rng>(&mut self, songs: Vec<Song>, rng: &mut R) {
        let mut visible = songs.clone();
        fisher_yates(&mut visible, rng);
        self.songs = visible;
        self.original = Some(songs);
        self.index = self.index.filter(|&i| i < self.songs.len());
    }

    /// Restore persisted state verbatim
    pub fn restore(&mut self, songs: Vec<Song>, original: Option<Vec<Song>>, index: Option<usize>) {
        self.index = index.filter(|&i| i < songs.len());
        self.original = original.filter(|o| !o.is_empty() && !songs.is_empty());
        self.songs = songs;
    }

    /// Point at `index`; returns false (and changes nothing) when out of range
    pub fn set_index(&mut self, index: usize) -> bool {
        if index < self.songs.len() {
            self.index = Some(index);
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.songs.clear();
        self.original = None;
        self.index = None;
    }

    /// Insert `song` right after `after` (`None` inserts at the front),
    /// dropping any other entry with the same id
    ///
    /// Returns the song's resulting index. The current index keeps pointing
    /// at the same song.
    pub fn insert_next(&mut self, song: Song, after: Option<usize>) -> usize {
        if self.songs.is_empty() {
            self.songs.push(song.clone());
            if let Some(original) = self.original.as_mut() {
                original.clear();
                original.push(song);
            }
            return 0;
        }

        let current_id = self.current().map(|s| s.id.clone());
        let insert_at = after.map(|a| (a + 1).min(self.songs.len())).unwrap_or(0);
        let id = song.id.clone();

        if self.original.is_some() {
            self.mirror_insert(&song, current_id.as_ref());
        }

        self.songs.insert(insert_at, song);
        let mut position = insert_at;
        let mut i = 0;
        self.songs.retain(|s| {
            let keep = i == insert_at || s.id != id;
            if !keep && i < insert_at {
                position -= 1;
            }
            i += 1;
            keep
        });

        self.index = current_id.and_then(|cid| self.position_of(&cid));
        position
    }

    /// Keep the snapshot in step with an insertion made while shuffled
    fn mirror_insert(&mut self, song: &Song, current_id: Option<&SongId>) {
        let Some(original) = self.original.as_mut() else {
            return;
        };
        original.retain(|s| s.id != song.id);
        let at = current_id
            .and_then(|cid| original.iter().position(|s| &s.id == cid))
            .map(|p| p + 1)
            .unwrap_or(original.len());
        original.insert(at, song.clone());
    }

    /// Delete the entry at `index` and repair the current index
    pub fn remove_at(&mut self, index: usize) -> RemoveOutcome {
        if index >= self.songs.len() {
            return RemoveOutcome::OutOfRange;
        }

        let removed = self.songs.remove(index);
        if let Some(original) = self.original.as_mut() {
            if let Some(pos) = original.iter().position(|s| s.id == removed.id) {
                original.remove(pos);
            }
        }

        if self.songs.is_empty() {
            self.clear();
            return RemoveOutcome::Emptied;
        }

        match self.index {
            Some(current) if index < current => {
                self.index = Some(current - 1);
                RemoveOutcome::Removed
            }
            Some(current) if index == current => {
                if current >= self.songs.len() {
                    self.index = Some(0);
                }
                RemoveOutcome::RemovedCurrent
            }
            _ => RemoveOutcome::Removed,
        }
    }

    /// Snapshot the order and shuffle the visible list
    ///
    /// Re-entering while already shuffled reshuffles without touching the
    /// snapshot.
    pub fn enter_shuffle<R: Rng>(&mut self, rng: &mut R) {
        if self.songs.is_empty() {
            return;
        }
        let current_id = self.current().map(|s| s.id.clone());
        if self.original.is_none() {
            self.original = Some(self.songs.clone());
        }
        fisher_yates(&mut self.songs, rng);
        if let Some(id) = current_id {
            self.index = self.position_of(&id);
        }
    }

    /// Restore the pre-shuffle order and relocate the index
    pub fn exit_shuffle(&mut self) {
        let Some(original) = self.original.take() else {
            return;
        };
        let current_id = self.current().map(|s| s.id.clone());
        self.songs = original;
        if self.index.is_some() {
            let position = current_id.and_then(|id| self.position_of(&id));
            self.index = if self.songs.is_empty() {
                None
            } else {
                Some(position.unwrap_or(0))
            };
        }
    }
}

/// Uniform in-place permutation
pub fn fisher_yates<T, R: Rng>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn song(id: u64) -> Song {
        Song::new(id, format!("song-{}", id))
    }

    fn ids(playlist: &Playlist) -> Vec<String> {
        playlist.songs().iter().map(|s| s.id.to_string()).collect()
    }

    fn playlist_of(n: u64, index: usize) -> Playlist {
        let mut playlist = Playlist::new();
        playlist.set_playlist((0..n).map(song).collect());
        playlist.set_index(index);
        playlist
    }

    #[test]
    fn test_set_playlist_keeps_valid_index() {
        let mut playlist = playlist_of(3, 2);
        playlist.set_playlist(vec![song(7), song(8), song(9), song(10)]);
        assert_eq!(playlist.index(), Some(2));
        playlist.set_playlist(vec![song(1)]);
        assert_eq!(playlist.index(), None);
    }

    #[test]
    fn test_insert_next_moves_existing_entry() {
        let mut playlist = Playlist::new();
        playlist.set_playlist(vec![song(1), song(2), song(3)]);
        playlist.set_index(0);

        let at = playlist.insert_next(song(3), Some(0));

        assert_eq!(at, 1);
        assert_eq!(ids(&playlist), vec!["1", "3", "2"]);
        assert_eq!(playlist.index(), Some(0));
    }

    #[test]
    fn test_insert_next_duplicate_before_insertion_point() {
        let mut playlist = playlist_of(4, 3);
        let at = playlist.insert_next(song(0), Some(3));
        assert_eq!(ids(&playlist), vec!["1", "2", "3", "0"]);
        assert_eq!(at, 3);
        // current song (id 3) shifted left
        assert_eq!(playlist.current().unwrap().id.as_str(), "3");
    }

    #[test]
    fn test_insert_next_into_empty_list() {
        let mut playlist = Playlist::new();
        assert_eq!(playlist.insert_next(song(5), None), 0);
        assert_eq!(ids(&playlist), vec!["5"]);
    }

    #[test]
    fn test_insert_next_without_current_goes_first() {
        let mut playlist = Playlist::new();
        playlist.set_playlist(vec![song(1), song(2)]);
        assert_eq!(playlist.insert_next(song(9), None), 0);
        assert_eq!(ids(&playlist), vec!["9", "1", "2"]);
    }

    #[test]
    fn test_remove_before_current_decrements() {
        let mut playlist = playlist_of(4, 2);
        assert_eq!(playlist.remove_at(0), RemoveOutcome::Removed);
        assert_eq!(playlist.index(), Some(1));
        assert_eq!(playlist.current().unwrap().id.as_str(), "2");
    }

    #[test]
    fn test_remove_current_last_wraps_to_zero() {
        let mut playlist = playlist_of(3, 2);
        assert_eq!(playlist.remove_at(2), RemoveOutcome::RemovedCurrent);
        assert_eq!(playlist.index(), Some(0));
    }

    #[test]
    fn test_remove_out_of_range_is_noop() {
        let mut playlist = playlist_of(2, 1);
        assert_eq!(playlist.remove_at(5), RemoveOutcome::OutOfRange);
        assert_eq!(playlist.len(), 2);
        assert_eq!(playlist.index(), Some(1));
    }

    #[test]
    fn test_remove_last_entry_empties() {
        let mut playlist = playlist_of(1, 0);
        assert_eq!(playlist.remove_at(0), RemoveOutcome::Emptied);
        assert!(playlist.is_empty());
        assert_eq!(playlist.index(), None);
        assert!(!playlist.is_shuffled());
    }

    #[test]
    fn test_remove_never_leaves_index_out_of_bounds() {
        for len in 1..7u64 {
            for current in 0..len as usize {
                for removed in 0..len as usize {
                    let mut playlist = playlist_of(len, current);
                    let outcome = playlist.remove_at(removed);
                    if playlist.is_empty() {
                        assert_eq!(outcome, RemoveOutcome::Emptied);
                        assert_eq!(playlist.index(), None);
                    } else {
                        let index = playlist.index().unwrap();
                        assert!(index < playlist.len(), "len {} cur {} rm {}", len, current, removed);
                    }
                }
            }
        }
    }

    #[test]
    fn test_shuffle_round_trip_restores_order_and_index() {
        let mut rng = StdRng::seed_from_u64(7);
        for len in 1..10u64 {
            for current in 0..len as usize {
                let mut playlist = playlist_of(len, current);
                let before = ids(&playlist);

                playlist.enter_shuffle(&mut rng);
                assert!(playlist.is_shuffled());
                assert_eq!(playlist.current().unwrap().id.to_string(), before[current]);

                playlist.exit_shuffle();
                assert!(!playlist.is_shuffled());
                assert_eq!(ids(&playlist), before);
                assert_eq!(playlist.index(), Some(current));
            }
        }
    }

    #[test]
    fn test_shuffle_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut playlist = playlist_of(20, 0);
        playlist.enter_shuffle(&mut rng);
        let mut shuffled = ids(&playlist);
        shuffled.sort();
        let mut expected: Vec<String> = (0..20).map(|i: u64| i.to_string()).collect();
        expected.sort();
        assert_eq!(shuffled, expected);
    }

    #[test]
    fn test_edits_while_shuffled_survive_exit() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut playlist = playlist_of(4, 1);
        playlist.enter_shuffle(&mut rng);

        let current = playlist.index();
        playlist.insert_next(song(99), current);
        let victim = playlist.position_of(&SongId::from(3u64)).unwrap();
        playlist.remove_at(victim);

        playlist.exit_shuffle();
        assert_eq!(ids(&playlist), vec!["0", "1", "99", "2"]);
        assert_eq!(playlist.current().unwrap().id.as_str(), "1");
    }

    #[test]
    fn test_set_playlist_shuffled_keeps_snapshot() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut playlist = Playlist::new();
        playlist.set_playlist_shuffled(vec![song(1), song(2), song(3)], &mut rng);
        assert_eq!(
            playlist.original().unwrap().iter().map(|s| s.id.to_string()).collect::<Vec<_>>(),
            vec!["1", "2", "3"]
        );
        playlist.exit_shuffle();
        assert_eq!(ids(&playlist), vec!["1", "2", "3"]);
        assert_eq!(playlist.index(), None);
    }
}
