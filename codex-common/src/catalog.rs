//! Track catalog data model
//!
//! The catalog is an ordered, read-only mapping from track id to track
//! metadata, supplied once at startup. The Director uses it both as an
//! id lookup and as the ordering for "skip to next" (wrapping).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One ambient loop entry in the catalog
///
/// Immutable, process-wide. `src` is whatever locator the playback
/// backend understands (a file path or URL).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    /// Stable identifier referenced by scene signals and commands
    pub id: String,
    /// Display label for the transport UI
    pub label: String,
    /// Mood tag ("vibe") shown alongside the label
    pub mood: String,
    /// Source locator handed to the playback backend
    pub src: String,
}

/// Ordered id -> track mapping built once at Director construction
#[derive(Debug, Clone, Default)]
pub struct TrackCatalog {
    tracks: Vec<Track>,
    by_id: HashMap<String, usize>,
}

impl TrackCatalog {
    /// Build a catalog from an ordered track list
    ///
    /// Later entries win on duplicate ids, matching map-insert order
    /// semantics; the ordering list keeps the first occurrence.
    pub fn new(tracks: Vec<Track>) -> Self {
        let by_id = tracks
            .iter()
            .enumerate()
            .map(|(index, track)| (track.id.clone(), index))
            .collect();
        Self { tracks, by_id }
    }

    /// Look up a track by id
    pub fn get(&self, id: &str) -> Option<&Track> {
        self.by_id.get(id).map(|&index| &self.tracks[index])
    }

    /// First track in catalog order (the default loop)
    pub fn first(&self) -> Option<&Track> {
        self.tracks.first()
    }

    /// Next track after `id` in catalog order, wrapping at the end
    ///
    /// Unknown ids (e.g. a synthetic `custom:` id engaged by an
    /// override) are treated as position zero, so "next" lands on the
    /// second catalog entry.
    pub fn next_after(&self, id: &str) -> Option<&Track> {
        if self.tracks.is_empty() {
            return None;
        }
        let index = self.by_id.get(id).copied().unwrap_or(0);
        Some(&self.tracks[(index + 1) % self.tracks.len()])
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Iterate tracks in catalog order
    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }
}
