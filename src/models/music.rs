//! The music document: a time-indexed, multi-track container
//!
//! # Invariants
//!
//! - `resolution > 0`
//! - point-event lists are ordered by time, and tempos, key signatures and
//!   time signatures hold at most one entry per time (the last one written wins)
//! - `song_length` is the latest `time + duration` of anything in the document,
//!   so after any trim every interval lies inside `[0, song_length]`
//!
//! Fields are public so a parser can fill them in directly; call
//! [`MusicDocument::normalize`] afterwards to restore the invariants.

use serde::{Deserialize, Serialize};

use super::annotations::Annotation;
use super::events::{Barline, Beat, Dated, KeySignature, Lyric, Metadata, Tempo, TimeSignature};
use super::serde_helpers::{null_as_default, null_as_empty};
use super::track::Track;
use crate::error::DocumentError;

/// Time steps per quarter note used when a producer does not say otherwise
pub const DEFAULT_RESOLUTION: i64 = 24;

/// A complete symbolic score
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(try_from = "DocumentRecord")]
pub struct MusicDocument {
    pub metadata: Metadata,
    /// Time steps per quarter note
    pub resolution: i64,
    pub tempos: Vec<Tempo>,
    pub key_signatures: Vec<KeySignature>,
    pub time_signatures: Vec<TimeSignature>,
    pub beats: Vec<Beat>,
    pub barlines: Vec<Barline>,
    pub lyrics: Vec<Lyric>,
    /// System-level (document-wide) annotations
    pub annotations: Vec<Annotation>,
    pub tracks: Vec<Track>,
    song_length: i64,
}

/// On-disk shape of a document; `song_length` is always recomputed
#[derive(Deserialize)]
struct DocumentRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    metadata: Metadata,
    #[serde(default = "default_resolution")]
    resolution: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    tempos: Vec<Tempo>,
    #[serde(default, deserialize_with = "null_as_empty")]
    key_signatures: Vec<KeySignature>,
    #[serde(default, deserialize_with = "null_as_empty")]
    time_signatures: Vec<TimeSignature>,
    #[serde(default, deserialize_with = "null_as_empty")]
    beats: Vec<Beat>,
    #[serde(default, deserialize_with = "null_as_empty")]
    barlines: Vec<Barline>,
    #[serde(default, deserialize_with = "null_as_empty")]
    lyrics: Vec<Lyric>,
    #[serde(default, deserialize_with = "null_as_empty")]
    annotations: Vec<Annotation>,
    #[serde(default, deserialize_with = "null_as_empty")]
    tracks: Vec<Track>,
}

fn default_resolution() -> i64 {
    DEFAULT_RESOLUTION
}

impl TryFrom<DocumentRecord> for MusicDocument {
    type Error = DocumentError;

    fn try_from(record: DocumentRecord) -> Result<Self, Self::Error> {
        let mut document = MusicDocument::new(record.resolution)?;
        document.metadata = record.metadata;
        document.tempos = record.tempos;
        document.key_signatures = record.key_signatures;
        document.time_signatures = record.time_signatures;
        document.beats = record.beats;
        document.barlines = record.barlines;
        document.lyrics = record.lyrics;
        document.annotations = record.annotations;
        document.tracks = record.tracks;
        document.normalize();
        Ok(document)
    }
}

impl Default for MusicDocument {
    fn default() -> Self {
        Self {
            metadata: Metadata::default(),
            resolution: DEFAULT_RESOLUTION,
            tempos: Vec::new(),
            key_signatures: Vec::new(),
            time_signatures: Vec::new(),
            beats: Vec::new(),
            barlines: Vec::new(),
            lyrics: Vec::new(),
            annotations: Vec::new(),
            tracks: Vec::new(),
            song_length: 0,
        }
    }
}

impl MusicDocument {
    /// Create an empty document
    pub fn new(resolution: i64) -> Result<Self, DocumentError> {
        if resolution <= 0 {
            return Err(DocumentError::InvalidResolution(resolution));
        }
        Ok(Self { resolution, ..Self::default() })
    }

    /// Length of the song in time steps
    pub fn song_length(&self) -> i64 {
        self.song_length
    }

    /// Sort every timeline, collapse same-time tempo / key / meter entries
    /// (last one wins) and recompute `song_length`
    pub fn normalize(&mut self) {
        self.tempos = last_per_time(std::mem::take(&mut self.tempos));
        self.key_signatures = last_per_time(std::mem::take(&mut self.key_signatures));
        self.time_signatures = last_per_time(std::mem::take(&mut self.time_signatures));
        self.beats.sort_by_key(|beat| beat.time);
        self.barlines.sort_by_key(|barline| barline.time);
        self.lyrics.sort_by_key(|lyric| lyric.time);
        self.annotations.sort_by_key(|annotation| annotation.time);
        for track in &mut self.tracks {
            track.sort_by_time();
        }
        self.update_song_length();
    }

    /// Recompute `song_length` from the current content
    pub fn update_song_length(&mut self) {
        self.song_length = self.compute_song_length();
    }

    fn compute_song_length(&self) -> i64 {
        let system = [
            latest_end(&self.tempos),
            latest_end(&self.key_signatures),
            latest_end(&self.time_signatures),
            latest_end(&self.beats),
            latest_end(&self.barlines),
            latest_end(&self.lyrics),
            latest_end(&self.annotations),
        ];
        let tracks = self.tracks.iter().map(Track::end);
        system.into_iter().chain(tracks).max().unwrap_or(0)
    }

    /// Keep only content in `[start, end)`, clamping durations at `end`
    ///
    /// An `end` before `start` means "to the end of the song". Times are not
    /// shifted.
    pub fn trim(&mut self, start: i64, end: i64) {
        let end = if end < start { self.song_length } else { end };

        self.tempos = window(&self.tempos, start, end);
        self.key_signatures = window(&self.key_signatures, start, end);
        self.time_signatures = window(&self.time_signatures, start, end);
        self.beats = window(&self.beats, start, end);
        self.barlines = window(&self.barlines, start, end);
        self.lyrics = window(&self.lyrics, start, end);
        self.annotations = window(&self.annotations, start, end);

        self.tracks = self
            .tracks
            .iter()
            .map(|track| Track {
                notes: window(&track.notes, start, end),
                lyrics: window(&track.lyrics, start, end),
                annotations: window(&track.annotations, start, end),
                ..track.clone()
            })
            .collect();

        self.update_song_length();
    }
}

fn latest_end<T: Dated>(items: &[T]) -> i64 {
    items.iter().map(Dated::end).max().unwrap_or(0)
}

/// Rebuild a collection from the items that start inside `[start, end)`
fn window<T: Dated>(items: &[T], start: i64, end: i64) -> Vec<T> {
    items
        .iter()
        .filter(|item| start <= item.time() && item.time() < end)
        .map(|item| item.clamped(end))
        .collect()
}

/// Stable-sort by time and keep only the last entry written for each time
fn last_per_time<T: Dated>(mut items: Vec<T>) -> Vec<T> {
    items.sort_by_key(Dated::time);
    let mut kept: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        match kept.last_mut() {
            Some(last) if last.time() == item.time() => *last = item,
            _ => kept.push(item),
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnnotationPayload, Note};

    fn sample() -> MusicDocument {
        let mut document = MusicDocument::new(4).unwrap();
        document.tempos = vec![Tempo::new(0, 120.0), Tempo::new(8, 90.0)];
        let mut track = Track::new(0);
        track.notes = vec![Note::new(0, 60, 4, 64), Note::new(6, 62, 10, 64)];
        track.annotations = vec![Annotation::new(2, AnnotationPayload::SlurSpanner { duration: 12, is_slur: true })];
        document.tracks.push(track);
        document.normalize();
        document
    }

    #[test]
    fn test_rejects_non_positive_resolution() {
        assert!(matches!(MusicDocument::new(0), Err(DocumentError::InvalidResolution(0))));
    }

    #[test]
    fn test_song_length_includes_annotation_duration() {
        let document = sample();
        // last note ends at 16, after the slur (2 + 12)
        assert_eq!(document.song_length(), 16);

        let mut document = document;
        document.tracks[0].annotations[0] =
            Annotation::new(2, AnnotationPayload::SlurSpanner { duration: 30, is_slur: true });
        document.update_song_length();
        assert_eq!(document.song_length(), 32);
    }

    #[test]
    fn test_same_time_tempos_keep_last() {
        let mut document = MusicDocument::new(4).unwrap();
        document.tempos = vec![Tempo::new(4, 100.0), Tempo::new(0, 80.0), Tempo::new(4, 140.0)];
        document.normalize();
        assert_eq!(document.tempos.len(), 2);
        assert_eq!(document.tempos[0].qpm, Some(80.0));
        assert_eq!(document.tempos[1].qpm, Some(140.0));
    }

    #[test]
    fn test_trim_clips_and_recomputes_length() {
        let mut document = sample();
        document.trim(0, 8);

        assert_eq!(document.tempos.len(), 1);
        let track = &document.tracks[0];
        assert_eq!(track.notes.len(), 2);
        assert_eq!(track.notes[1].duration, 2);
        assert_eq!(track.annotations[0].annotation.duration(), Some(6));
        assert_eq!(document.song_length(), 8);
        for note in &track.notes {
            assert!(note.time + note.duration <= document.song_length());
        }
    }

    #[test]
    fn test_trim_with_end_before_start_runs_to_song_end() {
        let mut document = sample();
        document.trim(4, -1);
        assert_eq!(document.tracks[0].notes.len(), 1);
        assert_eq!(document.tracks[0].notes[0].pitch, 62);
        assert!(document.tracks[0].annotations.is_empty());
        assert_eq!(document.song_length(), 16);
    }
}
