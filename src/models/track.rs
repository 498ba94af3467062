//! A single instrument staff

use serde::{Deserialize, Serialize};

use super::annotations::Annotation;
use super::events::{Dated, Lyric, Note};
use super::serde_helpers::{null_as_default, null_as_empty};

/// Notes and staff-level annotations for one instrument
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct Track {
    /// General MIDI program number
    pub program: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_drum: bool,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub notes: Vec<Note>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub lyrics: Vec<Lyric>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub annotations: Vec<Annotation>,
}

impl Track {
    pub fn new(program: i64) -> Self {
        Self { program: Some(program), ..Self::default() }
    }

    /// Latest end time of anything on this track
    pub fn end(&self) -> i64 {
        let notes = self.notes.iter().map(Dated::end);
        let lyrics = self.lyrics.iter().map(Dated::end);
        let annotations = self.annotations.iter().map(Dated::end);
        notes.chain(lyrics).chain(annotations).max().unwrap_or(0)
    }

    pub(crate) fn sort_by_time(&mut self) {
        self.notes.sort_by_key(|note| note.time);
        self.lyrics.sort_by_key(|lyric| lyric.time);
        self.annotations.sort_by_key(|annotation| annotation.time);
    }
}
