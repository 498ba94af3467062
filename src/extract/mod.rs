//! Feature extraction
//!
//! Walks a [`MusicDocument`] and flattens it into a table of [`EventRow`]s:
//! notes, grace notes and expressive features, each with a quantized beat /
//! position, a duration in canonical time steps and the time in seconds.
//!
//! System-level features are scraped once and repeated on every kept track.
//! Drum tracks and tracks whose program has no instrument class are skipped.

pub mod staff;
pub mod system;
pub mod text;

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::encoding::{Encoding, EventType, RESOLUTION};
use crate::models::MusicDocument;

/// Value column of an event row
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventValue {
    /// MIDI pitch of a note or grace note
    Pitch(i64),
    /// Cleaned expressive-feature label
    Label(String),
}

impl fmt::Display for EventValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventValue::Pitch(pitch) => write!(f, "{}", pitch),
            EventValue::Label(label) => f.write_str(label),
        }
    }
}

/// One row of the flat event table
#[derive(Debug, Clone, PartialEq)]
pub struct EventRow {
    pub event_type: EventType,
    pub beat: i64,
    /// Position within the beat, in canonical time steps
    pub position: i64,
    pub value: EventValue,
    /// Duration in canonical time steps
    pub duration: i64,
    /// General MIDI program of the track
    pub instrument: i64,
    /// Time in document time steps
    pub time: i64,
    pub time_seconds: f64,
}

/// Extraction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Give duration-less features the time until the next one of their kind
    pub use_implied_duration: bool,
    /// Minimum number of marks in an articulation chunk
    pub articulation_count_threshold: usize,
    /// Largest gap (in beats) between marks of one articulation chunk
    pub articulation_max_gap_beats: i64,
    /// Shortest slur or pedal that is kept
    pub minimum_span_seconds: f64,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            use_implied_duration: true,
            articulation_count_threshold: 4,
            articulation_max_gap_beats: 2,
            minimum_span_seconds: 1.5,
        }
    }
}

/// An event before quantization, in document time steps
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedEvent {
    pub event_type: EventType,
    pub time: i64,
    pub duration: i64,
    pub value: EventValue,
}

/// Flatten a document into an event table
///
/// Rows are stably sorted by `(time, type code, instrument code)` using the
/// registry's codes, then `beat`, `time` and `time_seconds` are rebased so the
/// first row starts at zero. Track order in the document does not affect the
/// row order. A document with a non-positive resolution yields no rows.
pub fn extract(document: &MusicDocument, encoding: &Encoding, config: &ExtractConfig) -> Vec<EventRow> {
    let resolution = document.resolution;
    if resolution <= 0 {
        log::warn!("cannot extract from a document with resolution {}", resolution);
        return Vec::new();
    }
    let tempo_map = document.tempo_map();
    let system_events = system::scrape_system(document, config);

    let mut rows: Vec<EventRow> = Vec::new();
    for (index, track) in document.tracks.iter().enumerate() {
        let program = match track.program {
            Some(program) if !track.is_drum && encoding.is_known_program(program) => program,
            _ => {
                log::debug!(
                    "skipping track {} (program {:?}, drum: {})",
                    index,
                    track.program,
                    track.is_drum
                );
                continue;
            }
        };

        let staff_events = staff::scrape_staff(track, document, &tempo_map, config);
        let mut seen: HashSet<(EventType, i64, i64, EventValue)> = HashSet::new();

        for event in system_events.iter().cloned().chain(staff_events) {
            let beat = event.time.div_euclid(resolution);
            let position = (event.time.rem_euclid(resolution) * RESOLUTION).div_euclid(resolution);
            if !seen.insert((event.event_type, beat, position, event.value.clone())) {
                continue;
            }
            rows.push(EventRow {
                event_type: event.event_type,
                beat,
                position,
                value: event.value,
                duration: event.duration.saturating_mul(RESOLUTION).div_euclid(resolution),
                instrument: program,
                time: event.time,
                time_seconds: tempo_map.absolute_time(event.time),
            });
        }
    }

    rows.sort_by_key(|row| {
        (row.time, encoding.type_code(row.event_type), encoding.instrument_code(row.instrument))
    });
    rebase(&mut rows);
    rows
}

/// Shift beats and times so the first row sits at zero
fn rebase(rows: &mut [EventRow]) {
    let Some(first) = rows.first() else {
        return;
    };
    let (beat, time, seconds) = (first.beat, first.time, first.time_seconds);
    for row in rows.iter_mut() {
        row.beat -= beat;
        row.time -= time;
        row.time_seconds -= seconds;
    }
}
