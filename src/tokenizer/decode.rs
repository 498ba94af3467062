//! Code matrix -> music document
//!
//! Sequences coming out of a model can contain anything, so decoding never
//! fails: rows it cannot interpret are logged and skipped.

use std::collections::HashMap;

use super::CodeRow;
use crate::encoding::{Dimension, Encoding, EventType, RESOLUTION};
use crate::models::{Annotation, AnnotationPayload, MusicDocument, Note, Track, DEFAULT_VELOCITY};

/// Tracks created so far, keyed by instrument code
struct TrackTable {
    by_instrument: HashMap<i64, usize>,
}

impl TrackTable {
    /// Index of the track for `instrument`, creating it on first use
    fn track(&mut self, document: &mut MusicDocument, encoding: &Encoding, instrument: i64) -> Option<usize> {
        if let Some(index) = self.by_instrument.get(&instrument) {
            return Some(*index);
        }
        let program = encoding.instrument_program(instrument)?;
        let mut track = Track::new(program);
        track.name = encoding.instrument_name(instrument).map(str::to_string);
        document.tracks.push(track);
        let index = document.tracks.len() - 1;
        self.by_instrument.insert(instrument, index);
        Some(index)
    }
}

/// Decode a code matrix into a document at the canonical resolution
///
/// Notes are placed at `beat * RESOLUTION + position` with the default
/// velocity; expressive features become text spanners carrying their label
/// and duration. Decoding stops at the first end-of-song row.
pub fn decode(codes: &[CodeRow], encoding: &Encoding) -> MusicDocument {
    let mut document = MusicDocument::default();
    document.resolution = RESOLUTION;
    let mut tracks = TrackTable { by_instrument: HashMap::new() };
    let mut in_notes = false;

    let field = |row: &CodeRow, dimension: Dimension| row[encoding.column(dimension)];

    for (index, row) in codes.iter().enumerate() {
        let type_code = field(row, Dimension::Type);
        let Some(kind) = encoding.event_type(type_code) else {
            log::warn!("row {}: unknown type code {}, skipping", index, type_code);
            continue;
        };

        match kind {
            EventType::StartOfSong => {}
            EventType::EndOfSong => break,
            EventType::StartOfNotes => in_notes = true,
            EventType::Instrument => {
                let instrument = field(row, Dimension::Instrument);
                if tracks.track(&mut document, encoding, instrument).is_none() {
                    log::warn!("row {}: unknown instrument code {}, skipping", index, instrument);
                }
            }
            EventType::ExpressiveFeature | EventType::GraceNote | EventType::Note => {
                if !in_notes {
                    log::warn!("row {}: {:?} before start-of-notes, skipping", index, kind);
                    continue;
                }
                decode_core_row(&mut document, &mut tracks, encoding, kind, row, index);
            }
        }
    }

    document.normalize();
    document
}

fn decode_core_row(
    document: &mut MusicDocument,
    tracks: &mut TrackTable,
    encoding: &Encoding,
    kind: EventType,
    row: &CodeRow,
    index: usize,
) {
    let [_, beat_code, position_code, value_code, duration_code, instrument_code] = encoding.fields(row);

    let Some(beat) = encoding.beat(beat_code) else {
        log::warn!("row {}: invalid beat code {}, skipping", index, beat_code);
        return;
    };
    let Some(position) = encoding.position(position_code) else {
        log::warn!("row {}: invalid position code {}, skipping", index, position_code);
        return;
    };
    let Some(duration) = encoding.duration(duration_code) else {
        log::warn!("row {}: invalid duration code {}, skipping", index, duration_code);
        return;
    };
    let Some(track) = tracks.track(document, encoding, instrument_code) else {
        log::warn!("row {}: unknown instrument code {}, skipping", index, instrument_code);
        return;
    };
    let time = beat * RESOLUTION + position;

    if kind.is_note() {
        let Some(pitch) = encoding.pitch(value_code) else {
            log::warn!("row {}: value code {} is not a pitch, skipping", index, value_code);
            return;
        };
        let note = if kind == EventType::GraceNote {
            Note::grace(time, pitch, duration, DEFAULT_VELOCITY)
        } else {
            Note::new(time, pitch, duration, DEFAULT_VELOCITY)
        };
        document.tracks[track].notes.push(note);
    } else {
        let Some(label) = encoding.label(value_code) else {
            log::warn!("row {}: value code {} is not a feature label, skipping", index, value_code);
            return;
        };
        let payload = AnnotationPayload::TextSpanner { duration, text: label.to_string(), is_system: false };
        document.tracks[track].annotations.push(Annotation::new(time, payload));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::{encode, EncodeOptions};
    use crate::extract::{EventRow, EventValue};

    #[test]
    fn test_decodes_notes_and_features() {
        let encoding = Encoding::default();
        let rows = vec![
            EventRow {
                event_type: EventType::ExpressiveFeature,
                beat: 0,
                position: 0,
                value: EventValue::Label("mf".into()),
                duration: 24,
                instrument: 0,
                time: 0,
                time_seconds: 0.0,
            },
            EventRow {
                event_type: EventType::Note,
                beat: 1,
                position: 6,
                value: EventValue::Pitch(67),
                duration: 6,
                instrument: 0,
                time: 18,
                time_seconds: 1.5,
            },
        ];
        let document = decode(&encode(&rows, &encoding, &EncodeOptions::default()), &encoding);

        assert_eq!(document.resolution, RESOLUTION);
        assert_eq!(document.tracks.len(), 1);
        let track = &document.tracks[0];
        assert_eq!(track.program, Some(0));
        assert_eq!(track.notes, vec![Note::new(18, 67, 6, DEFAULT_VELOCITY)]);
        assert_eq!(track.annotations[0].annotation.text(), Some("mf"));
        assert_eq!(track.annotations[0].annotation.duration(), Some(24));
    }

    #[test]
    fn test_garbage_rows_are_skipped() {
        let encoding = Encoding::default();
        let codes = vec![
            [0, 0, 0, 0, 0, 0],
            [1, 0, 0, 0, 0, 9999],
            [1, 0, 0, 0, 0, 1],
            [5, 1, 1, 61, 13, 1],
            [2, 0, 0, 0, 0, 0],
            [42, 1, 1, 61, 13, 1],
            [5, -3, 1, 61, 13, 1],
            [5, 1, 99, 61, 13, 1],
            [5, 1, 1, 61, 13, 777],
            [5, 1, 1, 400, 13, 1],
            [3, 1, 1, 61, 13, 1],
            [5, 2, 1, 65, 13, 1],
            [6, 0, 0, 0, 0, 0],
            [5, 3, 1, 65, 13, 1],
        ];
        let document = decode(&codes, &encoding);
        let notes = &document.tracks[0].notes;
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].time, 12);
        assert!(document.tracks[0].annotations.is_empty());
    }

    #[test]
    fn test_empty_sequence() {
        let document = decode(&[], &Encoding::default());
        assert_eq!(document.resolution, RESOLUTION);
        assert!(document.tracks.is_empty());
        assert_eq!(document.song_length(), 0);
    }
}
