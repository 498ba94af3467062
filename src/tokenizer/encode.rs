//! Event table -> code matrix

use std::cmp::Ordering;
use std::collections::BTreeSet;

use super::{CodeRow, Codes, Conditioning, EncodeOptions};
use crate::encoding::{Encoding, EventType};
use crate::extract::{EventRow, EventValue};

/// A core row with the keys conditioning sorts on
struct CoreRow {
    kind: EventType,
    type_code: i64,
    time: i64,
    seconds: f64,
    /// Fields in `Dimension::ALL` order
    fields: [i64; 6],
}

fn control_row(encoding: &Encoding, kind: EventType) -> CodeRow {
    encoding.row([encoding.type_code(kind), 0, 0, 0, 0, 0])
}

/// Map one event row through the vocabulary; `None` when it must be dropped
fn encode_row(row: &EventRow, encoding: &Encoding) -> Option<CoreRow> {
    let Some(beat) = encoding.beat_code(row.beat.max(0)) else {
        log::debug!("dropping {:?} row at beat {} (max beat {})", row.event_type, row.beat, encoding.max_beat());
        return None;
    };
    let Some(instrument) = encoding.instrument_code(row.instrument) else {
        log::debug!("dropping {:?} row with unknown program {}", row.event_type, row.instrument);
        return None;
    };
    let Some(position) = encoding.position_code(row.position.max(0)) else {
        log::debug!("dropping {:?} row at invalid position {}", row.event_type, row.position);
        return None;
    };
    let value = match &row.value {
        EventValue::Pitch(pitch) => encoding.pitch_code(*pitch).unwrap_or_else(|| {
            log::debug!("pitch {} out of range, using default value", pitch);
            encoding.default_value_code()
        }),
        EventValue::Label(label) => encoding.label_code(label),
    };
    let type_code = encoding.type_code(row.event_type);

    Some(CoreRow {
        kind: row.event_type,
        type_code,
        time: row.time,
        seconds: row.time_seconds,
        fields: [type_code, beat, position, value, encoding.duration_code(row.duration), instrument],
    })
}

impl CoreRow {
    fn instrument(&self) -> i64 {
        self.fields[5]
    }
}

fn by_time_type_instrument(a: &CoreRow, b: &CoreRow) -> Ordering {
    a.time
        .cmp(&b.time)
        .then(a.type_code.cmp(&b.type_code))
        .then(a.instrument().cmp(&b.instrument()))
}

/// Encode an event table into a code matrix
///
/// Rows past the maximum beat or with an unknown instrument are dropped
/// without error. Output length is `3 + instruments + core rows`, plus one
/// under prefix conditioning.
pub fn encode(rows: &[EventRow], encoding: &Encoding, options: &EncodeOptions) -> Codes {
    let mut core: Vec<CoreRow> = rows.iter().filter_map(|row| encode_row(row, encoding)).collect();
    if core.len() < rows.len() {
        log::debug!("dropped {} of {} rows while encoding", rows.len() - core.len(), rows.len());
    }

    let instruments: BTreeSet<i64> = core.iter().map(CoreRow::instrument).collect();

    let mut codes: Codes = Vec::with_capacity(core.len() + instruments.len() + 4);
    codes.push(control_row(encoding, EventType::StartOfSong));
    for instrument in instruments {
        codes.push(encoding.row([encoding.type_code(EventType::Instrument), 0, 0, 0, 0, instrument]));
    }
    codes.push(control_row(encoding, EventType::StartOfNotes));

    match options.conditioning {
        Conditioning::Sort => {
            core.sort_by(by_time_type_instrument);
            codes.extend(core.iter().map(|row| encoding.row(row.fields)));
        }
        Conditioning::Prefix => {
            let (mut features, mut notes): (Vec<CoreRow>, Vec<CoreRow>) =
                core.into_iter().partition(|row| row.kind == EventType::ExpressiveFeature);
            features.sort_by_key(|row| (row.time, row.instrument()));
            notes.sort_by(by_time_type_instrument);
            codes.extend(features.iter().map(|row| encoding.row(row.fields)));
            codes.push(control_row(encoding, EventType::StartOfNotes));
            codes.extend(notes.iter().map(|row| encoding.row(row.fields)));
        }
        Conditioning::Anticipation => {
            let sigma = options.sigma;
            let key = |row: &CoreRow| {
                if row.kind == EventType::ExpressiveFeature {
                    row.seconds - sigma
                } else {
                    row.seconds
                }
            };
            core.sort_by(|a, b| {
                key(a)
                    .total_cmp(&key(b))
                    .then(a.type_code.cmp(&b.type_code))
                    .then(a.instrument().cmp(&b.instrument()))
            });
            codes.extend(core.iter().map(|row| encoding.row(row.fields)));
        }
    }

    codes.push(control_row(encoding, EventType::EndOfSong));
    codes
}
