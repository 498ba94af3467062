//! The encoding registry: dimension order and every code map
//!
//! An [`Encoding`] is built once (from the default vocabulary or from a JSON /
//! YAML file) and then only read. Beat, position, duration and pitch codes are
//! arithmetic (`x + 1`, with `0` reserved for "none"); the remaining
//! dimensions go through string-keyed [`CodeMap`]s that serialize as plain
//! `label -> code` objects.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use super::vocabulary::{default_value_labels, program_instrument, DEFAULT_VALUE};
use crate::error::EncodingError;

/// Canonical time steps per quarter note
pub const RESOLUTION: i64 = 12;

/// Largest beat that can be encoded
pub const MAX_BEAT: i64 = 1024;

/// Largest duration (in canonical time steps) that can be encoded
pub const MAX_DURATION: i64 = 384;

/// Number of pitch codes (MIDI pitches 0..=127)
pub const PITCH_COUNT: i64 = 128;

/// Columns of a code row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Type,
    Beat,
    Position,
    Value,
    Duration,
    Instrument,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::Type,
        Dimension::Beat,
        Dimension::Position,
        Dimension::Value,
        Dimension::Duration,
        Dimension::Instrument,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Dimension::Type => "type",
            Dimension::Beat => "beat",
            Dimension::Position => "position",
            Dimension::Value => "value",
            Dimension::Duration => "duration",
            Dimension::Instrument => "instrument",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// Row kinds, listed in default code order
///
/// The code order doubles as the tie break between simultaneous events, so
/// expressive features sort ahead of grace notes, which sort ahead of notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventType {
    StartOfSong,
    Instrument,
    StartOfNotes,
    ExpressiveFeature,
    GraceNote,
    Note,
    EndOfSong,
}

impl EventType {
    pub const ALL: [EventType; 7] = [
        EventType::StartOfSong,
        EventType::Instrument,
        EventType::StartOfNotes,
        EventType::ExpressiveFeature,
        EventType::GraceNote,
        EventType::Note,
        EventType::EndOfSong,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            EventType::StartOfSong => "start-of-song",
            EventType::Instrument => "instrument",
            EventType::StartOfNotes => "start-of-notes",
            EventType::ExpressiveFeature => "expressive-feature",
            EventType::GraceNote => "grace-note",
            EventType::Note => "note",
            EventType::EndOfSong => "end-of-song",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.label() == label)
    }

    /// Note or grace note
    pub fn is_note(&self) -> bool {
        matches!(self, EventType::Note | EventType::GraceNote)
    }

    /// Rows that carry data (as opposed to control and instrument rows)
    pub fn is_core(&self) -> bool {
        matches!(self, EventType::ExpressiveFeature | EventType::GraceNote | EventType::Note)
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// Bidirectional `label <-> code` map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodeMap {
    codes: BTreeMap<String, i64>,
    labels: BTreeMap<i64, String>,
}

impl CodeMap {
    /// Assign consecutive codes starting at `first_code`, in iteration order
    pub fn from_labels<I, S>(labels: I, first_code: i64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut map = CodeMap::default();
        let mut next = first_code;
        for label in labels {
            let label = label.into();
            if map.codes.contains_key(&label) {
                continue;
            }
            map.labels.insert(next, label.clone());
            map.codes.insert(label, next);
            next += 1;
        }
        map
    }

    pub fn code(&self, label: &str) -> Option<i64> {
        self.codes.get(label).copied()
    }

    pub fn label(&self, code: i64) -> Option<&str> {
        self.labels.get(&code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Entries in code order
    pub fn iter(&self) -> impl Iterator<Item = (i64, &str)> {
        self.labels.iter().map(|(code, label)| (*code, label.as_str()))
    }
}

impl From<BTreeMap<String, i64>> for CodeMap {
    fn from(codes: BTreeMap<String, i64>) -> Self {
        let labels = codes.iter().map(|(label, code)| (*code, label.clone())).collect();
        Self { codes, labels }
    }
}

impl From<CodeMap> for BTreeMap<String, i64> {
    fn from(map: CodeMap) -> Self {
        map.codes
    }
}

impl Serialize for CodeMap {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.codes.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CodeMap {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        BTreeMap::<String, i64>::deserialize(deserializer).map(CodeMap::from)
    }
}

/// On-disk shape of an encoding
#[derive(Serialize, Deserialize, Clone)]
struct EncodingRecord {
    dimensions: Vec<String>,
    max_beat: i64,
    max_duration: i64,
    type_code_map: CodeMap,
    /// Expressive-feature labels only; pitch codes are arithmetic
    value_code_map: CodeMap,
    instrument_code_map: CodeMap,
    program_instrument_map: BTreeMap<i64, String>,
}

/// Immutable vocabulary shared by extraction, encoding and decoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EncodingRecord", into = "EncodingRecord")]
pub struct Encoding {
    dimensions: Vec<Dimension>,
    /// Position of each `Dimension::ALL` entry within a row
    columns: [usize; 6],
    max_beat: i64,
    max_duration: i64,
    type_code_map: CodeMap,
    type_codes: [i64; 7],
    value_code_map: CodeMap,
    instrument_code_map: CodeMap,
    program_instrument_map: BTreeMap<i64, String>,
}

impl TryFrom<EncodingRecord> for Encoding {
    type Error = EncodingError;

    fn try_from(record: EncodingRecord) -> Result<Self, Self::Error> {
        let mut dimensions = Vec::with_capacity(Dimension::ALL.len());
        let mut columns = [0usize; 6];
        for dimension in Dimension::ALL {
            let positions: Vec<usize> = record
                .dimensions
                .iter()
                .enumerate()
                .filter(|(_, name)| name.as_str() == dimension.name())
                .map(|(position, _)| position)
                .collect();
            match positions.as_slice() {
                [] => return Err(EncodingError::MissingDimension(dimension.name())),
                [position] => columns[dimension.index()] = *position,
                _ => return Err(EncodingError::DuplicateDimension(dimension.name().to_string())),
            }
        }
        if record.dimensions.len() != Dimension::ALL.len() {
            return Err(EncodingError::Shape { expected: Dimension::ALL.len(), found: record.dimensions.len() });
        }
        for name in &record.dimensions {
            if let Some(dimension) = Dimension::ALL.into_iter().find(|d| d.name() == name) {
                dimensions.push(dimension);
            }
        }

        let mut type_codes = [0i64; 7];
        for kind in EventType::ALL {
            type_codes[kind.index()] =
                record.type_code_map.code(kind.label()).ok_or(EncodingError::MissingType(kind.label()))?;
        }

        Ok(Self {
            dimensions,
            columns,
            max_beat: record.max_beat.max(0),
            max_duration: record.max_duration.max(0),
            type_code_map: record.type_code_map,
            type_codes,
            value_code_map: record.value_code_map,
            instrument_code_map: record.instrument_code_map,
            program_instrument_map: record.program_instrument_map,
        })
    }
}

impl From<Encoding> for EncodingRecord {
    fn from(encoding: Encoding) -> Self {
        Self {
            dimensions: encoding.dimensions.iter().map(|d| d.name().to_string()).collect(),
            max_beat: encoding.max_beat,
            max_duration: encoding.max_duration,
            type_code_map: encoding.type_code_map,
            value_code_map: encoding.value_code_map,
            instrument_code_map: encoding.instrument_code_map,
            program_instrument_map: encoding.program_instrument_map,
        }
    }
}

impl Default for Encoding {
    /// The canonical vocabulary
    fn default() -> Self {
        let program_instrument_map: BTreeMap<i64, String> = (0..128)
            .filter_map(|program| program_instrument(program).map(|class| (program, class.to_string())))
            .collect();
        // classes keep the order in which programs first reach them
        let instrument_code_map = CodeMap::from_labels(program_instrument_map.values().cloned(), 1);

        let type_code_map = CodeMap::from_labels(EventType::ALL.iter().map(EventType::label), 0);
        let mut type_codes = [0i64; 7];
        for (code, kind) in EventType::ALL.iter().enumerate() {
            type_codes[kind.index()] = code as i64;
        }

        Self {
            dimensions: Dimension::ALL.to_vec(),
            columns: [0, 1, 2, 3, 4, 5],
            max_beat: MAX_BEAT,
            max_duration: MAX_DURATION,
            type_code_map,
            type_codes,
            value_code_map: CodeMap::from_labels(default_value_labels(), PITCH_COUNT + 1),
            instrument_code_map,
            program_instrument_map,
        }
    }
}

fn is_yaml_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
}

impl Encoding {
    /// Load an encoding from JSON, or YAML when the extension is `.yaml` / `.yml`
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EncodingError> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let encoding = if is_yaml_path(path) {
            serde_yaml::from_reader(reader)?
        } else {
            serde_json::from_reader(reader)?
        };
        Ok(encoding)
    }

    /// Save this encoding as JSON, or YAML when the extension asks for it
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), EncodingError> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        if is_yaml_path(path) {
            serde_yaml::to_writer(&mut writer, self)?;
        } else {
            serde_json::to_writer_pretty(&mut writer, self)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Dimension names in column order
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Column index of a dimension
    pub fn column(&self, dimension: Dimension) -> usize {
        self.columns[dimension.index()]
    }

    /// Lay out fields given in `Dimension::ALL` order as a row in column order
    pub fn row(&self, fields: [i64; 6]) -> [i64; 6] {
        let mut row = [0i64; 6];
        for dimension in Dimension::ALL {
            row[self.column(dimension)] = fields[dimension.index()];
        }
        row
    }

    /// Inverse of [`Encoding::row`]
    pub fn fields(&self, row: &[i64; 6]) -> [i64; 6] {
        let mut fields = [0i64; 6];
        for dimension in Dimension::ALL {
            fields[dimension.index()] = row[self.column(dimension)];
        }
        fields
    }

    pub fn max_beat(&self) -> i64 {
        self.max_beat
    }

    pub fn max_duration(&self) -> i64 {
        self.max_duration
    }

    pub fn type_code(&self, kind: EventType) -> i64 {
        self.type_codes[kind.index()]
    }

    pub fn event_type(&self, code: i64) -> Option<EventType> {
        self.type_code_map.label(code).and_then(EventType::from_label)
    }

    /// Beat code, or `None` past `max_beat`
    pub fn beat_code(&self, beat: i64) -> Option<i64> {
        (0..=self.max_beat).contains(&beat).then_some(beat + 1)
    }

    pub fn beat(&self, code: i64) -> Option<i64> {
        (1..=self.max_beat + 1).contains(&code).then_some(code - 1)
    }

    pub fn position_code(&self, position: i64) -> Option<i64> {
        (0..RESOLUTION).contains(&position).then_some(position + 1)
    }

    pub fn position(&self, code: i64) -> Option<i64> {
        (1..=RESOLUTION).contains(&code).then_some(code - 1)
    }

    /// Duration code, clamping into `[0, max_duration]`
    pub fn duration_code(&self, duration: i64) -> i64 {
        duration.clamp(0, self.max_duration) + 1
    }

    pub fn duration(&self, code: i64) -> Option<i64> {
        (1..=self.max_duration + 1).contains(&code).then_some(code - 1)
    }

    pub fn pitch_code(&self, pitch: i64) -> Option<i64> {
        (0..PITCH_COUNT).contains(&pitch).then_some(pitch + 1)
    }

    /// Pitch for a value code in the pitch range
    pub fn pitch(&self, code: i64) -> Option<i64> {
        (1..=PITCH_COUNT).contains(&code).then_some(code - 1)
    }

    /// Code for an expressive-feature label
    ///
    /// Tries the label as is, then without hyphens and with accents folded,
    /// and finally falls back to the default-value code. An empty label is
    /// the "none" code.
    pub fn label_code(&self, label: &str) -> i64 {
        if label.is_empty() {
            return 0;
        }
        if let Some(code) = self.value_code_map.code(label) {
            return code;
        }
        let folded: String = label.replace('-', "").nfkd().filter(|c| !is_combining_mark(*c)).collect();
        if let Some(code) = self.value_code_map.code(&folded) {
            return code;
        }
        log::debug!("value `{}` not in vocabulary, using default", label);
        self.default_value_code()
    }

    pub fn label(&self, code: i64) -> Option<&str> {
        self.value_code_map.label(code)
    }

    pub fn default_value_code(&self) -> i64 {
        self.value_code_map.code(DEFAULT_VALUE).unwrap_or(0)
    }

    /// Expressive-feature labels in code order
    pub fn value_labels(&self) -> impl Iterator<Item = &str> {
        self.value_code_map.iter().map(|(_, label)| label)
    }

    /// Instrument class for a General MIDI program
    pub fn instrument_class(&self, program: i64) -> Option<&str> {
        self.program_instrument_map.get(&program).map(String::as_str)
    }

    /// True for programs that map to a class with a code
    pub fn is_known_program(&self, program: i64) -> bool {
        self.instrument_code(program).is_some()
    }

    pub fn instrument_code(&self, program: i64) -> Option<i64> {
        self.instrument_class(program).and_then(|class| self.instrument_code_map.code(class))
    }

    /// Lowest program belonging to the class behind an instrument code
    pub fn instrument_program(&self, code: i64) -> Option<i64> {
        let class = self.instrument_code_map.label(code)?;
        self.program_instrument_map
            .iter()
            .find(|(_, candidate)| candidate.as_str() == class)
            .map(|(program, _)| *program)
    }

    pub fn instrument_name(&self, code: i64) -> Option<&str> {
        self.instrument_code_map.label(code)
    }
}
