//! Dated point events and notes
//!
//! Everything that lives on the document timeline carries a `time` in time
//! steps (`resolution` steps per quarter note). Optional fields mirror the
//! self-describing record format, where producers are free to write `null`.

use serde::{Deserialize, Serialize};

use super::serde_helpers::null_as_default;

/// Anything placed on the timeline
pub trait Dated: Clone {
    /// Onset in time steps
    fn time(&self) -> i64;

    /// Length in time steps; point events have none
    fn duration(&self) -> i64 {
        0
    }

    /// End of the occupied interval `[time, time + duration)`
    fn end(&self) -> i64 {
        self.time() + self.duration()
    }

    /// Copy of this item whose duration does not run past `end`
    fn clamped(&self, _end: i64) -> Self {
        self.clone()
    }
}

/// Score metadata
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Metadata {
    pub schema_version: Option<String>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub creators: Option<Vec<String>>,
    pub copyright: Option<String>,
    pub collection: Option<String>,
    pub source_filename: Option<String>,
    pub source_format: Option<String>,
}

/// Tempo change
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Tempo {
    pub time: i64,
    /// Quarter notes per minute
    pub qpm: Option<f64>,
    pub text: Option<String>,
    pub measure: Option<i64>,
}

impl Tempo {
    pub fn new(time: i64, qpm: f64) -> Self {
        Self { time, qpm: Some(qpm), text: None, measure: None }
    }
}

/// Key signature change
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct KeySignature {
    pub time: i64,
    pub root: Option<i64>,
    pub mode: Option<String>,
    /// Position on the circle of fifths (negative = flats)
    pub fifths: Option<i64>,
    pub root_str: Option<String>,
    pub measure: Option<i64>,
}

impl KeySignature {
    pub fn new(time: i64, fifths: i64) -> Self {
        Self { time, root: None, mode: None, fifths: Some(fifths), root_str: None, measure: None }
    }
}

/// Time signature change
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TimeSignature {
    pub time: i64,
    pub numerator: Option<i64>,
    pub denominator: Option<i64>,
    pub measure: Option<i64>,
}

impl TimeSignature {
    pub fn new(time: i64, numerator: i64, denominator: i64) -> Self {
        Self { time, numerator: Some(numerator), denominator: Some(denominator), measure: None }
    }

    /// Length of one measure in time steps at the given resolution
    pub fn measure_length(&self, resolution: i64) -> i64 {
        let numerator = self.numerator.filter(|n| *n > 0).unwrap_or(4);
        let denominator = self.denominator.filter(|d| *d > 0).unwrap_or(4);
        (resolution * 4 * numerator / denominator).max(1)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Beat {
    pub time: i64,
    pub is_downbeat: Option<bool>,
    pub measure: Option<i64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Barline {
    pub time: i64,
    /// e.g. "double", "end", "start-repeat"; `None` is a plain barline
    pub subtype: Option<String>,
    pub measure: Option<i64>,
}

impl Barline {
    pub fn new(time: i64, subtype: Option<&str>) -> Self {
        Self { time, subtype: subtype.map(str::to_string), measure: None }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Lyric {
    pub time: i64,
    pub lyric: Option<String>,
    pub measure: Option<i64>,
}

/// A sounding note (or grace note)
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Note {
    pub time: i64,
    /// MIDI pitch
    pub pitch: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub duration: i64,
    #[serde(default = "default_velocity", deserialize_with = "null_as_velocity")]
    pub velocity: i64,
    pub pitch_str: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_grace: bool,
    pub measure: Option<i64>,
}

/// Velocity given to notes that do not specify one
pub const DEFAULT_VELOCITY: i64 = 64;

fn default_velocity() -> i64 {
    DEFAULT_VELOCITY
}

fn null_as_velocity<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<i64>::deserialize(deserializer)?.unwrap_or(DEFAULT_VELOCITY))
}

impl Note {
    pub fn new(time: i64, pitch: i64, duration: i64, velocity: i64) -> Self {
        Self {
            time,
            pitch,
            duration,
            velocity,
            pitch_str: None,
            is_grace: false,
            measure: None,
        }
    }

    pub fn grace(time: i64, pitch: i64, duration: i64, velocity: i64) -> Self {
        Self { is_grace: true, ..Self::new(time, pitch, duration, velocity) }
    }
}

macro_rules! impl_point_event {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Dated for $ty {
                fn time(&self) -> i64 {
                    self.time
                }
            }
        )*
    };
}

impl_point_event!(Tempo, KeySignature, TimeSignature, Beat, Barline, Lyric);

impl Dated for Note {
    fn time(&self) -> i64 {
        self.time
    }

    fn duration(&self) -> i64 {
        self.duration
    }

    fn clamped(&self, end: i64) -> Self {
        let mut note = self.clone();
        if note.time + note.duration > end {
            note.duration = end - note.time;
        }
        note
    }
}
