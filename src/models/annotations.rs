//! Annotations: dated wrappers around one expressive payload
//!
//! Payloads are a closed tagged union. On disk each payload is an object whose
//! `name` field selects the variant; `ANNOTATION_NAMES` is the full table of
//! accepted tags and loading rejects anything outside it.
//!
//! Spanner variants carry a `duration`, so their effective interval is
//! `[time, time + duration)`.

use serde::{Deserialize, Serialize};

use super::events::Dated;
use super::serde_helpers::{null_as_default, null_as_empty};

/// Every payload tag, in declaration order
pub const ANNOTATION_NAMES: [&str; 26] = [
    "Text",
    "Subtype",
    "RehearsalMark",
    "TechAnnotation",
    "Dynamic",
    "Fermata",
    "Arpeggio",
    "Tremolo",
    "ChordLine",
    "Ornament",
    "Articulation",
    "Notehead",
    "Symbol",
    "Bend",
    "TremoloBar",
    "Spanner",
    "SubtypeSpanner",
    "TempoSpanner",
    "TextSpanner",
    "HairPinSpanner",
    "SlurSpanner",
    "PedalSpanner",
    "TrillSpanner",
    "VibratoSpanner",
    "GlissandoSpanner",
    "OttavaSpanner",
];

/// Bend / tremolo-bar control point
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Point {
    pub time: i64,
    pub pitch: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vibrato: i64,
}

/// The expressive content of an annotation
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "name")]
pub enum AnnotationPayload {
    Text {
        #[serde(default, deserialize_with = "null_as_default")]
        text: String,
        #[serde(default, deserialize_with = "null_as_default")]
        is_system: bool,
        style: Option<String>,
    },
    Subtype {
        subtype: Option<String>,
    },
    RehearsalMark {
        #[serde(default, deserialize_with = "null_as_default")]
        text: String,
    },
    TechAnnotation {
        #[serde(default, deserialize_with = "null_as_default")]
        text: String,
        tech_type: Option<String>,
        #[serde(default, deserialize_with = "null_as_default")]
        is_system: bool,
    },
    Dynamic {
        subtype: Option<String>,
        velocity: Option<i64>,
    },
    Fermata {
        #[serde(default, deserialize_with = "null_as_default")]
        is_fermata_above: bool,
    },
    Arpeggio {
        subtype: Option<String>,
    },
    Tremolo {
        subtype: Option<String>,
    },
    ChordLine {
        subtype: Option<String>,
        #[serde(default, deserialize_with = "null_as_default")]
        is_straight: bool,
    },
    Ornament {
        subtype: Option<String>,
    },
    Articulation {
        subtype: Option<String>,
    },
    Notehead {
        subtype: Option<String>,
    },
    Symbol {
        subtype: Option<String>,
    },
    Bend {
        #[serde(default, deserialize_with = "null_as_empty")]
        points: Vec<Point>,
    },
    TremoloBar {
        #[serde(default, deserialize_with = "null_as_empty")]
        points: Vec<Point>,
    },
    Spanner {
        #[serde(default, deserialize_with = "null_as_default")]
        duration: i64,
    },
    SubtypeSpanner {
        #[serde(default, deserialize_with = "null_as_default")]
        duration: i64,
        subtype: Option<String>,
    },
    TempoSpanner {
        #[serde(default, deserialize_with = "null_as_default")]
        duration: i64,
        subtype: Option<String>,
    },
    TextSpanner {
        #[serde(default, deserialize_with = "null_as_default")]
        duration: i64,
        #[serde(default, deserialize_with = "null_as_default")]
        text: String,
        #[serde(default, deserialize_with = "null_as_default")]
        is_system: bool,
    },
    HairPinSpanner {
        #[serde(default, deserialize_with = "null_as_default")]
        duration: i64,
        subtype: Option<String>,
        hairpin_type: Option<i64>,
    },
    SlurSpanner {
        #[serde(default, deserialize_with = "null_as_default")]
        duration: i64,
        /// `false` marks a tie
        #[serde(default, deserialize_with = "null_as_default")]
        is_slur: bool,
    },
    PedalSpanner {
        #[serde(default, deserialize_with = "null_as_default")]
        duration: i64,
    },
    TrillSpanner {
        #[serde(default, deserialize_with = "null_as_default")]
        duration: i64,
        subtype: Option<String>,
        ornament: Option<String>,
    },
    VibratoSpanner {
        #[serde(default, deserialize_with = "null_as_default")]
        duration: i64,
        subtype: Option<String>,
    },
    GlissandoSpanner {
        #[serde(default, deserialize_with = "null_as_default")]
        duration: i64,
        #[serde(default, deserialize_with = "null_as_default")]
        is_wavy: bool,
    },
    OttavaSpanner {
        #[serde(default, deserialize_with = "null_as_default")]
        duration: i64,
        subtype: Option<String>,
    },
}

impl AnnotationPayload {
    /// The tag this payload is stored under
    pub fn name(&self) -> &'static str {
        use AnnotationPayload::*;
        match self {
            Text { .. } => "Text",
            Subtype { .. } => "Subtype",
            RehearsalMark { .. } => "RehearsalMark",
            TechAnnotation { .. } => "TechAnnotation",
            Dynamic { .. } => "Dynamic",
            Fermata { .. } => "Fermata",
            Arpeggio { .. } => "Arpeggio",
            Tremolo { .. } => "Tremolo",
            ChordLine { .. } => "ChordLine",
            Ornament { .. } => "Ornament",
            Articulation { .. } => "Articulation",
            Notehead { .. } => "Notehead",
            Symbol { .. } => "Symbol",
            Bend { .. } => "Bend",
            TremoloBar { .. } => "TremoloBar",
            Spanner { .. } => "Spanner",
            SubtypeSpanner { .. } => "SubtypeSpanner",
            TempoSpanner { .. } => "TempoSpanner",
            TextSpanner { .. } => "TextSpanner",
            HairPinSpanner { .. } => "HairPinSpanner",
            SlurSpanner { .. } => "SlurSpanner",
            PedalSpanner { .. } => "PedalSpanner",
            TrillSpanner { .. } => "TrillSpanner",
            VibratoSpanner { .. } => "VibratoSpanner",
            GlissandoSpanner { .. } => "GlissandoSpanner",
            OttavaSpanner { .. } => "OttavaSpanner",
        }
    }

    /// Spanner duration in time steps; `None` for point payloads
    pub fn duration(&self) -> Option<i64> {
        use AnnotationPayload::*;
        match self {
            Spanner { duration }
            | SubtypeSpanner { duration, .. }
            | TempoSpanner { duration, .. }
            | TextSpanner { duration, .. }
            | HairPinSpanner { duration, .. }
            | SlurSpanner { duration, .. }
            | PedalSpanner { duration }
            | TrillSpanner { duration, .. }
            | VibratoSpanner { duration, .. }
            | GlissandoSpanner { duration, .. }
            | OttavaSpanner { duration, .. } => Some(*duration),
            _ => None,
        }
    }

    fn duration_mut(&mut self) -> Option<&mut i64> {
        use AnnotationPayload::*;
        match self {
            Spanner { duration }
            | SubtypeSpanner { duration, .. }
            | TempoSpanner { duration, .. }
            | TextSpanner { duration, .. }
            | HairPinSpanner { duration, .. }
            | SlurSpanner { duration, .. }
            | PedalSpanner { duration }
            | TrillSpanner { duration, .. }
            | VibratoSpanner { duration, .. }
            | GlissandoSpanner { duration, .. }
            | OttavaSpanner { duration, .. } => Some(duration),
            _ => None,
        }
    }

    /// Free text carried by the payload, if the variant has a text field
    pub fn text(&self) -> Option<&str> {
        use AnnotationPayload::*;
        match self {
            Text { text, .. }
            | RehearsalMark { text }
            | TechAnnotation { text, .. }
            | TextSpanner { text, .. } => Some(text.as_str()),
            _ => None,
        }
    }

    /// Subtype string, if the variant has a subtype field
    pub fn subtype(&self) -> Option<&str> {
        use AnnotationPayload::*;
        match self {
            Subtype { subtype }
            | Dynamic { subtype, .. }
            | Arpeggio { subtype }
            | Tremolo { subtype }
            | ChordLine { subtype, .. }
            | Ornament { subtype }
            | Articulation { subtype }
            | Notehead { subtype }
            | Symbol { subtype }
            | SubtypeSpanner { subtype, .. }
            | TempoSpanner { subtype, .. }
            | HairPinSpanner { subtype, .. }
            | TrillSpanner { subtype, .. }
            | VibratoSpanner { subtype, .. }
            | OttavaSpanner { subtype, .. } => subtype.as_deref(),
            _ => None,
        }
    }

    /// True if the variant has a text field (even an empty one)
    pub fn has_text(&self) -> bool {
        self.text().is_some()
    }

    /// True if the variant has a subtype field (even an unset one)
    pub fn has_subtype(&self) -> bool {
        use AnnotationPayload::*;
        matches!(
            self,
            Subtype { .. }
                | Dynamic { .. }
                | Arpeggio { .. }
                | Tremolo { .. }
                | ChordLine { .. }
                | Ornament { .. }
                | Articulation { .. }
                | Notehead { .. }
                | Symbol { .. }
                | SubtypeSpanner { .. }
                | TempoSpanner { .. }
                | HairPinSpanner { .. }
                | TrillSpanner { .. }
                | VibratoSpanner { .. }
                | OttavaSpanner { .. }
        )
    }
}

/// A payload placed on the timeline
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Annotation {
    pub time: i64,
    pub annotation: AnnotationPayload,
    pub measure: Option<i64>,
    pub group: Option<String>,
}

impl Annotation {
    pub fn new(time: i64, annotation: AnnotationPayload) -> Self {
        Self { time, annotation, measure: None, group: None }
    }
}

impl Dated for Annotation {
    fn time(&self) -> i64 {
        self.time
    }

    fn duration(&self) -> i64 {
        self.annotation.duration().unwrap_or(0)
    }

    fn clamped(&self, end: i64) -> Self {
        let mut annotation = self.clone();
        let time = annotation.time;
        if let Some(duration) = annotation.annotation.duration_mut() {
            if time + *duration > end {
                *duration = end - time;
            }
        }
        annotation
    }
}
