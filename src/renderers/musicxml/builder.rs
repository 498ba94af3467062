// MusicXML builder: string assembly for partwise scores

use quick_xml::escape::escape;

/// Step names and alterations for the twelve pitch classes, spelled with sharps
const PITCH_CLASSES: [(&str, i64); 12] = [
    ("C", 0),
    ("C", 1),
    ("D", 0),
    ("D", 1),
    ("E", 0),
    ("F", 0),
    ("F", 1),
    ("G", 0),
    ("G", 1),
    ("A", 0),
    ("A", 1),
    ("B", 0),
];

/// MIDI pitch to (step, alter, octave); 60 is C4
pub fn pitch_to_step_alter_octave(pitch: i64) -> (&'static str, i64, i64) {
    let (step, alter) = PITCH_CLASSES[pitch.rem_euclid(12) as usize];
    (step, alter, pitch.div_euclid(12) - 1)
}

/// Convert a duration in quarter notes to a MusicXML note type and dot count
///
/// Returns `None` for durations with no plain or dotted note value.
pub fn duration_to_note_type(duration: f64) -> Option<(&'static str, usize)> {
    const EPSILON: f64 = 0.001;
    const TYPES: [(f64, &str, usize); 16] = [
        (6.0, "whole", 1),
        (4.0, "whole", 0),
        (3.0, "half", 1),
        (2.0, "half", 0),
        (1.5, "quarter", 1),
        (1.0, "quarter", 0),
        (0.75, "eighth", 1),
        (0.5, "eighth", 0),
        (0.375, "16th", 1),
        (0.25, "16th", 0),
        (0.1875, "32nd", 1),
        (0.125, "32nd", 0),
        (0.09375, "64th", 1),
        (0.0625, "64th", 0),
        (8.0, "breve", 0),
        (12.0, "breve", 1),
    ];
    TYPES
        .iter()
        .find(|(quarters, _, _)| (duration - quarters).abs() < EPSILON)
        .map(|(_, note_type, dots)| (*note_type, *dots))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clef {
    Treble,
    Bass,
}

/// Attribute changes written at the top of a measure
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasureAttributes {
    pub divisions: Option<i64>,
    pub fifths: Option<i64>,
    pub time: Option<(i64, i64)>,
    pub clef: Option<Clef>,
}

impl MeasureAttributes {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One note as written
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XmlNote {
    pub pitch: i64,
    /// Duration in divisions; ignored for grace notes
    pub duration: i64,
    /// Duration in quarter notes, used to pick the note type
    pub quarters: f64,
    pub voice: usize,
    pub chord: bool,
    pub grace: bool,
}

/// Builds the `<measure>` elements of one part
pub struct PartBuilder {
    buffer: String,
    measure_number: usize,
    measure_started: bool,
}

impl PartBuilder {
    pub fn new() -> Self {
        Self { buffer: String::new(), measure_number: 1, measure_started: false }
    }

    /// Open a measure, writing any attribute changes first
    pub fn start_measure(&mut self, attributes: &MeasureAttributes) {
        if self.measure_started {
            self.end_measure();
        }
        self.buffer.push_str(&format!("    <measure number=\"{}\">\n", self.measure_number));
        self.measure_started = true;
        if !attributes.is_empty() {
            self.write_attributes(attributes);
        }
    }

    /// Close the current measure and increment the number
    pub fn end_measure(&mut self) {
        if !self.measure_started {
            return;
        }
        self.buffer.push_str("    </measure>\n");
        self.measure_number += 1;
        self.measure_started = false;
    }

    fn write_attributes(&mut self, attributes: &MeasureAttributes) {
        self.buffer.push_str("      <attributes>\n");
        if let Some(divisions) = attributes.divisions {
            self.buffer.push_str(&format!("        <divisions>{}</divisions>\n", divisions));
        }
        if let Some(fifths) = attributes.fifths {
            self.buffer.push_str(&format!("        <key><fifths>{}</fifths></key>\n", fifths.clamp(-7, 7)));
        }
        if let Some((beats, beat_type)) = attributes.time {
            self.buffer.push_str(&format!(
                "        <time><beats>{}</beats><beat-type>{}</beat-type></time>\n",
                beats, beat_type
            ));
        }
        match attributes.clef {
            Some(Clef::Treble) => self.buffer.push_str("        <clef><sign>G</sign><line>2</line></clef>\n"),
            Some(Clef::Bass) => self.buffer.push_str("        <clef><sign>F</sign><line>4</line></clef>\n"),
            None => {}
        }
        self.buffer.push_str("      </attributes>\n");
    }

    /// Words direction `offset` divisions after the current position
    pub fn write_words(&mut self, text: &str, offset: i64) {
        self.buffer.push_str("      <direction placement=\"above\">\n");
        self.buffer.push_str("        <direction-type>\n");
        self.buffer.push_str(&format!("          <words>{}</words>\n", escape(text)));
        self.buffer.push_str("        </direction-type>\n");
        self.write_offset(offset);
        self.buffer.push_str("      </direction>\n");
    }

    /// Metronome mark plus playback tempo
    pub fn write_tempo(&mut self, qpm: f64, offset: i64) {
        let qpm = (qpm * 100.0).round() / 100.0;
        self.buffer.push_str("      <direction placement=\"above\">\n");
        self.buffer.push_str("        <direction-type>\n");
        self.buffer.push_str(&format!(
            "          <metronome><beat-unit>quarter</beat-unit><per-minute>{}</per-minute></metronome>\n",
            qpm
        ));
        self.buffer.push_str("        </direction-type>\n");
        self.write_offset(offset);
        self.buffer.push_str(&format!("        <sound tempo=\"{}\"/>\n", qpm));
        self.buffer.push_str("      </direction>\n");
    }

    fn write_offset(&mut self, offset: i64) {
        if offset != 0 {
            self.buffer.push_str(&format!("        <offset>{}</offset>\n", offset));
        }
    }

    pub fn write_note(&mut self, note: &XmlNote) {
        let (step, alter, octave) = pitch_to_step_alter_octave(note.pitch);

        self.buffer.push_str("      <note>\n");
        if note.grace {
            self.buffer.push_str("        <grace slash=\"yes\"/>\n");
        }
        if note.chord {
            self.buffer.push_str("        <chord/>\n");
        }
        self.buffer.push_str("        <pitch>\n");
        self.buffer.push_str(&format!("          <step>{}</step>\n", step));
        if alter != 0 {
            self.buffer.push_str(&format!("          <alter>{}</alter>\n", alter));
        }
        self.buffer.push_str(&format!("          <octave>{}</octave>\n", octave));
        self.buffer.push_str("        </pitch>\n");
        if !note.grace {
            self.buffer.push_str(&format!("        <duration>{}</duration>\n", note.duration));
        }
        self.buffer.push_str(&format!("        <voice>{}</voice>\n", note.voice));

        let note_type = if note.grace { Some(("eighth", 0)) } else { duration_to_note_type(note.quarters) };
        if let Some((note_type, dots)) = note_type {
            self.buffer.push_str(&format!("        <type>{}</type>\n", note_type));
            for _ in 0..dots {
                self.buffer.push_str("        <dot/>\n");
            }
        }
        if alter != 0 {
            self.buffer.push_str("        <accidental>sharp</accidental>\n");
        }
        self.buffer.push_str("      </note>\n");
    }

    /// Rest filling a whole measure
    pub fn write_measure_rest(&mut self, duration: i64) {
        self.buffer.push_str("      <note>\n");
        self.buffer.push_str("        <rest measure=\"yes\"/>\n");
        self.buffer.push_str(&format!("        <duration>{}</duration>\n", duration));
        self.buffer.push_str("      </note>\n");
    }

    pub fn write_forward(&mut self, duration: i64) {
        if duration > 0 {
            self.buffer.push_str(&format!("      <forward><duration>{}</duration></forward>\n", duration));
        }
    }

    pub fn write_backup(&mut self, duration: i64) {
        if duration > 0 {
            self.buffer.push_str(&format!("      <backup><duration>{}</duration></backup>\n", duration));
        }
    }

    /// Close any open measure and return the measures
    pub fn finish(mut self) -> String {
        self.end_measure();
        self.buffer
    }
}

impl Default for PartBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A finished part and its part-list entry
pub struct ScorePart {
    pub id: String,
    pub name: String,
    /// General MIDI program, zero-based
    pub program: Option<i64>,
    /// Zero-based MIDI channel
    pub channel: u8,
    pub measures: String,
}

/// Assemble a complete partwise document
pub fn score_partwise(title: Option<&str>, parts: &[ScorePart]) -> String {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<!DOCTYPE score-partwise PUBLIC \"-//Recordare//DTD MusicXML 3.1 Partwise//EN\" \"http://www.musicxml.org/dtds/partwise.dtd\">\n");
    xml.push_str("<score-partwise version=\"3.1\">\n");

    if let Some(title) = title.filter(|title| !title.is_empty()) {
        xml.push_str(&format!("  <movement-title>{}</movement-title>\n", escape(title)));
    }

    xml.push_str("  <part-list>\n");
    for part in parts {
        xml.push_str(&format!("    <score-part id=\"{}\">\n", part.id));
        xml.push_str(&format!("      <part-name>{}</part-name>\n", escape(&part.name)));
        if let Some(program) = part.program {
            xml.push_str(&format!("      <midi-instrument id=\"{}-I1\">\n", part.id));
            xml.push_str(&format!("        <midi-channel>{}</midi-channel>\n", part.channel + 1));
            xml.push_str(&format!("        <midi-program>{}</midi-program>\n", program.clamp(0, 127) + 1));
            xml.push_str("      </midi-instrument>\n");
        }
        xml.push_str("    </score-part>\n");
    }
    xml.push_str("  </part-list>\n");

    for part in parts {
        xml.push_str(&format!("  <part id=\"{}\">\n", part.id));
        xml.push_str(&part.measures);
        xml.push_str("  </part>\n");
    }
    xml.push_str("</score-partwise>\n");
    xml
}
