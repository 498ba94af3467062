//! Default vocabulary tables and the categorical mappers that feed them
//!
//! Every label here is already in cleaned form (lowercase, hyphenated, no
//! punctuation), so running it through the text cleaner leaves it unchanged.

use num_rational::Ratio;

/// Label used when a value cannot be found in the vocabulary
pub const DEFAULT_VALUE: &str = "text";

/// Dynamics that hold until the next dynamic
pub const SUSTAINED_DYNAMICS: [&str; 14] = [
    "pppppp", "ppppp", "pppp", "ppp", "pp", "p", "mp", "mf", "f", "ff", "fff", "ffff", "fffff", "ffffff",
];

/// Momentary accents written as dynamics; they never receive an implied duration
pub const HIKE_DYNAMICS: [&str; 11] = ["sfz", "sf", "sffz", "rf", "rfz", "fp", "fz", "sfp", "sfpp", "pf", "n"];

pub const DYNAMIC_MARKING: &str = "dynamic-marking";
pub const FERMATA: &str = "fermata";
pub const REHEARSAL_MARK: &str = "rehearsal-mark";
pub const TEMPO_MARKING: &str = "tempo-marking";
pub const ARTICULATION: &str = "articulation";
pub const SLUR: &str = "slur";
pub const PEDAL: &str = "pedal";
pub const TRILL: &str = "trill";
pub const BARLINE: &str = "barline";

/// True for dynamics that sustain (`p`, `mf`, ...) as opposed to accents
pub fn is_sustained_dynamic(subtype: &str) -> bool {
    SUSTAINED_DYNAMICS.contains(&subtype.to_lowercase().as_str())
}

/// True for any dynamic spelling the vocabulary recognises
pub fn is_known_dynamic(subtype: &str) -> bool {
    let subtype = subtype.to_lowercase();
    SUSTAINED_DYNAMICS.contains(&subtype.as_str()) || HIKE_DYNAMICS.contains(&subtype.as_str())
}

/// Italian tempo markings with their exclusive upper qpm bound
const TEMPO_MARKINGS: [(&str, f64); 10] = [
    ("grave", 40.0),
    ("largo", 60.0),
    ("larghetto", 66.0),
    ("adagio", 76.0),
    ("andante", 108.0),
    ("moderato", 120.0),
    ("allegro", 156.0),
    ("vivace", 176.0),
    ("presto", 200.0),
    ("prestissimo", f64::INFINITY),
];

/// Bucket a tempo into its Italian marking
pub fn qpm_tempo_label(qpm: Option<f64>) -> &'static str {
    let Some(qpm) = qpm.filter(|qpm| !qpm.is_nan()) else {
        return TEMPO_MARKING;
    };
    TEMPO_MARKINGS
        .iter()
        .find(|(_, upper)| qpm < *upper)
        .map_or("prestissimo", |(label, _)| *label)
}

/// Categorise a meter change by the ratio of new measure length to old
pub fn time_signature_change_label(previous: Option<(i64, i64)>, current: Option<(i64, i64)>) -> &'static str {
    let valid = |meter: Option<(i64, i64)>| meter.filter(|(n, d)| *n > 0 && *d > 0);
    let (Some((n0, d0)), Some((n1, d1))) = (valid(previous), valid(current)) else {
        return "time-signature-change-other";
    };
    let ratio = Ratio::new(n1, d1) / Ratio::new(n0, d0);
    if ratio == Ratio::new(1, 2) {
        "time-signature-change-halved"
    } else if ratio == Ratio::from_integer(2) {
        "time-signature-change-doubled"
    } else if ratio < Ratio::from_integer(1) {
        "time-signature-change-shorter"
    } else if ratio == Ratio::from_integer(1) {
        "time-signature-change-equivalent"
    } else {
        "time-signature-change-longer"
    }
}

/// Signed circle-of-fifths distance, taking the shorter way around
pub fn key_signature_distance(previous: Option<i64>, current: Option<i64>) -> i64 {
    let (Some(previous), Some(current)) = (previous, current) else {
        return 0;
    };
    let distance = current - previous;
    if distance == 0 {
        return 0;
    }
    let other_way = distance - 12 * distance.signum();
    if other_way.abs() < distance.abs() {
        other_way
    } else {
        distance
    }
}

pub fn key_signature_change_label(distance: i64) -> String {
    if distance < 0 {
        format!("key-signature-change-minus-{}", -distance)
    } else {
        format!("key-signature-change-{}", distance)
    }
}

/// Expressive-feature labels, in code order
pub fn default_value_labels() -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    let mut push = |label: &str| labels.push(label.to_string());

    push(DEFAULT_VALUE);
    SUSTAINED_DYNAMICS.iter().for_each(|label| push(label));
    HIKE_DYNAMICS.iter().for_each(|label| push(label));
    push(DYNAMIC_MARKING);
    TEMPO_MARKINGS.iter().for_each(|(label, _)| push(label));
    push(TEMPO_MARKING);
    for label in [
        "halved", "doubled", "shorter", "equivalent", "longer", "other",
    ] {
        push(&format!("time-signature-change-{}", label));
    }
    for distance in -6..=6 {
        push(&key_signature_change_label(distance));
    }
    for label in [
        "barline",
        "double-barline",
        "end-barline",
        "endstart-barline",
        "reverse-end-barline",
        "dashed-barline",
        "dotted-barline",
        "heavy-barline",
        "heavy-double-barline",
    ] {
        push(label);
    }
    for label in [
        FERMATA,
        REHEARSAL_MARK,
        SLUR,
        PEDAL,
        ARTICULATION,
        TRILL,
        // hairpins and tempo spanners
        "hair-pin",
        "crescendo",
        "decrescendo",
        "diminuendo",
        "cresc",
        "dim",
        "tempo",
        "accelerando",
        "ritardando",
        "rallentando",
        "allargando",
        "stringendo",
        "accel",
        "rit",
        "rall",
        "a-tempo",
        "tempo-primo",
        // articulation chunks
        "staccato",
        "staccatissimo",
        "tenuto",
        "accent",
        "marcato",
        "portato",
        "soft-accent",
        "accent-staccato",
        "tenuto-staccato",
        "marcato-staccato",
        "marcato-tenuto",
        "stress",
        "unstress",
        "mordent",
        "turn",
        "bow",
        "harmonic",
        "open",
        "stopped",
        "snap-pizzicato",
        "laissez-vibrer",
        // technique and expression text
        "tech-annotation",
        "pizz",
        "arco",
        "col-legno",
        "sul-ponticello",
        "sul-tasto",
        "tremolo",
        "mute",
        "con-sord",
        "senza-sord",
        "open-string",
        "solo",
        "tutti",
        "div",
        "unis",
        "legato",
        "dolce",
        "espressivo",
        "espr",
        "cantabile",
        "con-moto",
        "con-brio",
        "con-fuoco",
        "grazioso",
        "maestoso",
        "marcato-sempre",
        "agitato",
        "animato",
        "leggiero",
        "sostenuto",
        "tranquillo",
        "misterioso",
        "semplice",
        "simile",
        "sempre",
        "poco",
        "molto",
        "subito",
        "sotto-voce",
        "mezza-voce",
        "rubato",
        "ad-lib",
        "fine",
        "coda",
        "segno",
        "da-capo",
        "dal-segno",
        "to-coda",
        "swing",
        "straight",
    ] {
        push(label);
    }
    labels
}

/// General MIDI program -> instrument class; `None` marks an unsupported program
pub fn program_instrument(program: i64) -> Option<&'static str> {
    let class = match program {
        0..=3 => "piano",
        4..=5 => "electric-piano",
        6 => "harpsichord",
        7 => "clavinet",
        8 => "celesta",
        9 => "glockenspiel",
        10 => "music-box",
        11 => "vibraphone",
        12 => "marimba",
        13 => "xylophone",
        14 => "tubular-bells",
        15 => "dulcimer",
        16..=18 | 20 => "organ",
        19 => "church-organ",
        21 => "accordion",
        22 => "harmonica",
        23 => "bandoneon",
        24 => "nylon-string-guitar",
        25 => "steel-string-guitar",
        26..=31 => "electric-guitar",
        32 => "bass",
        33..=39 => "electric-bass",
        40 | 110 => "violin",
        41 => "viola",
        42 => "cello",
        43 => "contrabass",
        44..=45 | 48..=51 => "strings",
        46 => "harp",
        47 => "timpani",
        52..=54 => "voices",
        55 => "orchestra-hit",
        56 | 59 => "trumpet",
        57 => "trombone",
        58 => "tuba",
        60 => "horn",
        61..=63 => "brasses",
        64..=67 => "saxophone",
        68 => "oboe",
        69 => "english-horn",
        70 => "bassoon",
        71 => "clarinet",
        72 => "piccolo",
        73 => "flute",
        74 => "recorder",
        75 => "pan-flute",
        79 => "ocarina",
        80..=87 => "lead",
        88..=95 => "pad",
        104 => "sitar",
        105 => "banjo",
        106 => "shamisen",
        107 => "koto",
        108 => "kalimba",
        109 => "bag-pipe",
        111 => "shehnai",
        _ => return None,
    };
    Some(class)
}
