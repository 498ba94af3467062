// Encode / decode round trip
//
// A document that loses nothing to vocabulary limits must come back from
// decode(encode(...)) with the same event table, compared column by column.

use expressive_tokenizer::encoding::RESOLUTION;
use expressive_tokenizer::models::{Barline, KeySignature, Tempo, TimeSignature, DEFAULT_VELOCITY};
use expressive_tokenizer::{
    decode, encode, extract, Annotation, AnnotationPayload, Codes, Conditioning, EncodeOptions, Encoding, EventRow,
    EventType, EventValue, ExtractConfig, MusicDocument, Note, Track,
};

/// Columns that survive a round trip; times differ between resolutions
fn columns(rows: &[EventRow]) -> Vec<(EventType, i64, i64, EventValue, i64, i64)> {
    rows.iter()
        .map(|row| (row.event_type, row.beat, row.position, row.value.clone(), row.duration, row.instrument))
        .collect()
}

fn round_trip(document: &MusicDocument) -> (Vec<EventRow>, Codes, MusicDocument) {
    let encoding = Encoding::default();
    let config = ExtractConfig::default();
    let rows = extract(document, &encoding, &config);
    let codes = encode(&rows, &encoding, &EncodeOptions::default());
    let decoded = decode(&codes, &encoding);
    (rows, codes, decoded)
}

#[test]
fn test_two_note_example() {
    let mut document = MusicDocument::new(4).unwrap();
    let mut track = Track::new(0);
    track.notes = vec![Note::new(0, 60, 4, 64), Note::new(4, 64, 4, 64)];
    document.tracks.push(track);
    document.normalize();

    let (rows, codes, decoded) = round_trip(&document);

    assert_eq!(rows.len(), 2);
    assert_eq!((rows[0].beat, rows[0].position, rows[0].time), (0, 0, 0));
    assert_eq!(rows[0].time_seconds, 0.0);
    assert_eq!((rows[1].beat, rows[1].position, rows[1].time), (1, 0, 4));
    assert!(rows[1].time_seconds > 0.0);

    let types: Vec<i64> = codes.iter().map(|row| row[0]).collect();
    assert_eq!(types, vec![0, 1, 2, 5, 5, 6]);

    assert_eq!(decoded.resolution, RESOLUTION);
    assert_eq!(decoded.tracks.len(), 1);
    assert_eq!(decoded.tracks[0].program, Some(0));
    assert_eq!(
        decoded.tracks[0].notes,
        vec![
            Note::new(0, 60, RESOLUTION, DEFAULT_VELOCITY),
            Note::new(RESOLUTION, 64, RESOLUTION, DEFAULT_VELOCITY)
        ]
    );
}

fn expressive_document() -> MusicDocument {
    let mut document = MusicDocument::new(4).unwrap();
    document.tempos = vec![Tempo::new(0, 120.0), Tempo::new(16, 60.0)];
    document.time_signatures = vec![TimeSignature::new(0, 4, 4), TimeSignature::new(16, 2, 4)];
    document.key_signatures = vec![KeySignature::new(0, 0), KeySignature::new(24, 2)];
    document.barlines = vec![Barline::new(16, Some("double"))];
    document.annotations.push(Annotation::new(
        0,
        AnnotationPayload::Text { text: "dolce".into(), is_system: true, style: None },
    ));

    let mut piano = Track::new(0);
    piano.notes = (0..8).map(|i| Note::new(i * 4, 60 + i, 4, 80)).collect();
    piano.notes.push(Note::grace(11, 71, 1, 80));
    piano.annotations = vec![
        Annotation::new(0, AnnotationPayload::Dynamic { subtype: Some("p".into()), velocity: None }),
        Annotation::new(8, AnnotationPayload::Dynamic { subtype: Some("sfz".into()), velocity: None }),
        Annotation::new(12, AnnotationPayload::Dynamic { subtype: Some("f".into()), velocity: None }),
        Annotation::new(0, AnnotationPayload::SlurSpanner { duration: 16, is_slur: true }),
        Annotation::new(4, AnnotationPayload::HairPinSpanner { duration: 8, subtype: None, hairpin_type: Some(0) }),
    ];
    for time in [16, 18, 20, 22] {
        piano.annotations.push(Annotation::new(
            time,
            AnnotationPayload::Articulation { subtype: Some("articStaccatoAbove".into()) },
        ));
    }

    let mut violin = Track::new(40);
    violin.notes = vec![Note::new(2, 76, 6, 70), Note::new(9, 74, 3, 70), Note::new(24, 79, 8, 70)];
    violin.annotations.push(Annotation::new(9, AnnotationPayload::PedalSpanner { duration: 2 }));

    document.tracks = vec![piano, violin];
    document.normalize();
    document
}

#[test]
fn test_expressive_document_round_trips() {
    let document = expressive_document();
    let encoding = Encoding::default();
    let (rows, codes, decoded) = round_trip(&document);

    assert!(rows.iter().any(|row| row.event_type == EventType::ExpressiveFeature));
    assert!(rows.iter().any(|row| row.event_type == EventType::GraceNote));

    let again = extract(&decoded, &encoding, &ExtractConfig::default());
    assert_eq!(columns(&again), columns(&rows));
    assert_eq!(encode(&again, &encoding, &EncodeOptions::default()), codes);
}

#[test]
fn test_decoded_tracks_use_lowest_program_of_class() {
    let mut document = MusicDocument::new(12).unwrap();
    let mut piano = Track::new(2);
    piano.notes.push(Note::new(0, 60, 12, 64));
    document.tracks.push(piano);
    document.normalize();

    let (rows, codes, decoded) = round_trip(&document);
    assert_eq!(rows[0].instrument, 2);
    assert_eq!(decoded.tracks[0].program, Some(0));

    let encoding = Encoding::default();
    let again = extract(&decoded, &encoding, &ExtractConfig::default());
    assert_eq!(encode(&again, &encoding, &EncodeOptions::default()), codes);
}

#[test]
fn test_unknown_labels_come_back_as_default_value() {
    let mut document = MusicDocument::new(4).unwrap();
    document.annotations.push(Annotation::new(
        0,
        AnnotationPayload::TextSpanner { duration: 4, text: "quasi niente e lontano".into(), is_system: true },
    ));
    let mut track = Track::new(0);
    track.notes.push(Note::new(0, 60, 4, 64));
    document.tracks.push(track);
    document.normalize();

    let encoding = Encoding::default();
    let (_, codes, decoded) = round_trip(&document);
    assert_eq!(codes[3][3], encoding.default_value_code());
    assert_eq!(decoded.tracks[0].annotations[0].annotation.text(), Some("text"));

    let again = extract(&decoded, &encoding, &ExtractConfig::default());
    assert_eq!(encode(&again, &encoding, &EncodeOptions::default()), codes);
}

#[test]
fn test_round_trip_with_tracks_out_of_instrument_order() {
    let mut document = MusicDocument::new(4).unwrap();
    document.tempos.push(Tempo::new(0, 112.0));

    let mut flute = Track::new(73);
    flute.notes = vec![Note::new(0, 79, 8, 64)];
    flute.annotations.push(Annotation::new(
        0,
        AnnotationPayload::Text { text: "dolce".into(), is_system: false, style: None },
    ));
    let mut violin = Track::new(40);
    violin.notes = vec![Note::new(0, 76, 4, 64), Note::new(4, 74, 4, 64)];
    let mut piano = Track::new(0);
    piano.notes = vec![Note::new(0, 48, 8, 64), Note::new(0, 55, 8, 64), Note::new(4, 60, 4, 64)];
    document.tracks = vec![flute, violin, piano];
    document.normalize();

    let encoding = Encoding::default();
    let config = ExtractConfig::default();
    let rows = extract(&document, &encoding, &config);
    let instruments: Vec<i64> =
        rows.iter().filter(|row| row.time == 0 && row.event_type == EventType::Note).map(|row| row.instrument).collect();
    assert_eq!(instruments, vec![0, 0, 40, 73]);

    for conditioning in Conditioning::ALL {
        let options = EncodeOptions::with_conditioning(conditioning);
        let codes = encode(&rows, &encoding, &options);
        let decoded = decode(&codes, &encoding);
        let again = extract(&decoded, &encoding, &config);
        assert_eq!(columns(&again), columns(&rows), "{}", conditioning);
        if conditioning == Conditioning::Sort {
            assert_eq!(encode(&again, &encoding, &options), codes);
        }
    }
}
