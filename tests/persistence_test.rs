// Files on disk: documents, encoding registries and code matrices

use std::io::Read;

use flate2::read::GzDecoder;
use tempfile::tempdir;

use expressive_tokenizer::models::{Tempo, TimeSignature};
use expressive_tokenizer::tokenizer::{load_csv, load_npy, save_csv, save_npy};
use expressive_tokenizer::{
    encode_document, Annotation, AnnotationPayload, DocumentError, EncodeOptions, Encoding, EncodingError,
    ExtractConfig, MusicDocument, Note, Track,
};

fn document() -> MusicDocument {
    let mut document = MusicDocument::new(24).unwrap();
    document.metadata.title = Some("Étude".into());
    document.tempos.push(Tempo::new(0, 72.0));
    document.time_signatures.push(TimeSignature::new(0, 3, 4));
    document.annotations.push(Annotation::new(
        24,
        AnnotationPayload::Fermata { is_fermata_above: true },
    ));
    let mut track = Track::new(0);
    track.notes = vec![Note::new(0, 60, 24, 70), Note::new(24, 62, 48, 70), Note::grace(70, 65, 2, 70)];
    track.annotations.push(Annotation::new(0, AnnotationPayload::PedalSpanner { duration: 72 }));
    document.tracks.push(track);
    document.normalize();
    document
}

#[test]
fn test_json_round_trip() {
    let dir = tempdir().unwrap();
    let path = document().save_json(dir.path().join("song.json"), None).unwrap();
    let loaded = MusicDocument::load_json(&path).unwrap();
    assert_eq!(loaded, document());
}

#[test]
fn test_gzip_round_trip() {
    let dir = tempdir().unwrap();
    let path = document().save_json(dir.path().join("song.json"), Some(true)).unwrap();
    assert!(path.to_string_lossy().ends_with(".json.gz"));

    let mut text = String::new();
    GzDecoder::new(std::fs::File::open(&path).unwrap()).read_to_string(&mut text).unwrap();
    assert!(text.contains("\"resolution\":24"));

    assert_eq!(MusicDocument::load_json(&path).unwrap(), document());
}

#[test]
fn test_unknown_annotation_fails_to_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(
        &path,
        r#"{"resolution": 12, "annotations": [{"time": 0, "annotation": {"name": "Kazoo"}}]}"#,
    )
    .unwrap();
    match MusicDocument::load_json(&path) {
        Err(DocumentError::UnknownAnnotation(tag)) => assert_eq!(tag, "Kazoo"),
        other => panic!("expected unknown annotation, got {:?}", other),
    }
}

#[test]
fn test_trim_keeps_window() {
    let mut document = document();
    document.trim(0, 48);
    assert!(document.tracks[0].notes.iter().all(|note| note.time < 48 && note.time + note.duration <= 48));
    assert!(document.tracks[0].annotations.iter().all(|annotation| annotation.time < 48));
    assert_eq!(document.tracks[0].notes.len(), 2);
    assert_eq!(document.song_length(), 48);
}

#[test]
fn test_encoding_json_and_yaml_round_trip() {
    let dir = tempdir().unwrap();
    let encoding = Encoding::default();
    for name in ["encoding.json", "encoding.yaml"] {
        let path = dir.path().join(name);
        encoding.save(&path).unwrap();
        assert_eq!(Encoding::load(&path).unwrap(), encoding, "{}", name);
    }
}

#[test]
fn test_encoding_missing_dimension_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("encoding.json");
    Encoding::default().save(&path).unwrap();

    let mut value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    value["dimensions"] = serde_json::json!(["type", "beat", "position", "value", "duration"]);
    std::fs::write(&path, value.to_string()).unwrap();

    assert!(Encoding::load(&path).is_err());
}

#[test]
fn test_code_matrix_files() {
    let dir = tempdir().unwrap();
    let encoding = Encoding::default();
    let codes = encode_document(&document(), &encoding, &ExtractConfig::default(), &EncodeOptions::default());

    let csv = dir.path().join("codes.csv");
    save_csv(&csv, &codes, &encoding).unwrap();
    assert_eq!(load_csv(&csv).unwrap(), codes);

    let npy = dir.path().join("codes.npy");
    save_npy(&npy, &codes).unwrap();
    assert_eq!(load_npy(&npy).unwrap(), codes);
}

#[test]
fn test_npy_with_wrong_width_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wide.npy");
    let header = "{'descr': '<i8', 'fortran_order': False, 'shape': (1, 7), }";
    let mut bytes = b"\x93NUMPY\x01\x00".to_vec();
    let padded = format!("{:<width$}\n", header, width = 64 - 10 - 1);
    bytes.extend((padded.len() as u16).to_le_bytes());
    bytes.extend(padded.as_bytes());
    bytes.extend([0u8; 7 * 8]);
    std::fs::write(&path, bytes).unwrap();

    assert!(matches!(load_npy(&path), Err(EncodingError::Shape { expected: 6, found: 7 })));
}
