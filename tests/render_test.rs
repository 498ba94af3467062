// Rendering decoded sequences to MIDI and MusicXML

use tempfile::tempdir;

use expressive_tokenizer::renderers::{self, midi::DEFAULT_TPQ, RenderKind};
use expressive_tokenizer::{
    decode, encode_document, EncodeOptions, Encoding, ExtractConfig, MusicDocument, Note, RenderError, Track,
};

fn decoded() -> MusicDocument {
    let mut document = MusicDocument::new(4).unwrap();
    let mut piano = Track::new(0);
    piano.notes = vec![Note::new(0, 60, 4, 64), Note::new(4, 64, 4, 64), Note::new(8, 67, 8, 64)];
    let mut cello = Track::new(42);
    cello.notes = vec![Note::new(0, 36, 16, 64)];
    document.tracks = vec![piano, cello];
    document.normalize();

    let encoding = Encoding::default();
    let codes = encode_document(&document, &encoding, &ExtractConfig::default(), &EncodeOptions::default());
    decode(&codes, &encoding)
}

#[test]
fn test_midi_file_header() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("song.mid");
    let kind = RenderKind::infer(&path).unwrap();
    renderers::write(&decoded(), &path, kind).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[0..4], b"MThd");
    assert_eq!(&bytes[4..8], &[0, 0, 0, 6]);
    // format 1, conductor plus two tracks
    assert_eq!(&bytes[8..10], &[0, 1]);
    assert_eq!(&bytes[10..12], &[0, 3]);
    assert_eq!(&bytes[12..14], &DEFAULT_TPQ.to_be_bytes());
    assert_eq!(&bytes[14..18], b"MTrk");
}

#[test]
fn test_musicxml_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("song.musicxml");
    renderers::write(&decoded(), &path, RenderKind::infer(&path).unwrap()).unwrap();

    let xml = std::fs::read_to_string(&path).unwrap();
    assert!(xml.contains("<score-partwise version=\"3.1\">"));
    assert_eq!(xml.matches("<score-part id=").count(), 2);
    assert!(xml.contains("<part-name>piano</part-name>"));
    assert!(xml.contains("<part-name>cello</part-name>"));
    assert!(xml.contains("<divisions>12</divisions>"));
    assert!(xml.contains("<clef><sign>F</sign><line>4</line></clef>"));
}

#[test]
fn test_audio_output_is_unsupported() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("song.wav");
    let result = renderers::write(&decoded(), &path, RenderKind::infer(&path).unwrap());
    assert!(matches!(result, Err(RenderError::Unsupported(RenderKind::Audio))));
    assert!(!path.exists());
}
