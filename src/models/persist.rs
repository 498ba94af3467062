//! JSON (optionally gzipped) persistence for music documents
//!
//! Annotation payload tags are checked against [`ANNOTATION_NAMES`] before the
//! document is built, so an unknown tag is reported by name instead of as a
//! generic shape mismatch.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::Value;

use super::annotations::ANNOTATION_NAMES;
use super::music::MusicDocument;
use crate::error::DocumentError;

fn is_gzip_path(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("gz"))
}

/// Reject the first annotation whose payload tag has no variant
fn validate_annotation_tags(value: &Value) -> Result<(), DocumentError> {
    let system = value.get("annotations").and_then(Value::as_array).into_iter().flatten();
    let staff = value
        .get("tracks")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|track| track.get("annotations").and_then(Value::as_array))
        .flatten();

    for annotation in system.chain(staff) {
        let tag = annotation.get("annotation").and_then(|payload| payload.get("name"));
        match tag {
            Some(Value::String(name)) if ANNOTATION_NAMES.contains(&name.as_str()) => {}
            Some(Value::String(name)) => return Err(DocumentError::UnknownAnnotation(name.clone())),
            Some(other) => return Err(DocumentError::UnknownAnnotation(other.to_string())),
            // a missing tag is left to serde, which reports the field
            None => {}
        }
    }
    Ok(())
}

impl MusicDocument {
    /// Build a document from an already-parsed JSON value
    pub fn from_json_value(value: Value) -> Result<Self, DocumentError> {
        validate_annotation_tags(&value)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Parse a document from JSON text
    pub fn from_json_str(text: &str) -> Result<Self, DocumentError> {
        Self::from_json_value(serde_json::from_str(text)?)
    }

    /// Load a document from a `.json` or `.json.gz` file
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let mut reader = BufReader::new(File::open(path)?);
        let mut text = String::new();
        if is_gzip_path(path) {
            GzDecoder::new(reader).read_to_string(&mut text)?;
        } else {
            reader.read_to_string(&mut text)?;
        }
        Self::from_json_str(&text)
    }

    /// Serialize to a JSON string
    pub fn to_json_string(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Save as JSON, gzip-compressed when asked to or when the path ends in `.gz`
    ///
    /// With `compressed == Some(true)` a `.gz` extension is appended when the
    /// path lacks one. Returns the path actually written.
    pub fn save_json(&self, path: impl AsRef<Path>, compressed: Option<bool>) -> Result<PathBuf, DocumentError> {
        let mut path = path.as_ref().to_path_buf();
        let compressed = compressed.unwrap_or_else(|| is_gzip_path(&path));
        if compressed && !is_gzip_path(&path) {
            let mut name = path.clone().into_os_string();
            name.push(".gz");
            path = PathBuf::from(name);
        }

        let writer = BufWriter::new(File::create(&path)?);
        if compressed {
            let mut encoder = GzEncoder::new(writer, Compression::default());
            serde_json::to_writer(&mut encoder, self)?;
            encoder.finish()?.flush()?;
        } else {
            let mut writer = writer;
            serde_json::to_writer(&mut writer, self)?;
            writer.flush()?;
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_tag_reports_name() {
        let json = r#"{
            "resolution": 24,
            "tracks": [{"program": 0, "annotations": [
                {"time": 0, "annotation": {"name": "Glockenspiel", "subtype": "x"}}
            ]}]
        }"#;
        match MusicDocument::from_json_str(json) {
            Err(DocumentError::UnknownAnnotation(tag)) => assert_eq!(tag, "Glockenspiel"),
            other => panic!("expected unknown annotation, got {:?}", other),
        }
    }

    #[test]
    fn test_extra_class_tags_ignored() {
        let json = r#"{
            "name": "MusicRender",
            "resolution": 12,
            "tempos": [{"name": "Tempo", "time": 0, "qpm": 100.0}],
            "annotations": [
                {"name": "Annotation", "time": 3, "annotation": {"name": "Fermata", "is_fermata_above": true}}
            ]
        }"#;
        let document = MusicDocument::from_json_str(json).unwrap();
        assert_eq!(document.resolution, 12);
        assert_eq!(document.annotations[0].annotation.name(), "Fermata");
    }

    #[test]
    fn test_non_positive_resolution_rejected_on_load() {
        let error = MusicDocument::from_json_str(r#"{"resolution": 0}"#).unwrap_err();
        assert!(error.to_string().contains("resolution"));
    }

    #[test]
    fn test_gz_suffix_detection() {
        assert!(is_gzip_path(Path::new("song.json.gz")));
        assert!(!is_gzip_path(Path::new("song.json")));
    }
}
