//! Error types for the score model, the encoding registry and rendering
//!
//! Only process-boundary problems are errors here. Data problems inside a
//! document never raise: time conversion degrades numerically, encoding drops
//! rows, and decoding skips codes it cannot interpret.

use thiserror::Error;

use crate::renderers::RenderKind;

/// Failures while loading, saving or constructing a music document
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON, including an unrecognised annotation `name` tag
    #[error("invalid document json: {0}")]
    Json(#[from] serde_json::Error),

    /// Annotation tag with no entry in the payload table
    #[error("unknown annotation type: {0}")]
    UnknownAnnotation(String),

    #[error("resolution must be positive, got {0}")]
    InvalidResolution(i64),
}

/// Failures while loading the encoding registry or persisted code matrices
#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid encoding json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid encoding yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("encoding is missing dimension `{0}`")]
    MissingDimension(&'static str),

    #[error("dimension `{0}` appears more than once")]
    DuplicateDimension(String),

    #[error("type code map is missing `{0}`")]
    MissingType(&'static str),

    #[error("unknown conditioning `{0}` (expected sort, prefix or anticipation)")]
    UnknownConditioning(String),

    #[error("expected {expected} columns, found {found}")]
    Shape { expected: usize, found: usize },

    #[error("csv error: {0}")]
    Csv(String),

    #[error("npy error: {0}")]
    Npy(String),

    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// Failures while writing a document through a renderer
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("midi write error: {0}")]
    Midi(String),

    #[error("musicxml write error: {0}")]
    Xml(String),

    /// The output kind could not be inferred from the path
    #[error("cannot infer output format from `{0}` (expected MIDI, MusicXML, WAV, AIFF, FLAC or OGA)")]
    UnknownKind(String),

    /// No writer is available for this kind
    #[error("no renderer registered for {0:?} output")]
    Unsupported(RenderKind),
}
