//! Expressive Tokenizer
//!
//! Turns symbolic scores into fixed-width token sequences for sequence
//! models, and turns generated sequences back into scores.
//!
//! The pipeline is
//!
//! ```text
//! MusicDocument --extract--> [EventRow] --encode--> Codes --decode--> MusicDocument
//! ```
//!
//! - [`models`]: the score model (tracks, notes, timelines, annotations) and
//!   its JSON persistence
//! - [`extract`]: flattens a document into an event table of notes, grace
//!   notes and expressive features
//! - [`encoding`]: the vocabulary and code maps shared by encoder and decoder
//! - [`tokenizer`]: conditioning-aware encoding, decoding and code matrix files
//! - [`renderers`]: MIDI and MusicXML output for decoded documents
//! - [`batch`]: parallel encoding of many documents

pub mod batch;
pub mod encoding;
pub mod error;
pub mod extract;
pub mod models;
pub mod renderers;
pub mod tokenizer;

// Re-export commonly used types
pub use encoding::{Dimension, Encoding, EventType};
pub use error::{DocumentError, EncodingError, RenderError};
pub use extract::{extract, EventRow, EventValue, ExtractConfig};
pub use models::{Annotation, AnnotationPayload, MusicDocument, Note, Track};
pub use renderers::{RenderKind, ScoreWriter};
pub use tokenizer::{decode, encode, encode_document, CodeRow, Codes, Conditioning, EncodeOptions};
