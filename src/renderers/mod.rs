//! Output renderers
//!
//! Decoded documents can be written out as Standard MIDI Files or MusicXML.
//! Audio has no built-in writer; callers plug one in through
//! [`ScoreWriter`] and [`write_with`].

pub mod midi;
pub mod musicxml;

use std::path::Path;

use crate::error::RenderError;
use crate::models::MusicDocument;

/// Output format of a rendered document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderKind {
    Midi,
    MusicXml,
    Audio,
}

impl RenderKind {
    /// Guess the output kind from a file extension
    pub fn infer(path: impl AsRef<Path>) -> Result<Self, RenderError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "mid" | "midi" => Ok(RenderKind::Midi),
            "mxl" | "xml" | "mxml" | "musicxml" => Ok(RenderKind::MusicXml),
            "wav" | "aiff" | "flac" | "oga" => Ok(RenderKind::Audio),
            _ => Err(RenderError::UnknownKind(path.display().to_string())),
        }
    }
}

/// A renderer that can write a document to disk
pub trait ScoreWriter {
    fn write(&self, document: &MusicDocument, path: &Path, kind: RenderKind) -> Result<(), RenderError>;
}

/// The MIDI and MusicXML writers shipped with the crate
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinWriter;

impl ScoreWriter for BuiltinWriter {
    fn write(&self, document: &MusicDocument, path: &Path, kind: RenderKind) -> Result<(), RenderError> {
        match kind {
            RenderKind::Midi => midi::write_midi(document, path),
            RenderKind::MusicXml => musicxml::write_musicxml(document, path),
            RenderKind::Audio => Err(RenderError::Unsupported(kind)),
        }
    }
}

/// Write `document` to `path` with the built-in writers
pub fn write(document: &MusicDocument, path: impl AsRef<Path>, kind: RenderKind) -> Result<(), RenderError> {
    write_with(document, path, kind, &BuiltinWriter)
}

/// Write `document` to `path` through a caller-supplied renderer
pub fn write_with(
    document: &MusicDocument,
    path: impl AsRef<Path>,
    kind: RenderKind,
    writer: &dyn ScoreWriter,
) -> Result<(), RenderError> {
    let path = path.as_ref();
    log::info!("writing {:?} output to {}", kind, path.display());
    writer.write(document, path, kind)
}
