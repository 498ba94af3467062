//! Models module for the expressive score representation
//!
//! This module contains the music document, its tracks and every dated event
//! type that can appear on a timeline.

pub mod annotations;
pub mod events;
pub mod music;
pub mod persist;
pub mod serde_helpers;
pub mod timing;
pub mod track;

// Re-export commonly used types
pub use annotations::{Annotation, AnnotationPayload, Point, ANNOTATION_NAMES};
pub use events::*;
pub use music::{MusicDocument, DEFAULT_RESOLUTION};
pub use timing::{TempoMap, DEFAULT_QPM};
pub use track::Track;
