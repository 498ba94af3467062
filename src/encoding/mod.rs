//! Encoding registry
//!
//! Defines the token layout (dimension order), the control and event type
//! codes, and the value / instrument vocabularies shared by extraction,
//! encoding and decoding.

pub mod registry;
pub mod vocabulary;

pub use registry::{CodeMap, Dimension, Encoding, EventType, MAX_BEAT, MAX_DURATION, PITCH_COUNT, RESOLUTION};
