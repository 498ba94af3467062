//! Standard MIDI File output

pub mod defaults;
pub mod write;

pub use defaults::{DEFAULT_TEMPO_QPM, DEFAULT_TPQ, DRUM_CHANNEL};
pub use write::{to_smf_bytes, write_midi};
