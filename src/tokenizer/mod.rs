//! Tokenizer: event tables to code matrices and back
//!
//! A code matrix has one row per token and one column per encoding
//! dimension. Every sequence is framed as
//!
//! ```text
//! start-of-song, instrument*, start-of-notes, core rows..., end-of-song
//! ```
//!
//! where the order of the core rows depends on the [`Conditioning`].

pub mod decode;
pub mod encode;
pub mod storage;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use decode::decode;
pub use encode::encode;
pub use storage::{load_csv, load_npy, save_csv, save_npy};

use crate::encoding::Encoding;
use crate::error::EncodingError;
use crate::extract::{extract, ExtractConfig};
use crate::models::MusicDocument;

/// One token row, in the encoding's column order
pub type CodeRow = [i64; 6];

/// A full token sequence
pub type Codes = Vec<CodeRow>;

/// Lookahead, in seconds, for anticipation conditioning
pub const SIGMA: f64 = 5.0;

/// How expressive features are ordered relative to notes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Conditioning {
    /// Chronological, ties broken by type code
    #[default]
    Sort,
    /// Every expressive feature first, then a second start-of-notes, then the notes
    Prefix,
    /// Chronological, with expressive features moved `sigma` seconds earlier
    Anticipation,
}

impl Conditioning {
    pub const ALL: [Conditioning; 3] = [Conditioning::Sort, Conditioning::Prefix, Conditioning::Anticipation];

    pub fn as_str(&self) -> &'static str {
        match self {
            Conditioning::Sort => "sort",
            Conditioning::Prefix => "prefix",
            Conditioning::Anticipation => "anticipation",
        }
    }
}

impl fmt::Display for Conditioning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Conditioning {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|conditioning| conditioning.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| EncodingError::UnknownConditioning(s.to_string()))
    }
}

/// Per-call encoding settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeOptions {
    pub conditioning: Conditioning,
    /// Anticipation lookahead in seconds
    pub sigma: f64,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self { conditioning: Conditioning::Sort, sigma: SIGMA }
    }
}

impl EncodeOptions {
    pub fn with_conditioning(conditioning: Conditioning) -> Self {
        Self { conditioning, ..Self::default() }
    }
}

/// Extract and encode a document in one step
pub fn encode_document(
    document: &MusicDocument,
    encoding: &Encoding,
    config: &ExtractConfig,
    options: &EncodeOptions,
) -> Codes {
    encode(&extract(document, encoding, config), encoding, options)
}

/// Cut a sequence down to `max_seq_len` rows, keeping its final row
///
/// The first `max_seq_len - 1` rows are kept, followed by the original last
/// row (normally end-of-song).
pub fn truncate(codes: &[CodeRow], max_seq_len: usize) -> Codes {
    if codes.len() <= max_seq_len {
        return codes.to_vec();
    }
    if max_seq_len == 0 {
        return Vec::new();
    }
    let mut truncated = codes[..max_seq_len - 1].to_vec();
    truncated.push(codes[codes.len() - 1]);
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conditioning_from_str() {
        assert_eq!("sort".parse::<Conditioning>().unwrap(), Conditioning::Sort);
        assert_eq!("Prefix".parse::<Conditioning>().unwrap(), Conditioning::Prefix);
        assert_eq!(" anticipation ".parse::<Conditioning>().unwrap(), Conditioning::Anticipation);
        assert!(matches!("random".parse::<Conditioning>(), Err(EncodingError::UnknownConditioning(_))));
    }

    #[test]
    fn test_default_options() {
        let options = EncodeOptions::default();
        assert_eq!(options.conditioning, Conditioning::Sort);
        assert_eq!(options.sigma, 5.0);
    }

    #[test]
    fn test_truncate_keeps_last_row() {
        let codes: Codes = (0..10).map(|i| [i, 0, 0, 0, 0, 0]).collect();
        let truncated = truncate(&codes, 4);
        let types: Vec<i64> = truncated.iter().map(|row| row[0]).collect();
        assert_eq!(types, vec![0, 1, 2, 9]);
        assert_eq!(truncate(&codes, 20).len(), 10);
        assert!(truncate(&codes, 0).is_empty());
    }
}
