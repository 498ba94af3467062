//! Parallel encoding of many documents
//!
//! Each document is extracted and encoded on its own rayon task. A failure
//! only affects its own slot in the output, and results keep input order.

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::encoding::Encoding;
use crate::error::{DocumentError, EncodingError};
use crate::extract::ExtractConfig;
use crate::models::MusicDocument;
use crate::tokenizer::{encode_document, Codes, EncodeOptions};

fn encode_one(
    document: &MusicDocument,
    encoding: &Encoding,
    config: &ExtractConfig,
    options: &EncodeOptions,
) -> Result<Codes, EncodingError> {
    if document.resolution <= 0 {
        return Err(DocumentError::InvalidResolution(document.resolution).into());
    }
    Ok(encode_document(document, encoding, config, options))
}

fn encode_path(
    path: &Path,
    encoding: &Encoding,
    config: &ExtractConfig,
    options: &EncodeOptions,
) -> Result<Codes, EncodingError> {
    let document = MusicDocument::load_json(path)?;
    encode_one(&document, encoding, config, options)
}

/// Encode in-memory documents in parallel
pub fn encode_documents(
    documents: &[MusicDocument],
    encoding: &Encoding,
    config: &ExtractConfig,
    options: &EncodeOptions,
) -> Vec<Result<Codes, EncodingError>> {
    let results: Vec<Result<Codes, EncodingError>> = documents
        .par_iter()
        .enumerate()
        .map(|(index, document)| {
            let result = encode_one(document, encoding, config, options);
            if let Err(e) = &result {
                log::warn!("document {} failed to encode: {}", index, e);
            }
            result
        })
        .collect();

    log_summary(&results);
    results
}

/// Load and encode JSON documents (optionally `.gz`) in parallel
pub fn encode_files(
    paths: &[PathBuf],
    encoding: &Encoding,
    config: &ExtractConfig,
    options: &EncodeOptions,
) -> Vec<(PathBuf, Result<Codes, EncodingError>)> {
    let results: Vec<(PathBuf, Result<Codes, EncodingError>)> = paths
        .par_iter()
        .map(|path| {
            let result = encode_path(path, encoding, config, options);
            if let Err(e) = &result {
                log::warn!("{}: {}", path.display(), e);
            }
            (path.clone(), result)
        })
        .collect();

    let outcomes: Vec<&Result<Codes, EncodingError>> = results.iter().map(|(_, result)| result).collect();
    log_summary(outcomes);
    results
}

fn log_summary<'a, I>(results: I)
where
    I: IntoIterator<Item = &'a Result<Codes, EncodingError>>,
{
    let (mut encoded, mut failed, mut tokens) = (0usize, 0usize, 0usize);
    for result in results {
        match result {
            Ok(codes) => {
                encoded += 1;
                tokens += codes.len();
            }
            Err(_) => failed += 1,
        }
    }
    log::info!("encoded {} documents ({} tokens), {} failed", encoded, tokens, failed);
}
