//! Corpus ingestion: stream, tokenise, persist.
//!
//! One sequential pass over the record stream; each record is tokenised,
//! terminated with the end-of-text marker, and appended to a [`TokenSink`].
//! The finalised artifact is keyed by corpus and tokeniser identity, so a
//! later run with the same inputs skips the scan entirely.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use feather_common::Tokenizer;

use crate::corpus::Corpus;
use crate::sink::TokenSink;

/// Derived artifact path: `{root}/{corpus-name}[-{subset}]-{tokenizer}.bin`.
/// Pure function of the identities, so repeated runs are cache-compatible.
pub fn artifact_path(root: &Path, corpus: &dyn Corpus, tokenizer: &dyn Tokenizer) -> PathBuf {
    let stem = match corpus.subset() {
        Some(subset) => format!("{}-{}-{}", corpus.name(), subset, tokenizer.name()),
        None => format!("{}-{}", corpus.name(), tokenizer.name()),
    };

    root.join(format!("{stem}.bin"))
}

/// Return the path of the dataset artifact for `corpus` × `tokenizer`,
/// building it first if it does not exist yet.
///
/// On a cache hit nothing is tokenised and the artifact is left untouched.
/// An interrupted scan leaves only the `.temp` backing file behind; the
/// artifact path stays vacant, so the next run starts over.
pub fn ensure_artifact(
    root: &Path,
    corpus: &dyn Corpus,
    tokenizer: &dyn Tokenizer,
) -> Result<PathBuf> {
    let bin_path = artifact_path(root, corpus, tokenizer);

    if bin_path.exists() {
        tracing::info!(path = %bin_path.display(), "dataset artifact found, skipping preprocessing");
        return Ok(bin_path);
    }

    fs::create_dir_all(root).with_context(|| format!("create dataset dir {}", root.display()))?;

    let temp_path = bin_path.with_extension("bin.temp");
    let mut sink = TokenSink::create(&temp_path)?;

    tracing::info!(corpus = corpus.name(), subset = ?corpus.subset(), "preprocessing dataset");

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("[{elapsed_precise}] {spinner} {pos} records")
            .unwrap(),
    );

    for record in corpus.records()? {
        let text = record?;

        let mut tokens = tokenizer.encode_ordinary(&text)?;
        tokens.push(tokenizer.eot_token());

        sink.append(&tokens)?;
        pb.inc(1);
    }

    pb.finish_and_clear();

    let total_tokens = sink.len();
    sink.finalize(&bin_path)?;

    tracing::info!(tokens = total_tokens, path = %bin_path.display(), "dataset artifact written");

    Ok(bin_path)
}
