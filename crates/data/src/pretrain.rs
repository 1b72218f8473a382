//! Memory-mapped pre-training dataset and epoch sampling.
//!
//! The finalised artifact is mapped read-only, so only the pages an epoch
//! touches are ever resident; a 100 GB artifact costs nothing until sampled.
//! Each epoch draws one random start offset inside the split region and then
//! walks `samples_per_epoch` contiguous windows from it. Only the offset is
//! random; windows within an epoch are sequential and non-overlapping.

use std::fs::File;
use std::path::Path;

use anyhow::{bail, Context, Result};
use memmap2::Mmap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use feather_common::{PretrainDataConfig, Split, TokenId, TOKEN_BYTES};

/// Read-only view of a dataset artifact, restricted to one split region,
/// sampling fixed-length `(x, y)` windows with next-token labels.
pub struct PretrainDataset {
    mmap: Mmap,
    tokens_per_sample: usize,
    samples_per_epoch: usize,
    num_tokens: usize,
    start: usize,
    max_offset: usize,
    rng: StdRng,
}

impl PretrainDataset {
    /// Open the artifact at `bin_path` under `config`.
    ///
    /// The test region is the first `samples_per_epoch * (tokens_per_sample
    /// + 1)` tokens of the artifact; the train region is the remainder.
    /// Fails eagerly when the configuration is out of range or the artifact
    /// is too small to hold one epoch inside the requested region.
    pub fn open(bin_path: &Path, config: &PretrainDataConfig) -> Result<Self> {
        if config.tokens_per_sample < 1 {
            bail!("tokens_per_sample must be greater than 0");
        }
        if config.samples_per_epoch < 1 {
            bail!("samples_per_epoch must be greater than 0");
        }

        let file = File::open(bin_path)
            .with_context(|| format!("open dataset artifact {}", bin_path.display()))?;
        let byte_len = file.metadata().context("stat dataset artifact")?.len() as usize;
        if byte_len % TOKEN_BYTES != 0 {
            bail!(
                "artifact size {byte_len} is not a multiple of {TOKEN_BYTES} (expected u16 tokens)"
            );
        }

        let num_tokens = byte_len / TOKEN_BYTES;
        let tokens_per_epoch = config.samples_per_epoch * (config.tokens_per_sample + 1);

        let (start, end) = match config.split {
            Split::Train => (tokens_per_epoch, num_tokens),
            Split::Test => (0, tokens_per_epoch),
        };

        if end > num_tokens {
            bail!(
                "corpus too small: artifact has {num_tokens} tokens but the {} region ends at {end}",
                config.split
            );
        }

        // One epoch must fit between the region start and its end.
        let max_offset = match end.checked_sub(tokens_per_epoch) {
            Some(max_offset) if max_offset >= start => max_offset,
            _ => bail!(
                "corpus too small for requested epoch size: region [{start}, {end}) holds fewer than {tokens_per_epoch} tokens"
            ),
        };

        // SAFETY: opened read-only; no writer exists after finalize.
        let mmap = unsafe { Mmap::map(&file) }.context("mmap dataset artifact")?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            mmap,
            tokens_per_sample: config.tokens_per_sample,
            samples_per_epoch: config.samples_per_epoch,
            num_tokens,
            start,
            max_offset,
            rng,
        })
    }

    /// Total number of tokens in the artifact.
    pub fn num_tokens(&self) -> usize {
        self.num_tokens
    }

    pub fn tokens_per_sample(&self) -> usize {
        self.tokens_per_sample
    }

    pub fn samples_per_epoch(&self) -> usize {
        self.samples_per_epoch
    }

    /// Start one epoch: draw a uniform start offset in `[start, max_offset]`
    /// and return a finite iterator over exactly `samples_per_epoch` windows.
    /// Every call is a fresh pass with its own draw and its own cursor.
    pub fn epoch(&mut self) -> EpochIter<'_> {
        let offset = self.rng.gen_range(self.start..=self.max_offset);

        tracing::debug!(offset, "starting epoch");

        EpochIter {
            dataset: &*self,
            cursor: offset,
            remaining: self.samples_per_epoch,
        }
    }

    /// Decode `len` tokens starting at token offset `start`, widened to i64.
    fn read_window(&self, start: usize, len: usize) -> Vec<i64> {
        let bytes = &self.mmap[start * TOKEN_BYTES..(start + len) * TOKEN_BYTES];
        bytes
            .chunks_exact(TOKEN_BYTES)
            .map(|b| i64::from(TokenId::from_ne_bytes([b[0], b[1]])))
            .collect()
    }
}

/// Lazy iterator over one epoch of `(x, y)` windows.
pub struct EpochIter<'a> {
    dataset: &'a PretrainDataset,
    cursor: usize,
    remaining: usize,
}

impl Iterator for EpochIter<'_> {
    type Item = (Vec<i64>, Vec<i64>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let n = self.dataset.tokens_per_sample;
        let x = self.dataset.read_window(self.cursor, n);
        let y = self.dataset.read_window(self.cursor + 1, n);

        assert_eq!(x.len(), y.len(), "sample / label shape mismatch");

        self.cursor += n;
        self.remaining -= 1;

        Some((x, y))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for EpochIter<'_> {}
