//! # feather-data — Corpus → Dataset Pipeline
//!
//! Streams a text corpus of any size into a compact on-disk token artifact
//! and samples fixed-length training windows from it:
//!
//! * **[`TokenSink`]** — append-only growable token buffer backed by a
//!   temporary file.
//! * **[`ensure_artifact`]** — tokenise a [`Corpus`] into a cached `.bin`
//!   artifact (skipped entirely when the artifact already exists).
//! * **[`PretrainDataset`]** — mmap the artifact and yield one epoch of
//!   shifted `(x, y)` windows at a time.
//! * **[`build_sample`]** / **[`InstructDataset`]** — ChatML conversations →
//!   flat samples with per-turn label masking.
//! * **[`collate`]** — left-pad variable-length samples into one
//!   rectangular batch.

pub mod collate;
pub mod corpus;
pub mod ingest;
pub mod instruct;
pub mod pretrain;
pub mod sink;

pub use collate::collate;
pub use corpus::{Corpus, JsonlCorpus};
pub use ingest::{artifact_path, ensure_artifact};
pub use instruct::{build_sample, Conversation, InstructDataset, PADDING_INDEX};
pub use pretrain::{EpochIter, PretrainDataset};
pub use sink::TokenSink;

/// One training sample: equal-length input and next-token label sequences.
/// Labels may carry [`PADDING_INDEX`] at positions excluded from the loss.
pub type Sample = (Vec<i64>, Vec<i64>);

#[cfg(test)]
pub(crate) mod test_utils {
    use std::cell::Cell;

    use anyhow::Result;
    use feather_common::{TokenId, Tokenizer};

    /// Byte-level tokeniser for tests: each byte maps to its own id and the
    /// end-of-text marker is 256. Counts encode calls so cache-hit tests can
    /// assert that no tokenisation happened.
    #[derive(Default)]
    pub(crate) struct ByteTokenizer {
        pub(crate) calls: Cell<usize>,
    }

    impl Tokenizer for ByteTokenizer {
        fn name(&self) -> &str {
            "byte"
        }

        fn encode_ordinary(&self, text: &str) -> Result<Vec<TokenId>> {
            self.calls.set(self.calls.get() + 1);
            Ok(text.bytes().map(TokenId::from).collect())
        }

        fn encode(&self, text: &str, _allow_special: bool) -> Result<Vec<TokenId>> {
            self.encode_ordinary(text)
        }

        fn eot_token(&self) -> TokenId {
            256
        }
    }
}
