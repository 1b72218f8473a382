//! Tokeniser capability consumed by the data pipeline.
//!
//! The pipeline never implements tokenisation itself; it only needs a way to
//! turn text into ids and a reserved end-of-text id to mark record and turn
//! boundaries. [`HfTokenizer`] adapts a `tokenizer.json` file (e.g. GPT-2 BPE)
//! to that capability.

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};

/// Token id as stored in the persisted dataset format: 16-bit unsigned,
/// native byte order. Vocabularies larger than 65 536 entries are rejected
/// at tokeniser construction.
pub type TokenId = u16;

/// Width of one persisted token in bytes.
pub const TOKEN_BYTES: usize = std::mem::size_of::<TokenId>();

/// Text form of the end-of-text marker in GPT-2 style vocabularies.
pub const EOT_TOKEN_TEXT: &str = "<|endoftext|>";

/// What the pipeline needs from a tokeniser.
pub trait Tokenizer {
    /// Stable identifier; keys the derived dataset artifact path, so two
    /// tokenisers with the same name must produce identical ids.
    fn name(&self) -> &str;

    /// Encode plain text, treating special-token markup as ordinary text.
    fn encode_ordinary(&self, text: &str) -> Result<Vec<TokenId>>;

    /// Encode text; `allow_special` lets control tokens such as
    /// `<|im_start|>` map to their reserved ids instead of being split.
    fn encode(&self, text: &str, allow_special: bool) -> Result<Vec<TokenId>>;

    /// Reserved end-of-text id, appended after every record and turn.
    fn eot_token(&self) -> TokenId;
}

/// [`Tokenizer`] backed by a HuggingFace `tokenizer.json` file.
pub struct HfTokenizer {
    inner: tokenizers::Tokenizer,
    name: String,
    eot_token: TokenId,
}

impl HfTokenizer {
    /// Load from a `tokenizer.json` file. The file stem becomes the
    /// tokeniser name, so `gpt2.json` keys artifacts as `...-gpt2.bin`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let inner = tokenizers::Tokenizer::from_file(path.to_string_lossy().to_string())
            .map_err(|e| anyhow!("load tokenizer: {e}"))?;

        let vocab_size = inner.get_vocab_size(true);
        if vocab_size > usize::from(TokenId::MAX) + 1 {
            bail!("vocabulary of {vocab_size} entries does not fit 16-bit token ids");
        }

        let eot_token = inner
            .token_to_id(EOT_TOKEN_TEXT)
            .with_context(|| format!("tokenizer has no {EOT_TOKEN_TEXT} token"))?
            as TokenId;

        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .context("tokenizer path has no file name")?
            .to_string();

        Ok(Self {
            inner,
            name,
            eot_token,
        })
    }

    fn ids(&self, text: &str, allow_special: bool) -> Result<Vec<TokenId>> {
        let encoding = self
            .inner
            .encode(text, allow_special)
            .map_err(|e| anyhow!("encode: {e}"))?;

        // Safe cast: every id is below the vocab size checked in from_file.
        Ok(encoding.get_ids().iter().map(|&id| id as TokenId).collect())
    }
}

impl Tokenizer for HfTokenizer {
    fn name(&self) -> &str {
        &self.name
    }

    fn encode_ordinary(&self, text: &str) -> Result<Vec<TokenId>> {
        self.ids(text, false)
    }

    fn encode(&self, text: &str, allow_special: bool) -> Result<Vec<TokenId>> {
        self.ids(text, allow_special)
    }

    fn eot_token(&self) -> TokenId {
        self.eot_token
    }
}
