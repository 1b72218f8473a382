//! # feather-common — Shared Primitives
//!
//! Types and utilities shared across every crate in the workspace:
//!
//! * **[`TokenId`]** — the 16-bit token id of the persisted dataset format.
//! * **[`Tokenizer`]** — the tokeniser capability consumed by the pipeline,
//!   with [`HfTokenizer`] adapting a `tokenizer.json` file.
//! * **[`PretrainDataConfig`]** / **[`InstructDataConfig`]** — data pipeline
//!   settings (serialised as JSON).
//! * **[`Message`]** — one ChatML conversation turn.

pub mod chatml;
pub mod config;
pub mod tokenizer;

pub use chatml::Message;
pub use config::{InstructDataConfig, PretrainDataConfig, Split};
pub use tokenizer::{HfTokenizer, TokenId, Tokenizer, TOKEN_BYTES};
