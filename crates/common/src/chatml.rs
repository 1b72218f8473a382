//! ChatML conversation turns.
//!
//! Conversations are ordered lists of role/content pairs; a turn is rendered
//! as `<|im_start|>{role}\n{content}\n<|im_end|>\n` before tokenisation.

use serde::{Deserialize, Serialize};

/// One conversation turn: a role (`system`, `user`, `assistant`) and its text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    /// Render the turn in ChatML markup.
    pub fn render(&self) -> String {
        format!("<|im_start|>{}\n{}\n<|im_end|>\n", self.role, self.content)
    }
}
