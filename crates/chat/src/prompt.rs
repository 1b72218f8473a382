//! Prompt assembly for multi-turn generation.
//!
//! A session pins one rendered system message; the rest of the context
//! budget belongs to the rolling history. The generation loop re-assembles
//! the prompt from both before every model call.

use anyhow::{bail, Result};

use feather_common::TokenId;

use crate::memory::ChatMemory;

/// Token budget left for history once the system message is pinned.
/// Sized so that system message + retained history always fit the context.
pub fn history_budget(context_length: usize, system_length: usize) -> Result<usize> {
    if system_length >= context_length {
        bail!(
            "system message of {system_length} tokens fills the {context_length}-token context"
        );
    }

    Ok(context_length - system_length)
}

/// Concatenate the system message and the retained history into one prompt.
pub fn assemble_prompt(system_tokens: &[TokenId], memory: &ChatMemory) -> Vec<TokenId> {
    let mut prompt = system_tokens.to_vec();
    prompt.extend(memory.history());
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_is_system_then_history() {
        let mut memory = ChatMemory::new(100);
        memory.add_message(vec![10, 11]);
        memory.add_message(vec![12]);

        let prompt = assemble_prompt(&[1, 2, 3], &memory);
        assert_eq!(prompt, vec![1, 2, 3, 10, 11, 12]);
    }

    #[test]
    fn budget_excludes_the_system_message() {
        assert_eq!(history_budget(1024, 24).unwrap(), 1000);
        assert!(history_budget(1024, 1024).is_err());
    }

    #[test]
    fn prompt_respects_the_context_length() {
        let context_length = 16;
        let system = vec![0; 4];
        let mut memory = ChatMemory::new(history_budget(context_length, system.len()).unwrap());

        for _ in 0..10 {
            memory.add_message(vec![7; 5]);
        }

        let prompt = assemble_prompt(&system, &memory);
        assert!(prompt.len() <= context_length);
    }
}
