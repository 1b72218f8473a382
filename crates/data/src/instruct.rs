//! Instruction samples: ChatML conversations → flat masked token sequences.
//!
//! Each turn is rendered through the ChatML template, tokenised with special
//! tokens enabled, and terminated with the end-of-text marker. Turns are
//! accumulated whole until the next one would push the sample past its token
//! budget; a conversation cut short mid-way is still a valid sample.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use feather_common::{InstructDataConfig, Message, Tokenizer};

use crate::Sample;

/// Reserved label value excluded from the loss. Doubles as the padding value
/// for inputs in [`collate`](crate::collate::collate).
pub const PADDING_INDEX: i64 = -100;

/// An ordered list of conversation turns, as stored one-per-line in JSONL.
#[derive(Debug, Clone, Deserialize)]
pub struct Conversation {
    pub messages: Vec<Message>,
}

/// Flatten one conversation into a `(x, y)` pair.
///
/// Turns whose tokens would push the running total past
/// `max_tokens_per_sample` end the conversation there; turns are never
/// truncated mid-way. With `train_on_inputs`, labels are the turn's tokens
/// shifted by one; otherwise every label position carries [`PADDING_INDEX`],
/// for every role alike.
pub fn build_sample(
    tokenizer: &dyn Tokenizer,
    messages: &[Message],
    max_tokens_per_sample: usize,
    train_on_inputs: bool,
) -> Result<Sample> {
    let mut samples: Vec<i64> = Vec::new();
    let mut labels: Vec<i64> = Vec::new();

    for message in messages {
        let text = message.render();

        let mut tokens = tokenizer.encode(&text, true)?;
        tokens.push(tokenizer.eot_token());

        // One sample position per token, minus the final shift.
        let emitted = tokens.len() - 1;

        if samples.len() + emitted > max_tokens_per_sample {
            break;
        }

        samples.extend(tokens[..emitted].iter().map(|&t| i64::from(t)));

        if train_on_inputs {
            labels.extend(tokens[1..].iter().map(|&t| i64::from(t)));
        } else {
            labels.extend(std::iter::repeat(PADDING_INDEX).take(emitted));
        }
    }

    assert_eq!(samples.len(), labels.len(), "sample / label shape mismatch");

    Ok((samples, labels))
}

/// Instruction dataset over a JSONL file of conversations
/// (`{"messages": [{"role": ..., "content": ...}, ...]}` per line).
pub struct InstructDataset<T: Tokenizer> {
    tokenizer: T,
    conversations: Vec<Conversation>,
    max_tokens_per_sample: usize,
    train_on_inputs: bool,
}

impl<T: Tokenizer> InstructDataset<T> {
    pub fn open(path: &Path, tokenizer: T, config: &InstructDataConfig) -> Result<Self> {
        if config.max_tokens_per_sample < 1 {
            bail!(
                "max_tokens_per_sample must be greater than 0, {} given",
                config.max_tokens_per_sample
            );
        }

        let file =
            File::open(path).with_context(|| format!("open conversations {}", path.display()))?;

        let mut conversations = Vec::new();
        for (number, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let conversation: Conversation = serde_json::from_str(line)
                .with_context(|| format!("parse conversation on line {}", number + 1))?;
            conversations.push(conversation);
        }

        Ok(Self {
            tokenizer,
            conversations,
            max_tokens_per_sample: config.max_tokens_per_sample,
            train_on_inputs: config.train_on_inputs,
        })
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Build the sample for the conversation at `index`.
    pub fn get(&self, index: usize) -> Result<Sample> {
        let conversation = self.conversations.get(index).with_context(|| {
            format!(
                "index {index} out of bounds for dataset of size {}",
                self.conversations.len()
            )
        })?;

        build_sample(
            &self.tokenizer,
            &conversation.messages,
            self.max_tokens_per_sample,
            self.train_on_inputs,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ByteTokenizer;
    use std::io::Write;

    fn turn(role: &str, content: &str) -> Message {
        Message::new(role, content)
    }

    /// Emitted positions for one turn under the byte tokeniser: the rendered
    /// ChatML text plus the eot marker, minus the final shift.
    fn emitted(message: &Message) -> usize {
        message.render().len()
    }

    #[test]
    fn whole_conversation_fits() {
        let tokenizer = ByteTokenizer::default();
        let messages = vec![turn("user", "hi"), turn("assistant", "hello")];
        let total: usize = messages.iter().map(emitted).sum();

        let (x, y) = build_sample(&tokenizer, &messages, 1024, true).unwrap();

        assert_eq!(x.len(), total);
        assert_eq!(y.len(), total);
    }

    #[test]
    fn labels_shift_inputs_by_one() {
        let tokenizer = ByteTokenizer::default();
        let messages = vec![turn("user", "hi")];

        let (x, y) = build_sample(&tokenizer, &messages, 1024, true).unwrap();

        // Within the turn, y[i] is the token after x[i]; the last label is
        // the eot marker.
        for i in 0..x.len() - 1 {
            assert_eq!(y[i], x[i + 1]);
        }
        assert_eq!(*y.last().unwrap(), 256);
    }

    #[test]
    fn masked_labels_ignore_every_role() {
        let tokenizer = ByteTokenizer::default();
        let messages = vec![turn("user", "hi"), turn("assistant", "hello")];

        let (x, y) = build_sample(&tokenizer, &messages, 1024, false).unwrap();

        assert_eq!(x.len(), y.len());
        assert!(y.iter().all(|&label| label == PADDING_INDEX));
    }

    #[test]
    fn over_budget_turn_ends_the_conversation() {
        let tokenizer = ByteTokenizer::default();
        let messages = vec![
            turn("user", "first"),
            turn("assistant", "second"),
            turn("user", "third"),
        ];
        let first = emitted(&messages[0]);
        let second = emitted(&messages[1]);

        // Budget covers the first two turns exactly; the third must be cut.
        let budget = first + second;
        let (x, _) = build_sample(&tokenizer, &messages, budget, false).unwrap();
        assert_eq!(x.len(), first + second);

        // One token less and the second turn no longer fits either.
        let (x, _) = build_sample(&tokenizer, &messages, budget - 1, false).unwrap();
        assert_eq!(x.len(), first);
    }

    #[test]
    fn dataset_reads_jsonl_conversations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chats.jsonl");
        let mut file = File::create(&path).unwrap();
        writeln!(
            file,
            r#"{{"messages": [{{"role": "user", "content": "hi"}}]}}"#
        )
        .unwrap();
        writeln!(
            file,
            r#"{{"messages": [{{"role": "user", "content": "yo"}}, {{"role": "assistant", "content": "hey"}}]}}"#
        )
        .unwrap();

        let dataset = InstructDataset::open(
            &path,
            ByteTokenizer::default(),
            &InstructDataConfig::default(),
        )
        .unwrap();

        assert_eq!(dataset.len(), 2);
        let (x, y) = dataset.get(1).unwrap();
        assert_eq!(x.len(), y.len());
        assert!(dataset.get(2).is_err());
    }

    #[test]
    fn zero_budget_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chats.jsonl");
        File::create(&path).unwrap();

        let config = InstructDataConfig {
            max_tokens_per_sample: 0,
            ..Default::default()
        };
        assert!(InstructDataset::open(&path, ByteTokenizer::default(), &config).is_err());
    }
}
