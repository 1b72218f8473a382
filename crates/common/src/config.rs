//! Data pipeline configuration.
//!
//! Serialised as JSON so a preprocessing run and the training run that
//! consumes it can share one settings file. Every field has a sensible
//! default, so a minimal `{}` JSON produces a working configuration.

use std::path::{Path, PathBuf};

use anyhow::bail;
use serde::{Deserialize, Serialize};

/// Which region of the dataset artifact to sample from.
///
/// The test region is exactly one epoch of tokens taken from the corpus
/// head; the train region is everything after it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    #[default]
    Train,
    Test,
}

impl std::str::FromStr for Split {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "train" => Ok(Self::Train),
            "test" => Ok(Self::Test),
            other => bail!("split must be either train or test, {other} given"),
        }
    }
}

impl std::fmt::Display for Split {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Train => write!(f, "train"),
            Self::Test => write!(f, "test"),
        }
    }
}

/// Settings for the pre-training dataset: where the artifact lives and how
/// epochs are sampled from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PretrainDataConfig {
    /// Directory holding (or receiving) dataset artifacts.
    #[serde(default = "default_root_path")]
    pub root_path: PathBuf,
    /// Optional corpus subset; part of the artifact identity.
    #[serde(default)]
    pub subset: Option<String>,
    #[serde(default)]
    pub split: Split,
    /// Window length of each sample.
    #[serde(default = "default_tokens_per_sample")]
    pub tokens_per_sample: usize,
    /// Number of windows yielded per epoch.
    #[serde(default = "default_samples_per_epoch")]
    pub samples_per_epoch: usize,
    /// Seed for the per-epoch start offset draw; `None` seeds from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Settings for instruction fine-tuning samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstructDataConfig {
    /// Budget for one flattened conversation; turns that would push the
    /// running total past it are dropped whole.
    #[serde(default = "default_max_tokens_per_sample")]
    pub max_tokens_per_sample: usize,
    /// When false, every label position carries the ignore sentinel and no
    /// turn contributes to the loss.
    #[serde(default)]
    pub train_on_inputs: bool,
}

// ── Default value functions ─────────────────────────────────────────────────

fn default_root_path() -> PathBuf {
    PathBuf::from("./dataset")
}
fn default_tokens_per_sample() -> usize {
    1024
}
fn default_samples_per_epoch() -> usize {
    4096
}
fn default_max_tokens_per_sample() -> usize {
    1024
}

// ── Impl ────────────────────────────────────────────────────────────────────

impl Default for PretrainDataConfig {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
            subset: None,
            split: Split::Train,
            tokens_per_sample: 1024,
            samples_per_epoch: 4096,
            seed: None,
        }
    }
}

impl PretrainDataConfig {
    /// Save config to a JSON file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load config from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&json)?;
        Ok(config)
    }
}

impl Default for InstructDataConfig {
    fn default() -> Self {
        Self {
            max_tokens_per_sample: 1024,
            train_on_inputs: false,
        }
    }
}

impl InstructDataConfig {
    /// Save config to a JSON file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load config from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&json)?;
        Ok(config)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretrain_config_json_round_trip() {
        let config = PretrainDataConfig {
            subset: Some("sample-10bt".to_string()),
            split: Split::Test,
            seed: Some(42),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let loaded: PretrainDataConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.subset.as_deref(), Some("sample-10bt"));
        assert_eq!(loaded.split, Split::Test);
        assert_eq!(loaded.tokens_per_sample, 1024);
        assert_eq!(loaded.samples_per_epoch, 4096);
        assert_eq!(loaded.seed, Some(42));
    }

    #[test]
    fn minimal_json_uses_defaults() {
        let loaded: PretrainDataConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(loaded.root_path, PathBuf::from("./dataset"));
        assert_eq!(loaded.split, Split::Train);
        assert_eq!(loaded.tokens_per_sample, 1024);
        assert!(loaded.seed.is_none());

        let loaded: InstructDataConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(loaded.max_tokens_per_sample, 1024);
        assert!(!loaded.train_on_inputs);
    }

    #[test]
    fn unknown_split_is_rejected() {
        assert!(serde_json::from_str::<Split>("\"validation\"").is_err());
        assert!("validation".parse::<Split>().is_err());
        assert_eq!("test".parse::<Split>().unwrap(), Split::Test);
    }

    #[test]
    fn config_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let config = PretrainDataConfig {
            tokens_per_sample: 256,
            ..Default::default()
        };
        config.save(&path).unwrap();
        let loaded = PretrainDataConfig::load(&path).unwrap();
        assert_eq!(loaded.tokens_per_sample, 256);
    }
}
