//! Corpus source capability.
//!
//! The pipeline consumes a lazy stream of record texts plus the identity
//! parts that key the derived artifact path; where the records come from is
//! the source's business. [`JsonlCorpus`] covers the local case: a directory
//! of JSONL / plain-text files, optionally organised into subset
//! subdirectories, read line by line and never loaded whole.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

/// A source of text records for ingestion.
pub trait Corpus {
    /// Corpus name; first component of the artifact identity.
    fn name(&self) -> &str;

    /// Subset name, if the corpus is partitioned into subsets.
    fn subset(&self) -> Option<&str>;

    /// A fresh single-pass stream over the record texts, in a stable order.
    /// A stream error aborts ingestion; nothing is retried.
    fn records(&self) -> Result<Box<dyn Iterator<Item = Result<String>> + '_>>;
}

/// Local corpus: a directory of `.jsonl` / `.json` / `.txt` / `.raw` files.
/// Subsets are subdirectories of the corpus root.
#[derive(Debug)]
pub struct JsonlCorpus {
    name: String,
    subset: Option<String>,
    files: Vec<PathBuf>,
}

impl JsonlCorpus {
    /// Open the corpus rooted at `root`, optionally restricted to `subset`.
    /// An unknown subset fails here, listing the available ones.
    pub fn open(root: &Path, subset: Option<&str>) -> Result<Self> {
        let name = root
            .file_name()
            .and_then(|name| name.to_str())
            .with_context(|| format!("corpus path {} has no directory name", root.display()))?
            .to_string();

        let dir = match subset {
            Some(subset) => {
                let dir = root.join(subset);
                if !dir.is_dir() {
                    let available = list_subsets(root)?;
                    bail!(
                        "invalid subset {subset:?} for corpus {name}, available: [{}]",
                        available.join(", ")
                    );
                }
                dir
            }
            None => root.to_path_buf(),
        };

        let files = collect_files(&dir)?;
        if files.is_empty() {
            bail!("no record files under {}", dir.display());
        }

        Ok(Self {
            name,
            subset: subset.map(str::to_string),
            files,
        })
    }
}

impl Corpus for JsonlCorpus {
    fn name(&self) -> &str {
        &self.name
    }

    fn subset(&self) -> Option<&str> {
        self.subset.as_deref()
    }

    fn records(&self) -> Result<Box<dyn Iterator<Item = Result<String>> + '_>> {
        Ok(Box::new(RecordIter {
            files: &self.files,
            next_file: 0,
            lines: None,
        }))
    }
}

struct RecordIter<'a> {
    files: &'a [PathBuf],
    next_file: usize,
    lines: Option<Lines<BufReader<File>>>,
}

impl Iterator for RecordIter<'_> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(lines) = &mut self.lines {
                match lines.next() {
                    Some(Ok(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        return Some(Ok(extract_text(line)));
                    }
                    Some(Err(e)) => return Some(Err(e.into())),
                    None => self.lines = None,
                }
            }

            if self.next_file >= self.files.len() {
                return None;
            }
            let path = &self.files[self.next_file];
            self.next_file += 1;

            match File::open(path) {
                Ok(file) => self.lines = Some(BufReader::new(file).lines()),
                Err(e) => {
                    return Some(Err(
                        anyhow::Error::new(e).context(format!("open {}", path.display()))
                    ))
                }
            }
        }
    }
}

/// Subdirectories of the corpus root, sorted.
fn list_subsets(root: &Path) -> Result<Vec<String>> {
    let mut subsets: Vec<String> = std::fs::read_dir(root)
        .with_context(|| format!("read corpus dir {}", root.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .collect();
    subsets.sort();
    Ok(subsets)
}

/// Collect record files from a directory, sorted for a stable scan order.
fn collect_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("read corpus dir {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map(|ext| ext == "jsonl" || ext == "json" || ext == "txt" || ext == "raw")
                    .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Extract text from a line: plain text, JSONL with `"text"`, or JSONL with
/// `"input"` + `"output"`.
fn extract_text(line: &str) -> String {
    if line.starts_with('{') {
        if let Ok(v) = serde_json::from_str::<serde_json::Value>(line) {
            if let Some(t) = v.get("text").and_then(|t| t.as_str()) {
                return t.to_string();
            }
            if let (Some(inp), Some(out)) = (
                v.get("input").and_then(|x| x.as_str()),
                v.get("output").and_then(|x| x.as_str()),
            ) {
                return format!("{inp}\n{out}");
            }
        }
    }
    line.to_string()
}
