//! Append-only token buffer backed by a growable temporary file.
//!
//! The corpus scan appends tokens as records arrive; the backing file doubles
//! in size whenever the next append would overflow it, so a scan of unknown
//! length costs amortised O(1) per token and never holds the corpus in RAM.
//! [`TokenSink::finalize`] copies the live prefix into the immutable dataset
//! artifact and removes the temporary file.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use memmap2::MmapMut;

use feather_common::{TokenId, TOKEN_BYTES};

/// Initial capacity in tokens; capacity is always `1024 << k` afterwards.
const INITIAL_CAPACITY: usize = 1024;

/// Growable on-disk buffer of token ids, native byte order.
pub struct TokenSink {
    file: File,
    map: MmapMut,
    temp_path: PathBuf,
    len: usize,
    capacity: usize,
}

impl TokenSink {
    /// Create a sink backed by a fresh temporary file at `temp_path`.
    /// An existing file at that path is truncated: a leftover temp file is
    /// an aborted scan, never a reusable artifact.
    pub fn create(temp_path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(temp_path)
            .with_context(|| format!("create temp file {}", temp_path.display()))?;

        file.set_len((INITIAL_CAPACITY * TOKEN_BYTES) as u64)
            .context("size temp file")?;

        // SAFETY: the file is private to this sink until finalize; no other
        // mapping of it exists.
        let map = unsafe { MmapMut::map_mut(&file) }.context("map temp file")?;

        Ok(Self {
            file,
            map,
            temp_path: temp_path.to_path_buf(),
            len: 0,
            capacity: INITIAL_CAPACITY,
        })
    }

    /// Logical length in tokens. Always ≤ [`capacity`](Self::capacity).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current capacity of the backing file in tokens.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append `tokens` at the logical end, growing the backing file first if
    /// needed. Growth extends the file in place, so written data survives.
    pub fn append(&mut self, tokens: &[TokenId]) -> Result<()> {
        let new_len = self.len + tokens.len();

        while new_len > self.capacity {
            self.grow()?;
        }

        let dst = &mut self.map[self.len * TOKEN_BYTES..new_len * TOKEN_BYTES];
        for (slot, token) in dst.chunks_exact_mut(TOKEN_BYTES).zip(tokens) {
            slot.copy_from_slice(&token.to_ne_bytes());
        }

        self.len = new_len;

        Ok(())
    }

    fn grow(&mut self) -> Result<()> {
        let new_capacity = 2 * self.capacity;

        self.file
            .set_len((new_capacity * TOKEN_BYTES) as u64)
            .context("grow temp file")?;

        // SAFETY: same file, same exclusive ownership; the old mapping is
        // dropped on assignment.
        self.map = unsafe { MmapMut::map_mut(&self.file) }.context("remap grown temp file")?;

        self.capacity = new_capacity;

        Ok(())
    }

    /// Write exactly the live prefix to `artifact_path` and remove the
    /// temporary backing file. The artifact is synced before the temp file
    /// goes away, so an existing artifact is always a finalised one.
    pub fn finalize(self, artifact_path: &Path) -> Result<()> {
        let mut out = File::create(artifact_path)
            .with_context(|| format!("create artifact {}", artifact_path.display()))?;

        out.write_all(&self.map[..self.len * TOKEN_BYTES])
            .context("write artifact")?;
        out.sync_all().context("sync artifact")?;

        drop(self.map);
        drop(self.file);

        fs::remove_file(&self.temp_path)
            .with_context(|| format!("remove temp file {}", self.temp_path.display()))?;

        Ok(())
    }
}
