// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generic atomic snapshot persistence for crash recovery (SPEC_FULL.md
//! §4.6). Both the port registry and the session catalog are serialized
//! through this same primitive into their own files.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// On-disk envelope around a state value of type `T`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot<T> {
    pub state: T,
    pub saved_at: DateTime<Utc>,
}

impl<T> Snapshot<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    pub fn new(state: T) -> Self {
        Self {
            state,
            saved_at: Utc::now(),
        }
    }

    /// Save atomically: write to a `.tmp` sibling, fsync, then rename over
    /// the target. A crash mid-write leaves the previous file untouched.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = path.with_extension("tmp");
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, self)?;
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Load the snapshot at `path`, or `Ok(None)` if it doesn't exist.
    ///
    /// A corrupt file is rotated into `.bak` (keeping up to
    /// [`MAX_BAK_FILES`] generations) and treated as absent, so the caller
    /// starts fresh instead of failing startup outright.
    pub fn load(path: &Path) -> Result<Option<Self>, SnapshotError> {
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(path)?;
        let reader = BufReader::new(file);
        match serde_json::from_reader(reader) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                let bak_path = rotate_bak_path(path);
                warn!(
                    error = %e,
                    path = %path.display(),
                    bak = %bak_path.display(),
                    "corrupt snapshot, moving to .bak and starting fresh",
                );
                fs::rename(path, &bak_path)?;
                Ok(None)
            }
        }
    }

    /// Save `path`'s current contents as a `.bak` before overwriting it,
    /// preserving the pre-write state even when the new write succeeds.
    pub fn save_with_backup(&self, path: &Path) -> Result<(), SnapshotError> {
        if path.exists() {
            let bak_path = rotate_bak_path(path);
            fs::copy(path, &bak_path)?;
        }
        self.save(path)
    }
}

const MAX_BAK_FILES: u32 = 3;

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out. Keeps
/// up to [`MAX_BAK_FILES`] backups; the oldest is dropped once at capacity.
pub(crate) fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }

    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }

    bak(1)
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
