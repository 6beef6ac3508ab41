// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use thiserror::Error;

/// Errors from durable-state operations.
///
/// Read-side corruption is deliberately *not* represented here: corrupted
/// files degrade to defaults at the call site. These errors are the write
/// failures and lookup misses that callers must handle.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot encode {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("cannot encode transcript line: {0}")]
    EncodeLine(#[from] serde_json::Error),

    #[error("job {0} not found")]
    JobNotFound(String),
}

impl StorageError {
    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io { path: path.as_ref().to_path_buf(), source }
    }
}
