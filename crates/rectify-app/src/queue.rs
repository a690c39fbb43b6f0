// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch queue: the set of input files for one `process` run and the
// per-file outcome.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use rectify_core::{QueueStatus, Result, SupportedFormat};
use tracing::{debug, info, warn};

/// One input file and how far it got.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem {
    pub path: PathBuf,
    pub status: QueueStatus,
    pub error_message: Option<String>,
}

impl QueueItem {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            status: QueueStatus::Pending,
            error_message: None,
        }
    }

    pub fn mark_done(&mut self) {
        self.status = QueueStatus::Done;
        self.error_message = None;
    }

    pub fn mark_error(&mut self, message: impl Into<String>) {
        self.status = QueueStatus::Error;
        self.error_message = Some(message.into());
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

impl fmt::Display for QueueItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_message {
            Some(msg) => write!(f, "{} [{}: {}]", self.file_name(), self.status, msg),
            None => write!(f, "{} [{}]", self.file_name(), self.status),
        }
    }
}

/// Ordered, duplicate-free list of files to process.
#[derive(Debug, Default)]
pub struct BatchQueue {
    items: Vec<QueueItem>,
    seen: HashSet<PathBuf>,
}

impl BatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a queue from command-line inputs.
    ///
    /// Files are taken as given (their format is checked when they are
    /// loaded). Directories contribute their supported images, sorted by
    /// name; subdirectories are not descended into.
    pub fn from_inputs(inputs: &[PathBuf]) -> Result<Self> {
        let mut queue = Self::new();
        for input in inputs {
            if input.is_dir() {
                for path in scan_directory(input)? {
                    queue.push(path);
                }
            } else {
                queue.push(input.clone());
            }
        }
        info!(items = queue.len(), "Batch queue built");
        Ok(queue)
    }

    /// Append `path` unless it is already queued. Returns whether it was added.
    pub fn push(&mut self, path: PathBuf) -> bool {
        let key = std::fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
        if !self.seen.insert(key) {
            debug!(path = %path.display(), "Skipping duplicate input");
            return false;
        }
        self.items.push(QueueItem::new(path));
        true
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    pub fn items_mut(&mut self) -> impl Iterator<Item = &mut QueueItem> {
        self.items.iter_mut()
    }

    pub fn count(&self, status: QueueStatus) -> usize {
        self.items.iter().filter(|i| i.status == status).count()
    }

    pub fn has_failures(&self) -> bool {
        self.count(QueueStatus::Error) > 0
    }
}

/// Supported image files directly inside `dir`, sorted by path.
fn scan_directory(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(err) => {
                warn!(dir = %dir.display(), %err, "Unreadable directory entry");
                continue;
            }
        };
        if path.is_file() && SupportedFormat::from_path(&path).is_ok() {
            found.push(path);
        }
    }
    found.sort();
    debug!(dir = %dir.display(), images = found.len(), "Directory scanned");
    Ok(found)
}
