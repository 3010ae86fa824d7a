//! Newline-delimited checkpoint log.
//!
//! One identifier per line, appended and synced as soon as the identifier's
//! outcome is known. Lines are never rewritten; duplicates collapse on load.

use crate::domain::ports::CheckpointStore;
use crate::utils::error::{HarvestError, Result};
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

#[derive(Debug)]
pub struct FileCheckpointStore {
    path: PathBuf,
    file: Option<File>,
}

impl FileCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    fn error(&self, message: impl std::fmt::Display) -> HarvestError {
        HarvestError::CheckpointError {
            path: self.path.display().to_string(),
            message: message.to_string(),
        }
    }

    fn writer(&mut self) -> Result<&mut File> {
        let file = match self.file.take() {
            Some(file) => file,
            None => {
                if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent).map_err(|e| self.error(e))?;
                }
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.path)
                    .map_err(|e| self.error(e))?
            }
        };
        Ok(self.file.insert(file))
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load(&self) -> Result<HashSet<String>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("📭 No checkpoint log at {}, starting fresh", self.path.display());
                return Ok(HashSet::new());
            }
            Err(e) => return Err(self.error(e)),
        };

        let handled: HashSet<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        tracing::info!(
            "📌 Loaded {} handled identifiers from {}",
            handled.len(),
            self.path.display()
        );
        Ok(handled)
    }

    fn record(&mut self, identifier: &str) -> Result<()> {
        let path = self.path.display().to_string();
        let to_error = |e: std::io::Error| HarvestError::CheckpointError {
            path: path.clone(),
            message: e.to_string(),
        };

        let file = self.writer()?;
        writeln!(file, "{}", identifier).map_err(to_error)?;
        file.flush().map_err(to_error)?;
        file.sync_data().map_err(to_error)?;
        Ok(())
    }
}
