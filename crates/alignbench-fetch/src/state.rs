//! Durable resume checkpoint for batched fetching.
//!
//! The state file is written after every successfully completed batch and
//! deleted only once every batch has been attempted; if the process dies
//! mid-run, the file from the last batch boundary is the sole resumption
//! point. A batch index present in `completed_batches` is never reissued
//! in the same or a resumed run.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchState {
    pub completed_batches: BTreeSet<usize>,
    pub batch_size: usize,
    pub total_items: usize,
    pub language: String,
    pub endpoint: String,
}

impl BatchState {
    pub fn new(batch_size: usize, total_items: usize, language: &str, endpoint: &str) -> Self {
        Self {
            completed_batches: BTreeSet::new(),
            batch_size,
            total_items,
            language: language.to_string(),
            endpoint: endpoint.to_string(),
        }
    }

    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read resume state: {}", path.display()))?;
        let state = serde_json::from_str(&text)
            .with_context(|| format!("invalid resume state: {}", path.display()))?;
        Ok(Some(state))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("failed to write resume state: {}", path.display()))?;
        Ok(())
    }

    pub fn delete(path: &Path) -> Result<()> {
        if path.exists() {
            fs::remove_file(path)
                .with_context(|| format!("failed to delete resume state: {}", path.display()))?;
        }
        Ok(())
    }

    /// A loaded state must describe the same run we are about to resume;
    /// anything else silently misassigns batch indices.
    pub fn check_compatible(
        &self,
        batch_size: usize,
        total_items: usize,
        endpoint: &str,
    ) -> Result<()> {
        if self.batch_size != batch_size {
            return Err(anyhow!(
                "resume state batch size {} does not match configured {}",
                self.batch_size,
                batch_size
            ));
        }
        if self.total_items != total_items {
            return Err(anyhow!(
                "resume state covers {} items, run has {}",
                self.total_items,
                total_items
            ));
        }
        if self.endpoint != endpoint {
            return Err(anyhow!(
                "resume state endpoint {} does not match configured {}",
                self.endpoint,
                endpoint
            ));
        }
        Ok(())
    }
}
