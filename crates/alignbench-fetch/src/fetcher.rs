//! The resumable batch loop.

use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use alignbench_extract::{SplitWriter, StatementFilter};
use alignbench_rdf::{parse_statement, Statement};
use tracing::{info, warn};
use url::Url;

use crate::endpoint::{FetchError, SparqlEndpoint};
use crate::query::construct_query;
use crate::retry::RetryPolicy;
use crate::state::BatchState;

/// All fetcher tunables in one validated value.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub endpoint: String,
    pub batch_size: usize,
    pub language: String,
    pub timeout: Duration,
    /// Minimum delay between successive remote calls, enforced regardless
    /// of batch outcome.
    pub min_delay: Duration,
    pub user_agent: String,
}

impl FetchConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            batch_size: 50,
            language: "en".to_string(),
            timeout: Duration::from_secs(60),
            min_delay: Duration::from_secs(1),
            user_agent: "alignbench/0.3 (+https://github.com/alignbench/alignbench)".to_string(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.endpoint)
            .with_context(|| format!("invalid endpoint url: {}", self.endpoint))?;
        if self.batch_size == 0 {
            return Err(anyhow!("batch size must be at least 1"));
        }
        if self.language.is_empty() {
            return Err(anyhow!("language tag must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FetchStats {
    pub batches: usize,
    pub completed: usize,
    pub skipped: usize,
    pub abandoned: usize,
    pub attribute_lines: u64,
    pub relational_lines: u64,
}

pub struct Fetcher {
    config: FetchConfig,
    retry: RetryPolicy,
    filter: StatementFilter,
}

impl Fetcher {
    pub fn new(config: FetchConfig, retry: RetryPolicy, filter: StatementFilter) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            retry,
            filter,
        })
    }

    /// One CONSTRUCT round-trip for one batch; response lines that fail
    /// to parse are skipped like any other corrupt source line.
    fn fetch_batch(
        &self,
        endpoint: &dyn SparqlEndpoint,
        batch: &[String],
    ) -> Result<Vec<Statement>, FetchError> {
        let query = construct_query(batch, &self.config.language);
        let body = endpoint.construct(&query)?;
        Ok(body
            .lines()
            .filter_map(|line| parse_statement(line).ok())
            .collect())
    }

    /// Fetch all batches in stable input order, skipping those already in
    /// the resume state.
    ///
    /// Batch output is appended before the completion state is persisted,
    /// so a crash between the two replays that batch on resume: local
    /// output is at-least-once, never lost. Exhausted retries abandon the
    /// batch (logged, non-fatal) and move on. The state file is deleted
    /// once every batch has been attempted.
    pub fn run(
        &self,
        endpoint: &dyn SparqlEndpoint,
        identifiers: &[String],
        out: &mut SplitWriter,
        state_path: Option<&Path>,
        resume: bool,
    ) -> Result<FetchStats> {
        if identifiers.is_empty() {
            return Err(anyhow!("remote fetch requires a non-empty identifier set"));
        }

        let mut state = match (resume, state_path) {
            (true, Some(path)) => match BatchState::load(path)? {
                Some(prev) => {
                    prev.check_compatible(
                        self.config.batch_size,
                        identifiers.len(),
                        &self.config.endpoint,
                    )?;
                    info!(
                        completed = prev.completed_batches.len(),
                        "resuming from persisted batch state"
                    );
                    prev
                }
                None => self.fresh_state(identifiers.len()),
            },
            _ => self.fresh_state(identifiers.len()),
        };

        let mut stats = FetchStats::default();
        for (i, batch) in identifiers.chunks(self.config.batch_size).enumerate() {
            let batch_idx = i + 1;
            stats.batches += 1;

            if state.completed_batches.contains(&batch_idx) {
                stats.skipped += 1;
                continue;
            }

            info!(batch = batch_idx, size = batch.len(), "fetching batch");
            let statements = self.fetch_with_retry(endpoint, batch, batch_idx);

            match statements {
                Some(statements) => {
                    for stmt in &statements {
                        if let Some(routed) = self.filter.route(stmt) {
                            out.write(&routed)?;
                        }
                    }
                    out.flush()?;
                    state.completed_batches.insert(batch_idx);
                    if let Some(path) = state_path {
                        state.save(path)?;
                    }
                    stats.completed += 1;
                }
                None => stats.abandoned += 1,
            }

            if !self.config.min_delay.is_zero() {
                thread::sleep(self.config.min_delay);
            }
        }

        stats.attribute_lines = out.attr.lines;
        stats.relational_lines = out.rel.lines;

        if let Some(path) = state_path {
            BatchState::delete(path)?;
        }
        info!(
            completed = stats.completed,
            skipped = stats.skipped,
            abandoned = stats.abandoned,
            attr = stats.attribute_lines,
            rel = stats.relational_lines,
            "remote fetch done"
        );
        Ok(stats)
    }

    fn fresh_state(&self, total_items: usize) -> BatchState {
        BatchState::new(
            self.config.batch_size,
            total_items,
            &self.config.language,
            &self.config.endpoint,
        )
    }

    fn fetch_with_retry(
        &self,
        endpoint: &dyn SparqlEndpoint,
        batch: &[String],
        batch_idx: usize,
    ) -> Option<Vec<Statement>> {
        let mut attempt = 0u32;
        loop {
            match self.fetch_batch(endpoint, batch) {
                Ok(statements) => return Some(statements),
                Err(err) => {
                    attempt += 1;
                    if attempt > self.retry.max_retries {
                        warn!(batch = batch_idx, %err, "batch abandoned after retries");
                        return None;
                    }
                    let delay = self.retry.delay(attempt);
                    warn!(
                        batch = batch_idx,
                        attempt,
                        max_retries = self.retry.max_retries,
                        delay_secs = delay.as_secs_f64(),
                        %err,
                        "transient fetch failure, retrying"
                    );
                    thread::sleep(delay);
                }
            }
        }
    }
}
