//! Label/description enrichment for knowledge-base identifiers.
//!
//! Extracted subgraphs reference opaque entity and property identifiers;
//! the benchmark is more useful when each carries a human-readable label.
//! Lookups go through an injected [`LabelCache`] collaborator so repeated
//! builds do not hammer the endpoint; the cache is a plain get/put seam,
//! not process-wide state.

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{Context, Result};
use alignbench_extract::{TripleWriter, WriteMode};
use alignbench_rdf::Literal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::endpoint::SparqlEndpoint;
use crate::fetcher::FetchConfig;
use crate::query::label_query;
use crate::retry::RetryPolicy;

pub const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
pub const SCHEMA_DESCRIPTION: &str = "http://schema.org/description";

/// Knowledge-base namespace layout: which IRIs denote entities, and how a
/// property IRI maps back to the entity describing that property.
#[derive(Debug, Clone)]
pub struct KbNamespace {
    pub entity_prefix: String,
    pub property_prefix: String,
}

impl KbNamespace {
    pub fn new(entity_prefix: impl Into<String>, property_prefix: impl Into<String>) -> Self {
        Self {
            entity_prefix: entity_prefix.into(),
            property_prefix: property_prefix.into(),
        }
    }

    pub fn wikidata() -> Self {
        Self::new(
            "http://www.wikidata.org/entity/",
            "http://www.wikidata.org/prop/",
        )
    }

    pub fn is_entity(&self, iri: &str) -> bool {
        iri.starts_with(&self.entity_prefix)
    }

    /// Entity form of a property IRI (`.../prop/direct/P238` → the `P238`
    /// entity), if the IRI lives in the property namespace.
    pub fn property_to_entity(&self, iri: &str) -> Option<String> {
        if !iri.starts_with(&self.property_prefix) {
            return None;
        }
        let tail = iri.trim_end_matches('/').rsplit('/').next()?;
        if !tail.starts_with('P') {
            return None;
        }
        Some(format!("{}{tail}", self.entity_prefix))
    }
}

/// Collect knowledge-base IRIs referenced by written triple files:
/// entity subjects/objects plus property IRIs in their entity form.
pub fn collect_kb_iris(paths: &[&Path], ns: &KbNamespace) -> Result<BTreeSet<String>> {
    let mut iris = BTreeSet::new();
    for path in paths {
        let file = File::open(path)
            .with_context(|| format!("failed to open triple file: {}", path.display()))?;
        for line in BufReader::new(file).lines() {
            let line = line?;
            let mut cols = line.split('\t');
            let (Some(s), Some(p), Some(o)) = (cols.next(), cols.next(), cols.next()) else {
                continue;
            };
            for token in [s, o] {
                let iri = token.trim_start_matches('<').trim_end_matches('>');
                if ns.is_entity(iri) {
                    iris.insert(iri.to_string());
                }
            }
            let p_iri = p.trim_start_matches('<').trim_end_matches('>');
            if let Some(entity) = ns.property_to_entity(p_iri) {
                iris.insert(entity);
            }
        }
    }
    Ok(iris)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEntry {
    pub label: Option<String>,
    pub description: Option<String>,
}

/// Injected key-value store for label lookups.
pub trait LabelCache {
    fn get(&self, iri: &str) -> Option<&LabelEntry>;
    fn put(&mut self, iri: &str, entry: LabelEntry);
    fn flush(&mut self) -> Result<()>;
}

/// JSON-file-backed cache (one object, IRI → entry).
pub struct JsonFileCache {
    path: PathBuf,
    entries: HashMap<String, LabelEntry>,
}

impl JsonFileCache {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read label cache: {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("invalid label cache: {}", path.display()))?
        } else {
            HashMap::new()
        };
        Ok(Self { path, entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl LabelCache for JsonFileCache {
    fn get(&self, iri: &str) -> Option<&LabelEntry> {
        self.entries.get(iri)
    }

    fn put(&mut self, iri: &str, entry: LabelEntry) {
        self.entries.insert(iri.to_string(), entry);
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&self.entries)?)
            .with_context(|| format!("failed to write label cache: {}", self.path.display()))?;
        Ok(())
    }
}

fn decode_bindings(json: &serde_json::Value, found: &mut HashMap<String, LabelEntry>) {
    let Some(bindings) = json
        .get("results")
        .and_then(|r| r.get("bindings"))
        .and_then(|b| b.as_array())
    else {
        return;
    };
    for row in bindings {
        let Some(iri) = row
            .get("s")
            .and_then(|s| s.get("value"))
            .and_then(|v| v.as_str())
        else {
            continue;
        };
        let entry = found.entry(iri.to_string()).or_default();
        if let Some(label) = row
            .get("label")
            .and_then(|l| l.get("value"))
            .and_then(|v| v.as_str())
        {
            entry.label = Some(label.to_string());
        }
        if let Some(desc) = row
            .get("desc")
            .and_then(|d| d.get("value"))
            .and_then(|v| v.as_str())
        {
            entry.description = Some(desc.to_string());
        }
    }
}

/// Fetch labels/descriptions for every knowledge-base IRI referenced by
/// the written files and append them to the attribute file.
///
/// Cached IRIs are never re-queried; their entries still contribute
/// appended lines, since enrichment runs once per produced benchmark.
/// Returns the number of appended attribute lines.
pub fn enrich_with_labels(
    endpoint: &dyn SparqlEndpoint,
    cache: &mut dyn LabelCache,
    config: &FetchConfig,
    retry: &RetryPolicy,
    ns: &KbNamespace,
    attr_path: &Path,
    rel_path: &Path,
) -> Result<u64> {
    let iris = collect_kb_iris(&[attr_path, rel_path], ns)?;
    if iris.is_empty() {
        return Ok(0);
    }

    let to_query: Vec<String> = iris
        .iter()
        .filter(|iri| cache.get(iri).is_none())
        .cloned()
        .collect();
    info!(
        referenced = iris.len(),
        uncached = to_query.len(),
        "label enrichment"
    );

    for (i, batch) in to_query.chunks(config.batch_size).enumerate() {
        let tokens: Vec<String> = batch.iter().map(|iri| format!("<{iri}>")).collect();
        let query = label_query(&tokens, &config.language);

        let mut attempt = 0u32;
        let json = loop {
            match endpoint.select(&query) {
                Ok(json) => break Some(json),
                Err(err) => {
                    attempt += 1;
                    if attempt > retry.max_retries {
                        warn!(batch = i + 1, %err, "label batch abandoned after retries");
                        break None;
                    }
                    warn!(batch = i + 1, attempt, %err, "label fetch failure, retrying");
                    thread::sleep(retry.delay(attempt));
                }
            }
        };

        if let Some(json) = json {
            let mut found = HashMap::new();
            decode_bindings(&json, &mut found);
            for iri in batch {
                cache.put(iri, found.remove(iri).unwrap_or_default());
            }
        }

        if !config.min_delay.is_zero() {
            thread::sleep(config.min_delay);
        }
    }
    cache.flush()?;

    let mut writer = TripleWriter::open(attr_path, WriteMode::Append)?;
    let mut appended = 0u64;
    for iri in &iris {
        let Some(entry) = cache.get(iri) else {
            continue;
        };
        let subject = format!("<{iri}>");
        if let Some(label) = &entry.label {
            writer.write_attribute(
                &subject,
                &format!("<{RDFS_LABEL}>"),
                &Literal::plain(label.clone()),
            )?;
            appended += 1;
        }
        if let Some(desc) = &entry.description {
            writer.write_attribute(
                &subject,
                &format!("<{SCHEMA_DESCRIPTION}>"),
                &Literal::plain(desc.clone()),
            )?;
            appended += 1;
        }
    }
    writer.flush()?;
    Ok(appended)
}
