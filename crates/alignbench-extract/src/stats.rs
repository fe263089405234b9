//! Counting passes over the source dump and over written triple files.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use alignbench_rdf::parse_statement;
use tracing::info;

use crate::filter::StatementFilter;

/// Count, per subject in `subjects`, the source statements that would
/// survive the emission filters. Used to drop links whose source entity
/// would contribute too little signal to the benchmark.
pub fn count_subject_statements(
    source: &Path,
    subjects: &HashSet<String>,
    filter: &StatementFilter,
) -> Result<HashMap<String, u64>> {
    let file = File::open(source)
        .with_context(|| format!("failed to open source: {}", source.display()))?;
    let mut counts: HashMap<String, u64> =
        subjects.iter().map(|s| (s.clone(), 0)).collect();

    for line in BufReader::new(file).lines() {
        let line = line?;
        let Ok(stmt) = parse_statement(&line) else {
            continue;
        };
        if let Some(count) = counts.get_mut(&stmt.subject_key()) {
            if filter.route(&stmt).is_some() {
                *count += 1;
            }
        }
    }
    Ok(counts)
}

fn tsv_columns(line: &str) -> Option<(String, String, String)> {
    let mut parts = line.split('\t');
    let s = parts.next()?;
    let p = parts.next()?;
    let o = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    Some((s.to_string(), p.to_string(), o.to_string()))
}

/// Predicate occurrence counts across written triple files.
pub fn property_frequency(paths: &[&Path]) -> Result<HashMap<String, u64>> {
    let mut counts = HashMap::new();
    for path in paths {
        let file = File::open(path)
            .with_context(|| format!("failed to open triple file: {}", path.display()))?;
        for line in BufReader::new(file).lines() {
            let line = line?;
            if let Some((_, p, _)) = tsv_columns(&line) {
                *counts.entry(p).or_insert(0) += 1;
            }
        }
    }
    Ok(counts)
}

fn copy_frequent(
    input: &Path,
    output: &Path,
    counts: &HashMap<String, u64>,
    min_count: u64,
) -> Result<u64> {
    let file = File::open(input)
        .with_context(|| format!("failed to open triple file: {}", input.display()))?;
    let mut out = BufWriter::new(
        File::create(output)
            .with_context(|| format!("failed to create triple file: {}", output.display()))?,
    );
    let mut kept = 0u64;
    for line in BufReader::new(file).lines() {
        let line = line?;
        let Some((_, p, _)) = tsv_columns(&line) else {
            continue;
        };
        if counts.get(&p).copied().unwrap_or(0) >= min_count {
            writeln!(out, "{line}")?;
            kept += 1;
        }
    }
    out.flush()?;
    Ok(kept)
}

/// Rewrite an attribute/relational file pair keeping only statements whose
/// predicate occurs at least `min_count` times across both files.
pub fn filter_by_property_frequency(
    in_attr: &Path,
    in_rel: &Path,
    out_attr: &Path,
    out_rel: &Path,
    min_count: u64,
) -> Result<(u64, u64)> {
    let counts = property_frequency(&[in_attr, in_rel])?;
    let attr_kept = copy_frequent(in_attr, out_attr, &counts, min_count)?;
    let rel_kept = copy_frequent(in_rel, out_rel, &counts, min_count)?;
    info!(attr_kept, rel_kept, min_count, "property-frequency filter done");
    Ok((attr_kept, rel_kept))
}
