//! Entity-link table input.
//!
//! A link table is a tab/CSV-like file of already-discovered identifier
//! pairs. If the first row names the identifier columns (`source_iri`,
//! `target_iri`, optionally `source_value`/`target_value` carrying the
//! literal values that established each link), columns are resolved by
//! name; otherwise a fixed positional layout applies.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{anyhow, Context, Result};

/// Canonical node key for an identifier cell: bracket bare IRIs, leave
/// already-canonical `<...>` / `_:...` tokens alone.
pub fn node_key(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('<') || trimmed.starts_with("_:") {
        trimmed.to_string()
    } else {
        format!("<{trimmed}>")
    }
}

/// One row of the link table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRow {
    pub source: String,
    pub target: String,
    pub source_value: Option<String>,
    pub target_value: Option<String>,
}

impl LinkRow {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            source_value: None,
            target_value: None,
        }
    }
}

/// Positional column layout, used when the file has no recognized header.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub source: usize,
    pub target: usize,
    pub source_value: Option<usize>,
    pub target_value: Option<usize>,
}

impl Default for ColumnSpec {
    fn default() -> Self {
        Self {
            source: 0,
            target: 1,
            source_value: None,
            target_value: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LinkTable {
    pub rows: Vec<LinkRow>,
}

fn normalize_header(cell: &str) -> String {
    cell.trim().to_lowercase().replace(' ', "")
}

impl LinkTable {
    /// Read a link table, resolving columns by header name when the first
    /// row carries the recognized identifier headers.
    pub fn read(path: &Path, separator: char, columns: ColumnSpec) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open link table: {}", path.display()))?;
        let mut lines = BufReader::new(file).lines();

        let Some(first) = lines.next().transpose()? else {
            return Ok(Self::default());
        };

        let header_cells: Vec<String> = first.split(separator).map(normalize_header).collect();
        let by_name: HashMap<&str, usize> = header_cells
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();

        let has_header = by_name.contains_key("source_iri") && by_name.contains_key("target_iri");
        let columns = if has_header {
            ColumnSpec {
                source: by_name["source_iri"],
                target: by_name["target_iri"],
                source_value: columns
                    .source_value
                    .or_else(|| by_name.get("source_value").copied()),
                target_value: columns
                    .target_value
                    .or_else(|| by_name.get("target_value").copied()),
            }
        } else {
            columns
        };

        let mut table = Self::default();
        if !has_header {
            table.push_row(&first, separator, &columns);
        }
        for line in lines {
            table.push_row(&line?, separator, &columns);
        }
        Ok(table)
    }

    fn push_row(&mut self, line: &str, separator: char, columns: &ColumnSpec) {
        let cells: Vec<&str> = line.trim_end_matches('\n').split(separator).collect();
        let needed = columns.source.max(columns.target);
        if cells.len() <= needed {
            return;
        }
        let cell = |idx: Option<usize>| -> Option<String> {
            idx.and_then(|i| cells.get(i))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let source = cells[columns.source].trim();
        let target = cells[columns.target].trim();
        if source.is_empty() || target.is_empty() {
            return;
        }
        self.rows.push(LinkRow {
            source: node_key(source),
            target: node_key(target),
            source_value: cell(columns.source_value),
            target_value: cell(columns.target_value),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Source-side seed identifiers, input order preserved.
    pub fn source_keys(&self) -> Vec<String> {
        self.rows.iter().map(|r| r.source.clone()).collect()
    }

    /// Target-side identifiers, input order preserved.
    pub fn target_keys(&self) -> Vec<String> {
        self.rows.iter().map(|r| r.target.clone()).collect()
    }

    /// Literal values that established the links on the source side.
    pub fn source_mask_values(&self) -> HashSet<String> {
        self.rows
            .iter()
            .filter_map(|r| r.source_value.clone())
            .collect()
    }

    pub fn target_mask_values(&self) -> HashSet<String> {
        self.rows
            .iter()
            .filter_map(|r| r.target_value.clone())
            .collect()
    }

    /// Drop rows whose source identifier is not in `allowed`.
    pub fn retain_sources(&mut self, allowed: &HashSet<String>) {
        self.rows.retain(|r| allowed.contains(&r.source));
    }

    /// Rewrite target identifiers through a merge map.
    pub fn remap_targets(&mut self, merge_map: &HashMap<String, String>) {
        for row in &mut self.rows {
            if let Some(canonical) = merge_map.get(&row.target) {
                row.target = canonical.clone();
            }
        }
    }
}

/// Build an identifier merge map from rows whose target value is known:
/// target identifiers sharing a link value denote the same real-world
/// entity and are coalesced to the lexicographically smallest one.
pub fn build_merge_map(rows: &[LinkRow]) -> Result<HashMap<String, String>> {
    let mut by_value: HashMap<&str, BTreeSet<&str>> = HashMap::new();
    for row in rows {
        if let Some(value) = row.target_value.as_deref() {
            by_value.entry(value).or_default().insert(&row.target);
        }
    }

    let mut merge_map = HashMap::new();
    for ids in by_value.values() {
        if ids.len() <= 1 {
            continue;
        }
        let canonical = ids
            .first()
            .ok_or_else(|| anyhow!("empty merge group"))?
            .to_string();
        for id in ids.iter().skip(1) {
            merge_map.insert(id.to_string(), canonical.clone());
        }
    }
    Ok(merge_map)
}
