//! Normalized-value index for one side of the benchmark.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use alignbench_rdf::normalize::normalize_for_linking;
use alignbench_rdf::unescape;
use tracing::info;

/// One literal occurrence: the original lexical value and the entity that
/// carries it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub original: String,
    pub owner: String,
}

/// Map from normalized value to its occurrences.
///
/// Iteration follows insertion order so that linking output is
/// deterministic for a given input file; a plain hash map would make the
/// produced link order depend on hasher state.
#[derive(Debug, Clone, Default)]
pub struct ValueIndex {
    keys: Vec<String>,
    buckets: Vec<Vec<Occurrence>>,
    positions: HashMap<String, usize>,
}

impl ValueIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, normalized: String, original: String, owner: String) {
        let occurrence = Occurrence { original, owner };
        match self.positions.get(&normalized) {
            Some(&pos) => self.buckets[pos].push(occurrence),
            None => {
                self.positions.insert(normalized.clone(), self.keys.len());
                self.keys.push(normalized);
                self.buckets.push(vec![occurrence]);
            }
        }
    }

    pub fn get(&self, normalized: &str) -> Option<&[Occurrence]> {
        self.positions
            .get(normalized)
            .map(|&pos| self.buckets[pos].as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Occurrence])> {
        self.keys
            .iter()
            .zip(&self.buckets)
            .map(|(k, b)| (k.as_str(), b.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Build an index by scanning an attribute-triple file for literal
    /// values of the given properties (bare IRIs). Values normalize
    /// through the generic + alias stages; empty normalized values are
    /// dropped.
    pub fn from_attribute_file(
        path: &Path,
        properties: &HashSet<String>,
        aliases: &HashMap<String, String>,
    ) -> Result<Self> {
        let predicates: HashSet<String> =
            properties.iter().map(|p| format!("<{p}>")).collect();
        let file = File::open(path)
            .with_context(|| format!("failed to open attribute file: {}", path.display()))?;

        let mut index = Self::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            let mut cols = line.split('\t');
            let (Some(subject), Some(predicate), Some(object)) =
                (cols.next(), cols.next(), cols.next())
            else {
                continue;
            };
            if !predicates.contains(predicate) {
                continue;
            }
            let Some(inner) = object
                .strip_prefix('"')
                .and_then(|o| o.strip_suffix('"'))
            else {
                continue;
            };
            let original = unescape(inner);
            let normalized = normalize_for_linking(&original, aliases);
            if normalized.is_empty() {
                continue;
            }
            index.insert(normalized, original, subject.to_string());
        }
        info!(
            path = %path.display(),
            distinct_values = index.len(),
            "value index built"
        );
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alignbench_rdf::normalize::default_code_aliases;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn insertion_order_is_preserved() {
        let mut index = ValueIndex::new();
        index.insert("b".into(), "B".into(), "<e1>".into());
        index.insert("a".into(), "A".into(), "<e2>".into());
        index.insert("b".into(), "B2".into(), "<e3>".into());

        let keys: Vec<&str> = index.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(index.get("b").unwrap().len(), 2);
        assert_eq!(index.get("b").unwrap()[1].owner, "<e3>");
    }

    #[test]
    fn builds_from_attribute_file_with_alias_normalization() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "<e1>\t<http://schema.org/isrcCode>\t\"UK-AAA-12-34\"").unwrap();
        writeln!(file, "<e2>\t<http://schema.org/name>\t\"ignored\"").unwrap();
        writeln!(file, "<e3>\t<http://schema.org/isrcCode>\t\"gb-aaa-12-34\"").unwrap();
        writeln!(file, "<e4>\t<http://schema.org/isrcCode>\t\"---\"").unwrap();
        writeln!(file, "<e5>\t<http://schema.org/isrcCode>\t<not-a-literal>").unwrap();

        let props = HashSet::from(["http://schema.org/isrcCode".to_string()]);
        let index =
            ValueIndex::from_attribute_file(file.path(), &props, &default_code_aliases())
                .unwrap();

        // UK and GB variants normalize to the same key; name/empty/node
        // rows are dropped.
        assert_eq!(index.len(), 1);
        let bucket = index.get("gbaaa1234").unwrap();
        assert_eq!(bucket.len(), 2);
        assert_eq!(bucket[0].owner, "<e1>");
        assert_eq!(bucket[0].original, "UK-AAA-12-34");
    }
}
