//! Bounded-depth subject closure over a disk-resident source.
//!
//! The source never fits in memory, so the closure is an explicit
//! frontier/processed fixed point over repeated full streaming passes,
//! never recursive descent. Each hop costs one pass; memory stays
//! O(|processed|) and total I/O is O(depth x source size).

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use alignbench_rdf::{parse_statement, Statement};
use tracing::{debug, info};

use crate::filter::StatementFilter;
use crate::writer::SplitWriter;

#[derive(Debug, Clone, Copy)]
pub struct ClosureOptions {
    /// Maximum blank-node hops from the seed set; `-1` iterates until no
    /// new blank node is discovered.
    pub max_depth: i64,
    /// Emit a progress event every N source lines (0 = off).
    pub progress_every: u64,
}

impl Default for ClosureOptions {
    fn default() -> Self {
        Self {
            max_depth: 1,
            progress_every: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractStats {
    pub passes: u64,
    pub discovered_blank_nodes: u64,
    pub attribute_lines: u64,
    pub relational_lines: u64,
}

pub struct ClosureExtractor {
    seeds: BTreeSet<String>,
    options: ClosureOptions,
    filter: StatementFilter,
}

impl ClosureExtractor {
    pub fn new(
        seeds: impl IntoIterator<Item = String>,
        options: ClosureOptions,
        filter: StatementFilter,
    ) -> Result<Self> {
        let seeds: BTreeSet<String> = seeds.into_iter().filter(|s| !s.is_empty()).collect();
        if seeds.is_empty() {
            return Err(anyhow!("closure extraction requires a non-empty seed set"));
        }
        Ok(Self {
            seeds,
            options,
            filter,
        })
    }

    /// One full streaming pass; malformed lines are skipped.
    fn stream(&self, source: &Path, mut visit: impl FnMut(&Statement)) -> Result<u64> {
        let file = File::open(source)
            .with_context(|| format!("failed to open source: {}", source.display()))?;
        let reader = BufReader::new(file);
        let mut line_no = 0u64;
        for line in reader.lines() {
            let line = line?;
            line_no += 1;
            if self.options.progress_every > 0 && line_no % self.options.progress_every == 0 {
                debug!(lines = line_no, "streaming pass progress");
            }
            if let Ok(stmt) = parse_statement(&line) {
                visit(&stmt);
            }
        }
        Ok(line_no)
    }

    /// Expand the seed set through blank-node objects, one pass per hop.
    ///
    /// Discovery ignores the emission filters: the closure must not
    /// depend on sanitization settings. Invariant at the start of each
    /// pass: no frontier identifier has been expanded before.
    pub fn discover(&self, source: &Path) -> Result<(BTreeSet<String>, ExtractStats)> {
        let mut stats = ExtractStats::default();
        let mut processed = self.seeds.clone();
        let mut frontier = self.seeds.clone();
        let mut hop = 0i64;

        while !frontier.is_empty() {
            if self.options.max_depth >= 0 && hop >= self.options.max_depth {
                break;
            }
            let mut next: BTreeSet<String> = BTreeSet::new();
            self.stream(source, |stmt| {
                if !stmt.object.is_blank_node() {
                    return;
                }
                if !frontier.contains(&stmt.subject_key()) {
                    return;
                }
                let key = stmt.object.key();
                if !processed.contains(&key) {
                    next.insert(key);
                }
            })?;
            stats.passes += 1;
            stats.discovered_blank_nodes += next.len() as u64;
            info!(
                hop = hop + 1,
                new_blank_nodes = next.len(),
                subjects = processed.len() + next.len(),
                "closure discovery pass done"
            );
            processed.extend(next.iter().cloned());
            frontier = next;
            hop += 1;
        }

        Ok((processed, stats))
    }

    /// Full extraction: discovery passes, then one emission pass that
    /// routes every statement of a closed-over subject through the
    /// filters into the attribute/relational writers. Emission order
    /// follows source line order.
    pub fn extract(&self, source: &Path, out: &mut SplitWriter) -> Result<ExtractStats> {
        let (processed, mut stats) = self.discover(source)?;

        let mut write_err = None;
        self.stream(source, |stmt| {
            if write_err.is_some() || !processed.contains(&stmt.subject_key()) {
                return;
            }
            if let Some(routed) = self.filter.route(stmt) {
                if let Err(e) = out.write(&routed) {
                    write_err = Some(e);
                }
            }
        })?;
        if let Some(e) = write_err {
            return Err(e);
        }
        stats.passes += 1;
        out.flush()?;

        stats.attribute_lines = out.attr.lines;
        stats.relational_lines = out.rel.lines;
        info!(
            attr = stats.attribute_lines,
            rel = stats.relational_lines,
            passes = stats.passes,
            "extraction done"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::WriteMode;
    use std::collections::{HashMap, HashSet};
    use std::io::Write;
    use tempfile::tempdir;

    const SOURCE: &str = "\
<e1> <p> \"v\" .\n\
<e1> <q> _:b1 .\n\
_:b1 <r> \"w\" .\n\
_:b1 <s> _:b2 .\n\
_:b2 <t> \"x\" .\n\
<e2> <p> \"unrelated\" .\n\
this line is garbage\n";

    fn run(max_depth: i64, filter: StatementFilter) -> (String, String) {
        let dir = tempdir().unwrap();
        let source = dir.path().join("dump.nq");
        std::fs::File::create(&source)
            .unwrap()
            .write_all(SOURCE.as_bytes())
            .unwrap();

        let attr = dir.path().join("attr");
        let rel = dir.path().join("rel");
        let extractor = ClosureExtractor::new(
            ["<e1>".to_string()],
            ClosureOptions {
                max_depth,
                progress_every: 0,
            },
            filter,
        )
        .unwrap();
        let mut out = SplitWriter::open(&attr, &rel, WriteMode::Truncate).unwrap();
        extractor.extract(&source, &mut out).unwrap();
        (
            std::fs::read_to_string(&attr).unwrap(),
            std::fs::read_to_string(&rel).unwrap(),
        )
    }

    #[test]
    fn depth_zero_emits_exactly_the_seed_subjects() {
        let (attr, rel) = run(0, StatementFilter::default());
        assert_eq!(attr, "<e1>\t<p>\t\"v\"\n");
        assert_eq!(rel, "<e1>\t<q>\t_:b1\n");
    }

    #[test]
    fn depth_one_follows_one_blank_node_hop() {
        let (attr, rel) = run(1, StatementFilter::default());
        assert!(attr.contains("<e1>\t<p>\t\"v\""));
        assert!(attr.contains("_:b1\t<r>\t\"w\""));
        assert!(rel.contains("<e1>\t<q>\t_:b1"));
        // b2 is at hop 2: its own statements stay out.
        assert!(!attr.contains("_:b2\t<t>"));
        // Unrelated subjects never appear.
        assert!(!attr.contains("<e2>"));
    }

    #[test]
    fn unbounded_depth_reaches_the_fixpoint() {
        let (attr, _rel) = run(-1, StatementFilter::default());
        assert!(attr.contains("_:b2\t<t>\t\"x\""));
    }

    #[test]
    fn masked_values_never_reach_the_attribute_output() {
        let filter = StatementFilter::new(
            HashSet::new(),
            HashSet::from(["v".to_string(), "w".to_string()]),
            HashMap::new(),
        );
        let (attr, rel) = run(1, filter);
        assert!(!attr.contains("\"v\""));
        assert!(!attr.contains("\"w\""));
        // Masking only affects literals; the relational stream is intact.
        assert!(rel.contains("<e1>\t<q>\t_:b1"));
    }

    #[test]
    fn excluded_predicates_do_not_stop_discovery() {
        // <q> is excluded from emission, but _:b1 must still be found
        // through it.
        let filter = StatementFilter::new(
            HashSet::from(["q".to_string()]),
            HashSet::new(),
            HashMap::new(),
        );
        let (attr, rel) = run(1, filter);
        assert!(!rel.contains("<e1>\t<q>"));
        assert!(attr.contains("_:b1\t<r>\t\"w\""));
    }

    #[test]
    fn empty_seed_set_is_a_configuration_error() {
        let result = ClosureExtractor::new(
            Vec::<String>::new(),
            ClosureOptions::default(),
            StatementFilter::default(),
        );
        assert!(result.is_err());
    }
}
