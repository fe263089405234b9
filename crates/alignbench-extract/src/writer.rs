//! Tab-separated triple and link file writers.
//!
//! File contract (consumed downstream by the alignment model, fixed):
//!
//! - triple files: `subject<TAB>predicate<TAB>object`, object either
//!   node text (`<...>` / `_:...`) or a double-quoted literal; attribute
//!   files carry the bare quoted form, language/datatype stripped;
//! - link files: `sourceIRI<TAB>targetIRI`, no header.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use alignbench_rdf::Literal;

use crate::filter::Routed;
use crate::links::LinkRow;

/// Truncate on a fresh run, append when resuming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Truncate,
    Append,
}

fn open(path: &Path, mode: WriteMode) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = match mode {
        WriteMode::Truncate => File::create(path),
        WriteMode::Append => OpenOptions::new().create(true).append(true).open(path),
    }
    .with_context(|| format!("failed to open output file: {}", path.display()))?;
    Ok(BufWriter::new(file))
}

/// One tab-separated triple file.
pub struct TripleWriter {
    out: BufWriter<File>,
    pub lines: u64,
}

impl TripleWriter {
    pub fn open(path: &Path, mode: WriteMode) -> Result<Self> {
        Ok(Self {
            out: open(path, mode)?,
            lines: 0,
        })
    }

    /// Attribute line; the literal is written in its bare quoted form.
    pub fn write_attribute(
        &mut self,
        subject: &str,
        predicate: &str,
        literal: &Literal,
    ) -> Result<()> {
        writeln!(self.out, "{subject}\t{predicate}\t{}", literal.bare())?;
        self.lines += 1;
        Ok(())
    }

    pub fn write_relation(&mut self, subject: &str, predicate: &str, object: &str) -> Result<()> {
        writeln!(self.out, "{subject}\t{predicate}\t{object}")?;
        self.lines += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// Attribute + relational writer pair fed by [`Routed`] statements.
pub struct SplitWriter {
    pub attr: TripleWriter,
    pub rel: TripleWriter,
}

impl SplitWriter {
    pub fn open(attr_path: &Path, rel_path: &Path, mode: WriteMode) -> Result<Self> {
        Ok(Self {
            attr: TripleWriter::open(attr_path, mode)?,
            rel: TripleWriter::open(rel_path, mode)?,
        })
    }

    pub fn write(&mut self, routed: &Routed) -> Result<()> {
        match routed {
            Routed::Attribute {
                subject,
                predicate,
                literal,
            } => self.attr.write_attribute(subject, predicate, literal),
            Routed::Relation {
                subject,
                predicate,
                object,
            } => self.rel.write_relation(subject, predicate, object),
        }
    }

    pub fn flush(&mut self) -> Result<()> {
        self.attr.flush()?;
        self.rel.flush()
    }
}

/// Entity-link pair writer, optionally deduplicating on the pair key.
pub struct LinkWriter;

impl LinkWriter {
    pub fn write(path: &Path, rows: &[LinkRow], dedupe: bool) -> Result<u64> {
        let mut out = open(path, WriteMode::Truncate)?;
        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut written = 0u64;
        for row in rows {
            if row.source.is_empty() || row.target.is_empty() {
                continue;
            }
            if dedupe && !seen.insert((row.source.clone(), row.target.clone())) {
                continue;
            }
            writeln!(out, "{}\t{}", row.source, row.target)?;
            written += 1;
        }
        out.flush()?;
        Ok(written)
    }
}
