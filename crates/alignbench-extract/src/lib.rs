//! Streaming subgraph extraction for alignbench.
//!
//! The source corpus is a line-oriented N-Quads/N-Triples dump that may be
//! arbitrarily larger than memory, so everything here works in full
//! streaming passes over the file:
//!
//! - [`closure`] computes the bounded-depth blank-node closure of a seed
//!   entity set (frontier/processed fixed point, one pass per hop) and
//!   emits the induced subgraph in a final pass.
//! - [`filter`] applies the shared emission filters: predicate exclusion,
//!   literal-value masking, identifier replacement, attribute/relational
//!   routing.
//! - [`links`] reads and writes the entity-link table.
//! - [`writer`] serializes triple and link files in the benchmark layout.
//! - [`stats`] holds the per-subject and per-predicate counting passes.

pub mod closure;
pub mod filter;
pub mod links;
pub mod stats;
pub mod writer;

pub use closure::{ClosureExtractor, ClosureOptions, ExtractStats};
pub use filter::{Routed, StatementFilter};
pub use links::{node_key, ColumnSpec, LinkRow, LinkTable};
pub use writer::{LinkWriter, SplitWriter, TripleWriter, WriteMode};
