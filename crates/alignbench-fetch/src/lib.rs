//! Batched remote fetching for the target side of the benchmark.
//!
//! The public knowledge base only answers bounded-size batched queries,
//! rate-limits callers, and fails transiently at scale. This crate wraps
//! that reality:
//!
//! - [`endpoint`]: the [`SparqlEndpoint`] trait seam plus the blocking
//!   HTTP implementation; queries are read-only, so re-issuing a batch can
//!   at worst duplicate locally-written output.
//! - [`query`]: the two query shapes actually needed, a VALUES-bound
//!   CONSTRUCT for entity subgraphs and a VALUES-bound SELECT for
//!   labels/descriptions.
//! - [`retry`]: the retry policy value (max attempts, exponential
//!   backoff).
//! - [`state`]: the durable resume checkpoint.
//! - [`fetcher`]: the batch loop that skips completed batches, retries
//!   transient failures, abandons exhausted batches non-fatally and
//!   persists state after every success.
//! - [`labels`]: label/description enrichment behind an injected
//!   key-value cache collaborator.

pub mod endpoint;
pub mod fetcher;
pub mod labels;
pub mod query;
pub mod retry;
pub mod state;

pub use endpoint::{FetchError, HttpEndpoint, SparqlEndpoint};
pub use fetcher::{FetchConfig, FetchStats, Fetcher};
pub use labels::{
    collect_kb_iris, enrich_with_labels, JsonFileCache, KbNamespace, LabelCache, LabelEntry,
};
pub use retry::RetryPolicy;
pub use state::BatchState;
