//! Exact + prefix-fuzzy pairing of two value indices.

use std::collections::HashSet;
use std::fmt;

use tracing::info;

use crate::index::ValueIndex;

/// Minimum normalized-value length eligible for fuzzy matching. Standard
/// ISRCs are 12 characters; 8 tolerates truncation while keeping short
/// codes out of the prefix phase.
pub const DEFAULT_MIN_FUZZY_LENGTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMethod {
    Exact,
    /// Prefix match over the first `L` characters (the shorter key's
    /// length).
    Fuzzy(usize),
}

impl fmt::Display for LinkMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkMethod::Exact => write!(f, "exact"),
            LinkMethod::Fuzzy(len) => write!(f, "fuzzy:{len}"),
        }
    }
}

/// A claimed correspondence between one identifier from each side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityLink {
    pub source_iri: String,
    pub target_iri: String,
    pub source_value: String,
    pub target_value: String,
    pub method: LinkMethod,
}

/// Produce deduplicated entity links from two value indices.
///
/// Phase 1 pairs every occurrence under keys present in both indices
/// (`exact`; no length filter). Phase 2 pairs keys of length ≥
/// `min_fuzzy_length` whose shorter-length prefixes agree (`fuzzy:<L>`).
/// The `(source, target)` identity key is unique in the result; the
/// earliest phase that produced a pair wins.
///
/// Phase 2 is O(|source keys| × |target keys|), acceptable because both
/// indices are pre-scoped to the value domain of a single property.
pub fn link_indices(
    source: &ValueIndex,
    target: &ValueIndex,
    min_fuzzy_length: usize,
) -> Vec<EntityLink> {
    let mut matched: HashSet<(String, String)> = HashSet::new();
    let mut links = Vec::new();

    for (key, source_bucket) in source.iter() {
        let Some(target_bucket) = target.get(key) else {
            continue;
        };
        for s in source_bucket {
            for t in target_bucket {
                if matched.insert((s.owner.clone(), t.owner.clone())) {
                    links.push(EntityLink {
                        source_iri: s.owner.clone(),
                        target_iri: t.owner.clone(),
                        source_value: s.original.clone(),
                        target_value: t.original.clone(),
                        method: LinkMethod::Exact,
                    });
                }
            }
        }
    }
    let exact_count = links.len();

    for (source_key, source_bucket) in source.iter() {
        if source_key.len() < min_fuzzy_length {
            continue;
        }
        for (target_key, target_bucket) in target.iter() {
            if target_key.len() < min_fuzzy_length {
                continue;
            }
            let prefix_len = source_key.len().min(target_key.len());
            if source_key.as_bytes()[..prefix_len] != target_key.as_bytes()[..prefix_len] {
                continue;
            }
            for s in source_bucket {
                for t in target_bucket {
                    if matched.insert((s.owner.clone(), t.owner.clone())) {
                        links.push(EntityLink {
                            source_iri: s.owner.clone(),
                            target_iri: t.owner.clone(),
                            source_value: s.original.clone(),
                            target_value: t.original.clone(),
                            method: LinkMethod::Fuzzy(prefix_len),
                        });
                    }
                }
            }
        }
    }

    info!(
        exact = exact_count,
        fuzzy = links.len() - exact_count,
        "entity linking done"
    );
    links
}
