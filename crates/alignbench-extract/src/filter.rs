//! Emission filters shared by the closure extractor and the remote fetcher.
//!
//! Filtering happens at emission time, not during frontier discovery: the
//! frontier must still grow through triples whose predicate is excluded,
//! otherwise the closure would depend on the sanitization settings.

use std::collections::{HashMap, HashSet};

use alignbench_rdf::{Literal, Statement, Term};

/// A statement that passed the filters, routed to its output stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    /// Literal-valued statement, destined for the attribute file.
    Attribute {
        subject: String,
        predicate: String,
        literal: Literal,
    },
    /// Node-valued statement, destined for the relational file.
    Relation {
        subject: String,
        predicate: String,
        object: String,
    },
}

/// Predicate exclusion, literal masking and identifier remapping.
///
/// `mask_values` removes exactly the identifying literal values that
/// established the entity links, so the linking signal never leaks into the
/// produced benchmark. `replace_map` coalesces identifiers known to denote
/// the same real-world entity; it applies to subject and non-literal object
/// positions, keyed on canonical term text.
#[derive(Debug, Clone, Default)]
pub struct StatementFilter {
    pub exclude_predicates: HashSet<String>,
    pub mask_values: HashSet<String>,
    pub replace_map: HashMap<String, String>,
}

impl StatementFilter {
    pub fn new(
        exclude_predicates: HashSet<String>,
        mask_values: HashSet<String>,
        replace_map: HashMap<String, String>,
    ) -> Self {
        Self {
            exclude_predicates,
            mask_values,
            replace_map,
        }
    }

    fn remap(&self, key: String) -> String {
        match self.replace_map.get(&key) {
            Some(canonical) => canonical.clone(),
            None => key,
        }
    }

    /// Apply the filters to one statement; `None` means dropped.
    pub fn route(&self, stmt: &Statement) -> Option<Routed> {
        if self.exclude_predicates.contains(&stmt.predicate) {
            return None;
        }

        let subject = self.remap(stmt.subject_key());
        let predicate = stmt.predicate_key();

        match &stmt.object {
            Term::Literal(lit) => {
                if self.mask_values.contains(&lit.lexical) {
                    return None;
                }
                Some(Routed::Attribute {
                    subject,
                    predicate,
                    literal: lit.clone(),
                })
            }
            node => Some(Routed::Relation {
                subject,
                predicate,
                object: self.remap(node.key()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alignbench_rdf::parse_statement;

    fn filter_with(mask: &[&str], exclude: &[&str]) -> StatementFilter {
        StatementFilter::new(
            exclude.iter().map(|s| s.to_string()).collect(),
            mask.iter().map(|s| s.to_string()).collect(),
            HashMap::new(),
        )
    }

    #[test]
    fn masked_literal_values_are_dropped() {
        let filter = filter_with(&["GB-AAA-12-34"], &[]);
        let masked = parse_statement("<e> <p> \"GB-AAA-12-34\" .").unwrap();
        let kept = parse_statement("<e> <p> \"other\" .").unwrap();
        assert_eq!(filter.route(&masked), None);
        assert!(matches!(
            filter.route(&kept),
            Some(Routed::Attribute { .. })
        ));
    }

    #[test]
    fn excluded_predicates_drop_both_streams() {
        let filter = filter_with(&[], &["http://schema.org/isrcCode"]);
        let attr = parse_statement("<e> <http://schema.org/isrcCode> \"x\" .").unwrap();
        let rel = parse_statement("<e> <http://schema.org/isrcCode> <o> .").unwrap();
        assert_eq!(filter.route(&attr), None);
        assert_eq!(filter.route(&rel), None);
    }

    #[test]
    fn replace_map_applies_to_node_positions_only() {
        let mut replace = HashMap::new();
        replace.insert("<http://e.org/dup>".to_string(), "<http://e.org/canon>".to_string());
        let filter = StatementFilter::new(HashSet::new(), HashSet::new(), replace);

        let rel = parse_statement("<http://e.org/dup> <p> <http://e.org/dup> .").unwrap();
        match filter.route(&rel).unwrap() {
            Routed::Relation {
                subject, object, ..
            } => {
                assert_eq!(subject, "<http://e.org/canon>");
                assert_eq!(object, "<http://e.org/canon>");
            }
            other => panic!("expected relation, got {other:?}"),
        }

        // A literal spelled like a mapped key is left alone.
        let attr = parse_statement("<http://e.org/dup> <p> \"<http://e.org/dup>\" .").unwrap();
        match filter.route(&attr).unwrap() {
            Routed::Attribute {
                subject, literal, ..
            } => {
                assert_eq!(subject, "<http://e.org/canon>");
                assert_eq!(literal.lexical, "<http://e.org/dup>");
            }
            other => panic!("expected attribute, got {other:?}"),
        }
    }
}
