//! Term model and line-oriented triple handling for alignbench.
//!
//! This crate sits at the bottom of the pipeline:
//!
//! - [`Term`], [`Literal`] and [`Statement`] model one parsed N-Triples or
//!   N-Quads statement.
//! - [`tokenizer`] turns one serialized line into a [`Statement`] (or a
//!   recoverable [`ParseError`]; callers skip bad lines, they never abort).
//! - [`normalize`] canonicalizes literal values for entity matching.
//!
//! Statements are transient: they are produced and consumed per streaming
//! pass and never materialized in full.

pub mod normalize;
pub mod tokenizer;

use std::fmt;

pub use tokenizer::{parse_statement, ParseError};

// ============================================================================
// Term model
// ============================================================================

/// A typed or plain string value attached as a statement's object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    pub lexical: String,
    pub language: Option<String>,
    pub datatype: Option<String>,
}

impl Literal {
    pub fn plain(lexical: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            language: None,
            datatype: None,
        }
    }

    /// Bare double-quoted form, language/datatype decoration stripped.
    ///
    /// Final attribute outputs use this form; intermediate files keep the
    /// full rendering from [`fmt::Display`].
    pub fn bare(&self) -> String {
        format!("\"{}\"", escape(&self.lexical))
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", escape(&self.lexical))?;
        if let Some(lang) = &self.language {
            write!(f, "@{lang}")?;
        } else if let Some(dt) = &self.datatype {
            write!(f, "^^<{dt}>")?;
        }
        Ok(())
    }
}

/// One node or value position of a statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    Iri(String),
    BlankNode(String),
    Literal(Literal),
}

impl Term {
    pub fn is_literal(&self) -> bool {
        matches!(self, Term::Literal(_))
    }

    pub fn is_blank_node(&self) -> bool {
        matches!(self, Term::BlankNode(_))
    }

    /// Lexical value if this term is a literal.
    pub fn literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    /// Canonical text form (`<iri>`, `_:id`, quoted literal).
    ///
    /// Node identity throughout the pipeline (seed sets, frontier sets,
    /// replace maps, link tables) is keyed on this rendering.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{iri}>"),
            Term::BlankNode(id) => write!(f, "_:{id}"),
            Term::Literal(lit) => lit.fmt(f),
        }
    }
}

/// One parsed triple or quad.
///
/// `subject` is an IRI or blank node, `predicate` is a bare IRI (no angle
/// brackets), `object` may additionally be a literal. `graph` is present
/// only for quad serializations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub subject: Term,
    pub predicate: String,
    pub object: Term,
    pub graph: Option<Term>,
}

impl Statement {
    pub fn subject_key(&self) -> String {
        self.subject.key()
    }

    pub fn predicate_key(&self) -> String {
        format!("<{}>", self.predicate)
    }
}

// ============================================================================
// String escapes
// ============================================================================

/// Escape a lexical value for the canonical quoted rendering.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

/// Undo [`escape`]; unknown escape sequences are kept verbatim.
pub fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn term_rendering_is_canonical() {
        assert_eq!(Term::Iri("http://e.org/a".into()).key(), "<http://e.org/a>");
        assert_eq!(Term::BlankNode("b1".into()).key(), "_:b1");
        assert_eq!(Term::Literal(Literal::plain("v")).key(), "\"v\"");
    }

    #[test]
    fn literal_display_keeps_decoration() {
        let tagged = Literal {
            lexical: "Hello".into(),
            language: Some("en".into()),
            datatype: None,
        };
        assert_eq!(tagged.to_string(), "\"Hello\"@en");
        assert_eq!(tagged.bare(), "\"Hello\"");

        let typed = Literal {
            lexical: "42".into(),
            language: None,
            datatype: Some("http://www.w3.org/2001/XMLSchema#integer".into()),
        };
        assert_eq!(
            typed.to_string(),
            "\"42\"^^<http://www.w3.org/2001/XMLSchema#integer>"
        );
    }

    #[test]
    fn escape_round_trips() {
        let raw = "line\nwith \"quotes\" and \\slash\\";
        assert_eq!(unescape(&escape(raw)), raw);
    }
}
