//! Quote-aware tokenizer for one line of N-Triples / N-Quads text.
//!
//! The serialization is line-oriented: `subject predicate object [graph] .`
//! with terms separated by unquoted whitespace. A literal object may carry a
//! language tag (`@en`) or datatype suffix (`^^<iri>`) glued to its closing
//! quote; both stay part of the literal token.
//!
//! Corrupt lines are expected at scale, so parsing never panics and never
//! aborts a scan: every failure is a [`ParseError`] the caller skips.

use crate::{unescape, Literal, Statement, Term};

/// Recoverable per-line parse failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("blank line")]
    Blank,
    #[error("comment line")]
    Comment,
    #[error("malformed statement: {0}")]
    Malformed(String),
}

/// Parse one serialized line into a [`Statement`].
pub fn parse_statement(line: &str) -> Result<Statement, ParseError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Blank);
    }
    if trimmed.starts_with('#') {
        return Err(ParseError::Comment);
    }

    let mut tokens = tokenize(trimmed)?;
    match tokens.last().map(String::as_str) {
        Some(".") => {
            tokens.pop();
        }
        _ => return Err(ParseError::Malformed("missing terminating '.'".into())),
    }

    if tokens.len() != 3 && tokens.len() != 4 {
        return Err(ParseError::Malformed(format!(
            "expected 3 or 4 terms, found {}",
            tokens.len()
        )));
    }

    let subject = parse_node_term(&tokens[0])?;
    let predicate = match parse_term(&tokens[1])? {
        Term::Iri(iri) => iri,
        other => {
            return Err(ParseError::Malformed(format!(
                "predicate must be an IRI, found {other}"
            )))
        }
    };
    let object = parse_term(&tokens[2])?;
    let graph = if tokens.len() == 4 {
        Some(parse_node_term(&tokens[3])?)
    } else {
        None
    };

    Ok(Statement {
        subject,
        predicate,
        object,
        graph,
    })
}

/// Split a line on unquoted whitespace.
///
/// Tracks an "inside literal" flag toggled by each unescaped double quote;
/// whitespace inside a literal belongs to the token.
fn tokenize(line: &str) -> Result<Vec<String>, ParseError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_literal = false;
    let mut escaped = false;

    for c in line.chars() {
        if in_literal {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_literal = false;
            }
            continue;
        }
        if c == '"' {
            current.push(c);
            in_literal = true;
        } else if c.is_whitespace() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }

    if in_literal {
        return Err(ParseError::Malformed("unterminated literal".into()));
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Parse a token expected to name a node (subject or graph position).
fn parse_node_term(token: &str) -> Result<Term, ParseError> {
    match parse_term(token)? {
        term @ (Term::Iri(_) | Term::BlankNode(_)) => Ok(term),
        Term::Literal(_) => Err(ParseError::Malformed(format!(
            "expected IRI or blank node, found literal: {token}"
        ))),
    }
}

/// Classify and parse one token: bracket-delimited IRI, `_:` blank node,
/// or double-quoted literal with optional language/datatype suffix.
fn parse_term(token: &str) -> Result<Term, ParseError> {
    if let Some(inner) = token.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
        if inner.is_empty() {
            return Err(ParseError::Malformed("empty IRI".into()));
        }
        return Ok(Term::Iri(inner.to_string()));
    }

    if let Some(id) = token.strip_prefix("_:") {
        if id.is_empty() {
            return Err(ParseError::Malformed("empty blank node label".into()));
        }
        return Ok(Term::BlankNode(id.to_string()));
    }

    if token.starts_with('"') {
        return parse_literal(token).map(Term::Literal);
    }

    Err(ParseError::Malformed(format!("unrecognized term: {token}")))
}

fn parse_literal(token: &str) -> Result<Literal, ParseError> {
    let mut end_quote = None;
    let mut escaped = false;
    for (i, c) in token.char_indices().skip(1) {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '"' {
            end_quote = Some(i);
            break;
        }
    }
    let Some(end) = end_quote else {
        return Err(ParseError::Malformed(format!(
            "literal missing closing quote: {token}"
        )));
    };

    let lexical = unescape(&token[1..end]);
    let rest = &token[end + 1..];

    if rest.is_empty() {
        return Ok(Literal::plain(lexical));
    }

    if let Some(lang) = rest.strip_prefix('@') {
        if lang.is_empty() || !lang.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(ParseError::Malformed(format!("invalid language tag: @{lang}")));
        }
        return Ok(Literal {
            lexical,
            language: Some(lang.to_string()),
            datatype: None,
        });
    }

    if let Some(dt) = rest.strip_prefix("^^") {
        let Some(dt_iri) = dt.strip_prefix('<').and_then(|t| t.strip_suffix('>')) else {
            return Err(ParseError::Malformed(format!("invalid datatype suffix: {dt}")));
        };
        if dt_iri.is_empty() {
            return Err(ParseError::Malformed("empty datatype IRI".into()));
        }
        return Ok(Literal {
            lexical,
            language: None,
            datatype: Some(dt_iri.to_string()),
        });
    }

    Err(ParseError::Malformed(format!(
        "trailing garbage after literal: {rest}"
    )))
}
