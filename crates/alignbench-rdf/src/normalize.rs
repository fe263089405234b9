//! Value normalization for entity matching.
//!
//! Two pure stages, applied in order:
//!
//! 1. [`normalize_value`]: aggressive generic normalization (lowercase,
//!    keep only `[a-z0-9]`).
//! 2. [`canonicalize_code_prefix`]: rewrite a known non-standard two-letter
//!    code prefix to its canonical form (identifier schemes like ISRC embed
//!    a country code in the first two characters, and real-world data uses
//!    variants like `UK` or `GX` for `GB`).
//!
//! Both stages are idempotent and map empty input to empty output.

use std::collections::HashMap;

/// Lowercase and drop every character outside `[a-z0-9]`.
pub fn normalize_value(text: &str) -> String {
    text.chars()
        .flat_map(|c| c.to_lowercase())
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// Non-standard → canonical two-letter code aliases seen in the wild.
pub fn default_code_aliases() -> HashMap<String, String> {
    HashMap::from([
        ("gx".to_string(), "gb".to_string()),
        ("uk".to_string(), "gb".to_string()),
    ])
}

/// Rewrite the leading two-character code of an already-normalized value
/// when it is a known alias; the remainder of the string is untouched.
pub fn canonicalize_code_prefix(normalized: &str, aliases: &HashMap<String, String>) -> String {
    let Some(prefix) = normalized.get(..2) else {
        return normalized.to_string();
    };
    match aliases.get(prefix) {
        Some(canonical) => format!("{canonical}{}", &normalized[2..]),
        None => normalized.to_string(),
    }
}

/// Full matching form: generic normalization plus alias canonicalization.
pub fn normalize_for_linking(text: &str, aliases: &HashMap<String, String>) -> String {
    canonicalize_code_prefix(&normalize_value(text), aliases)
}
