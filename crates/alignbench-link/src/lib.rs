//! Two-phase entity linking over normalized literal values.
//!
//! Both sides of the benchmark expose one identifying property (an ISRC,
//! an IATA code, ...). Each side is scanned into a [`ValueIndex`] mapping
//! the normalized value to every `(original value, owner)` occurrence;
//! [`link_indices`] then pairs owners in two phases: exact key equality
//! first, then a guarded prefix match for truncated identifiers.

pub mod index;
pub mod linker;

pub use index::{Occurrence, ValueIndex};
pub use linker::{link_indices, EntityLink, LinkMethod, DEFAULT_MIN_FUZZY_LENGTH};
