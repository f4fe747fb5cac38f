//! cv-core: shared types, IDs, errors, configuration, and byte-range logic.
//!
//! This crate is the foundational dependency for all other cv-* crates,
//! providing type-safe identifiers, a unified error type, the range
//! resolver used by chunked downloads, content-type helpers, and the
//! application configuration.

pub mod config;
pub mod error;
pub mod ids;
pub mod media;
pub mod range;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use ids::*;
pub use range::{RangeSpec, ResolvedRange};
