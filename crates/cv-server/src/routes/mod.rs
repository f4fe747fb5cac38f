//! Route handlers for the HTTP API.

pub mod files;
pub mod health;
pub mod transactions;

/// Parse a path segment into a typed ID, mapping failures to a 400.
pub(crate) fn parse_id<T: std::str::FromStr>(raw: &str, what: &str) -> cv_core::Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| cv_core::Error::Validation(format!("Invalid {what} id: {raw}")))
}
