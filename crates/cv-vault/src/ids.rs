//! File identifier generation.

use std::sync::atomic::{AtomicU64, Ordering};

use cv_core::FileId;
use uuid::Uuid;

/// Source of fresh file identifiers.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> FileId;
}

/// Random v4 UUIDs. The production generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_id(&self) -> FileId {
        FileId::new()
    }
}

/// Deterministic identifiers `00000000-0000-0000-0000-000000000001`, `...02`, ...
///
/// Intended for tests that need to predict the IDs a batch receives.
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// The ID that the `n`th call (1-based) to [`IdGenerator::next_id`] returns.
    pub fn nth(n: u64) -> FileId {
        FileId::from(Uuid::from_u128(u128::from(n)))
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> FileId {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        Self::nth(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_ids_are_predictable() {
        let ids = SequentialIds::new();
        assert_eq!(ids.next_id(), SequentialIds::nth(1));
        assert_eq!(ids.next_id(), SequentialIds::nth(2));
        assert_eq!(
            SequentialIds::nth(3).to_string(),
            "00000000-0000-0000-0000-000000000003"
        );
    }

    #[test]
    fn random_ids_differ() {
        let ids = RandomIds;
        assert_ne!(ids.next_id(), ids.next_id());
    }
}
