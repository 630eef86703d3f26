//! Known-identifier tracking for cross-cycle deduplication

use std::collections::HashMap;

use super::types::ExternalRecord;

/// Registrations an id may be absent from before it is forgotten
pub const DEFAULT_RETENTION: u64 = 3;

/// Identifiers seen for one external source.
///
/// Every id of the latest batch is always kept, so the set stays a superset
/// of the last published snapshot. Ids missing from more than `retention`
/// consecutive batches are dropped; a record that returns after that is
/// reported as new again.
#[derive(Debug)]
pub struct KnownIds {
    last_seen: HashMap<String, u64>,
    generation: u64,
    retention: u64,
}

impl Default for KnownIds {
    fn default() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }
}

impl KnownIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: u64) -> Self {
        Self {
            last_seen: HashMap::new(),
            generation: 0,
            retention,
        }
    }

    /// Record every id in `records`; return the records not seen before.
    /// Duplicate ids inside one batch are reported once (first occurrence).
    pub fn register<'a, R: ExternalRecord>(&mut self, records: &'a [R]) -> Vec<&'a R> {
        self.generation += 1;
        let generation = self.generation;

        let fresh: Vec<&'a R> = records
            .iter()
            .filter(|r| {
                self.last_seen
                    .insert(r.record_id().to_string(), generation)
                    .is_none()
            })
            .collect();

        let retention = self.retention;
        self.last_seen.retain(|_, seen| generation - *seen <= retention);
        fresh
    }

    pub fn contains(&self, id: &str) -> bool {
        self.last_seen.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.last_seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Rec(&'static str);

    impl ExternalRecord for Rec {
        fn record_id(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn test_register_reports_only_new() {
        let mut known = KnownIds::new();

        let first = [Rec("a"), Rec("b"), Rec("a")];
        let fresh: Vec<&str> = known.register(&first).iter().map(|r| r.0).collect();
        assert_eq!(fresh, vec!["a", "b"]);

        let second = [Rec("b"), Rec("c")];
        let fresh: Vec<&str> = known.register(&second).iter().map(|r| r.0).collect();
        assert_eq!(fresh, vec!["c"]);

        assert!(known.register(&second).is_empty());
        assert_eq!(known.len(), 3);
        assert!(known.contains("a"));
    }

    #[test]
    fn test_absent_ids_are_forgotten_after_retention() {
        let mut known = KnownIds::with_retention(2);
        known.register(&[Rec("a"), Rec("b")]);

        // "a" missing for two batches: still known
        known.register(&[Rec("b")]);
        known.register(&[Rec("b")]);
        assert!(known.contains("a"));

        // third miss drops it; the current batch is always kept
        known.register(&[Rec("b")]);
        assert!(!known.contains("a"));
        assert!(known.contains("b"));
        assert_eq!(known.len(), 1);

        let fresh: Vec<&str> = known.register(&[Rec("a"), Rec("b")]).iter().map(|r| r.0).collect();
        assert_eq!(fresh, vec!["a"]);
    }

    #[test]
    fn test_empty_batch_ages_everything() {
        let mut known = KnownIds::with_retention(0);
        known.register(&[Rec("a")]);
        known.register::<Rec>(&[]);
        assert!(known.is_empty());
    }
}
