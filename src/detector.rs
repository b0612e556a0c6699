//! Field-level change detection between snapshots.

use crate::domain::Snapshot;

/// What the engine should do with a freshly fetched snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// No baseline yet: record silently.
    Seed,
    Unchanged,
    /// Notify, then record.
    Changed,
}

/// True iff title or URL differ. Comparison is exact; `updated_at` is ignored.
///
/// A previous snapshot without a URL (upgraded from a title-only record) is compared
/// on title alone.
pub fn detect(previous: &Snapshot, current: &Snapshot) -> bool {
    if previous.url.is_empty() {
        return previous.title != current.title;
    }
    previous.title != current.title || previous.url != current.url
}

/// The first observation of a feed is never a change.
pub fn decide(previous: Option<&Snapshot>, current: &Snapshot) -> Decision {
    match previous {
        None => Decision::Seed,
        Some(previous) if detect(previous, current) => Decision::Changed,
        Some(_) => Decision::Unchanged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_content_with_different_timestamp() {
        let a = Snapshot::new("A", "u1").with_updated_at("2024-01-01T00:00:00Z");
        let b = Snapshot::new("A", "u1").with_updated_at("2024-02-02T00:00:00Z");
        assert!(!detect(&a, &b));
        assert_eq!(decide(Some(&a), &b), Decision::Unchanged);
    }

    #[test]
    fn test_title_or_url_change() {
        let a = Snapshot::new("A", "u1");
        assert!(detect(&a, &Snapshot::new("B", "u1")));
        assert!(detect(&a, &Snapshot::new("A", "u2")));
        assert_eq!(decide(Some(&a), &Snapshot::new("B", "u2")), Decision::Changed);
    }

    #[test]
    fn test_comparison_is_exact() {
        let a = Snapshot::new("Title", "u1");
        assert!(detect(&a, &Snapshot::new("Title ", "u1")));
        assert!(detect(&a, &Snapshot::new("title", "u1")));
    }

    #[test]
    fn test_title_only_record_ignores_url() {
        let upgraded = Snapshot::new("A", "");
        assert_eq!(decide(Some(&upgraded), &Snapshot::new("A", "u1")), Decision::Unchanged);
        assert_eq!(decide(Some(&upgraded), &Snapshot::new("B", "u2")), Decision::Changed);
    }

    #[test]
    fn test_absent_previous_seeds() {
        assert_eq!(decide(None, &Snapshot::new("A", "u1")), Decision::Seed);
    }
}
