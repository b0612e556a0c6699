use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The latest item currently visible at a feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub title: String,
    #[serde(default)]
    pub url: String,
    /// Informational only; never part of change detection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Snapshot {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            updated_at: None,
        }
    }

    pub fn with_updated_at(mut self, updated_at: impl Into<String>) -> Self {
        self.updated_at = Some(updated_at.into());
        self
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "(Untitled)"
        } else {
            &self.title
        }
    }
}

/// Last notified snapshot per feed name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionRecord {
    entries: BTreeMap<String, Snapshot>,
}

impl VersionRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, feed: &str) -> Option<&Snapshot> {
        self.entries.get(feed)
    }

    pub fn insert(&mut self, feed: impl Into<String>, snapshot: Snapshot) -> Option<Snapshot> {
        self.entries.insert(feed.into(), snapshot)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Snapshot)> for VersionRecord {
    fn from_iter<I: IntoIterator<Item = (String, Snapshot)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_title_without_title() {
        assert_eq!(Snapshot::new("", "u").display_title(), "(Untitled)");
        assert_eq!(Snapshot::new("A", "u").display_title(), "A");
    }

    #[test]
    fn test_insert_replaces_previous() {
        let mut record = VersionRecord::new();
        assert!(record.insert("fb_Beta", Snapshot::new("A", "u1")).is_none());
        let old = record.insert("fb_Beta", Snapshot::new("B", "u2"));
        assert_eq!(old, Some(Snapshot::new("A", "u1")));
        assert_eq!(record.get("fb_Beta"), Some(&Snapshot::new("B", "u2")));
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn test_updated_at_is_not_serialized_when_absent() {
        let json = serde_json::to_string(&Snapshot::new("A", "u1")).unwrap();
        assert_eq!(json, r#"{"title":"A","url":"u1"}"#);
    }
}
