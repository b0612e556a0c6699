//! The set of destinations that receive notifications.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotPresent,
}

/// Insertion-ordered, duplicate-free list of destination identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestinationRegistry {
    ids: Vec<String>,
}

impl DestinationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry keeping the first occurrence of each id.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::new();
        for id in ids {
            registry.add(id);
        }
        registry
    }

    pub fn add(&mut self, id: impl Into<String>) -> AddOutcome {
        let id = id.into();
        if self.contains(&id) {
            AddOutcome::AlreadyPresent
        } else {
            self.ids.push(id);
            AddOutcome::Added
        }
    }

    pub fn remove(&mut self, id: &str) -> RemoveOutcome {
        match self.ids.iter().position(|existing| existing == id) {
            Some(index) => {
                self.ids.remove(index);
                RemoveOutcome::Removed
            }
            None => RemoveOutcome::NotPresent,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|existing| existing == id)
    }

    pub fn list(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
