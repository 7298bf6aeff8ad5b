//! Durable set of already-announced event identifiers.
//!
//! The set is loaded at the start of each cycle and written back whole at the
//! end. `load` never fails: missing or unreadable state means "nothing
//! announced yet".

pub mod file;
pub mod memory;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::PersistError;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// Identifiers already delivered. Only ever grows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnouncedSet {
    ids: BTreeSet<String>,
}

impl AnnouncedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Returns `true` if the id was not present yet.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.ids.insert(id.into())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for AnnouncedSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// How a `load` went. Only `Loaded` means the backing data is known good.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Loaded,
    Missing,
    Corrupt,
}

#[derive(Debug, Clone)]
pub struct LoadedSet {
    pub set: AnnouncedSet,
    pub status: LoadStatus,
}

#[async_trait::async_trait]
pub trait AnnouncedStore: Send + Sync {
    /// Snapshot of the persisted set. Missing or corrupt data yields an empty set.
    async fn load(&self) -> LoadedSet;

    /// Replace the persisted set atomically.
    async fn save(&self, set: &AnnouncedSet) -> Result<(), PersistError>;
}
