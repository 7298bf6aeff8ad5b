use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{AnnouncedSet, AnnouncedStore, LoadStatus, LoadedSet};
use crate::error::PersistError;

/// In-process store. Loses everything on restart; meant for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Option<AnnouncedSet>>,
    saves: Mutex<usize>,
}

// Writers swap whole values, so a poisoned lock still holds a consistent one.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_set(set: AnnouncedSet) -> Self {
        Self {
            inner: Mutex::new(Some(set)),
            saves: Mutex::new(0),
        }
    }

    /// Current persisted snapshot, if anything was ever saved.
    pub fn snapshot(&self) -> Option<AnnouncedSet> {
        lock(&self.inner).clone()
    }

    pub fn save_count(&self) -> usize {
        *lock(&self.saves)
    }
}

#[async_trait]
impl AnnouncedStore for MemoryStore {
    async fn load(&self) -> LoadedSet {
        match self.snapshot() {
            Some(set) => LoadedSet {
                set,
                status: LoadStatus::Loaded,
            },
            None => LoadedSet {
                set: AnnouncedSet::new(),
                status: LoadStatus::Missing,
            },
        }
    }

    async fn save(&self, set: &AnnouncedSet) -> Result<(), PersistError> {
        *lock(&self.inner) = Some(set.clone());
        *lock(&self.saves) += 1;
        Ok(())
    }
}
