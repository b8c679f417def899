//! # Memory store
//!
//! Process-local key-value store. Values do not survive the process,
//! which makes this store a good fit for tests and one-shot hosts.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use tracing::trace;

use super::ThreadStore;
use crate::AnyResult;

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return a copy of all the entries of the store.
    pub fn entries_snapshot(&self) -> HashMap<String, String> {
        self.entries().clone()
    }
}

impl<K: ToString, V: ToString> FromIterator<(K, V)> for MemoryStore {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let entries = iter
            .into_iter()
            .map(|(key, val)| (key.to_string(), val.to_string()))
            .collect();

        Self {
            entries: Mutex::new(entries),
        }
    }
}

#[async_trait]
impl ThreadStore for MemoryStore {
    async fn get(&self, key: &str) -> AnyResult<Option<String>> {
        trace!("getting memory store value at {key:?}");
        Ok(self.entries().get(key).cloned())
    }

    async fn set(&self, key: &str, val: &str) -> AnyResult<()> {
        trace!("setting memory store value at {key:?}");
        self.entries().insert(key.to_owned(), val.to_owned());
        Ok(())
    }

    async fn delete(&self, key: &str) -> AnyResult<()> {
        trace!("deleting memory store value at {key:?}");
        self.entries().remove(key);
        Ok(())
    }
}
