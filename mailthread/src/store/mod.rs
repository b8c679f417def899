//! # Store
//!
//! Module dedicated to the persistence of conversation identifiers.
//! The store is a simple durable string key-value store, injected
//! into the [`ThreadedSender`](crate::sender::ThreadedSender). See
//! [`ThreadStore`].

#[cfg(feature = "file-store")]
pub mod file;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{AnyResult, Error, Result};

#[cfg(feature = "file-store")]
#[doc(inline)]
pub use self::file::FileStore;
#[doc(inline)]
pub use self::memory::MemoryStore;

/// The key-value store contract.
#[async_trait]
pub trait ThreadStore: Send + Sync {
    /// Get the value at the given key. Return `None` if the key does
    /// not exist.
    async fn get(&self, key: &str) -> AnyResult<Option<String>>;

    /// (Re)set the value at the given key.
    async fn set(&self, key: &str, val: &str) -> AnyResult<()>;

    /// Delete the value at the given key. Deleting an unknown key is
    /// not an error.
    async fn delete(&self, key: &str) -> AnyResult<()>;
}

#[async_trait]
impl<T: ThreadStore + ?Sized> ThreadStore for Arc<T> {
    async fn get(&self, key: &str) -> AnyResult<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, val: &str) -> AnyResult<()> {
        (**self).set(key, val).await
    }

    async fn delete(&self, key: &str) -> AnyResult<()> {
        (**self).delete(key).await
    }
}

/// The store keys derived from a persistence key.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StateKeys {
    /// Key of the current conversation identifier.
    pub current: String,

    /// Key of the identifier replaced by a new conversation.
    pub previous: String,

    /// Key of the identifier removed by a reset.
    pub archived: String,

    /// Key of the reset date.
    pub archived_at: String,
}

impl StateKeys {
    pub fn new(persistence_key: &str) -> Self {
        Self {
            current: persistence_key.to_owned(),
            previous: format!("{persistence_key}_previous"),
            archived: format!("{persistence_key}_archived"),
            archived_at: format!("{persistence_key}_archived_at"),
        }
    }
}

/// Get the value at the given key, mapping the store error.
pub(crate) async fn get(store: &dyn ThreadStore, key: &str) -> Result<Option<String>> {
    store
        .get(key)
        .await
        .map(|val| val.filter(|val| !val.trim().is_empty()))
        .map_err(|err| Error::GetStoreValueError(err, key.to_owned()))
}

/// Set the value at the given key, mapping the store error.
pub(crate) async fn set(store: &dyn ThreadStore, key: &str, val: &str) -> Result<()> {
    store
        .set(key, val)
        .await
        .map_err(|err| Error::SetStoreValueError(err, key.to_owned()))
}

/// Delete the value at the given key, mapping the store error.
pub(crate) async fn delete(store: &dyn ThreadStore, key: &str) -> Result<()> {
    store
        .delete(key)
        .await
        .map_err(|err| Error::DeleteStoreValueError(err, key.to_owned()))
}

/// The persisted state of a conversation stream.
///
/// Only the current identifier drives the sending logic, the other
/// ones are breadcrumbs kept for diagnostics.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    feature = "derive",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub struct PersistedThreadState {
    pub current_thread_id: Option<String>,
    pub previous_thread_id: Option<String>,
    pub archived_thread_id: Option<String>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl PersistedThreadState {
    /// Load the state of the given persistence key.
    ///
    /// An archive date that cannot be parsed is ignored.
    pub async fn load(store: &dyn ThreadStore, persistence_key: &str) -> Result<Self> {
        debug!("loading thread state of key {persistence_key:?}");
        let keys = StateKeys::new(persistence_key);

        let archived_at = get(store, &keys.archived_at).await?.and_then(|date| {
            DateTime::parse_from_rfc3339(&date)
                .map(|date| date.with_timezone(&Utc))
                .ok()
        });

        Ok(Self {
            current_thread_id: get(store, &keys.current).await?,
            previous_thread_id: get(store, &keys.previous).await?,
            archived_thread_id: get(store, &keys.archived).await?,
            archived_at,
        })
    }
}
