//! Storage collaborator - a generic per-collection key/value store
//!
//! Every persisted type names its collection through [`Record::STORE`], so the
//! same `get_all/get_by_id/save/remove/clear` calls serve requests, collections,
//! environments and history alike. Global variables live outside the
//! collections as one wholesale-replaced list.

mod error;
mod file;
mod memory;

use std::future::Future;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::{ApiRequest, Collection, Environment, HistoryItem, KeyValuePair};

pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Named collections inside a store
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StoreName {
    Requests,
    Collections,
    Environments,
    History,
}

impl StoreName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreName::Requests => "requests",
            StoreName::Collections => "collections",
            StoreName::Environments => "environments",
            StoreName::History => "history",
        }
    }
}

/// A value that can be persisted in a named collection, keyed by id
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const STORE: StoreName;

    fn id(&self) -> &str;
}

impl Record for ApiRequest {
    const STORE: StoreName = StoreName::Requests;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Collection {
    const STORE: StoreName = StoreName::Collections;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Environment {
    const STORE: StoreName = StoreName::Environments;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for HistoryItem {
    const STORE: StoreName = StoreName::History;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Persistence used by the client. No cross-collection transactions; cascades
/// are issued by the caller as individual removes.
pub trait Store: Send + Sync + 'static {
    fn get_all<T: Record>(&self) -> impl Future<Output = StoreResult<Vec<T>>> + Send;

    fn get_by_id<T: Record>(&self, id: &str) -> impl Future<Output = StoreResult<Option<T>>> + Send;

    /// Insert or replace by id
    fn save<T: Record>(&self, item: &T) -> impl Future<Output = StoreResult<()>> + Send;

    /// Removing an unknown id is not an error
    fn remove<T: Record>(&self, id: &str) -> impl Future<Output = StoreResult<()>> + Send;

    fn clear<T: Record>(&self) -> impl Future<Output = StoreResult<()>> + Send;

    /// Global variables; an absent list loads as empty
    fn load_globals(&self) -> impl Future<Output = StoreResult<Vec<KeyValuePair>>> + Send;

    /// Overwrites the whole list
    fn save_globals(&self, variables: &[KeyValuePair]) -> impl Future<Output = StoreResult<()>> + Send;
}
