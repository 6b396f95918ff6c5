use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::{Record, Store, StoreError, StoreName, StoreResult};
use crate::models::KeyValuePair;

type Tables = HashMap<StoreName, Vec<(String, serde_json::Value)>>;

/// In-process store. Records keep insertion order; an upsert keeps the
/// original position.
///
/// Can be switched offline to exercise failure paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    globals: Mutex<Vec<KeyValuePair>>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every operation fails until brought back online
    pub fn offline() -> Self {
        let store = Self::default();
        store.set_offline(true);
        store
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store is offline".into()))
        } else {
            Ok(())
        }
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        // rows are replaced whole, so a poisoned lock still holds consistent data
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of records in the collection of `T`
    pub fn count<T: Record>(&self) -> usize {
        self.tables().get(&T::STORE).map_or(0, Vec::len)
    }
}

impl Store for MemoryStore {
    async fn get_all<T: Record>(&self) -> StoreResult<Vec<T>> {
        self.check()?;
        let tables = self.tables();
        let rows = match tables.get(&T::STORE) {
            Some(rows) => rows,
            None => return Ok(Vec::new()),
        };
        rows.iter()
            .map(|(_, value)| serde_json::from_value(value.clone()).map_err(StoreError::from))
            .collect()
    }

    async fn get_by_id<T: Record>(&self, id: &str) -> StoreResult<Option<T>> {
        self.check()?;
        let tables = self.tables();
        let value = tables
            .get(&T::STORE)
            .and_then(|rows| rows.iter().find(|(row_id, _)| row_id == id))
            .map(|(_, value)| value.clone());
        match value {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn save<T: Record>(&self, item: &T) -> StoreResult<()> {
        self.check()?;
        let value = serde_json::to_value(item)?;
        let mut tables = self.tables();
        let rows = tables.entry(T::STORE).or_default();
        match rows.iter_mut().find(|(row_id, _)| row_id == item.id()) {
            Some(row) => row.1 = value,
            None => rows.push((item.id().to_string(), value)),
        }
        Ok(())
    }

    async fn remove<T: Record>(&self, id: &str) -> StoreResult<()> {
        self.check()?;
        if let Some(rows) = self.tables().get_mut(&T::STORE) {
            rows.retain(|(row_id, _)| row_id != id);
        }
        Ok(())
    }

    async fn clear<T: Record>(&self) -> StoreResult<()> {
        self.check()?;
        self.tables().remove(&T::STORE);
        Ok(())
    }

    async fn load_globals(&self) -> StoreResult<Vec<KeyValuePair>> {
        self.check()?;
        Ok(self.globals.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    async fn save_globals(&self, variables: &[KeyValuePair]) -> StoreResult<()> {
        self.check()?;
        *self.globals.lock().unwrap_or_else(|e| e.into_inner()) = variables.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApiRequest, Collection};

    #[tokio::test]
    async fn test_upsert_keeps_position() {
        let store = MemoryStore::new();
        let mut first = ApiRequest::new();
        let second = ApiRequest::new();
        store.save(&first).await.unwrap();
        store.save(&second).await.unwrap();
        first.name = "renamed".into();
        store.save(&first).await.unwrap();

        let all: Vec<ApiRequest> = store.get_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "renamed");
        assert_eq!(all[1].id, second.id);
    }

    #[tokio::test]
    async fn test_collections_are_separate() {
        let store = MemoryStore::new();
        store.save(&ApiRequest::new()).await.unwrap();
        store.save(&Collection::new(None)).await.unwrap();
        store.clear::<ApiRequest>().await.unwrap();
        assert_eq!(store.count::<ApiRequest>(), 0);
        assert_eq!(store.count::<Collection>(), 1);
    }

    #[tokio::test]
    async fn test_get_by_id_and_remove() {
        let store = MemoryStore::new();
        let req = ApiRequest::new();
        store.save(&req).await.unwrap();
        let found: Option<ApiRequest> = store.get_by_id(&req.id).await.unwrap();
        assert_eq!(found, Some(req.clone()));
        store.remove::<ApiRequest>(&req.id).await.unwrap();
        store.remove::<ApiRequest>("unknown").await.unwrap();
        let gone: Option<ApiRequest> = store.get_by_id(&req.id).await.unwrap();
        assert!(gone.is_none());
    }

    #[tokio::test]
    async fn test_offline_store_rejects_calls() {
        let store = MemoryStore::offline();
        let err = store.get_all::<ApiRequest>().await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        store.set_offline(false);
        assert!(store.get_all::<ApiRequest>().await.unwrap().is_empty());
    }
}
