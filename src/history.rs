//! History recorder - bounded, newest-first log of sent requests

use std::collections::VecDeque;

use crate::constants::MAX_HISTORY;
use crate::models::{generate_id, now_millis, ApiRequest, ApiResponse, HistoryItem};
use crate::storage::{Store, StoreResult};

/// In-memory mirror of the persisted history, ordered by timestamp descending
#[derive(Clone, Debug, Default)]
pub struct HistoryLog {
    items: VecDeque<HistoryItem>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from persisted items. Returns the log plus the ids that fell
    /// outside the bound, which the caller should delete from storage.
    pub fn from_items(mut items: Vec<HistoryItem>) -> (Self, Vec<String>) {
        items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        let overflow = if items.len() > MAX_HISTORY {
            items.split_off(MAX_HISTORY).into_iter().map(|item| item.id).collect()
        } else {
            Vec::new()
        };
        (
            HistoryLog {
                items: items.into(),
            },
            overflow,
        )
    }

    /// Append a snapshot of `request` with its response, persist it, then
    /// evict (from memory and storage) everything past the bound
    pub async fn record<S: Store>(
        &mut self,
        store: &S,
        request: &ApiRequest,
        response: ApiResponse,
    ) -> StoreResult<HistoryItem> {
        self.record_at(store, request, response, now_millis()).await
    }

    pub(crate) async fn record_at<S: Store>(
        &mut self,
        store: &S,
        request: &ApiRequest,
        response: ApiResponse,
        timestamp: i64,
    ) -> StoreResult<HistoryItem> {
        let item = HistoryItem {
            id: generate_id(),
            request: request.clone(),
            response: Some(response),
            timestamp,
        };
        store.save(&item).await?;

        let position = self
            .items
            .iter()
            .position(|existing| existing.timestamp <= timestamp)
            .unwrap_or(self.items.len());
        self.items.insert(position, item.clone());

        // Drop from memory only once storage has let go
        while self.items.len() > MAX_HISTORY {
            let Some(evicted) = self.items.back().map(|item| item.id.clone()) else {
                break;
            };
            tracing::debug!(id = %evicted, "Evicting history entry");
            store.remove::<HistoryItem>(&evicted).await?;
            self.items.pop_back();
        }

        Ok(item)
    }

    /// Delete every entry, from storage first
    pub async fn clear<S: Store>(&mut self, store: &S) -> StoreResult<()> {
        store.clear::<HistoryItem>().await?;
        self.items.clear();
        Ok(())
    }

    /// Entry by index, 0 = most recent
    pub fn get(&self, index: usize) -> Option<&HistoryItem> {
        self.items.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
