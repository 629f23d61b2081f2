//! In-process [`Repository`] backed by ordered vectors per entity.

use std::collections::HashMap;

use async_trait::async_trait;
use common::{FieldCryptoError, Filter, Record};
use serde_json::Value;
use tokio::sync::RwLock;

use super::{record_id, Page, Repository};

/// Entity name → records in insertion order.
pub type Snapshot = HashMap<String, Vec<Record>>;

/// Thread-safe in-memory store.
///
/// Records keep insertion order, so offset pagination is stable across updates.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    inner: RwLock<Snapshot>,
}

impl MemoryRepository {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `snapshot`.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            inner: RwLock::new(snapshot),
        }
    }

    /// Copy of every stored record.
    pub async fn snapshot(&self) -> Snapshot {
        self.inner.read().await.clone()
    }

    /// Number of records stored for `entity`.
    pub async fn count(&self, entity: &str) -> usize {
        self.inner.read().await.get(entity).map_or(0, Vec::len)
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create(&self, entity: &str, mut data: Record) -> Result<Record, FieldCryptoError> {
        if record_id(&data).is_none() {
            data.insert("id".into(), Value::String(uuid::Uuid::new_v4().to_string()));
        }
        let mut lock = self.inner.write().await;
        lock.entry(entity.to_owned()).or_default().push(data.clone());
        Ok(data)
    }

    async fn update(
        &self,
        entity: &str,
        id: &str,
        data: Record,
    ) -> Result<Record, FieldCryptoError> {
        let mut lock = self.inner.write().await;
        let record = lock
            .get_mut(entity)
            .and_then(|rows| {
                rows.iter_mut()
                    .find(|r| record_id(r).as_deref() == Some(id))
            })
            .ok_or_else(|| {
                FieldCryptoError::Storage(format!("{entity} record {id} not found"))
            })?;
        for (k, v) in data {
            record.insert(k, v);
        }
        Ok(record.clone())
    }

    async fn find_one(
        &self,
        entity: &str,
        filter: &Filter,
    ) -> Result<Option<Record>, FieldCryptoError> {
        let lock = self.inner.read().await;
        Ok(lock
            .get(entity)
            .and_then(|rows| rows.iter().find(|r| matches(r, filter)))
            .cloned())
    }

    async fn find_many(
        &self,
        entity: &str,
        filter: &Filter,
        page: Page,
    ) -> Result<Vec<Record>, FieldCryptoError> {
        let lock = self.inner.read().await;
        Ok(lock
            .get(entity)
            .map(|rows| {
                rows.iter()
                    .filter(|r| matches(r, filter))
                    .skip(page.offset)
                    .take(page.limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Evaluate an equality filter against one record.
fn matches(record: &Record, filter: &Filter) -> bool {
    filter.iter().all(|(field, cond)| {
        let actual = record.get(field).unwrap_or(&Value::Null);
        match cond {
            Value::Object(op) if op.contains_key("equals") => op.get("equals") == Some(actual),
            Value::Object(op) if op.contains_key("in") => op
                .get("in")
                .and_then(Value::as_array)
                .is_some_and(|set| set.contains(actual)),
            literal => literal == actual,
        }
    })
}
