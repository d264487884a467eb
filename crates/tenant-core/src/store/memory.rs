use std::collections::HashMap;
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};
use tracing::trace;

use tenant_model::{TenantKey, TenantResource, TenantStatus};

use crate::{error::StoreError, store::TenantStore};

const DEFAULT_EVENTS_CAPACITY: usize = 1024;

/// In-memory tenant store.
///
/// Mirrors the semantics of a finalizer-aware API server:
/// - every write bumps `resource_version`, stale writes are rejected with a conflict;
/// - `delete` only sets the deletion timestamp while finalizers remain;
/// - a write removing the last finalizer of a deleting record removes the record.
///
/// Every stored change is published on a broadcast channel (see [`MemoryStore::subscribe`]).
pub struct MemoryStore {
    records: RwLock<HashMap<TenantKey, TenantResource>>,
    events: broadcast::Sender<TenantResource>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(DEFAULT_EVENTS_CAPACITY);
        Self {
            records: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Subscribe to change notifications (one snapshot per stored change).
    pub fn subscribe(&self) -> broadcast::Receiver<TenantResource> {
        self.events.subscribe()
    }

    /// Insert a new record.
    pub async fn create(&self, mut resource: TenantResource) -> Result<TenantResource, StoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(&resource.key) {
            return Err(StoreError::AlreadyExists(resource.key));
        }
        resource.resource_version = 1;
        resource.deletion_timestamp = None;
        records.insert(resource.key.clone(), resource.clone());
        drop(records);

        self.publish(&resource);
        Ok(resource)
    }

    /// Write the status field without a version precondition.
    pub async fn set_status(
        &self,
        key: &TenantKey,
        status: TenantStatus,
    ) -> Result<TenantResource, StoreError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;
        record.status = Some(status);
        record.resource_version += 1;
        let snapshot = record.clone();
        drop(records);

        self.publish(&snapshot);
        Ok(snapshot)
    }

    /// Request deletion of a record.
    ///
    /// Records holding finalizers are only marked; the last finalizer removal deletes them.
    pub async fn delete(&self, key: &TenantKey) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;

        let snapshot = if record.finalizers.is_empty() {
            let mut gone = records
                .remove(key)
                .ok_or_else(|| StoreError::NotFound(key.clone()))?;
            gone.deletion_timestamp.get_or_insert_with(SystemTime::now);
            gone
        } else {
            if record.deletion_timestamp.is_none() {
                record.deletion_timestamp = Some(SystemTime::now());
                record.resource_version += 1;
            }
            record.clone()
        };
        drop(records);

        self.publish(&snapshot);
        Ok(())
    }

    pub async fn contains(&self, key: &TenantKey) -> bool {
        self.records.read().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    fn publish(&self, resource: &TenantResource) {
        // No subscribers is fine.
        let _ = self.events.send(resource.clone());
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TenantStore for MemoryStore {
    async fn get(&self, key: &TenantKey) -> Result<TenantResource, StoreError> {
        self.records
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.clone()))
    }

    async fn update(&self, mut resource: TenantResource) -> Result<TenantResource, StoreError> {
        let mut records = self.records.write().await;
        let current = records
            .get(&resource.key)
            .ok_or_else(|| StoreError::NotFound(resource.key.clone()))?;

        if current.resource_version != resource.resource_version {
            return Err(StoreError::Conflict {
                key: resource.key.clone(),
                expected: resource.resource_version,
                found: current.resource_version,
            });
        }

        // Store-owned fields.
        resource.deletion_timestamp = current.deletion_timestamp;
        resource.resource_version = current.resource_version + 1;

        if resource.is_deleting() && resource.finalizers.is_empty() {
            records.remove(&resource.key);
            trace!(tenant = %resource.key, "last finalizer removed, record deleted");
        } else {
            records.insert(resource.key.clone(), resource.clone());
        }
        drop(records);

        self.publish(&resource);
        Ok(resource)
    }
}
