//! # Runtime registry: tenant key → live runtime handle.
//!
//! ## Rules
//! - At most one handle per tenant key; `put` hands back the handle it replaced
//! - `remove` of an absent key is a no-op
//! - Guarded by an async `RwLock`, safe with any number of reconcile workers

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;

use tenant_model::TenantKey;

use crate::runtime::RuntimeHandle;

#[derive(Default)]
pub struct Registry {
    handles: RwLock<HashMap<TenantKey, Arc<RuntimeHandle>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            handles: RwLock::new(HashMap::new()),
        }
    }

    /// Store `handle` under its tenant key, returning the handle it replaced.
    pub async fn put(&self, handle: RuntimeHandle) -> Option<Arc<RuntimeHandle>> {
        let mut handles = self.handles.write().await;
        handles.insert(handle.key().clone(), Arc::new(handle))
    }

    pub async fn get(&self, key: &TenantKey) -> Option<Arc<RuntimeHandle>> {
        self.handles.read().await.get(key).cloned()
    }

    pub async fn remove(&self, key: &TenantKey) -> Option<Arc<RuntimeHandle>> {
        self.handles.write().await.remove(key)
    }

    pub async fn contains(&self, key: &TenantKey) -> bool {
        self.handles.read().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.handles.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.handles.read().await.is_empty()
    }

    /// Returns sorted list of registered tenant keys.
    pub async fn keys(&self) -> Vec<TenantKey> {
        let handles = self.handles.read().await;
        let mut keys: Vec<TenantKey> = handles.keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    /// Remove and return every handle.
    pub async fn drain(&self) -> Vec<Arc<RuntimeHandle>> {
        let mut handles = self.handles.write().await;
        handles.drain().map(|(_, h)| h).collect()
    }
}
