use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use tenant_model::{TenantConnection, TenantKey, TenantResource};

use crate::{error::CoreError, store::TenantStore};

/// Lightweight reconciliation request delivered to a nested controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub key: TenantKey,
}

impl Trigger {
    pub fn new(key: TenantKey) -> Self {
        Self { key }
    }
}

/// Re-fetches the parent tenant resource on behalf of a nested controller.
///
/// Paused tenants are reported as [`CoreError::Paused`].
#[derive(Clone)]
pub struct TenantLookup {
    store: Arc<dyn TenantStore>,
    key: TenantKey,
}

impl TenantLookup {
    pub fn new(store: Arc<dyn TenantStore>, key: TenantKey) -> Self {
        Self { store, key }
    }

    pub async fn fetch(&self) -> Result<TenantResource, CoreError> {
        let resource = self.store.get(&self.key).await?;
        if resource.is_paused() {
            return Err(CoreError::Paused(self.key.clone()));
        }
        Ok(resource)
    }
}

/// Lifecycle context shared by every nested controller of one tenant runtime.
#[derive(Clone)]
pub struct RuntimeContext {
    id: Uuid,
    key: TenantKey,
    connection: Arc<TenantConnection>,
    token: CancellationToken,
    lookup: TenantLookup,
}

impl RuntimeContext {
    pub fn new(
        key: TenantKey,
        connection: TenantConnection,
        token: CancellationToken,
        lookup: TenantLookup,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            key,
            connection: Arc::new(connection),
            token,
            lookup,
        }
    }

    /// Unique id of this runtime instance (differs across restarts of the same tenant).
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn key(&self) -> &TenantKey {
        &self.key
    }

    pub fn connection(&self) -> &TenantConnection {
        &self.connection
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn lookup(&self) -> &TenantLookup {
        &self.lookup
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
