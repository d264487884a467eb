//! Access to the shared store holding tenant resources.

mod memory;
pub use memory::MemoryStore;

use async_trait::async_trait;

use tenant_model::{TenantKey, TenantResource};

use crate::error::StoreError;

/// Versioned record store for tenant resources.
///
/// Implementations must enforce optimistic concurrency on [`TenantStore::update`]:
/// the write succeeds only if the stored `resource_version` still equals the one
/// carried by the submitted copy, otherwise [`StoreError::Conflict`] is returned.
#[async_trait]
pub trait TenantStore: Send + Sync + 'static {
    /// Fetch the freshest copy of a tenant resource.
    async fn get(&self, key: &TenantKey) -> Result<TenantResource, StoreError>;

    /// Write back a previously fetched copy, returning the stored result.
    async fn update(&self, resource: TenantResource) -> Result<TenantResource, StoreError>;
}
