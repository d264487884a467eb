use async_trait::async_trait;

use tenant_model::{TenantConnection, TenantResource};

use crate::error::CoreError;

/// Derives the parameters needed to reach a tenant's own API endpoint.
#[async_trait]
pub trait ConnectionProvider: Send + Sync + 'static {
    async fn connection(&self, tenant: &TenantResource) -> Result<TenantConnection, CoreError>;
}
