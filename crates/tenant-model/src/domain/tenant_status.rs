use serde::{Deserialize, Serialize};

/// Lifecycle status reported by the tenant control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TenantStatus {
    /// Control plane is being created; nothing to talk to yet.
    Provisioning,
    /// Control plane version is being upgraded.
    Upgrading,
    /// Control plane data is being migrated to another datastore.
    Migrating,
    /// Control plane is up and serving requests.
    Ready,
    /// Control plane exists but is not serving requests.
    NotReady,
    /// Certificate authority is being rotated; issued credentials are stale.
    #[serde(rename = "caRotating")]
    CaRotating,
    /// Control plane has been scaled to zero.
    Sleeping,
}

impl TenantStatus {
    /// Returns `true` if a tenant runtime may run against the control plane.
    pub fn is_serviceable(&self) -> bool {
        matches!(
            self,
            TenantStatus::Ready | TenantStatus::Upgrading | TenantStatus::Migrating
        )
    }

    /// Returns `true` if a running tenant runtime must be torn down and started again.
    pub fn requires_restart(&self) -> bool {
        matches!(self, TenantStatus::CaRotating | TenantStatus::NotReady)
    }

    /// Short label for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantStatus::Provisioning => "provisioning",
            TenantStatus::Upgrading => "upgrading",
            TenantStatus::Migrating => "migrating",
            TenantStatus::Ready => "ready",
            TenantStatus::NotReady => "notReady",
            TenantStatus::CaRotating => "caRotating",
            TenantStatus::Sleeping => "sleeping",
        }
    }
}
