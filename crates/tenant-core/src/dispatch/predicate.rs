use tenant_model::{TenantResource, TenantStatus};

/// Returns `true` if a change notification for `resource` should trigger a pass.
///
/// Tenants without status or still provisioning carry nothing actionable.
pub fn is_actionable(resource: &TenantResource) -> bool {
    !matches!(resource.status, None | Some(TenantStatus::Provisioning))
}
