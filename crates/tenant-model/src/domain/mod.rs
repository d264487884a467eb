mod constants;
pub use constants::{
    ANNOTATION_PAUSED, ANNOTATION_RUNTIME, ANNOTATION_RUNTIME_FAILED, FINALIZER_RUNTIME,
};

mod connection;
pub use connection::TenantConnection;

mod tenant;
pub use tenant::TenantResource;

mod tenant_key;
pub use tenant_key::TenantKey;

mod tenant_status;
pub use tenant_status::TenantStatus;

/// Annotation set attached to a tenant resource.
///
/// Ordered so that serialized records are stable between writes.
pub type Annotations = std::collections::BTreeMap<String, String>;

/// Monotonic version stamp used for optimistic concurrency.
pub type ResourceVersion = u64;
