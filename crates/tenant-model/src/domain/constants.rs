/// Finalizer guarding the record until the tenant runtime has been stopped.
pub const FINALIZER_RUNTIME: &str = "finalizer.runtime.tenant.io/soot";

/// Annotation used to carry the outcome of the last runtime start attempt.
pub const ANNOTATION_RUNTIME: &str = "runtime.tenant.io/soot";

/// Value of [`ANNOTATION_RUNTIME`] marking a runtime that failed to start.
pub const ANNOTATION_RUNTIME_FAILED: &str = "failed";

/// Presence of this annotation pauses reconciliation of the tenant.
pub const ANNOTATION_PAUSED: &str = "runtime.tenant.io/paused";
