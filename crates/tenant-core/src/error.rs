//! Error types of the tenant runtime supervisor.
//!
//! - [`StoreError`]: failures reported by a [`TenantStore`](crate::TenantStore).
//! - [`CoreError`]: failures of a reconciliation pass, returned to the dispatcher.
//! - [`RuntimeError`]: reasons a running bundle of nested controllers exited.
//! - [`ControllerError`]: failures reported by a single nested controller.

use thiserror::Error;

use tenant_model::{ResourceVersion, TenantKey};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("tenant {0} not found")]
    NotFound(TenantKey),

    #[error("tenant {0} already exists")]
    AlreadyExists(TenantKey),

    /// Optimistic concurrency check failed; the caller must re-read and retry.
    #[error("tenant {key} was modified concurrently (expected version {expected}, found {found})")]
    Conflict {
        key: TenantKey,
        expected: ResourceVersion,
        found: ResourceVersion,
    },

    #[error("store backend error: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("reconciliation of tenant {0} is paused")]
    Paused(TenantKey),

    #[error("tenant {key}: update still conflicting after {attempts} attempts")]
    RetriesExhausted { key: TenantKey, attempts: u32 },

    #[error("tenant {key}: cannot derive connection parameters: {reason}")]
    Connection { key: TenantKey, reason: String },

    #[error("nested controller {controller} failed to register: {reason}")]
    Register {
        controller: &'static str,
        reason: String,
    },
}

impl CoreError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            CoreError::Store(StoreError::NotFound(_)) => "store_not_found",
            CoreError::Store(StoreError::AlreadyExists(_)) => "store_already_exists",
            CoreError::Store(StoreError::Conflict { .. }) => "store_conflict",
            CoreError::Store(StoreError::Backend(_)) => "store_backend",
            CoreError::Paused(_) => "reconciliation_paused",
            CoreError::RetriesExhausted { .. } => "retries_exhausted",
            CoreError::Connection { .. } => "connection_unavailable",
            CoreError::Register { .. } => "controller_register_failed",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::Store(StoreError::NotFound(_)))
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, CoreError::Paused(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            CoreError::Store(StoreError::Conflict { .. }) | CoreError::RetriesExhausted { .. }
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("nested controller {controller} failed: {reason}")]
    ControllerFailed {
        controller: &'static str,
        reason: String,
    },

    #[error("nested controller task panicked: {0}")]
    Panicked(String),
}

impl RuntimeError {
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::ControllerFailed { .. } => "runtime_controller_failed",
            RuntimeError::Panicked(_) => "runtime_panicked",
        }
    }
}

/// Outcome of a nested controller call.
///
/// `Transient` errors are logged and retried on the next trigger;
/// `Fatal` errors stop the whole tenant runtime.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    #[error("transient failure: {0}")]
    Transient(String),

    #[error("fatal failure: {0}")]
    Fatal(String),
}

impl From<CoreError> for ControllerError {
    fn from(e: CoreError) -> Self {
        ControllerError::Transient(e.to_string())
    }
}
