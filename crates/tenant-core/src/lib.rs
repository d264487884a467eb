//! Supervisor of per-tenant control-plane runtimes.
//!
//! For every tenant resource in the store, [`TenantSupervisor`] keeps one isolated
//! bundle of nested controllers ([`RuntimeHandle`]) alive while the tenant is
//! serviceable and tears it down on deletion, CA rotation or sleep.
//!
//! ```text
//! notifications ──► predicate ──┐
//!                               ├──► WorkQueue ──► workers ──► TenantSupervisor::reconcile
//! feedback (runtime failures) ──┘                                 │
//!                                                                 ├──► Registry (key → RuntimeHandle)
//!                                                                 └──► Mutator ──► TenantStore
//! ```
pub mod error;
pub use error::{ControllerError, CoreError, RuntimeError, StoreError};

pub mod store;
pub use store::{MemoryStore, TenantStore};

pub mod mutator;
pub use mutator::{Mutator, RetryConfig};

pub mod runtime;
pub use runtime::{
    ControllerSet, NestedController, RuntimeContext, RuntimeHandle, TenantLookup, Trigger,
};

pub mod registry;
pub use registry::Registry;

pub mod supervisor;
pub use supervisor::{ConnectionProvider, Reconciled, SupervisorConfig, TenantSupervisor};

pub mod dispatch;
pub use dispatch::{
    DispatchConfig, Dispatcher, Feedback, FeedbackReceiver, FeedbackSender, Notifier, WorkQueue,
};
