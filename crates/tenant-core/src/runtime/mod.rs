//! # Tenant runtime: one bundle of nested controllers per tenant.
//!
//! ## Lifecycle
//! ```text
//! ControllerSet ──► Bundle::register(ctx) ──► RuntimeHandle::start(bundle.run())
//!                     │ (any error aborts,          │
//!                     │  ctx token cancelled)       ├─► trigger()  : try_send to every controller
//!                     ▼                             ├─► cancel()   : cooperative, via ctx token
//!                CoreError::Register                └─► wait(d)    : completion signal or timeout
//! ```
//!
//! ## Rules
//! - The completion signal is closed exactly once, whatever the exit reason (panics included)
//! - Cancellation ends the bundle with `Ok(())`; only controller failures produce an error
//! - Trigger delivery never blocks: a full input means a reconciliation is already pending

mod bundle;
pub(crate) use bundle::Bundle;

mod context;
pub use context::{RuntimeContext, TenantLookup, Trigger};

mod controller;
pub use controller::{ControllerSet, NestedController};

mod handle;
pub use handle::RuntimeHandle;
