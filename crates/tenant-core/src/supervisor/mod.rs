//! # Tenant supervisor: start, restart and stop tenant runtimes.
//!
//! ## Decision policy (one pass per key, never concurrent for the same key)
//! ```text
//! fetch ─┬─ not found ─────────────────────────────► cleanup(key, None)
//!        ├─ paused ────────────────────────────────► skip
//!        ├─ deleting / sleeping ─┬─ finalizer or
//!        │                       │  runtime ───────► cleanup(key, tenant)  (stop, then drop finalizer)
//!        │                       └─ none ──────────► done
//!        ├─ runtime registered ──┬─ failed mark ───► drop handle, clear mark (restart next pass)
//!        │                       ├─ caRotating /
//!        │                       │  notReady ──────► cleanup(key, tenant)
//!        │                       ├─ exited ────────► drop handle, requeue
//!        │                       └─ otherwise ─────► trigger nested controllers
//!        └─ no runtime ──────────┬─ not serviceable► done
//!                                ├─ stale failed mark ► clear mark, requeue
//!                                ├─ no finalizer ──► add finalizer, requeue
//!                                └─ otherwise ─────► start runtime, requeue
//! ```
//!
//! A runtime that later exits with an error is reported by its own background task:
//! the failure annotation is written and a feedback event re-enters the first
//! branch of "runtime registered" on the following pass. If the annotation cannot be
//! written (paused tenant, store failure), the "exited" branch drops the handle instead.

mod config;
pub use config::SupervisorConfig;

mod connect;
pub use connect::ConnectionProvider;

mod failure;
use failure::FailureReporter;

use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

use tenant_model::{
    ANNOTATION_RUNTIME, FINALIZER_RUNTIME, TenantKey, TenantResource, TenantStatus,
};

use crate::{
    dispatch::FeedbackSender,
    error::{CoreError, StoreError},
    mutator::Mutator,
    registry::Registry,
    runtime::{Bundle, ControllerSet, RuntimeContext, RuntimeHandle, TenantLookup},
    store::TenantStore,
};

/// Result of a successful reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// Nothing else to do until the next notification.
    Done,
    /// Run another pass for the same key after the delay.
    RequeueAfter(Duration),
}

impl Reconciled {
    pub fn requeue_after(&self) -> Option<Duration> {
        match self {
            Reconciled::Done => None,
            Reconciled::RequeueAfter(delay) => Some(*delay),
        }
    }
}

pub struct TenantSupervisor {
    store: Arc<dyn TenantStore>,
    mutator: Mutator,
    registry: Registry,
    controllers: ControllerSet,
    connector: Arc<dyn ConnectionProvider>,
    feedback: FeedbackSender,
    config: SupervisorConfig,
    root: CancellationToken,
}

impl TenantSupervisor {
    pub fn new(
        store: Arc<dyn TenantStore>,
        connector: Arc<dyn ConnectionProvider>,
        controllers: ControllerSet,
        feedback: FeedbackSender,
        config: SupervisorConfig,
    ) -> Self {
        Self {
            mutator: Mutator::new(Arc::clone(&store), config.retry.clone()),
            registry: Registry::new(),
            root: CancellationToken::new(),
            store,
            controllers,
            connector,
            feedback,
            config,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Run one reconciliation pass for `key`.
    #[instrument(level = "debug", skip_all, fields(tenant = %key))]
    pub async fn reconcile(&self, key: &TenantKey) -> Result<Reconciled, CoreError> {
        match self.reconcile_tenant(key).await {
            Err(CoreError::Paused(_)) => {
                debug!("tenant reconciliation is paused");
                Ok(Reconciled::Done)
            }
            other => other,
        }
    }

    async fn reconcile_tenant(&self, key: &TenantKey) -> Result<Reconciled, CoreError> {
        let tenant = match self.store.get(key).await {
            Ok(tenant) => tenant,
            Err(StoreError::NotFound(_)) => {
                self.cleanup(key, None).await?;
                return Ok(Reconciled::Done);
            }
            Err(e) => return Err(e.into()),
        };

        if tenant.is_paused() {
            return Err(CoreError::Paused(key.clone()));
        }

        let status = tenant.effective_status();
        if tenant.is_deleting() || status == TenantStatus::Sleeping {
            if tenant.has_finalizer(FINALIZER_RUNTIME) || self.registry.contains(key).await {
                self.cleanup(key, Some(&tenant)).await?;
            }
            return Ok(Reconciled::Done);
        }

        if let Some(handle) = self.registry.get(key).await {
            if tenant.runtime_failed() {
                if let Some(failed) = self.registry.remove(key).await {
                    failed.cancel();
                }
                info!(runtime = %handle.id(), "dropping failed tenant runtime");
                self.clear_failure(key).await?;
                return Ok(Reconciled::Done);
            }

            if status.requires_restart() {
                // Stale credentials or an unreachable endpoint: stop now, start fresh once serviceable.
                info!(status = status.as_str(), "stopping tenant runtime");
                self.cleanup(key, Some(&tenant)).await?;
                return Ok(Reconciled::Done);
            }

            if handle.is_completed() {
                // Exited without a recorded failure (e.g. the mark could not be written).
                warn!(runtime = %handle.id(), "dropping exited tenant runtime");
                self.registry.remove(key).await;
                return Ok(Reconciled::RequeueAfter(self.config.requeue_after));
            }

            let delivered = handle.trigger();
            trace!(delivered, "nested controllers triggered");
            return Ok(Reconciled::Done);
        }

        if !status.is_serviceable() {
            info!(
                status = status.as_str(),
                "skipping start of tenant runtime for a not ready instance"
            );
            return Ok(Reconciled::Done);
        }

        if tenant.runtime_failed() {
            // Left over by a runtime this process no longer tracks.
            self.clear_failure(key).await?;
            return Ok(Reconciled::RequeueAfter(self.config.requeue_after));
        }

        if !tenant.has_finalizer(FINALIZER_RUNTIME) {
            self.mutator.add_finalizer(key, FINALIZER_RUNTIME).await?;
            return Ok(Reconciled::RequeueAfter(self.config.requeue_after));
        }

        self.start(key, &tenant).await?;
        Ok(Reconciled::RequeueAfter(self.config.requeue_after))
    }

    /// Stop the runtime of `key`, if any, then release the finalizer held on `tenant`.
    ///
    /// Idempotent: without a runtime and without a finalizer this does nothing.
    #[instrument(level = "debug", skip_all, fields(tenant = %key))]
    pub async fn cleanup(
        &self,
        key: &TenantKey,
        tenant: Option<&TenantResource>,
    ) -> Result<(), CoreError> {
        if let Some(handle) = self.registry.get(key).await {
            handle.cancel();
            if handle.wait(self.config.await_timeout).await {
                info!(
                    runtime = %handle.id(),
                    uptime = ?handle.uptime(),
                    "tenant runtime completed its process"
                );
            }
            self.registry.remove(key).await;
        }

        if let Some(tenant) = tenant
            && tenant.has_finalizer(FINALIZER_RUNTIME)
        {
            self.mutator.remove_finalizer(key, FINALIZER_RUNTIME).await?;
            debug!("runtime finalizer removed");
        }

        Ok(())
    }

    async fn clear_failure(&self, key: &TenantKey) -> Result<(), CoreError> {
        self.mutator
            .annotate(key, |annotations| {
                annotations.remove(ANNOTATION_RUNTIME);
            })
            .await?;
        Ok(())
    }

    async fn start(&self, key: &TenantKey, tenant: &TenantResource) -> Result<(), CoreError> {
        let connection = self.connector.connection(tenant).await?;
        let token = self.root.child_token();
        let ctx = RuntimeContext::new(
            key.clone(),
            connection,
            token.clone(),
            TenantLookup::new(Arc::clone(&self.store), key.clone()),
        );

        let registered =
            Bundle::register(ctx.clone(), &self.controllers, self.config.trigger_capacity).await;
        let (bundle, triggers) = match registered {
            Ok(registered) => registered,
            Err(e) => {
                token.cancel();
                return Err(e);
            }
        };

        let reporter = FailureReporter {
            key: key.clone(),
            mutator: self.mutator.clone(),
            feedback: self.feedback.clone(),
        };
        let handle = RuntimeHandle::start(&ctx, triggers, async move {
            if let Err(err) = bundle.run().await {
                reporter.report(err).await;
            }
        });

        info!(
            runtime = %handle.id(),
            controllers = handle.trigger_count(),
            endpoint = %ctx.connection().endpoint,
            "tenant runtime started"
        );
        if let Some(previous) = self.registry.put(handle).await {
            previous.cancel();
        }
        Ok(())
    }

    /// Stop every running tenant runtime.
    ///
    /// Finalizers are kept: the next process re-derives every runtime from the store.
    pub async fn shutdown(&self) {
        self.root.cancel();
        let handles = self.registry.drain().await;
        for handle in &handles {
            handle.cancel();
        }
        for handle in &handles {
            handle.wait(self.config.await_timeout).await;
        }
        info!(stopped = handles.len(), "tenant supervisor stopped");
    }
}
