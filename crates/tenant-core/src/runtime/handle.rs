use std::{
    future::Future,
    time::{Duration, Instant},
};

use tokio::{
    sync::{mpsc, mpsc::error::TrySendError, watch},
    time,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use tenant_model::TenantKey;

use crate::runtime::{RuntimeContext, Trigger};

/// Handle to a running tenant runtime.
///
/// Owned by the [`Registry`](crate::Registry); the background task reports back
/// only through the completion signal.
pub struct RuntimeHandle {
    id: Uuid,
    key: TenantKey,
    triggers: Vec<mpsc::Sender<Trigger>>,
    cancel: CancellationToken,
    done: watch::Receiver<bool>,
    started_at: Instant,
}

impl RuntimeHandle {
    /// Spawn `run` as the background task of the runtime described by `ctx`.
    ///
    /// The completion signal is closed when `run` returns (or panics).
    pub fn start<F>(ctx: &RuntimeContext, triggers: Vec<mpsc::Sender<Trigger>>, run: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (done_tx, done_rx) = watch::channel(false);

        tokio::spawn(async move {
            run.await;
            let _ = done_tx.send(true);
        });

        Self {
            id: ctx.id(),
            key: ctx.key().clone(),
            triggers,
            cancel: ctx.token().clone(),
            done: done_rx,
            started_at: Instant::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn key(&self) -> &TenantKey {
        &self.key
    }

    /// Number of trigger inputs (one per nested controller).
    pub fn trigger_count(&self) -> usize {
        self.triggers.len()
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Ask every nested controller to reconcile, without blocking.
    ///
    /// Returns how many triggers were queued; full inputs already hold a pending trigger.
    pub fn trigger(&self) -> usize {
        let mut delivered = 0;
        for tx in &self.triggers {
            match tx.try_send(Trigger::new(self.key.clone())) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    trace!(tenant = %self.key, "trigger coalesced with a pending one");
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(tenant = %self.key, runtime = %self.id, "trigger input closed");
                }
            }
        }
        delivered
    }

    /// Request cooperative shutdown of the runtime.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Returns `true` once the background task has exited.
    pub fn is_completed(&self) -> bool {
        *self.done.borrow() || self.done.has_changed().is_err()
    }

    /// Wait for the completion signal for at most `timeout`.
    ///
    /// Returns `false` on timeout; the background task may then still be running.
    pub async fn wait(&self, timeout: Duration) -> bool {
        let mut done = self.done.clone();
        // A dropped sender means the task is gone as well.
        match time::timeout(timeout, done.wait_for(|finished| *finished)).await {
            Ok(_) => true,
            Err(_) => {
                warn!(
                    tenant = %self.key,
                    runtime = %self.id,
                    timeout = ?timeout,
                    "tenant runtime did not exit before timeout"
                );
                false
            }
        }
    }
}

impl std::fmt::Debug for RuntimeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeHandle")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("triggers", &self.triggers.len())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
