//! # Event intake and worker loop.
//!
//! ```text
//! Notifier ──► is_actionable ──┐
//!                              ├──► WorkQueue ──► worker × N ──► TenantSupervisor::reconcile
//! FeedbackReceiver ────────────┘        ▲                              │
//!                                       └─── requeue / backoff ◄───────┘
//! ```
//!
//! Store notifications pass the [`predicate::is_actionable`] filter; feedback events
//! come from the supervisor itself and are never filtered.

mod feedback;
pub use feedback::{Feedback, FeedbackReceiver, FeedbackSender, channel};

pub mod predicate;

mod queue;
pub use queue::WorkQueue;

use std::{sync::Arc, time::Duration};

use taskvisor::{BackoffPolicy, JitterPolicy};
use tokio::{
    select,
    sync::{broadcast, mpsc},
    task::JoinSet,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use tenant_model::TenantResource;

use crate::supervisor::TenantSupervisor;

/// Configuration of the [`Dispatcher`].
#[derive(Clone, Debug)]
pub struct DispatchConfig {
    /// Number of concurrent reconcile workers.
    pub workers: usize,
    /// Capacity of the store notification channel.
    pub notification_capacity: usize,
    /// Per-key retry delay after a failed pass, indexed by consecutive failures.
    pub backoff: BackoffPolicy,
}

impl DispatchConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_notification_capacity(mut self, capacity: usize) -> Self {
        self.notification_capacity = capacity.max(1);
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }
}

impl Default for DispatchConfig {
    /// - `workers = 1`
    /// - `notification_capacity = 1024`
    /// - `backoff`: 5ms doubling up to 1000s, no jitter
    fn default() -> Self {
        Self {
            workers: 1,
            notification_capacity: 1024,
            backoff: BackoffPolicy {
                first: Duration::from_millis(5),
                max: Duration::from_secs(1000),
                factor: 2.0,
                jitter: JitterPolicy::None,
            },
        }
    }
}

/// Entry point for tenant change notifications.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<TenantResource>,
}

impl Notifier {
    /// Deliver a changed resource; returns `false` once the dispatcher stopped.
    pub async fn send(&self, resource: TenantResource) -> bool {
        self.tx.send(resource).await.is_ok()
    }

    /// Forward a store change feed until either side closes.
    pub async fn forward(self, mut events: broadcast::Receiver<TenantResource>) {
        loop {
            match events.recv().await {
                Ok(resource) => {
                    if !self.send(resource).await {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "store change feed lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        debug!("store change feed closed");
    }
}

/// Drives [`TenantSupervisor::reconcile`] from notifications and feedback.
pub struct Dispatcher {
    supervisor: Arc<TenantSupervisor>,
    queue: Arc<WorkQueue>,
    config: DispatchConfig,
    notify_tx: mpsc::Sender<TenantResource>,
    notify_rx: mpsc::Receiver<TenantResource>,
    feedback_rx: FeedbackReceiver,
}

impl Dispatcher {
    pub fn new(
        supervisor: Arc<TenantSupervisor>,
        feedback_rx: FeedbackReceiver,
        config: DispatchConfig,
    ) -> Self {
        let (notify_tx, notify_rx) = mpsc::channel(config.notification_capacity.max(1));
        Self {
            queue: WorkQueue::new(config.backoff),
            supervisor,
            config,
            notify_tx,
            notify_rx,
            feedback_rx,
        }
    }

    pub fn notifier(&self) -> Notifier {
        Notifier {
            tx: self.notify_tx.clone(),
        }
    }

    /// Run until `token` is cancelled, then stop every tenant runtime.
    pub async fn run(self, token: CancellationToken) {
        let Dispatcher {
            supervisor,
            queue,
            config,
            notify_tx,
            notify_rx,
            feedback_rx,
        } = self;
        drop(notify_tx);

        let mut tasks = JoinSet::new();
        tasks.spawn(intake(
            Arc::clone(&queue),
            notify_rx,
            feedback_rx,
            token.clone(),
        ));
        for worker in 0..config.workers.max(1) {
            tasks.spawn(work(worker, Arc::clone(&supervisor), Arc::clone(&queue)));
        }
        info!(workers = config.workers.max(1), "tenant dispatcher started");

        token.cancelled().await;
        queue.shut_down();
        while let Some(res) = tasks.join_next().await {
            if let Err(e) = res {
                warn!(error = %e, "dispatcher task failed");
            }
        }

        supervisor.shutdown().await;
        info!("tenant dispatcher stopped");
    }
}

async fn intake(
    queue: Arc<WorkQueue>,
    mut notifications: mpsc::Receiver<TenantResource>,
    mut feedback: FeedbackReceiver,
    token: CancellationToken,
) {
    let mut notifications_open = true;
    loop {
        select! {
            biased;
            _ = token.cancelled() => break,

            Some(event) = feedback.recv() => {
                trace!(tenant = %event.key, "feedback received");
                queue.add(event.key).await;
            }

            res = notifications.recv(), if notifications_open => match res {
                Some(resource) if predicate::is_actionable(&resource) => {
                    queue.add(resource.key).await;
                }
                Some(resource) => {
                    trace!(tenant = %resource.key, "notification filtered");
                }
                None => notifications_open = false,
            },
        }
    }
}

async fn work(worker: usize, supervisor: Arc<TenantSupervisor>, queue: Arc<WorkQueue>) {
    while let Some(key) = queue.get().await {
        match supervisor.reconcile(&key).await {
            Ok(outcome) => {
                queue.forget(&key).await;
                if let Some(delay) = outcome.requeue_after() {
                    queue.add_after(key.clone(), delay);
                }
            }
            Err(e) => {
                let delay = queue.add_rate_limited(key.clone()).await;
                if e.is_conflict() {
                    debug!(
                        tenant = %key,
                        error = %e,
                        retry_in = ?delay,
                        "reconciliation raced a concurrent update"
                    );
                } else {
                    warn!(
                        tenant = %key,
                        error = %e,
                        label = e.as_label(),
                        retry_in = ?delay,
                        "reconciliation failed"
                    );
                }
            }
        }
        queue.done(&key).await;
    }
    debug!(worker, "dispatcher worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_backoff_doubles_from_five_millis() {
        let backoff = DispatchConfig::default().backoff;
        assert_eq!(backoff.next(0), Duration::from_millis(5));
        assert_eq!(backoff.next(1), Duration::from_millis(10));
        assert_eq!(backoff.next(4), Duration::from_millis(80));
        assert_eq!(backoff.next(40), Duration::from_secs(1000));
    }
}
