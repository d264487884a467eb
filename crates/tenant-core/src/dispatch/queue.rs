//! Deduplicating work queue with per-key serialization.
//!
//! ## Rules
//! - A key is queued at most once (`dirty` set)
//! - A key handed to a worker is not handed to another one until [`WorkQueue::done`]
//! - A key added while being processed is queued again on [`WorkQueue::done`]
//! - Failures back off exponentially per key until [`WorkQueue::forget`]

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::Arc,
    time::Duration,
};

use tokio::{
    select,
    sync::{Mutex, Notify},
    time,
};
use taskvisor::BackoffPolicy;
use tokio_util::sync::CancellationToken;

use tenant_model::TenantKey;

#[derive(Default)]
struct QueueState {
    queue: VecDeque<TenantKey>,
    dirty: HashSet<TenantKey>,
    processing: HashSet<TenantKey>,
    failures: HashMap<TenantKey, u32>,
}

pub struct WorkQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    token: CancellationToken,
    backoff: BackoffPolicy,
}

impl WorkQueue {
    /// `backoff.next(n)` is the delay after the `n+1`-th consecutive failure of a key.
    pub fn new(backoff: BackoffPolicy) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            token: CancellationToken::new(),
            backoff,
        })
    }

    pub async fn add(&self, key: TenantKey) {
        if self.token.is_cancelled() {
            return;
        }
        let mut state = self.state.lock().await;
        if !state.dirty.insert(key.clone()) {
            return;
        }
        if state.processing.contains(&key) {
            return;
        }
        state.queue.push_back(key);
        drop(state);
        self.notify.notify_one();
    }

    /// Add `key` once `delay` has elapsed (dropped on shutdown).
    pub fn add_after(self: &Arc<Self>, key: TenantKey, delay: Duration) {
        if delay.is_zero() {
            let me = Arc::clone(self);
            tokio::spawn(async move { me.add(key).await });
            return;
        }
        let me = Arc::clone(self);
        tokio::spawn(async move {
            select! {
                _ = me.token.cancelled() => {}
                _ = time::sleep(delay) => me.add(key).await,
            }
        });
    }

    /// Add `key` after its per-key backoff; returns the delay used.
    pub async fn add_rate_limited(self: &Arc<Self>, key: TenantKey) -> Duration {
        let delay = {
            let mut state = self.state.lock().await;
            let failures = state.failures.entry(key.clone()).or_insert(0);
            let delay = self.backoff.next(*failures);
            *failures = failures.saturating_add(1);
            delay
        };
        self.add_after(key, delay);
        delay
    }

    /// Reset the failure count of `key`.
    pub async fn forget(&self, key: &TenantKey) {
        self.state.lock().await.failures.remove(key);
    }

    pub async fn failures(&self, key: &TenantKey) -> u32 {
        self.state
            .lock()
            .await
            .failures
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    /// Wait for the next key; `None` once the queue is shut down.
    pub async fn get(&self) -> Option<TenantKey> {
        loop {
            if self.token.is_cancelled() {
                return None;
            }
            {
                let mut state = self.state.lock().await;
                if let Some(key) = state.queue.pop_front() {
                    state.dirty.remove(&key);
                    state.processing.insert(key.clone());
                    return Some(key);
                }
            }
            select! {
                _ = self.token.cancelled() => return None,
                _ = self.notify.notified() => {}
            }
        }
    }

    /// Mark `key` as processed, re-queueing it if it was added meanwhile.
    pub async fn done(&self, key: &TenantKey) {
        let mut state = self.state.lock().await;
        state.processing.remove(key);
        if state.dirty.contains(key) {
            state.queue.push_back(key.clone());
            drop(state);
            self.notify.notify_one();
        }
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.queue.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.queue.is_empty()
    }

    pub fn shut_down(&self) {
        self.token.cancel();
        self.notify.notify_waiters();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }
}
