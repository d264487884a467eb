//! Conflict-safe fetch-modify-write against the tenant store.
//!
//! Every write the supervisor performs (finalizer add/remove, failure annotation
//! set/clear) goes through [`Mutator::apply`]: the freshest copy is fetched, the
//! mutation closure is applied, and the copy is written back with its version as
//! precondition. Conflicts restart the whole cycle, up to [`RetryConfig::attempts`].

use std::{sync::Arc, time::Duration};

use taskvisor::{BackoffPolicy, JitterPolicy};
use tokio::time;
use tracing::{debug, instrument};

use tenant_model::{Annotations, TenantKey, TenantResource};

use crate::{
    error::{CoreError, StoreError},
    runtime::TenantLookup,
    store::TenantStore,
};

/// Retry schedule for conflicting writes.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Total number of fetch-modify-write cycles (at least one is always made).
    pub attempts: u32,
    /// Wait before cycle `n + 1` is `backoff.next(n - 1)`.
    pub backoff: BackoffPolicy,
}

impl Default for RetryConfig {
    /// - `attempts = 5`
    /// - fixed 10ms wait with up to 10% jitter (decorrelated, capped at 11ms)
    fn default() -> Self {
        Self {
            attempts: 5,
            backoff: BackoffPolicy {
                first: Duration::from_millis(10),
                max: Duration::from_millis(11),
                factor: 1.0,
                jitter: JitterPolicy::Decorrelated,
            },
        }
    }
}

#[derive(Clone)]
pub struct Mutator {
    store: Arc<dyn TenantStore>,
    retry: RetryConfig,
}

impl Mutator {
    pub fn new(store: Arc<dyn TenantStore>, retry: RetryConfig) -> Self {
        Self { store, retry }
    }

    /// Apply `mutate` to the freshest copy of `key` and write it back.
    ///
    /// `mutate` returns whether it changed anything; unchanged copies are not written.
    /// Fails with [`CoreError::RetriesExhausted`] once every attempt conflicted, and
    /// immediately on any other store error or when the tenant is paused.
    #[instrument(level = "debug", skip_all, fields(tenant = %key))]
    pub async fn apply<F>(
        &self,
        key: &TenantKey,
        mut mutate: F,
    ) -> Result<TenantResource, CoreError>
    where
        F: FnMut(&mut TenantResource) -> bool + Send,
    {
        let lookup = TenantLookup::new(Arc::clone(&self.store), key.clone());
        let attempts = self.retry.attempts.max(1);

        for attempt in 1..=attempts {
            let mut resource = lookup.fetch().await?;
            if !mutate(&mut resource) {
                return Ok(resource);
            }

            match self.store.update(resource).await {
                Ok(stored) => return Ok(stored),
                Err(StoreError::Conflict { expected, found, .. }) => {
                    debug!(attempt, expected, found, "conflicting update, retrying");
                    if attempt < attempts {
                        time::sleep(self.retry.backoff.next(attempt - 1)).await;
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(CoreError::RetriesExhausted {
            key: key.clone(),
            attempts,
        })
    }

    /// Mutate only the annotation set of `key`.
    pub async fn annotate<F>(
        &self,
        key: &TenantKey,
        mut mutate: F,
    ) -> Result<TenantResource, CoreError>
    where
        F: FnMut(&mut Annotations) + Send,
    {
        self.apply(key, |resource| {
            let before = resource.annotations.clone();
            mutate(&mut resource.annotations);
            before != resource.annotations
        })
        .await
    }

    pub async fn add_finalizer(
        &self,
        key: &TenantKey,
        finalizer: &str,
    ) -> Result<TenantResource, CoreError> {
        self.apply(key, |resource| resource.add_finalizer(finalizer))
            .await
    }

    pub async fn remove_finalizer(
        &self,
        key: &TenantKey,
        finalizer: &str,
    ) -> Result<TenantResource, CoreError> {
        self.apply(key, |resource| resource.remove_finalizer(finalizer))
            .await
    }
}
