use std::sync::Arc;

use tokio::{select, sync::mpsc, task::JoinSet};
use tracing::{debug, trace, warn};

use crate::{
    error::{ControllerError, CoreError, RuntimeError},
    runtime::{ControllerSet, NestedController, RuntimeContext, Trigger},
};

struct Member {
    controller: Arc<dyn NestedController>,
    triggers: mpsc::Receiver<Trigger>,
}

/// Registered, not yet running, set of nested controllers bound to one runtime context.
pub(crate) struct Bundle {
    ctx: RuntimeContext,
    members: Vec<Member>,
}

impl Bundle {
    /// Register every controller against `ctx`, giving each its own trigger input.
    ///
    /// Returns the bundle together with the trigger senders, in controller order.
    /// Registration stops at the first failure.
    pub(crate) async fn register(
        ctx: RuntimeContext,
        controllers: &ControllerSet,
        trigger_capacity: usize,
    ) -> Result<(Self, Vec<mpsc::Sender<Trigger>>), CoreError> {
        let mut members = Vec::with_capacity(controllers.len());
        let mut senders = Vec::with_capacity(controllers.len());

        for controller in controllers.iter() {
            controller
                .register(&ctx)
                .await
                .map_err(|e| CoreError::Register {
                    controller: controller.name(),
                    reason: e.to_string(),
                })?;

            let (tx, rx) = mpsc::channel(trigger_capacity.max(1));
            senders.push(tx);
            members.push(Member {
                controller: Arc::clone(controller),
                triggers: rx,
            });
            trace!(tenant = %ctx.key(), controller = controller.name(), "nested controller registered");
        }

        Ok((Self { ctx, members }, senders))
    }

    /// Run every controller loop until the runtime token is cancelled or one of them fails.
    ///
    /// The first failure cancels the sibling loops and is returned once all of them exited.
    pub(crate) async fn run(self) -> Result<(), RuntimeError> {
        let Bundle { ctx, members } = self;
        let mut loops = JoinSet::new();

        for member in members {
            loops.spawn(run_controller(ctx.clone(), member));
        }

        let mut outcome = Ok(());
        while let Some(joined) = loops.join_next().await {
            let result = joined.unwrap_or_else(|e| Err(RuntimeError::Panicked(e.to_string())));
            if let Err(e) = result
                && outcome.is_ok()
            {
                ctx.token().cancel();
                outcome = Err(e);
            }
        }
        outcome
    }
}

async fn run_controller(ctx: RuntimeContext, member: Member) -> Result<(), RuntimeError> {
    let Member {
        controller,
        mut triggers,
    } = member;
    let name = controller.name();
    let mut pending = Some(Trigger::new(ctx.key().clone()));

    loop {
        let trigger = match pending.take() {
            Some(trigger) => trigger,
            None => select! {
                biased;
                _ = ctx.token().cancelled() => break,
                msg = triggers.recv() => match msg {
                    Some(trigger) => trigger,
                    None => break,
                },
            },
        };

        let result = select! {
            biased;
            _ = ctx.token().cancelled() => break,
            result = controller.reconcile(&ctx, trigger) => result,
        };

        match result {
            Ok(()) => trace!(tenant = %ctx.key(), controller = name, "nested reconcile done"),
            Err(ControllerError::Transient(reason)) => {
                warn!(tenant = %ctx.key(), controller = name, %reason, "nested reconcile failed");
            }
            Err(ControllerError::Fatal(reason)) => {
                return Err(RuntimeError::ControllerFailed {
                    controller: name,
                    reason,
                });
            }
        }
    }

    debug!(tenant = %ctx.key(), controller = name, "nested controller stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    use tenant_model::{TenantConnection, TenantKey};

    use super::*;
    use crate::{runtime::TenantLookup, store::MemoryStore};

    #[derive(Default)]
    struct Counting {
        reconciles: AtomicUsize,
    }

    #[async_trait]
    impl NestedController for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn reconcile(&self, _ctx: &RuntimeContext, _t: Trigger) -> Result<(), ControllerError> {
            self.reconciles.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct RefusesRegistration;

    #[async_trait]
    impl NestedController for RefusesRegistration {
        fn name(&self) -> &'static str {
            "refuses"
        }

        async fn register(&self, _ctx: &RuntimeContext) -> Result<(), ControllerError> {
            Err(ControllerError::Fatal("no client".into()))
        }

        async fn reconcile(&self, _ctx: &RuntimeContext, _t: Trigger) -> Result<(), ControllerError> {
            Ok(())
        }
    }

    struct FailsFatally;

    #[async_trait]
    impl NestedController for FailsFatally {
        fn name(&self) -> &'static str {
            "fails"
        }

        async fn reconcile(&self, _ctx: &RuntimeContext, _t: Trigger) -> Result<(), ControllerError> {
            Err(ControllerError::Fatal("unreachable endpoint".into()))
        }
    }

    fn ctx() -> RuntimeContext {
        let key = TenantKey::new("tenants", "acme");
        RuntimeContext::new(
            key.clone(),
            TenantConnection::new("https://127.0.0.1:6443"),
            CancellationToken::new(),
            TenantLookup::new(Arc::new(MemoryStore::new()), key),
        )
    }

    async fn eventually(mut check: impl FnMut() -> bool) {
        for _ in 0..200 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn registration_failure_aborts_bundle() {
        let set = ControllerSet::new()
            .with(Arc::new(Counting::default()))
            .with(Arc::new(RefusesRegistration));

        let err = Bundle::register(ctx(), &set, 1).await.err().unwrap();
        assert!(matches!(err, CoreError::Register { controller: "refuses", .. }));
    }

    #[tokio::test]
    async fn initial_reconcile_then_one_per_trigger() {
        let counting = Arc::new(Counting::default());
        let set = ControllerSet::new().with(counting.clone());
        let ctx = ctx();

        let (bundle, senders) = Bundle::register(ctx.clone(), &set, 1).await.unwrap();
        assert_eq!(senders.len(), 1);
        let running = tokio::spawn(bundle.run());

        eventually(|| counting.reconciles.load(Ordering::SeqCst) == 1).await;
        senders[0].send(Trigger::new(ctx.key().clone())).await.unwrap();
        eventually(|| counting.reconciles.load(Ordering::SeqCst) == 2).await;

        ctx.token().cancel();
        assert_eq!(running.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn fatal_failure_stops_siblings_and_is_reported() {
        let set = ControllerSet::new()
            .with(Arc::new(Counting::default()))
            .with(Arc::new(FailsFatally));
        let ctx = ctx();

        let (bundle, _senders) = Bundle::register(ctx.clone(), &set, 1).await.unwrap();
        let err = bundle.run().await.unwrap_err();

        assert_eq!(
            err,
            RuntimeError::ControllerFailed {
                controller: "fails",
                reason: "unreachable endpoint".into(),
            }
        );
        assert!(ctx.is_cancelled());
    }
}
