#![allow(dead_code)]

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;

use tenant_core::{
    ConnectionProvider, ControllerError, ControllerSet, CoreError, FeedbackReceiver, MemoryStore,
    NestedController, RuntimeContext, SupervisorConfig, TenantSupervisor, Trigger, dispatch,
};
use tenant_model::{TenantConnection, TenantKey, TenantResource};

/// Names of the controllers of a full tenant runtime.
pub const REFERENCE_CONTROLLERS: [&str; 7] = [
    "webhook-migration",
    "agent",
    "proxy",
    "dns",
    "kubeadm-config",
    "kubelet-config",
    "bootstrap-token",
];

pub const TEST_CA: &str = "-----BEGIN CERTIFICATE-----\ntenant-ca\n-----END CERTIFICATE-----";

/// Counts reconciles; fails fatally on the next reconcile once [`fail_next`] is set.
pub struct RecordingController {
    name: &'static str,
    reconciles: AtomicUsize,
    fail: AtomicBool,
    connection: Mutex<Option<TenantConnection>>,
}

impl RecordingController {
    pub fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            reconciles: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            connection: Mutex::new(None),
        })
    }

    pub fn reconciles(&self) -> usize {
        self.reconciles.load(Ordering::SeqCst)
    }

    /// Connection parameters seen on the last reconcile.
    pub fn connection(&self) -> Option<TenantConnection> {
        self.connection.lock().unwrap().clone()
    }

    pub fn fail_next(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl NestedController for RecordingController {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn reconcile(&self, ctx: &RuntimeContext, trigger: Trigger) -> Result<(), ControllerError> {
        assert_eq!(&trigger.key, ctx.key());
        *self.connection.lock().unwrap() = Some(ctx.connection().clone());
        self.reconciles.fetch_add(1, Ordering::SeqCst);
        if self.fail.swap(false, Ordering::SeqCst) {
            return Err(ControllerError::Fatal("tenant endpoint refused connection".into()));
        }
        Ok(())
    }
}

/// Blocks its worker thread on the first reconcile, deaf to cancellation, until released.
pub struct StuckController {
    entered: AtomicBool,
    release: Mutex<std::sync::mpsc::Receiver<()>>,
}

impl StuckController {
    pub fn new() -> (Arc<Self>, std::sync::mpsc::Sender<()>) {
        let (tx, rx) = std::sync::mpsc::channel();
        let controller = Arc::new(Self {
            entered: AtomicBool::new(false),
            release: Mutex::new(rx),
        });
        (controller, tx)
    }

    pub fn entered(&self) -> bool {
        self.entered.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NestedController for StuckController {
    fn name(&self) -> &'static str {
        "stuck"
    }

    async fn reconcile(&self, _ctx: &RuntimeContext, _t: Trigger) -> Result<(), ControllerError> {
        if self.entered.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let _ = self
            .release
            .lock()
            .unwrap()
            .recv_timeout(Duration::from_secs(10));
        Ok(())
    }
}

pub struct RefusingController;

#[async_trait]
impl NestedController for RefusingController {
    fn name(&self) -> &'static str {
        "refusing"
    }

    async fn register(&self, _ctx: &RuntimeContext) -> Result<(), ControllerError> {
        Err(ControllerError::Fatal("missing client".into()))
    }

    async fn reconcile(&self, _ctx: &RuntimeContext, _t: Trigger) -> Result<(), ControllerError> {
        Ok(())
    }
}

/// Serves an in-cluster endpoint per tenant, or refuses every request.
#[derive(Default)]
pub struct StaticConnector {
    pub refuse: AtomicBool,
    pub calls: AtomicUsize,
}

#[async_trait]
impl ConnectionProvider for StaticConnector {
    async fn connection(&self, tenant: &TenantResource) -> Result<TenantConnection, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.refuse.load(Ordering::SeqCst) {
            return Err(CoreError::Connection {
                key: tenant.key.clone(),
                reason: "admin kubeconfig not found".into(),
            });
        }
        Ok(TenantConnection::new(format!(
            "https://{}.{}.svc:6443",
            tenant.key.name, tenant.key.namespace
        ))
        .with_ca_bundle(TEST_CA)
        .with_token("token"))
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub connector: Arc<StaticConnector>,
    pub supervisor: Arc<TenantSupervisor>,
    pub feedback: FeedbackReceiver,
}

pub fn config() -> SupervisorConfig {
    SupervisorConfig::default()
        .with_requeue_after(Duration::from_millis(10))
        .with_await_timeout(Duration::from_secs(1))
}

pub fn harness(controllers: ControllerSet) -> Harness {
    harness_with(controllers, config())
}

pub fn harness_with(controllers: ControllerSet, config: SupervisorConfig) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let connector = Arc::new(StaticConnector::default());
    let (feedback_tx, feedback) = dispatch::channel();
    let supervisor = Arc::new(TenantSupervisor::new(
        store.clone(),
        connector.clone(),
        controllers,
        feedback_tx,
        config,
    ));
    Harness {
        store,
        connector,
        supervisor,
        feedback,
    }
}

pub fn reference_bundle() -> (ControllerSet, Vec<Arc<RecordingController>>) {
    let recorders: Vec<_> = REFERENCE_CONTROLLERS
        .iter()
        .map(|name| RecordingController::new(*name))
        .collect();
    let set = recorders
        .iter()
        .fold(ControllerSet::new(), |set, c| set.with(c.clone()));
    (set, recorders)
}

pub fn key(name: &str) -> TenantKey {
    TenantKey::new("tenants", name)
}

pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..400 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}
