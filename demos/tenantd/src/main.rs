use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use tenant_core::{
    ConnectionProvider, ControllerError, ControllerSet, CoreError, DispatchConfig, Dispatcher,
    MemoryStore, NestedController, RuntimeContext, SupervisorConfig, TenantSupervisor, Trigger,
    dispatch,
};
use tenant_model::{TenantConnection, TenantKey, TenantResource, TenantStatus};
use tenant_observe::{LoggerConfig, LoggerFormat, logger_init};

/// Logs every reconcile of its tenant; stands in for a real nested controller.
struct Echo(&'static str);

#[async_trait]
impl NestedController for Echo {
    fn name(&self) -> &'static str {
        self.0
    }

    async fn reconcile(&self, ctx: &RuntimeContext, trigger: Trigger) -> Result<(), ControllerError> {
        let tenant = ctx.lookup().fetch().await?;
        info!(
            controller = self.0,
            tenant = %trigger.key,
            runtime = %ctx.id(),
            status = tenant.effective_status().as_str(),
            "nested reconcile"
        );
        Ok(())
    }
}

/// Derives the in-cluster API server endpoint from the tenant key; the CA comes from `TENANTD_CA_BUNDLE`.
struct InCluster;

#[async_trait]
impl ConnectionProvider for InCluster {
    async fn connection(&self, tenant: &TenantResource) -> Result<TenantConnection, CoreError> {
        let mut connection = TenantConnection::new(format!(
            "https://{}.{}.svc:6443",
            tenant.key.name, tenant.key.namespace
        ));
        if let Ok(ca_bundle) = std::env::var("TENANTD_CA_BUNDLE") {
            connection = connection.with_ca_bundle(ca_bundle);
        }
        Ok(connection)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1) Logger
    let mut cfg = LoggerConfig::default()
        .with_level(std::env::var("TENANTD_LOG").unwrap_or_else(|_| "info".to_string()));
    if let Ok(format) = std::env::var("TENANTD_LOG_FORMAT") {
        cfg = cfg.with_format(format.parse::<LoggerFormat>()?);
    }
    logger_init(&cfg)?;
    info!(format = %cfg.format, level = %cfg.level, "logger initialized");

    // 2) Store + supervisor
    let store = Arc::new(MemoryStore::new());
    let controllers = ["agent", "proxy", "dns", "kubelet-config"]
        .into_iter()
        .fold(ControllerSet::new(), |set, name| set.with(Arc::new(Echo(name))));
    let (feedback_tx, feedback_rx) = dispatch::channel();
    let supervisor = Arc::new(TenantSupervisor::new(
        store.clone(),
        Arc::new(InCluster),
        controllers,
        feedback_tx,
        SupervisorConfig::default(),
    ));

    // 3) Dispatcher fed by the store's change feed
    let dispatcher = Dispatcher::new(supervisor, feedback_rx, DispatchConfig::default());
    tokio::spawn(dispatcher.notifier().forward(store.subscribe()));
    let token = CancellationToken::new();
    let running = tokio::spawn(dispatcher.run(token.clone()));
    info!("tenant dispatcher ready");

    // 4) Walk one tenant through its lifecycle
    let key = TenantKey::new("tenants", "acme");
    store.create(TenantResource::new(key.clone())).await?;
    tokio::time::sleep(Duration::from_millis(200)).await;
    store.set_status(&key, TenantStatus::Ready).await?;
    tokio::time::sleep(Duration::from_secs(3)).await;
    store.set_status(&key, TenantStatus::CaRotating).await?;
    tokio::time::sleep(Duration::from_secs(1)).await;
    store.set_status(&key, TenantStatus::Ready).await?;
    tokio::time::sleep(Duration::from_secs(3)).await;
    store.delete(&key).await?;
    info!(tenant = %key, "tenant deletion requested");

    // 5) Keep running
    info!("press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    info!("shutting down...");
    token.cancel();
    running.await?;

    Ok(())
}
