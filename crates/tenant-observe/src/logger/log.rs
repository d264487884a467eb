//! Subscriber assembly: one formatting layer per [`LoggerFormat`], filtered by the
//! configured directive and installed as the global default.

use time::{UtcOffset, format_description::well_known::Rfc3339};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, format::FmtSpan, time::OffsetTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::logger::{config::LoggerConfig, error::LoggerError, format::LoggerFormat};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

pub(crate) fn install(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    let filter = parse_filter(&cfg.level)?;
    let layer = match cfg.format {
        LoggerFormat::Text => text_layer(cfg),
        LoggerFormat::Json => json_layer(cfg),
        LoggerFormat::Journald => journald_layer()?,
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()
        .map_err(|e| install_error(e.to_string()))
}

fn text_layer(cfg: &LoggerConfig) -> BoxedLayer {
    fmt::layer()
        .with_ansi(cfg.use_color)
        .with_target(cfg.with_targets)
        .with_timer(local_timer())
        .boxed()
}

/// Json lines; span close events carry the busy/idle time of each reconciliation pass.
fn json_layer(cfg: &LoggerConfig) -> BoxedLayer {
    fmt::layer()
        .json()
        .with_ansi(false)
        .with_target(cfg.with_targets)
        .with_current_span(true)
        .with_span_list(false)
        .with_span_events(FmtSpan::CLOSE)
        .with_timer(local_timer())
        .boxed()
}

#[cfg(all(target_os = "linux", feature = "journald"))]
fn journald_layer() -> Result<BoxedLayer, LoggerError> {
    let layer = tracing_journald::layer()
        .map_err(|e| LoggerError::Install(format!("journald socket: {e}")))?;
    Ok(layer.boxed())
}

#[cfg(not(all(target_os = "linux", feature = "journald")))]
fn journald_layer() -> Result<BoxedLayer, LoggerError> {
    Err(LoggerError::JournaldUnavailable)
}

fn parse_filter(directive: &str) -> Result<EnvFilter, LoggerError> {
    EnvFilter::try_new(directive).map_err(|_| LoggerError::InvalidFilter(directive.to_string()))
}

fn local_timer() -> OffsetTime<Rfc3339> {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetTime::new(offset, Rfc3339)
}

fn install_error(reason: String) -> LoggerError {
    if reason.contains("global default") {
        LoggerError::AlreadyInstalled
    } else {
        LoggerError::Install(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_directive_is_rejected() {
        let err = parse_filter("tenant_core=notalevel").unwrap_err();
        assert!(matches!(err, LoggerError::InvalidFilter(d) if d == "tenant_core=notalevel"));
    }

    #[test]
    fn per_crate_directive_is_accepted() {
        assert!(parse_filter("tenant_core=debug,info").is_ok());
    }

    #[test]
    fn second_install_is_reported() {
        assert!(matches!(
            install_error("a global default trace dispatcher has already been set".into()),
            LoggerError::AlreadyInstalled
        ));
        assert!(matches!(install_error("boom".into()), LoggerError::Install(_)));
    }
}
