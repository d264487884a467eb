use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("unknown log format {0:?} (expected text, json or journald)")]
    UnknownFormat(String),

    #[error("journald output needs linux and the `journald` feature")]
    JournaldUnavailable,

    #[error("a global tracing subscriber is already installed")]
    AlreadyInstalled,

    #[error("cannot install tracing subscriber: {0}")]
    Install(String),

    #[error("invalid log filter directive {0:?}")]
    InvalidFilter(String),
}
