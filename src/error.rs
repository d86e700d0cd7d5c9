//! Unified error type.

use std::net::SocketAddr;
use std::time::Duration;

use tracing::error;

/// How long the accept and receive loops wait after an I/O error before
/// trying again.
pub(crate) const RETRY_DELAY: Duration = Duration::from_millis(100);

/// The error type returned by the relay's fallible startup and serving paths.
///
/// Application-level failures (a missing file, a malformed form body) never
/// show up here. The router turns the former into a `404` response and the
/// consumer logs and drops the latter. This type surfaces infrastructure
/// failures: reading configuration, binding a port, or accepting a connection.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Logs a failed accept or receive and waits [`RETRY_DELAY`] before the
/// caller loops. Errors such as descriptor exhaustion repeat on every
/// attempt and would otherwise spin the loop.
pub(crate) async fn pause_after_error(op: &'static str, err: &std::io::Error) {
    error!(op, retry_in = ?RETRY_DELAY, "{op} error: {err}");
    tokio::time::sleep(RETRY_DELAY).await;
}
