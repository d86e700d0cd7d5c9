use std::process::ExitCode;

use formrelay::shutdown::shutdown_signal;
use formrelay::{Relay, RelayConfig, SqliteStore, telemetry};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match RelayConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    telemetry::init(&config.log_level);
    info!(?config, "starting formrelay");

    let store = SqliteStore::new(config.store_uri.clone());
    let relay = match Relay::bind(&config, store).await {
        Ok(relay) => relay,
        Err(e) => {
            error!(error = %e, "startup failed");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.cancel();
        }
    });

    match relay.run(shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "relay failed");
            ExitCode::FAILURE
        }
    }
}
