mod api;
mod auth;
mod config;
mod error;
mod fetch;
mod ingest;
mod outbound;

#[cfg(test)]
mod testutil;

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use wabridge_media::Transcriber;
use wabridge_proto::{OfflineClient, ProtocolClient};
use wabridge_store::Database;

use crate::api::AppState;
use crate::auth::AuthHandle;
use crate::config::BridgeConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,wabridge_server=debug")),
        )
        .init();

    info!("starting WhatsApp bridge v{}", env!("CARGO_PKG_VERSION"));

    let config = Arc::new(BridgeConfig::from_env());
    std::fs::create_dir_all(&config.store_dir)?;

    // The wire-protocol backend keeps its own device store under store_dir
    // and is handed in here; the offline stand-in carries no identity, so
    // the bridge comes up logged out but fully reachable.
    let client: Arc<dyn ProtocolClient> = Arc::new(OfflineClient::new());

    let store = Arc::new(Database::open(&config.message_db_path())?);

    let transcriber = Arc::new(Transcriber::new(
        config.whisper_bin_path.clone(),
        config.whisper_model_path.clone(),
        config.ffmpeg_bin_path.clone(),
    ));

    let state = AppState {
        client,
        store,
        auth: Arc::new(AuthHandle::new()),
        config: config.clone(),
        transcriber,
    };

    ingest::install_event_handler(&state);

    // HTTP comes up before authentication so the QR page is reachable while
    // pairing. A bind failure is logged but not fatal: the operator should
    // still be able to see what went wrong from the running process.
    let http_state = state.clone();
    let port = config.port;
    tokio::spawn(async move {
        if let Err(e) = api::serve(http_state, port).await {
            error!(error = %e, "HTTP server failed");
        }
    });

    auth::authenticate_on_startup(&state).await;

    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("interrupt received"),
        _ = sigterm.recv() => info!("terminate received"),
    }

    info!("shutting down");
    state.client.disconnect().await;

    Ok(())
}
