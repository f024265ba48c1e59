//! HTTP liveness probe so external monitors can tell the process is up.

use axum::Router;
use axum::routing::get;
use tokio::task::JoinHandle;

pub const ALIVE_MESSAGE: &str = "Bot is alive!";

pub fn router() -> Router {
    Router::new().route("/", get(alive_handler))
}

#[tracing::instrument]
pub async fn alive_handler() -> &'static str {
    ALIVE_MESSAGE
}

/// Serves the probe on `0.0.0.0:<port>` until the process exits.
#[tracing::instrument]
pub async fn serve(port: u16) -> anyhow::Result<()> {
    let address = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("Liveness server running on http://{}", address);
    axum::serve(listener, router()).await?;
    Ok(())
}

/// Runs [`serve`] in the background. Failures are logged, never fatal to the bot.
pub fn spawn(port: u16) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = serve(port).await {
            tracing::error!("Liveness server stopped: {:#}", e);
        }
    })
}
