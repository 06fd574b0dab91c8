use std::sync::Arc;

use mock_server::{MockIssuer, DEFAULT_PATH};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let terminal_id = std::env::var("TUTUKA_TERMINAL_ID").unwrap_or_else(|_| "0000000001".to_string());
    let terminal_secret =
        std::env::var("TUTUKA_TERMINAL_SECRET").unwrap_or_else(|_| "mock-secret".to_string());

    // A funded demo profile and two unlinked cards to play with.
    let issuer = MockIssuer::new(&terminal_id, &terminal_secret)
        .with_profile("1000000001", 100_000)
        .with_card("0000000000000001", 0)
        .with_card("0000000000000002", 0);

    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, path = DEFAULT_PATH, terminal_id = %terminal_id, "mock issuer listening");
    mock_server::run(listener, Arc::new(issuer)).await
}
