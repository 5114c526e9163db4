/**
 * Ripple Server Entry Point
 *
 * Boots the presence and message delivery backend: database, shared
 * state, the staleness sweeper, and the Axum HTTP/WebSocket server.
 */

use ripple::backend::server::{init, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info,ripple=debug".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(?config, "server initialization started");

    let state = init::build_state(config.clone()).await?;
    init::spawn_sweeper(state.clone());

    let app = init::create_app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;

    Ok(())
}
