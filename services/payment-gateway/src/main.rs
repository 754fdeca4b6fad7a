// Payment Gateway Service
// Routes deposits and withdrawals to regional payment providers

use payment_gateway::config::Config;
use payment_gateway::server::{router, AppState};
use payment_gateway::telemetry;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    info!("Starting Payment Gateway Service");

    let config = Config::from_env()?;
    config.validate()?;

    let state = AppState::from_config(&config).await?;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let app = router(state).layer(cors);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Gateway listening on: {}", bind_addr);
    info!("   POST /deposit - Initiate a deposit");
    info!("   POST /withdrawal - Initiate a withdrawal");
    info!("   POST /callback/:gateway_id - Provider status callback");
    info!("   GET  /health - Health check");
    info!("   GET  /metrics - Prometheus metrics");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Payment Gateway Service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
