use anyhow::Result;
use std::sync::Arc;

use powerbi_gateway::{config, gateway::PowerBiGateway, middleware, routes};
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (for log level)
    let config = config::Config::load()?;

    // Initialize logging with a configured level
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    config.validate()?;

    tracing::info!("Power BI Gateway starting...");
    tracing::info!(
        "Server configured: {}:{}",
        config.server_host,
        config.server_port
    );
    tracing::info!("Power BI endpoint: {}", config.gateway.base_url);

    let gateway = Arc::new(PowerBiGateway::new(&config.gateway)?);

    // Probe authentication once so bad credentials show up at startup
    match gateway.http().credentials().ensure_valid_token().await {
        Ok(_) => tracing::info!(
            "Authentication successful for tenant {}",
            gateway.http().credentials().tenant_id()
        ),
        Err(e) => {
            tracing::error!("Authentication failed: {}", e);
            tracing::warn!("Server will start but tool calls will fail without valid credentials");
        }
    }

    if config.gateway_api_key.is_none() {
        tracing::warn!("GATEWAY_API_KEY not set; tool routes are open to any caller");
    }

    let state = routes::AppState {
        gateway,
        api_key: config.gateway_api_key.clone(),
    };

    let app = build_app(state);

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Build the application with all routes and middleware
fn build_app(state: routes::AppState) -> axum::Router {
    axum::Router::new()
        .merge(routes::health_routes())
        .merge(routes::tool_routes(state))
        .layer(middleware::cors_layer())
        .layer(TraceLayer::new_for_http())
}

/// Handle graceful shutdown signal
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown...");
        },
    }
}
