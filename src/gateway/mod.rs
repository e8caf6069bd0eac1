//! Gateway 应用层
//!
//! HTTP 服务器和请求处理

mod handlers;
mod middleware;
mod state;

pub use state::AppState;

use anyhow::Result;
use axum::{
    http::StatusCode,
    middleware as axum_middleware,
    routing::{any, get},
    Router,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::card::CardGenerator;
use crate::config::{Config, SERVER_REQUEST_TIMEOUT_SECS};

/// 卡片生成端点
pub const CARD_PATH: &str = "/generate-card";
/// 兼容 Netlify Functions 的路径
pub const NETLIFY_CARD_PATH: &str = "/.netlify/functions/generate-card";

pub async fn serve(config: Config) -> Result<()> {
    let generator = CardGenerator::from_config(&config)?;
    let state = AppState::new(generator, config.model.as_str());
    let app = build_router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!(model = %config.model, "Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route(CARD_PATH, any(handlers::handle_generate_card))
        .route(NETLIFY_CARD_PATH, any(handlers::handle_generate_card))
        .route("/health", get(handlers::handle_health))
        .layer(
            ServiceBuilder::new()
                .layer(axum_middleware::from_fn(middleware::request_logger))
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    Duration::from_secs(SERVER_REQUEST_TIMEOUT_SECS),
                )),
        )
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    #[cfg(not(unix))]
    tokio::select! {
        _ = ctrl_c => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
