//! 健康检查处理器

use axum::{extract::State, Json};
use serde::Serialize;

use crate::gateway::state::AppState;

/// 健康检查响应
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    model: String,
    credential_configured: bool,
}

/// GET /health
pub async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        model: state.model().to_string(),
        credential_configured: state.generator().has_credential(),
    })
}
