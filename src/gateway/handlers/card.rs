//! 卡片生成处理器

use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};

use crate::card::Envelope;
use crate::gateway::state::AppState;

/// 任意方法 /generate-card
///
/// 不读取请求方法和请求体；每次调用都会请求一次上游。
pub async fn handle_generate_card(State(state): State<AppState>) -> Response {
    let envelope = state.generator().invoke().await;
    envelope_response(envelope)
}

/// 将信封渲染为带 CORS 头的 JSON 响应
fn envelope_response(envelope: Envelope) -> Response {
    let status = envelope.status();
    let mut response = (status, Json(envelope)).into_response();

    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET"),
    );

    response
}
