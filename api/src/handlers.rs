use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use shared::{
    supported_currencies, supported_networks, NetworkCurrencyMapping, RegistrationResponse,
    Submission, NETWORK_CURRENCY_MAPPINGS,
};

use crate::{
    error::ApiResult,
    rate_limit::client_ip,
    state::AppState,
    validation::ValidatedJson,
};

const SERVICE_NAME: &str = "Channel Intake API";
const VERSION: &str = env!("CARGO_PKG_VERSION");

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": SERVICE_NAME,
        "version": VERSION,
        "status": "operational",
        "health": "/api/v1/health"
    }))
}

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let uptime = state.started_at.elapsed().as_secs();
    let now = chrono::Utc::now().to_rfc3339();

    let storage_ok = match state.store().ping().await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(error = %err, "storage ping failed");
            false
        }
    };

    let (status, label) = if storage_ok {
        tracing::info!(uptime_secs = uptime, "health check passed");
        (StatusCode::OK, "ok")
    } else {
        tracing::warn!(uptime_secs = uptime, "health check degraded, storage unreachable");
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status,
        Json(json!({
            "status": label,
            "service": SERVICE_NAME,
            "version": VERSION,
            "timestamp": now,
            "uptime_secs": uptime,
            "risk_gate_configured": state.pipeline.risk_gate().is_configured()
        })),
    )
}

/// POST /api/v1/register
pub async fn register_channels(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    ValidatedJson(submission): ValidatedJson<Submission>,
) -> ApiResult<(StatusCode, Json<RegistrationResponse>)> {
    let origin = client_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr));

    let row = state.pipeline.admit(&submission, origin.as_deref()).await?;

    Ok((StatusCode::CREATED, Json(RegistrationResponse::from(&row))))
}

pub async fn registration_health() -> Json<Value> {
    Json(json!({"status": "healthy", "endpoint": "registration"}))
}

pub async fn network_currency_mappings() -> Json<&'static [NetworkCurrencyMapping]> {
    Json(NETWORK_CURRENCY_MAPPINGS)
}

pub async fn list_networks() -> Json<Value> {
    Json(json!({"success": true, "data": supported_networks()}))
}

pub async fn list_currencies() -> Json<Value> {
    Json(json!({"success": true, "data": supported_currencies()}))
}

pub async fn networks_health() -> Json<Value> {
    Json(json!({"status": "healthy", "endpoint": "networks"}))
}

pub async fn route_not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({"error": "Route not found"})))
}
