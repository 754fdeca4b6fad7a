// HTTP handlers
// Deposit/withdrawal initiation, provider callbacks, health and metrics

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use gateway_core::codec::{self, DataFormat};
use gateway_core::{
    GatewayHealth, InboundRequest, ProviderId, TransactionKind, TransactionRequest,
    TransactionResponse,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::info;

use crate::error::ApiError;
use crate::negotiation::{content_type, request_format, response_format, Encoded};
use crate::server::AppState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackAck {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub gateways: Vec<GatewayHealth>,
}

/// Token cancelled once `timeout` elapses or the guard is dropped
fn deadline(timeout: Duration) -> (CancellationToken, DropGuard) {
    let token = CancellationToken::new();
    let timer = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(timeout) => timer.cancel(),
            _ = timer.cancelled() => {}
        }
    });
    let guard = token.clone().drop_guard();
    (token, guard)
}

async fn initiate(
    state: AppState,
    kind: TransactionKind,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Encoded<TransactionResponse>, ApiError> {
    let format = response_format(&headers);

    let request: TransactionRequest = request_format(&headers)
        .and_then(|request_format| codec::decode(request_format, &body))
        .map_err(|e| ApiError::new(format, e))?;
    request.validate().map_err(|e| ApiError::new(format, e))?;

    info!(user_id = request.user_id, kind = %kind, "Received transaction request");

    let (cancel, _guard) = deadline(state.request_timeout);
    let response = state
        .orchestrator
        .initiate(&request, kind, &cancel)
        .await
        .map_err(|e| ApiError::new(format, e))?;

    Ok(Encoded(format, response))
}

pub async fn deposit(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Encoded<TransactionResponse>, ApiError> {
    initiate(state, TransactionKind::Deposit, headers, body).await
}

pub async fn withdrawal(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Encoded<TransactionResponse>, ApiError> {
    initiate(state, TransactionKind::Withdrawal, headers, body).await
}

pub async fn callback(
    State(state): State<AppState>,
    Path(gateway_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Encoded<CallbackAck>, ApiError> {
    let format = response_format(&headers);
    let gateway_id = ProviderId::from(gateway_id);

    let provider = state
        .orchestrator
        .selector()
        .get_by_id(&gateway_id)
        .await
        .map_err(|e| ApiError::new(format, e))?;

    let inbound = InboundRequest::new(content_type(&headers), body);
    let callback = provider
        .parse_callback(&inbound)
        .map_err(|e| ApiError::new(format, e))?;

    info!(
        gateway_id = %gateway_id,
        transaction_id = callback.transaction_id,
        status = %callback.status,
        "Received gateway callback"
    );

    state
        .orchestrator
        .handle_callback(&callback)
        .await
        .map_err(|e| ApiError::new(format, e))?;

    Ok(Encoded(
        format,
        CallbackAck {
            status: "success".to_string(),
        },
    ))
}

pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    state.orchestrator.ping().await.map_err(|e| {
        tracing::error!("Health check failed: {}", e);
        ApiError::internal(DataFormat::Json, "Database connection failed")
    })?;

    Ok(Json(HealthResponse {
        status: "healthy",
        service: "payment-gateway",
        version: env!("CARGO_PKG_VERSION"),
        gateways: state.orchestrator.selector().snapshot().await,
    }))
}

pub async fn metrics_handler() -> Response {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        return ApiError::internal(
            DataFormat::Json,
            format!("Failed to export metrics: {}", e),
        )
        .into_response();
    }
    (
        [(axum::http::header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response()
}
