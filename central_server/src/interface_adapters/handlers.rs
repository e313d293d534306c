// HTTP handlers over the coordinator's core operations.

use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::warn;

use crate::domain::errors::PlacementError;
use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::state::AppState;

/// Deadline for bus publishes made from HTTP handlers.
const PUBLISH_TIMEOUT: Duration = Duration::from_secs(10);

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn error_response(status: StatusCode, message: impl Into<String>) -> HandlerError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

// Health check used by chunk servers as a readiness probe.
pub async fn ping() -> &'static str {
    "pong"
}

pub async fn dbconn(State(state): State<AppState>) -> Result<&'static str, HandlerError> {
    state.db_ping.ping().await.map_err(|err| {
        warn!(error = %err, "store ping failed");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "unable to connect to database")
    })?;
    Ok("able to connect to DB")
}

#[derive(Debug, Serialize)]
pub struct ChunkServersResponse {
    pub chunk_servers: Vec<String>,
}

pub async fn list_chunks(State(state): State<AppState>) -> Json<ChunkServersResponse> {
    let registered = state.registered.read().await;
    let mut chunk_servers: Vec<String> = registered.iter().cloned().collect();
    chunk_servers.sort();
    Json(ChunkServersResponse { chunk_servers })
}

#[derive(Debug, Deserialize)]
pub struct ChunkCoordinates {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Serialize)]
pub struct ChunkUrlResponse {
    pub url: String,
}

pub async fn get_or_provision_chunk(
    State(state): State<AppState>,
    Json(payload): Json<ChunkCoordinates>,
) -> Result<Json<ChunkUrlResponse>, HandlerError> {
    state
        .placement
        .get_or_provision(payload.x, payload.y)
        .await
        .map(|url| Json(ChunkUrlResponse { url }))
        .map_err(placement_error_response)
}

#[derive(Debug, Deserialize)]
pub struct DecommissionRequest {
    pub x: i32,
    pub y: i32,
    pub url: String,
}

pub async fn decommission_chunk(
    State(state): State<AppState>,
    Json(payload): Json<DecommissionRequest>,
) -> Result<StatusCode, HandlerError> {
    state
        .placement
        .decommission(payload.x, payload.y, &payload.url)
        .await
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(placement_error_response)
}

fn placement_error_response(err: PlacementError) -> HandlerError {
    let status = match &err {
        PlacementError::UnknownChunk { .. } => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.to_string())
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub status: &'static str,
}

pub async fn broadcast_message(
    State(state): State<AppState>,
    Json(payload): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, HandlerError> {
    publish(state.hub.broadcast(&payload.message)).await?;
    Ok(Json(MessageResponse {
        status: "broadcast sent",
    }))
}

pub async fn send_to_chunk(
    State(state): State<AppState>,
    Path(chunk_id): Path<String>,
    Json(payload): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, HandlerError> {
    publish(state.hub.send_to_chunk(&chunk_id, &payload.message)).await?;
    Ok(Json(MessageResponse {
        status: "message sent",
    }))
}

async fn publish(
    send: impl std::future::Future<Output = Result<(), String>>,
) -> Result<(), HandlerError> {
    match timeout(PUBLISH_TIMEOUT, send).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => {
            warn!(error = %err, "bus publish failed");
            Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, err))
        }
        Err(_) => Err(error_response(
            StatusCode::GATEWAY_TIMEOUT,
            "bus publish timed out",
        )),
    }
}
