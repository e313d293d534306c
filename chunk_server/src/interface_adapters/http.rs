// HTTP handlers on the chunk server's small imperative surface.

use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::warn;

use crate::domain::state::SyncSnapshot;
use crate::domain::topics;
use crate::interface_adapters::state::AppState;

/// Deadline for bus publishes made from HTTP handlers.
const PUBLISH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    // Human-readable error string for consistent JSON error responses.
    pub error: String,
}

pub async fn ping() -> &'static str {
    "pong"
}

/// The wall grid this chunk bootstrapped with.
pub async fn get_map(State(state): State<AppState>) -> Json<Vec<Vec<String>>> {
    Json(state.map.rows().to_vec())
}

/// The latest cross-chunk sync snapshot received from the coordinator.
pub async fn leaderboard(State(state): State<AppState>) -> Json<SyncSnapshot> {
    Json(state.world.sync().await)
}

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub status: &'static str,
}

/// Operator path: relay an ad-hoc message to the coordinator.
pub async fn send_message(
    State(state): State<AppState>,
    Json(payload): Json<SendRequest>,
) -> Result<Json<SendResponse>, (StatusCode, Json<ErrorResponse>)> {
    let tagged = format!("[{}]: {}", state.chunk_id, payload.message);
    match timeout(
        PUBLISH_TIMEOUT,
        state.producer.send(topics::CHUNK_TO_CENTRAL, &tagged),
    )
    .await
    {
        Ok(Ok(())) => Ok(Json(SendResponse {
            status: "message sent to central server",
        })),
        Ok(Err(err)) => {
            warn!(error = %err, "relay publish failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse { error: err }),
            ))
        }
        Err(_) => Err((
            StatusCode::GATEWAY_TIMEOUT,
            Json(ErrorResponse {
                error: "bus publish timed out".to_string(),
            }),
        )),
    }
}
