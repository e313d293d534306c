// Client fan-out: one websocket per viewer, per-connection write queues, and
// the 20 Hz per-viewer snapshot broadcaster.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::domain::state::Location;
use crate::interface_adapters::protocol::{ClientMessage, Snapshot};
use crate::interface_adapters::state::AppState;

/// Snapshot fan-out interval (matches the simulation tick).
pub const SNAPSHOT_INTERVAL: Duration = Duration::from_millis(50);
/// Deadline for one websocket write.
const SOCKET_WRITE_TIMEOUT: Duration = Duration::from_secs(10);
/// Outbound queue depth per connection; full queues drop frames.
const OUTBOUND_QUEUE: usize = 64;
/// Sub-grid cell a connection views before a player id is bound.
const DEFAULT_VIEW: Location = Location { x: 1, y: 1 };

struct ClientHandle {
    tx: mpsc::Sender<String>,
    player_id: Option<String>,
}

/// Registry of connected sockets.
#[derive(Default)]
pub struct ClientTable {
    clients: Mutex<HashMap<u64, ClientHandle>>,
    next_id: AtomicU64,
}

impl ClientTable {
    pub fn new() -> Self {
        Self::default()
    }

    async fn register(&self, tx: mpsc::Sender<String>) -> u64 {
        let conn_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut clients = self.clients.lock().await;
        clients.insert(conn_id, ClientHandle { tx, player_id: None });
        conn_id
    }

    /// Bind the player id to the connection on the first identified message.
    async fn bind_player(&self, conn_id: u64, player_id: &str) {
        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get_mut(&conn_id) {
            if client.player_id.is_none() {
                client.player_id = Some(player_id.to_string());
            }
        }
    }

    /// Drop the connection; returns the bound player id, if any.
    async fn remove(&self, conn_id: u64) -> Option<String> {
        let mut clients = self.clients.lock().await;
        clients.remove(&conn_id).and_then(|client| client.player_id)
    }

    async fn viewers(&self) -> Vec<(u64, mpsc::Sender<String>, Option<String>)> {
        let clients = self.clients.lock().await;
        clients
            .iter()
            .map(|(conn_id, client)| (*conn_id, client.tx.clone(), client.player_id.clone()))
            .collect()
    }

    async fn sender(&self, conn_id: u64) -> Option<mpsc::Sender<String>> {
        let clients = self.clients.lock().await;
        clients.get(&conn_id).map(|client| client.tx.clone())
    }
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: AppState, socket: WebSocket) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<String>(OUTBOUND_QUEUE);
    let conn_id = state.clients.register(tx).await;
    debug!(conn_id, "client connected");

    // Writer task: per-connection serialized writes with a deadline, so one
    // slow client only ever delays itself.
    let writer = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            match timeout(SOCKET_WRITE_TIMEOUT, ws_sender.send(Message::Text(payload.into()))).await
            {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    debug!(error = %err, "socket write failed");
                    break;
                }
                Err(_) => {
                    warn!("socket write timed out");
                    break;
                }
            }
        }
    });

    // Bootstrap snapshot before the client has identified itself.
    let bootstrap = Snapshot::assemble(&state.world, DEFAULT_VIEW).await;
    send_to_connection(&state, conn_id, &bootstrap).await;

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };
        match message {
            Message::Text(raw) => handle_client_message(&state, conn_id, &raw).await,
            Message::Close(_) => break,
            _ => {}
        }
    }

    // Keep the player's state for reconnects; just flag it and tell everyone.
    if let Some(player_id) = state.clients.remove(conn_id).await {
        if state.world.mark_player_left(&player_id).await {
            info!(player_id = %player_id, "player left");
        }
        broadcast_snapshots(&state).await;
    }
    let _ = writer.await;
    debug!(conn_id, "client disconnected");
}

async fn handle_client_message(state: &AppState, conn_id: u64, raw: &str) {
    let parsed = match serde_json::from_str::<ClientMessage>(raw) {
        Ok(message) => message,
        Err(err) => {
            warn!(conn_id, error = %err, "dropping malformed client message");
            return;
        }
    };

    match parsed {
        ClientMessage::Player(player) => {
            if !player.id.is_empty() {
                state.clients.bind_player(conn_id, &player.id).await;
            }
            state.world.upsert_player(player).await;
        }
        ClientMessage::Pellet(event) => {
            state
                .world
                .mark_pellet_eaten(&event.pellet_id, event.location)
                .await;
            broadcast_snapshots(state).await;
        }
        ClientMessage::GhostCollision(event) => {
            state
                .world
                .apply_ghost_collision(&event.id, event.score, event.location)
                .await;
            broadcast_snapshots(state).await;
        }
    }
}

/// Send every connected viewer a snapshot assembled for its own sub-grid cell.
pub async fn broadcast_snapshots(state: &AppState) {
    for (conn_id, tx, player_id) in state.clients.viewers().await {
        let view = match &player_id {
            Some(id) => state
                .world
                .player_location(id)
                .await
                .unwrap_or(DEFAULT_VIEW),
            None => DEFAULT_VIEW,
        };
        let snapshot = Snapshot::assemble(&state.world, view).await;
        match serde_json::to_string(&snapshot) {
            // Full queue means a slow client; drop the frame, the next tick
            // carries fresh state anyway.
            Ok(payload) => {
                if tx.try_send(payload).is_err() {
                    debug!(conn_id, "outbound queue full; dropping snapshot");
                }
            }
            Err(err) => warn!(error = %err, "snapshot serialization failed"),
        }
    }
}

async fn send_to_connection(state: &AppState, conn_id: u64, snapshot: &Snapshot) {
    let Some(tx) = state.clients.sender(conn_id).await else {
        return;
    };
    match serde_json::to_string(snapshot) {
        Ok(payload) => {
            let _ = tx.try_send(payload);
        }
        Err(err) => warn!(error = %err, "snapshot serialization failed"),
    }
}

/// Stream per-viewer snapshots at the tick rate until the task is dropped.
pub async fn run_snapshot_loop(state: AppState) {
    let mut ticker = tokio::time::interval(SNAPSHOT_INTERVAL);
    loop {
        ticker.tick().await;
        broadcast_snapshots(&state).await;
    }
}
