// Coordinator-side dispatcher for everything chunks put on the bus.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::domain::entities::PlayerUpdate;
use crate::domain::ports::{BusConsumer, BusProducer, MapStore, UserStore};
use crate::domain::topics;
use crate::interface_adapters::protocol::{InboundMessage, MAP_RESPONSE_PREFIX};

/// Deadline applied to every store call made from the hub and broadcaster.
pub const STORE_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Backoff after a failed bus consume; redelivery repairs transient loss.
const CONSUME_RETRY_DELAY: Duration = Duration::from_secs(2);

pub struct ProtocolHub {
    users: Arc<dyn UserStore>,
    maps: Arc<dyn MapStore>,
    producer: Arc<dyn BusProducer>,
    registered: Arc<RwLock<HashSet<String>>>,
}

impl ProtocolHub {
    pub fn new(
        users: Arc<dyn UserStore>,
        maps: Arc<dyn MapStore>,
        producer: Arc<dyn BusProducer>,
    ) -> Self {
        Self {
            users,
            maps,
            producer,
            registered: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    /// Shared view of the registered-chunk set for the HTTP surface.
    pub fn registered(&self) -> Arc<RwLock<HashSet<String>>> {
        self.registered.clone()
    }

    /// Consume `chunk_to_central` until the task is dropped. Store and bus
    /// failures are logged and the loop continues.
    pub async fn run(&self, consumer: Arc<dyn BusConsumer>) {
        loop {
            match consumer.next().await {
                Ok(record) => self.handle(&record.payload).await,
                Err(err) => {
                    warn!(error = %err, "bus consume failed; backing off");
                    tokio::time::sleep(CONSUME_RETRY_DELAY).await;
                }
            }
        }
    }

    pub async fn handle(&self, payload: &str) {
        match InboundMessage::parse(payload) {
            Some(InboundMessage::Register(id)) => self.handle_register(id).await,
            Some(InboundMessage::MapRequest(coordinate)) => {
                self.handle_map_request(&coordinate).await
            }
            Some(InboundMessage::PlayerUpdate(update)) => self.handle_player_update(&update).await,
            None => warn!(payload, "dropping malformed bus message"),
        }
    }

    async fn handle_register(&self, id: String) {
        let mut registered = self.registered.write().await;
        if registered.insert(id.clone()) {
            info!(chunk_id = %id, "registered chunk server");
        } else {
            // Duplicate registration is a no-op, not an error.
            debug!(chunk_id = %id, "chunk server already registered");
        }
    }

    async fn handle_map_request(&self, coordinate: &str) {
        let map = self.lookup_map(coordinate).await;
        let topic = topics::chunk_topic(coordinate);
        let json = match serde_json::to_string(&map) {
            Ok(json) => json,
            Err(err) => {
                warn!(coordinate, error = %err, "map serialization failed");
                return;
            }
        };
        let payload = format!("{MAP_RESPONSE_PREFIX}{json}");
        match self.producer.send(&topic, &payload).await {
            Ok(()) => info!(coordinate, %topic, "sent map response"),
            Err(err) => warn!(coordinate, %topic, error = %err, "map response publish failed"),
        }
    }

    /// Fallback chain: requested coordinate, then the origin map, then a
    /// single open tile. A chunk blocked on its map must always get an answer.
    async fn lookup_map(&self, coordinate: &str) -> Vec<Vec<String>> {
        if let Some(map) = self.find_map(coordinate).await {
            return map;
        }
        if coordinate != "0,0" {
            if let Some(map) = self.find_map("0,0").await {
                return map;
            }
        }
        vec![vec!["0".to_string()]]
    }

    async fn find_map(&self, coordinate: &str) -> Option<Vec<Vec<String>>> {
        match tokio::time::timeout(STORE_QUERY_TIMEOUT, self.maps.find(coordinate)).await {
            Ok(Ok(found)) => found,
            Ok(Err(err)) => {
                warn!(coordinate, error = %err, "map lookup failed");
                None
            }
            Err(_) => {
                warn!(coordinate, "map lookup timed out");
                None
            }
        }
    }

    async fn handle_player_update(&self, update: &PlayerUpdate) {
        match tokio::time::timeout(STORE_QUERY_TIMEOUT, self.users.apply_update(update)).await {
            Ok(Ok(())) => debug!(
                user = %update.user_name,
                score = update.score,
                status = update.status.as_str(),
                "upserted player state"
            ),
            Ok(Err(err)) => warn!(user = %update.user_name, error = %err, "player upsert failed"),
            Err(_) => warn!(user = %update.user_name, "player upsert timed out"),
        }
    }

    /// Publish an ad-hoc message to every chunk.
    pub async fn broadcast(&self, message: &str) -> Result<(), String> {
        self.producer
            .send(topics::CENTRAL_TO_CHUNK_BROADCAST, message)
            .await
    }

    /// Publish an ad-hoc message to a single chunk's topic.
    pub async fn send_to_chunk(&self, chunk_id: &str, message: &str) -> Result<(), String> {
        self.producer.send(&topics::chunk_topic(chunk_id), message).await
    }
}
