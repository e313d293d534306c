// Main bus consumer: owns the chunk topic and the broadcast topic, and keeps
// the cross-chunk sync cache fresh.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::domain::ports::{BusConsumer, BusRecord};
use crate::domain::state::SyncSnapshot;
use crate::domain::topics;
use crate::domain::world::ChunkWorld;
use crate::interface_adapters::protocol::MAP_RESPONSE_PREFIX;

/// Backoff after a failed consume.
const CONSUME_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Consume until the task is dropped.
pub async fn run_main_consumer(world: Arc<ChunkWorld>, consumer: Arc<dyn BusConsumer>) {
    loop {
        match consumer.next().await {
            Ok(record) => handle_record(&world, &record).await,
            Err(err) => {
                warn!(error = %err, "bus consume failed; backing off");
                tokio::time::sleep(CONSUME_RETRY_DELAY).await;
            }
        }
    }
}

pub async fn handle_record(world: &ChunkWorld, record: &BusRecord) {
    if record.topic == topics::CENTRAL_TO_CHUNK_BROADCAST {
        match serde_json::from_str::<SyncSnapshot>(&record.payload) {
            Ok(snapshot) => world.set_sync(snapshot).await,
            Err(err) => warn!(error = %err, "dropping malformed sync message"),
        }
        return;
    }

    // Map responses belong to the dedicated bootstrap consumer.
    if record.payload.starts_with(MAP_RESPONSE_PREFIX) {
        return;
    }

    info!(topic = %record.topic, payload = %record.payload, "message from coordinator");
}
