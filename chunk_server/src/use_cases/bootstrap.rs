// Map bootstrap: ask the coordinator for this chunk's wall grid and wait for
// the answer on the chunk's own topic.

use std::time::Duration;

use tracing::{info, warn};

use crate::domain::map::TileMap;
use crate::domain::ports::{BusConsumer, BusProducer};
use crate::domain::topics;
use crate::interface_adapters::protocol::parse_map_response;

/// Delay between map request attempts.
pub const MAP_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Backoff after a failed consume.
const CONSUME_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Request the wall grid for `coordinate` until a `MAP_RESPONSE:` arrives.
///
/// The caller must hand in a consumer with its own dedicated group
/// (`<chunk id>_map`): the main consumer shares the chunk topic and would
/// otherwise swallow the response.
pub async fn fetch_map(
    coordinate: &str,
    producer: &dyn BusProducer,
    consumer: &dyn BusConsumer,
) -> TileMap {
    let request = format!("GET_MAP:{coordinate}");
    loop {
        if let Err(err) = producer.send(topics::CHUNK_TO_CENTRAL, &request).await {
            warn!(error = %err, "map request publish failed");
        }

        match tokio::time::timeout(MAP_RETRY_INTERVAL, consumer.next()).await {
            Ok(Ok(record)) => match parse_map_response(&record.payload) {
                Some(rows) => {
                    info!(coordinate, rows = rows.len(), "received map");
                    return TileMap::new(rows);
                }
                None => {
                    warn!(payload = %record.payload, "ignoring non-map message during bootstrap");
                }
            },
            Ok(Err(err)) => {
                warn!(error = %err, "map consume failed");
                tokio::time::sleep(CONSUME_RETRY_DELAY).await;
            }
            // Timed out: re-request and keep waiting.
            Err(_) => {}
        }
    }
}
