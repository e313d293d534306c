// Change-detecting player reporter: publishes per-player deltas to the
// coordinator, suppressing sends when nothing changed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::ports::BusProducer;
use crate::domain::state::PlayerStatus;
use crate::domain::topics;
use crate::domain::world::ChunkWorld;

/// Interval between change scans.
pub const REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Wire form of one player update.
#[derive(Debug, Serialize)]
struct PlayerReport<'a> {
    #[serde(rename = "userName")]
    user_name: &'a str,
    score: i64,
    status: PlayerStatus,
}

pub struct Reporter {
    world: Arc<ChunkWorld>,
    producer: Arc<dyn BusProducer>,
    last_sent: HashMap<String, (i64, PlayerStatus)>,
}

impl Reporter {
    pub fn new(world: Arc<ChunkWorld>, producer: Arc<dyn BusProducer>) -> Self {
        Self {
            world,
            producer,
            last_sent: HashMap::new(),
        }
    }

    /// Scan once per second until the task is dropped.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(REPORT_INTERVAL);
        loop {
            ticker.tick().await;
            self.scan().await;
        }
    }

    /// One scan. A player is reported only when `(score, status)` differs
    /// from the last successful send.
    pub async fn scan(&mut self) {
        let players = self.world.players().await;
        for (id, player) in players {
            let current = (player.score, player.status);
            if self.last_sent.get(&id) == Some(&current) {
                continue;
            }

            let report = PlayerReport {
                user_name: &id,
                score: player.score,
                status: player.status,
            };
            let payload = match serde_json::to_string(&report) {
                Ok(payload) => payload,
                Err(err) => {
                    warn!(player_id = %id, error = %err, "player report serialization failed");
                    continue;
                }
            };

            match self.producer.send(topics::CHUNK_TO_CENTRAL, &payload).await {
                Ok(()) => {
                    debug!(player_id = %id, score = player.score, "reported player state");
                    self.last_sent.insert(id, current);
                }
                // Leave `last_sent` untouched so the next scan retries.
                Err(err) => warn!(player_id = %id, error = %err, "player report failed"),
            }
        }
    }
}
