// Periodic cross-chunk sync: leaderboard plus active/left player lists.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::domain::entities::{LeaderboardEntry, PlayerStatus};
use crate::domain::ports::{BusProducer, UserStore};
use crate::domain::topics;
use crate::interface_adapters::protocol::SyncMessage;
use crate::use_cases::hub::STORE_QUERY_TIMEOUT;

/// How often the sync snapshot goes out.
pub const SYNC_INTERVAL: Duration = Duration::from_secs(1);
/// Leaderboard depth included in every snapshot.
const LEADERBOARD_LIMIT: i64 = 10;

pub struct Broadcaster {
    users: Arc<dyn UserStore>,
    producer: Arc<dyn BusProducer>,
}

impl Broadcaster {
    pub fn new(users: Arc<dyn UserStore>, producer: Arc<dyn BusProducer>) -> Self {
        Self { users, producer }
    }

    /// Publish one sync snapshot per second until the task is dropped.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(SYNC_INTERVAL);
        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// One sync pass. The three queries are independent; a failed query
    /// contributes an empty list instead of skipping the whole tick.
    pub async fn tick(&self) {
        let leaderboard = self
            .query("leaderboard", self.users.top_by_high_score(LEADERBOARD_LIMIT))
            .await;
        let active = self
            .query("active", self.users.find_by_status(PlayerStatus::Active))
            .await;
        let left = self
            .query("left", self.users.find_by_status(PlayerStatus::Left))
            .await;

        let message = SyncMessage {
            leaderboard,
            active,
            left,
        };
        let payload = match serde_json::to_string(&message) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "sync message serialization failed");
                return;
            }
        };
        if let Err(err) = self
            .producer
            .send(topics::CENTRAL_TO_CHUNK_BROADCAST, &payload)
            .await
        {
            warn!(error = %err, "sync broadcast failed");
        }
    }

    async fn query(
        &self,
        which: &'static str,
        query: impl Future<Output = Result<Vec<LeaderboardEntry>, String>>,
    ) -> Vec<LeaderboardEntry> {
        match tokio::time::timeout(STORE_QUERY_TIMEOUT, query).await {
            Ok(Ok(entries)) => entries,
            Ok(Err(err)) => {
                warn!(query = which, error = %err, "sync query failed");
                Vec::new()
            }
            Err(_) => {
                warn!(query = which, "sync query timed out");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::test_support::{
        MemoryUserStore, RecordingProducer, UserFailureFlags, UserRow,
    };

    fn seed_players(users: &MemoryUserStore) {
        users.seed(
            "alice",
            UserRow {
                score: 40,
                high_score: 90,
                status: PlayerStatus::Active,
            },
        );
        users.seed(
            "bob",
            UserRow {
                score: 10,
                high_score: 120,
                status: PlayerStatus::Left,
            },
        );
        users.seed(
            "carol",
            UserRow {
                score: 70,
                high_score: 70,
                status: PlayerStatus::Active,
            },
        );
    }

    #[tokio::test]
    async fn tick_publishes_leaderboard_and_player_lists() {
        let users = Arc::new(MemoryUserStore::new());
        seed_players(&users);
        let producer = Arc::new(RecordingProducer::new());
        let broadcaster = Broadcaster::new(users, producer.clone());

        broadcaster.tick().await;

        let sent = producer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, topics::CENTRAL_TO_CHUNK_BROADCAST);

        let message: SyncMessage =
            serde_json::from_str(&sent[0].1).expect("payload should parse back");
        // Leaderboard is ordered by high score, descending.
        let names: Vec<&str> = message
            .leaderboard
            .iter()
            .map(|entry| entry.user_name.as_str())
            .collect();
        assert_eq!(names, vec!["bob", "alice", "carol"]);
        assert_eq!(message.leaderboard[0].score, 120);

        let active: Vec<&str> = message.active.iter().map(|e| e.user_name.as_str()).collect();
        assert_eq!(active, vec!["alice", "carol"]);
        let left: Vec<&str> = message.left.iter().map(|e| e.user_name.as_str()).collect();
        assert_eq!(left, vec!["bob"]);
    }

    #[tokio::test]
    async fn failed_query_contributes_an_empty_list_but_tick_still_publishes() {
        let users = Arc::new(MemoryUserStore::new().with_failures(UserFailureFlags {
            leaderboard: true,
            ..Default::default()
        }));
        seed_players(&users);
        let producer = Arc::new(RecordingProducer::new());
        let broadcaster = Broadcaster::new(users, producer.clone());

        broadcaster.tick().await;

        let sent = producer.sent();
        assert_eq!(sent.len(), 1);
        let message: SyncMessage =
            serde_json::from_str(&sent[0].1).expect("payload should parse back");
        assert!(message.leaderboard.is_empty());
        assert_eq!(message.active.len(), 2);
        assert_eq!(message.left.len(), 1);
    }

    #[tokio::test]
    async fn leaderboard_is_capped_at_ten_entries() {
        let users = Arc::new(MemoryUserStore::new());
        for index in 0..15 {
            users.seed(
                &format!("p{index:02}"),
                UserRow {
                    score: index,
                    high_score: index,
                    status: PlayerStatus::Active,
                },
            );
        }
        let producer = Arc::new(RecordingProducer::new());
        let broadcaster = Broadcaster::new(users, producer.clone());

        broadcaster.tick().await;

        let message: SyncMessage =
            serde_json::from_str(&producer.sent()[0].1).expect("payload should parse back");
        assert_eq!(message.leaderboard.len(), 10);
        assert_eq!(message.leaderboard[0].score, 14);
    }
}
