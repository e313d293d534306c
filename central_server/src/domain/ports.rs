use async_trait::async_trait;

use crate::domain::entities::{
    ChunkRecord, LeaderboardEntry, PlayerStatus, PlayerUpdate, PodInfo, PodList,
};

// Ports for the external collaborators the coordinator depends on. The
// frameworks layer provides the real Kafka/Mongo/Kubernetes implementations;
// use cases are tested against in-memory doubles.

/// Coordinate-to-URL record storage. Only the coordinator writes here.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    async fn find(&self, x: i32, y: i32) -> Result<Option<ChunkRecord>, String>;
    async fn insert(&self, record: ChunkRecord) -> Result<(), String>;
    async fn delete(&self, x: i32, y: i32) -> Result<bool, String>;
}

/// Player profile storage with last-write-wins score and monotonic high score.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Upsert `score`, `status` and `updatedAt`; `highScore` only ever grows.
    async fn apply_update(&self, update: &PlayerUpdate) -> Result<(), String>;
    async fn top_by_high_score(&self, limit: i64) -> Result<Vec<LeaderboardEntry>, String>;
    async fn find_by_status(&self, status: PlayerStatus) -> Result<Vec<LeaderboardEntry>, String>;
}

/// Optional per-coordinate wall grids.
#[async_trait]
pub trait MapStore: Send + Sync {
    async fn find(&self, coordinate: &str) -> Result<Option<Vec<Vec<String>>>, String>;
}

/// Liveness probe against the backing store.
#[async_trait]
pub trait StorePing: Send + Sync {
    async fn ping(&self) -> Result<(), String>;
}

#[async_trait]
pub trait BusProducer: Send + Sync {
    async fn send(&self, topic: &str, payload: &str) -> Result<(), String>;
}

/// One record pulled off the bus.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BusRecord {
    pub topic: String,
    pub payload: String,
}

#[async_trait]
pub trait BusConsumer: Send + Sync {
    async fn next(&self) -> Result<BusRecord, String>;
}

/// Control surface for one compute cluster hosting chunk pods.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    fn cluster_name(&self) -> &str;
    async fn list_pods(&self) -> Result<PodList, String>;
    async fn replica_count(&self) -> Result<i32, String>;
    async fn set_replica_count(&self, replicas: i32) -> Result<(), String>;
    /// Park an ordinal so the freed pod name is not handed straight back.
    async fn reserve_ordinal(&self, ordinal: String) -> Result<(), String>;
    /// Pop the oldest parked ordinal, making it eligible for reuse.
    async fn release_oldest_ordinal(&self) -> Result<Option<String>, String>;
    /// Block until a pod-added event lands after the given resource version.
    async fn wait_for_pod_added(&self, since_resource_version: &str) -> Result<PodInfo, String>;
}
