use serde::{Deserialize, Serialize};

/// Persisted mapping from a world coordinate to the chunk server URL that
/// serves it. Keyed uniquely by `(x, y)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub x: i32,
    pub y: i32,
    pub url: String,
}

/// Player status as stored and as carried on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerStatus {
    #[default]
    Active,
    Left,
}

impl PlayerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PlayerStatus::Active => "active",
            PlayerStatus::Left => "left",
        }
    }
}

/// Inbound per-player delta published by a chunk server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerUpdate {
    #[serde(rename = "userName")]
    pub user_name: String,
    pub score: i64,
    pub status: PlayerStatus,
}

/// One row of the periodic sync snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    #[serde(rename = "userName")]
    pub user_name: String,
    pub score: i64,
}

/// Pod metadata the placement controller needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PodInfo {
    pub name: String,
    pub created_at_epoch_ms: i64,
}

/// Result of a pod list call: items plus the resource version watches
/// should resume from.
#[derive(Clone, Debug, Default)]
pub struct PodList {
    pub items: Vec<PodInfo>,
    pub resource_version: String,
}
