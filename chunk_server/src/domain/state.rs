use serde::{Deserialize, Serialize};

/// Absolute position inside a maze, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Velocity components in pixels per tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub x: f64,
    pub y: f64,
}

impl Velocity {
    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

/// Which of the 4x4 sub-grid mazes an object occupies. Both axes are 0..=3.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub x: i32,
    pub y: i32,
}

impl Location {
    /// Maze template index derived from the sub-grid cell.
    pub fn map_index(self) -> i32 {
        self.x * 4 + self.y
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerStatus {
    #[default]
    Active,
    Left,
}

/// Authoritative per-player state owned by this chunk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub velocity: Velocity,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub status: PlayerStatus,
    #[serde(default)]
    pub location: Location,
}

/// Server-driven ghost. The id suffix selects the AI strategy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GhostState {
    pub id: String,
    pub position: Position,
    pub velocity: Velocity,
}

/// Server-driven pellet dropper.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropperState {
    pub id: String,
    pub position: Position,
    pub velocity: Velocity,
    pub last_position: Position,
    pub pellet_counter: u32,
}

/// Pellet re-introduced by a dropper after revisiting an eaten cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoredPellet {
    pub id: String,
    pub position: Position,
    pub map_index: i32,
}

/// One row of the coordinator's sync snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    #[serde(rename = "userName")]
    pub user_name: String,
    pub score: i64,
}

/// Cross-chunk sync snapshot cached from the broadcast topic.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncSnapshot {
    #[serde(default)]
    pub leaderboard: Vec<LeaderboardEntry>,
    #[serde(default)]
    pub active: Vec<LeaderboardEntry>,
    #[serde(default)]
    pub left: Vec<LeaderboardEntry>,
}

/// Extract `<k>` from actor ids shaped like `map<k>_ghost_0`.
pub fn parse_map_index(id: &str) -> Option<i32> {
    let rest = id.strip_prefix("map")?;
    let end = rest.find('_')?;
    rest[..end].parse().ok()
}
