// All mutable state owned by one chunk server. Aggregates are locked
// independently so tick loops, socket handlers, and the reporter only contend
// where they actually overlap.

use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::domain::state::{
    DropperState, GhostState, Location, PlayerState, PlayerStatus, RestoredPellet, SyncSnapshot,
};

/// Number of sub-grid mazes managed by one chunk.
pub const SUBGRID_CELLS: usize = 16;

/// Restored pellets closer than this (on the same maze) count as duplicates.
const DUPLICATE_PELLET_DISTANCE: f64 = 5.0;

pub struct ChunkWorld {
    chunk_key: String,
    players: RwLock<HashMap<String, PlayerState>>,
    /// Ghosts keyed by chunk key, then ghost id.
    ghosts: RwLock<HashMap<String, HashMap<String, GhostState>>>,
    droppers: RwLock<HashMap<String, DropperState>>,
    /// One eaten-pellet set per sub-grid maze. Read on snapshot assembly,
    /// never cleared there; individual ids are unmarked by droppers.
    eaten_pellets: [RwLock<HashSet<String>>; SUBGRID_CELLS],
    /// Restored pellets keyed by chunk key, then pellet id. Drained on read.
    restored_pellets: RwLock<HashMap<String, HashMap<String, RestoredPellet>>>,
    sync: RwLock<SyncSnapshot>,
}

impl ChunkWorld {
    pub fn new(chunk_key: impl Into<String>) -> Self {
        Self {
            chunk_key: chunk_key.into(),
            players: RwLock::new(HashMap::new()),
            ghosts: RwLock::new(HashMap::new()),
            droppers: RwLock::new(HashMap::new()),
            eaten_pellets: std::array::from_fn(|_| RwLock::new(HashSet::new())),
            restored_pellets: RwLock::new(HashMap::new()),
            sync: RwLock::new(SyncSnapshot::default()),
        }
    }

    pub fn chunk_key(&self) -> &str {
        &self.chunk_key
    }

    pub async fn upsert_player(&self, player: PlayerState) {
        let mut players = self.players.write().await;
        debug!(
            player_id = %player.id,
            score = player.score,
            status = ?player.status,
            "updated player state"
        );
        players.insert(player.id.clone(), player);
    }

    /// Apply a client-reported ghost collision: score and location change,
    /// position and velocity are left as last reported.
    pub async fn apply_ghost_collision(&self, id: &str, score: i64, location: Location) {
        let mut players = self.players.write().await;
        let player = players.entry(id.to_string()).or_insert_with(|| PlayerState {
            id: id.to_string(),
            position: Default::default(),
            velocity: Default::default(),
            score: 0,
            status: PlayerStatus::Active,
            location,
        });
        player.score = score;
        player.status = PlayerStatus::Active;
        player.location = location;
    }

    /// Keep the player's state but mark it as gone. Returns false when the id
    /// was never seen.
    pub async fn mark_player_left(&self, id: &str) -> bool {
        let mut players = self.players.write().await;
        match players.get_mut(id) {
            Some(player) => {
                player.status = PlayerStatus::Left;
                true
            }
            None => false,
        }
    }

    pub async fn players(&self) -> HashMap<String, PlayerState> {
        self.players.read().await.clone()
    }

    pub async fn player_location(&self, id: &str) -> Option<Location> {
        self.players.read().await.get(id).map(|player| player.location)
    }

    pub async fn put_ghost(&self, ghost: GhostState) {
        let mut ghosts = self.ghosts.write().await;
        ghosts
            .entry(self.chunk_key.clone())
            .or_default()
            .insert(ghost.id.clone(), ghost);
    }

    pub async fn ghosts(&self) -> HashMap<String, GhostState> {
        let ghosts = self.ghosts.read().await;
        ghosts.get(&self.chunk_key).cloned().unwrap_or_default()
    }

    pub async fn replace_ghosts(&self, updated: HashMap<String, GhostState>) {
        let mut ghosts = self.ghosts.write().await;
        ghosts.insert(self.chunk_key.clone(), updated);
    }

    pub async fn put_dropper(&self, dropper: DropperState) {
        let mut droppers = self.droppers.write().await;
        droppers.insert(dropper.id.clone(), dropper);
    }

    pub async fn droppers(&self) -> HashMap<String, DropperState> {
        self.droppers.read().await.clone()
    }

    pub async fn replace_droppers(&self, updated: HashMap<String, DropperState>) {
        let mut droppers = self.droppers.write().await;
        *droppers = updated;
    }

    pub async fn mark_pellet_eaten(&self, pellet_id: &str, location: Location) {
        let Some(ledger) = self.ledger(location.map_index()) else {
            warn!(pellet_id, ?location, "pellet event outside the sub-grid");
            return;
        };
        ledger.write().await.insert(pellet_id.to_string());
    }

    /// Eaten pellet ids for one maze. Read without clearing; the ledger is
    /// state-carrying, not a delta.
    pub async fn eaten_pellets(&self, location: Location) -> Vec<String> {
        match self.ledger(location.map_index()) {
            Some(ledger) => ledger.read().await.iter().cloned().collect(),
            None => Vec::new(),
        }
    }

    pub async fn is_pellet_eaten(&self, pellet_id: &str, map_index: i32) -> bool {
        match self.ledger(map_index) {
            Some(ledger) => ledger.read().await.contains(pellet_id),
            None => false,
        }
    }

    pub async fn unmark_pellet(&self, pellet_id: &str, map_index: i32) {
        if let Some(ledger) = self.ledger(map_index) {
            ledger.write().await.remove(pellet_id);
        }
    }

    /// Point-in-time copy of every maze's eaten set, indexed by maze.
    pub async fn eaten_by_maze(&self) -> Vec<HashSet<String>> {
        let mut sets = Vec::with_capacity(SUBGRID_CELLS);
        for ledger in &self.eaten_pellets {
            sets.push(ledger.read().await.clone());
        }
        sets
    }

    /// Add a restored pellet unless a near-identical one is already pending.
    pub async fn add_restored_pellet(&self, pellet: RestoredPellet) {
        let mut restored = self.restored_pellets.write().await;
        let pending = restored.entry(self.chunk_key.clone()).or_default();
        let duplicate = pending.values().any(|existing| {
            existing.map_index == pellet.map_index
                && (existing.position.x - pellet.position.x).abs() < DUPLICATE_PELLET_DISTANCE
                && (existing.position.y - pellet.position.y).abs() < DUPLICATE_PELLET_DISTANCE
        });
        if duplicate {
            debug!(pellet_id = %pellet.id, "skipping duplicate restored pellet");
            return;
        }
        pending.insert(pellet.id.clone(), pellet);
    }

    /// Read and clear the restored-pellet set; each call returns only pellets
    /// restored since the previous one.
    pub async fn drain_restored_pellets(&self) -> HashMap<String, RestoredPellet> {
        let mut restored = self.restored_pellets.write().await;
        restored.remove(&self.chunk_key).unwrap_or_default()
    }

    pub async fn set_sync(&self, snapshot: SyncSnapshot) {
        *self.sync.write().await = snapshot;
    }

    pub async fn sync(&self) -> SyncSnapshot {
        self.sync.read().await.clone()
    }

    fn ledger(&self, map_index: i32) -> Option<&RwLock<HashSet<String>>> {
        usize::try_from(map_index)
            .ok()
            .and_then(|index| self.eaten_pellets.get(index))
    }
}
