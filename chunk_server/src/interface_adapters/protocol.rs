// Wire protocol DTOs for the browser-facing websocket and the bus bootstrap.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::state::{DropperState, GhostState, Location, PlayerState, RestoredPellet};
use crate::domain::world::ChunkWorld;

/// Prefix on map payloads delivered on the chunk's own topic.
pub const MAP_RESPONSE_PREFIX: &str = "MAP_RESPONSE:";

/// Messages browser clients send over the websocket, as `{type, data}`.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Full client-authoritative player state.
    Player(PlayerState),
    /// A pellet was eaten in the sender's maze.
    Pellet(PelletEvent),
    /// The client ran into a ghost and reports its own new score.
    GhostCollision(GhostCollisionEvent),
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PelletEvent {
    pub pellet_id: String,
    /// Player who ate the pellet.
    pub id: String,
    #[serde(default)]
    pub score: i64,
    pub location: Location,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GhostCollisionEvent {
    pub id: String,
    #[serde(default)]
    pub score: i64,
    pub location: Location,
}

/// Per-viewer snapshot streamed at the tick rate.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub players: HashMap<String, PlayerState>,
    pub eaten_pellets: Vec<String>,
    pub restored_pellets: HashMap<String, RestoredPellet>,
    pub ghosts: HashMap<String, GhostState>,
    pub droppers: HashMap<String, DropperState>,
}

impl Snapshot {
    /// Assemble the state visible to a viewer standing in `location`. The
    /// restored-pellet set is drained; the eaten ledger is read but kept.
    pub async fn assemble(world: &ChunkWorld, location: Location) -> Snapshot {
        Snapshot {
            players: world.players().await,
            eaten_pellets: world.eaten_pellets(location).await,
            restored_pellets: world.drain_restored_pellets().await,
            ghosts: world.ghosts().await,
            droppers: world.droppers().await,
        }
    }
}

/// Strip the map-response prefix and parse the 2D wall grid.
pub fn parse_map_response(payload: &str) -> Option<Vec<Vec<String>>> {
    let json = payload.strip_prefix(MAP_RESPONSE_PREFIX)?;
    serde_json::from_str(json).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::{PlayerStatus, Position};

    #[test]
    fn parses_player_messages() {
        let raw = r#"{"type":"player","data":{"id":"p1","position":{"x":80.0,"y":80.0},"velocity":{"x":6.0,"y":0.0},"score":10,"status":"active","location":{"x":1,"y":1}}}"#;
        let parsed: ClientMessage = serde_json::from_str(raw).expect("player should parse");
        match parsed {
            ClientMessage::Player(player) => {
                assert_eq!(player.id, "p1");
                assert_eq!(player.score, 10);
                assert_eq!(player.location, Location { x: 1, y: 1 });
            }
            other => panic!("expected player message, got {other:?}"),
        }
    }

    #[test]
    fn parses_pellet_messages() {
        let raw = r#"{"type":"pellet","data":{"pelletId":"120-200","id":"p1","score":10,"location":{"x":1,"y":1}}}"#;
        let parsed: ClientMessage = serde_json::from_str(raw).expect("pellet should parse");
        match parsed {
            ClientMessage::Pellet(event) => {
                assert_eq!(event.pellet_id, "120-200");
                assert_eq!(event.id, "p1");
                assert_eq!(event.location.map_index(), 5);
            }
            other => panic!("expected pellet message, got {other:?}"),
        }
    }

    #[test]
    fn parses_ghost_collision_messages() {
        let raw = r#"{"type":"ghost_collision","data":{"id":"p1","score":0,"location":{"x":2,"y":3}}}"#;
        let parsed: ClientMessage = serde_json::from_str(raw).expect("collision should parse");
        assert!(matches!(parsed, ClientMessage::GhostCollision(_)));
    }

    #[test]
    fn rejects_unknown_message_types() {
        let raw = r#"{"type":"teleport","data":{}}"#;
        assert!(serde_json::from_str::<ClientMessage>(raw).is_err());
    }

    #[test]
    fn map_response_parsing_requires_the_prefix() {
        assert_eq!(
            parse_map_response("MAP_RESPONSE:[[\"0\",\"1\"]]"),
            Some(vec![vec!["0".to_string(), "1".to_string()]])
        );
        assert_eq!(parse_map_response("[[\"0\"]]"), None);
        assert_eq!(parse_map_response("MAP_RESPONSE:not json"), None);
    }

    #[tokio::test]
    async fn snapshot_serializes_with_wire_field_names() {
        let world = ChunkWorld::new("0,0");
        world
            .upsert_player(PlayerState {
                id: "p1".to_string(),
                position: Position { x: 80.0, y: 80.0 },
                velocity: Default::default(),
                score: 10,
                status: PlayerStatus::Active,
                location: Location { x: 1, y: 1 },
            })
            .await;
        world
            .mark_pellet_eaten("120-200", Location { x: 1, y: 1 })
            .await;

        let snapshot = Snapshot::assemble(&world, Location { x: 1, y: 1 }).await;
        let json = serde_json::to_string(&snapshot).expect("snapshot should serialize");

        assert!(json.contains("\"players\""));
        assert!(json.contains("\"eatenPellets\":[\"120-200\"]"));
        assert!(json.contains("\"restoredPellets\""));
        assert!(json.contains("\"ghosts\""));
        assert!(json.contains("\"droppers\""));
    }

    #[tokio::test]
    async fn snapshot_assembly_drains_restored_pellets_but_keeps_the_ledger() {
        let world = ChunkWorld::new("0,0");
        let location = Location { x: 1, y: 1 };
        world.mark_pellet_eaten("120-200", location).await;
        world
            .add_restored_pellet(RestoredPellet {
                id: "pellet-3-5-5".to_string(),
                position: Position { x: 120.0, y: 200.0 },
                map_index: 5,
            })
            .await;

        let first = Snapshot::assemble(&world, location).await;
        assert_eq!(first.restored_pellets.len(), 1);
        assert_eq!(first.eaten_pellets, vec!["120-200".to_string()]);

        let second = Snapshot::assemble(&world, location).await;
        assert!(second.restored_pellets.is_empty());
        assert_eq!(second.eaten_pellets, vec!["120-200".to_string()]);
    }

    #[tokio::test]
    async fn snapshot_scopes_eaten_pellets_to_the_viewer() {
        let world = ChunkWorld::new("0,0");
        world
            .mark_pellet_eaten("120-200", Location { x: 1, y: 1 })
            .await;

        let elsewhere = Snapshot::assemble(&world, Location { x: 2, y: 2 }).await;
        assert!(elsewhere.eaten_pellets.is_empty());
    }
}
