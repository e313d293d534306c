// Wire protocol for bus traffic between chunks and the coordinator.
// This parser is the only place that sees the textual prefixes.

use serde::{Deserialize, Serialize};

use crate::domain::entities::{LeaderboardEntry, PlayerUpdate};

/// Prefix on map payloads delivered back to a chunk's own topic.
pub const MAP_RESPONSE_PREFIX: &str = "MAP_RESPONSE:";

const REGISTER_PREFIX: &str = "REGISTER:";
const MAP_REQUEST_PREFIX: &str = "GET_MAP:";

/// Everything a chunk server can put on the `chunk_to_central` topic.
#[derive(Clone, Debug, PartialEq)]
pub enum InboundMessage {
    /// `REGISTER:<chunk id>`, idempotent chunk registration.
    Register(String),
    /// `GET_MAP:<x,y>`, a request for the wall grid of a coordinate.
    MapRequest(String),
    /// JSON `{userName, score, status}` carrying a per-player delta.
    PlayerUpdate(PlayerUpdate),
}

impl InboundMessage {
    /// Parse a raw bus payload. Returns `None` for malformed messages, which
    /// the hub logs and drops.
    pub fn parse(raw: &str) -> Option<InboundMessage> {
        if let Some(id) = raw.strip_prefix(REGISTER_PREFIX) {
            return Some(InboundMessage::Register(id.to_string()));
        }
        if let Some(coord) = raw.strip_prefix(MAP_REQUEST_PREFIX) {
            // Some chunk runtimes quote the coordinate they read from the
            // environment; accept both forms.
            return Some(InboundMessage::MapRequest(coord.trim_matches('"').to_string()));
        }
        serde_json::from_str::<PlayerUpdate>(raw)
            .ok()
            .map(InboundMessage::PlayerUpdate)
    }
}

/// Periodic sync snapshot published on the broadcast topic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncMessage {
    pub leaderboard: Vec<LeaderboardEntry>,
    pub active: Vec<LeaderboardEntry>,
    pub left: Vec<LeaderboardEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::PlayerStatus;

    #[test]
    fn parses_registration() {
        assert_eq!(
            InboundMessage::parse("REGISTER:chunk-host-3"),
            Some(InboundMessage::Register("chunk-host-3".to_string()))
        );
    }

    #[test]
    fn parses_map_request_and_strips_quotes() {
        assert_eq!(
            InboundMessage::parse("GET_MAP:\"2,3\""),
            Some(InboundMessage::MapRequest("2,3".to_string()))
        );
        assert_eq!(
            InboundMessage::parse("GET_MAP:0,0"),
            Some(InboundMessage::MapRequest("0,0".to_string()))
        );
    }

    #[test]
    fn parses_player_update_json() {
        let parsed = InboundMessage::parse(r#"{"userName":"p1","score":40,"status":"active"}"#);
        assert_eq!(
            parsed,
            Some(InboundMessage::PlayerUpdate(PlayerUpdate {
                user_name: "p1".to_string(),
                score: 40,
                status: PlayerStatus::Active,
            }))
        );
    }

    #[test]
    fn rejects_malformed_payloads() {
        assert_eq!(InboundMessage::parse("hello there"), None);
        assert_eq!(InboundMessage::parse(r#"{"foo":1}"#), None);
    }

    #[test]
    fn sync_message_uses_wire_field_names() {
        let message = SyncMessage {
            leaderboard: vec![LeaderboardEntry {
                user_name: "p1".to_string(),
                score: 90,
            }],
            active: Vec::new(),
            left: Vec::new(),
        };
        let json = serde_json::to_string(&message).expect("sync message should serialize");
        assert_eq!(
            json,
            r#"{"leaderboard":[{"userName":"p1","score":90}],"active":[],"left":[]}"#
        );
    }
}
