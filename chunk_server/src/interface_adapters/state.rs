use std::sync::Arc;

use crate::domain::map::TileMap;
use crate::domain::ports::BusProducer;
use crate::domain::world::ChunkWorld;
use crate::interface_adapters::net::ClientTable;

/// Shared state handed to the HTTP handlers, the websocket fan-out, and the
/// snapshot loop.
#[derive(Clone)]
pub struct AppState {
    pub chunk_id: Arc<str>,
    pub world: Arc<ChunkWorld>,
    pub map: Arc<TileMap>,
    pub clients: Arc<ClientTable>,
    pub producer: Arc<dyn BusProducer>,
}
