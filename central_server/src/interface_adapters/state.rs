use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::domain::ports::StorePing;
use crate::use_cases::hub::ProtocolHub;
use crate::use_cases::placement::PlacementController;

/// Shared state handed to every HTTP handler.
#[derive(Clone)]
pub struct AppState {
    pub placement: Arc<PlacementController>,
    pub hub: Arc<ProtocolHub>,
    /// Chunk ids that have registered over the bus.
    pub registered: Arc<RwLock<HashSet<String>>>,
    pub db_ping: Arc<dyn StorePing>,
}
