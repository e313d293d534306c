use std::fmt;

/// Failures surfaced by the placement controller.
#[derive(Debug)]
pub enum PlacementError {
    /// Every configured cluster failed its pod list call.
    NoReachableCluster,
    /// The orchestrator rejected or timed out a list/scale/watch call.
    Orchestrator(String),
    /// The chunk record store rejected a lookup or mutation.
    Store(String),
    /// Decommission was asked for a coordinate with no stored record.
    UnknownChunk { x: i32, y: i32 },
}

impl fmt::Display for PlacementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementError::NoReachableCluster => write!(f, "no clusters are reachable"),
            PlacementError::Orchestrator(err) => write!(f, "orchestrator failure: {err}"),
            PlacementError::Store(err) => write!(f, "store failure: {err}"),
            PlacementError::UnknownChunk { x, y } => write!(f, "no such chunk at ({x},{y})"),
        }
    }
}

impl std::error::Error for PlacementError {}
