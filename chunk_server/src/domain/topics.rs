/// Chunk-to-coordinator firehose.
pub const CHUNK_TO_CENTRAL: &str = "chunk_to_central";
/// Coordinator-to-every-chunk sync channel.
pub const CENTRAL_TO_CHUNK_BROADCAST: &str = "central_to_chunk_broadcast";

/// This chunk's own topic, derived from its coordinate. Payloads keep the raw
/// `x,y` form; topic names swap commas for underscores.
pub fn chunk_topic(coordinate: &str) -> String {
    format!("central_to_chunk_{}", coordinate.replace(',', "_"))
}
