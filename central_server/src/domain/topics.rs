/// Chunk-to-coordinator firehose.
pub const CHUNK_TO_CENTRAL: &str = "chunk_to_central";
/// Coordinator-to-every-chunk sync channel.
pub const CENTRAL_TO_CHUNK_BROADCAST: &str = "central_to_chunk_broadcast";
/// Consumer group owning the coordinator side of `chunk_to_central`.
pub const CENTRAL_CONSUMER_GROUP: &str = "central-server-group";

/// Topic addressed to a single chunk. Payloads keep the raw `x,y` coordinate
/// form; topic names swap commas for underscores.
pub fn chunk_topic(id: &str) -> String {
    format!("central_to_chunk_{}", id.replace(',', "_"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_topic_replaces_commas_with_underscores() {
        assert_eq!(chunk_topic("2,3"), "central_to_chunk_2_3");
        assert_eq!(chunk_topic("-1,4"), "central_to_chunk_-1_4");
    }

    #[test]
    fn chunk_topic_passes_plain_ids_through() {
        assert_eq!(chunk_topic("chunk-host-7"), "central_to_chunk_chunk-host-7");
    }
}
