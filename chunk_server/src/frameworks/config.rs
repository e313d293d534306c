use std::env;
use std::time::{SystemTime, UNIX_EPOCH};

// Runtime configuration for the chunk server (environment with defaults).

pub fn http_port() -> u16 {
    env::var("CHUNK_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8080)
}

pub fn kafka_bootstrap_server() -> String {
    env::var("KAFKA_BOOTSTRAP_SERVER").unwrap_or_else(|_| "kafka:9092".to_string())
}

/// Coordinator base URL, probed with `GET /ping` before startup proceeds.
pub fn central_server_url() -> String {
    env::var("CENTRAL_SERVER_URL").unwrap_or_else(|_| "http://central_server:8080".to_string())
}

/// This chunk's coordinate, `"x,y"` with any quotes stripped.
pub fn chunk_coordinate() -> String {
    normalize_coordinate(env::var("CHUNK_COORDINATE").ok().as_deref())
}

/// Registration id: the pod hostname, prefixed with the cluster number when
/// one is configured.
pub fn chunk_id() -> String {
    let hostname = env::var("HOSTNAME").ok().filter(|name| !name.is_empty());
    let base = hostname.unwrap_or_else(|| {
        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        format!("chunk_server_{seconds}")
    });
    prefix_chunk_id(env::var("CLUSTER_NUMBER").ok().as_deref(), &base)
}

fn normalize_coordinate(raw: Option<&str>) -> String {
    let trimmed = raw.unwrap_or_default().trim().trim_matches('"');
    if trimmed.is_empty() {
        "0,0".to_string()
    } else {
        trimmed.to_string()
    }
}

fn prefix_chunk_id(cluster_number: Option<&str>, base: &str) -> String {
    match cluster_number {
        Some(cluster) if !cluster.is_empty() => format!("{cluster}_{base}"),
        _ => base.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_defaults_to_the_origin() {
        assert_eq!(normalize_coordinate(None), "0,0");
        assert_eq!(normalize_coordinate(Some("")), "0,0");
        assert_eq!(normalize_coordinate(Some("\"\"")), "0,0");
    }

    #[test]
    fn coordinate_strips_quotes_and_whitespace() {
        assert_eq!(normalize_coordinate(Some("\"2,3\"")), "2,3");
        assert_eq!(normalize_coordinate(Some(" -1,4 ")), "-1,4");
        assert_eq!(normalize_coordinate(Some("0,0")), "0,0");
    }

    #[test]
    fn chunk_id_gains_a_cluster_prefix_only_when_configured() {
        assert_eq!(prefix_chunk_id(Some("2"), "chunk-host"), "2_chunk-host");
        assert_eq!(prefix_chunk_id(Some(""), "chunk-host"), "chunk-host");
        assert_eq!(prefix_chunk_id(None, "chunk-host"), "chunk-host");
    }
}
