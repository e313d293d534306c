use std::env;

// Runtime configuration for the coordinator (environment with defaults).

pub fn http_port() -> u16 {
    env::var("CENTRAL_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8080)
}

pub fn kafka_bootstrap_server() -> String {
    env::var("KAFKA_BOOTSTRAP_SERVER").unwrap_or_else(|_| "kafka:9092".to_string())
}

pub fn mongo_uri() -> String {
    env::var("MONGO_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string())
}

/// Comma-separated kubeconfig paths, one per chunk cluster.
pub fn kubeconfig_paths() -> Vec<String> {
    env::var("KUBECONFIGS")
        .unwrap_or_default()
        .split(',')
        .filter(|path| !path.is_empty())
        .map(str::to_string)
        .collect()
}

/// Domain under which chunk server URLs are built
/// (`<cluster>.<domain>/?id=<ordinal>`).
pub fn chunk_domain() -> String {
    env::var("CHUNK_DOMAIN").unwrap_or_else(|_| "example.com".to_string())
}
