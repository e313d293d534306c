// Frameworks layer: runtime config, the Kafka driver, and server bootstrap.

pub mod config;
pub mod kafka;
pub mod server;
