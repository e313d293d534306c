use async_trait::async_trait;

// Bus ports for the chunk server. The frameworks layer provides the Kafka
// implementations; use cases are tested against in-memory doubles.

#[async_trait]
pub trait BusProducer: Send + Sync {
    async fn send(&self, topic: &str, payload: &str) -> Result<(), String>;
}

/// One record pulled off the bus.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BusRecord {
    pub topic: String,
    pub payload: String,
}

#[async_trait]
pub trait BusConsumer: Send + Sync {
    async fn next(&self) -> Result<BusRecord, String>;
}
