// Kafka-backed implementations of the chunk server's bus ports, plus topic
// creation for the chunk's own topic.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::types::RDKafkaErrorCode;
use rdkafka::util::Timeout;
use rdkafka::Message;
use tracing::debug;

use crate::domain::ports::{BusConsumer, BusProducer, BusRecord};

/// Deadline for one produce round-trip.
const SEND_TIMEOUT: Duration = Duration::from_secs(10);
/// Deadline for the topic-creation admin call.
const ADMIN_TIMEOUT: Duration = Duration::from_secs(10);

pub struct KafkaProducer {
    inner: FutureProducer,
}

impl KafkaProducer {
    pub fn new(broker: &str) -> Result<Self, String> {
        let inner = ClientConfig::new()
            .set("bootstrap.servers", broker)
            .set("message.timeout.ms", "10000")
            .create()
            .map_err(|err| format!("kafka producer init failed: {err}"))?;
        Ok(Self { inner })
    }
}

#[async_trait]
impl BusProducer for KafkaProducer {
    async fn send(&self, topic: &str, payload: &str) -> Result<(), String> {
        self.inner
            .send(
                FutureRecord::<(), str>::to(topic).payload(payload),
                Timeout::After(SEND_TIMEOUT),
            )
            .await
            .map(|_| ())
            .map_err(|(err, _)| format!("kafka send to {topic} failed: {err}"))
    }
}

/// Consumer bound to one group and a fixed topic set. The chunk runs two of
/// these: the main consumer (chunk topic + broadcast) and the map-bootstrap
/// consumer with its own group.
pub struct KafkaConsumer {
    inner: StreamConsumer,
}

impl KafkaConsumer {
    pub fn new(broker: &str, group: &str, topics: &[&str]) -> Result<Self, String> {
        let inner: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", broker)
            .set("group.id", group)
            .set("auto.offset.reset", "latest")
            .set("enable.auto.commit", "true")
            .create()
            .map_err(|err| format!("kafka consumer init failed: {err}"))?;
        inner
            .subscribe(topics)
            .map_err(|err| format!("kafka subscribe failed: {err}"))?;
        Ok(Self { inner })
    }
}

#[async_trait]
impl BusConsumer for KafkaConsumer {
    async fn next(&self) -> Result<BusRecord, String> {
        let message = self
            .inner
            .recv()
            .await
            .map_err(|err| format!("kafka consume failed: {err}"))?;
        let payload = message
            .payload_view::<str>()
            .transpose()
            .map_err(|err| format!("non-utf8 kafka payload: {err}"))?
            .unwrap_or_default()
            .to_string();
        Ok(BusRecord {
            topic: message.topic().to_string(),
            payload,
        })
    }
}

/// Create the chunk's topic if it does not exist yet. An already-existing
/// topic is success.
pub async fn ensure_topic(broker: &str, topic: &str) -> Result<(), String> {
    let admin: AdminClient<DefaultClientContext> = ClientConfig::new()
        .set("bootstrap.servers", broker)
        .create()
        .map_err(|err| format!("kafka admin init failed: {err}"))?;

    let new_topic = NewTopic::new(topic, 1, TopicReplication::Fixed(1));
    let options = AdminOptions::new().operation_timeout(Some(Timeout::After(ADMIN_TIMEOUT)));
    let results = admin
        .create_topics([&new_topic], &options)
        .await
        .map_err(|err| format!("topic creation request failed: {err}"))?;

    for result in results {
        match result {
            Ok(created) => debug!(topic = %created, "created topic"),
            Err((name, RDKafkaErrorCode::TopicAlreadyExists)) => {
                debug!(topic = %name, "topic already exists");
            }
            Err((name, code)) => return Err(format!("failed to create topic {name}: {code}")),
        }
    }
    Ok(())
}
