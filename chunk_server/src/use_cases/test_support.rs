use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::ports::{BusConsumer, BusProducer, BusRecord};

// In-memory bus doubles shared by the chunk use-case tests.

/// Producer double that records every publish; optionally fails the first N.
#[derive(Default)]
pub(crate) struct RecordingProducer {
    sent: Mutex<Vec<(String, String)>>,
    failures_left: AtomicU32,
}

impl RecordingProducer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing_times(failures: u32) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failures_left: AtomicU32::new(failures),
        }
    }

    pub(crate) fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().expect("sent mutex poisoned").clone()
    }
}

#[async_trait]
impl BusProducer for RecordingProducer {
    async fn send(&self, topic: &str, payload: &str) -> Result<(), String> {
        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                left.checked_sub(1)
            })
            .is_ok()
        {
            return Err("send failed".to_string());
        }
        let mut sent = self.sent.lock().expect("sent mutex poisoned");
        sent.push((topic.to_string(), payload.to_string()));
        Ok(())
    }
}

/// Consumer double that replays a scripted sequence of records.
pub(crate) struct ScriptedConsumer {
    queue: Mutex<VecDeque<Result<BusRecord, String>>>,
}

impl ScriptedConsumer {
    pub(crate) fn new(records: Vec<Result<BusRecord, String>>) -> Self {
        Self {
            queue: Mutex::new(records.into()),
        }
    }
}

#[async_trait]
impl BusConsumer for ScriptedConsumer {
    async fn next(&self) -> Result<BusRecord, String> {
        let mut queue = self.queue.lock().expect("queue mutex poisoned");
        queue.pop_front().unwrap_or_else(|| Err("drained".to_string()))
    }
}
