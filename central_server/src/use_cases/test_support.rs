use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI32, AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::entities::{
    ChunkRecord, LeaderboardEntry, PlayerStatus, PlayerUpdate, PodInfo, PodList,
};
use crate::domain::ports::{BusProducer, ChunkStore, ClusterApi, MapStore, UserStore};

// In-memory doubles for every coordinator port, shared by the use-case tests.

#[derive(Clone, Copy, Default)]
pub(crate) struct FailureFlags {
    pub find: bool,
    pub insert: bool,
    pub delete: bool,
}

pub(crate) struct MemoryChunkStore {
    records: Mutex<HashMap<(i32, i32), String>>,
    failures: FailureFlags,
}

impl MemoryChunkStore {
    pub(crate) fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            failures: FailureFlags::default(),
        }
    }

    pub(crate) fn with_failures(mut self, failures: FailureFlags) -> Self {
        self.failures = failures;
        self
    }

    pub(crate) fn len(&self) -> usize {
        self.records.lock().expect("records mutex poisoned").len()
    }
}

#[async_trait]
impl ChunkStore for MemoryChunkStore {
    async fn find(&self, x: i32, y: i32) -> Result<Option<ChunkRecord>, String> {
        if self.failures.find {
            return Err("find failed".to_string());
        }
        let records = self.records.lock().expect("records mutex poisoned");
        Ok(records.get(&(x, y)).map(|url| ChunkRecord {
            x,
            y,
            url: url.clone(),
        }))
    }

    async fn insert(&self, record: ChunkRecord) -> Result<(), String> {
        if self.failures.insert {
            return Err("insert failed".to_string());
        }
        let mut records = self.records.lock().expect("records mutex poisoned");
        records.insert((record.x, record.y), record.url);
        Ok(())
    }

    async fn delete(&self, x: i32, y: i32) -> Result<bool, String> {
        if self.failures.delete {
            return Err("delete failed".to_string());
        }
        let mut records = self.records.lock().expect("records mutex poisoned");
        Ok(records.remove(&(x, y)).is_some())
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct UserRow {
    pub score: i64,
    pub high_score: i64,
    pub status: PlayerStatus,
}

#[derive(Clone, Copy, Default)]
pub(crate) struct UserFailureFlags {
    pub apply: bool,
    pub leaderboard: bool,
    pub by_status: bool,
}

pub(crate) struct MemoryUserStore {
    users: Mutex<HashMap<String, UserRow>>,
    failures: UserFailureFlags,
}

impl MemoryUserStore {
    pub(crate) fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            failures: UserFailureFlags::default(),
        }
    }

    pub(crate) fn with_failures(mut self, failures: UserFailureFlags) -> Self {
        self.failures = failures;
        self
    }

    pub(crate) fn row(&self, user_name: &str) -> Option<UserRow> {
        let users = self.users.lock().expect("users mutex poisoned");
        users.get(user_name).cloned()
    }

    pub(crate) fn seed(&self, user_name: &str, row: UserRow) {
        let mut users = self.users.lock().expect("users mutex poisoned");
        users.insert(user_name.to_string(), row);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn apply_update(&self, update: &PlayerUpdate) -> Result<(), String> {
        if self.failures.apply {
            return Err("apply failed".to_string());
        }
        let mut users = self.users.lock().expect("users mutex poisoned");
        let row = users.entry(update.user_name.clone()).or_default();
        row.score = update.score;
        row.status = update.status;
        row.high_score = row.high_score.max(update.score);
        Ok(())
    }

    async fn top_by_high_score(&self, limit: i64) -> Result<Vec<LeaderboardEntry>, String> {
        if self.failures.leaderboard {
            return Err("leaderboard query failed".to_string());
        }
        let users = self.users.lock().expect("users mutex poisoned");
        let mut rows: Vec<(String, i64)> = users
            .iter()
            .map(|(name, row)| (name.clone(), row.high_score))
            .collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        rows.truncate(limit.max(0) as usize);
        Ok(rows
            .into_iter()
            .map(|(user_name, score)| LeaderboardEntry { user_name, score })
            .collect())
    }

    async fn find_by_status(&self, status: PlayerStatus) -> Result<Vec<LeaderboardEntry>, String> {
        if self.failures.by_status {
            return Err("status query failed".to_string());
        }
        let users = self.users.lock().expect("users mutex poisoned");
        let mut entries: Vec<LeaderboardEntry> = users
            .iter()
            .filter(|(_, row)| row.status == status)
            .map(|(name, row)| LeaderboardEntry {
                user_name: name.clone(),
                score: row.score,
            })
            .collect();
        entries.sort_by(|a, b| a.user_name.cmp(&b.user_name));
        Ok(entries)
    }
}

pub(crate) struct MemoryMapStore {
    maps: Mutex<HashMap<String, Vec<Vec<String>>>>,
}

impl MemoryMapStore {
    pub(crate) fn new() -> Self {
        Self {
            maps: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn seed(&self, coordinate: &str, map: Vec<Vec<String>>) {
        let mut maps = self.maps.lock().expect("maps mutex poisoned");
        maps.insert(coordinate.to_string(), map);
    }
}

#[async_trait]
impl MapStore for MemoryMapStore {
    async fn find(&self, coordinate: &str) -> Result<Option<Vec<Vec<String>>>, String> {
        let maps = self.maps.lock().expect("maps mutex poisoned");
        Ok(maps.get(coordinate).cloned())
    }
}

/// Producer double that records every publish.
#[derive(Default)]
pub(crate) struct RecordingProducer {
    sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingProducer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub(crate) fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().expect("sent mutex poisoned").clone()
    }
}

#[async_trait]
impl BusProducer for RecordingProducer {
    async fn send(&self, topic: &str, payload: &str) -> Result<(), String> {
        if self.fail {
            return Err("send failed".to_string());
        }
        let mut sent = self.sent.lock().expect("sent mutex poisoned");
        sent.push((topic.to_string(), payload.to_string()));
        Ok(())
    }
}

/// Cluster double with scripted pods, scale recording, and ordinal parking.
pub(crate) struct FakeCluster {
    name: String,
    reachable: bool,
    pods: Mutex<Vec<PodInfo>>,
    reserved: Mutex<VecDeque<String>>,
    pending_ordinal: Mutex<Option<String>>,
    next_ordinal: AtomicI32,
    next_created: AtomicI64,
    scale_calls: Mutex<Vec<i32>>,
}

impl FakeCluster {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            reachable: true,
            pods: Mutex::new(Vec::new()),
            reserved: Mutex::new(VecDeque::new()),
            pending_ordinal: Mutex::new(None),
            next_ordinal: AtomicI32::new(0),
            next_created: AtomicI64::new(1_000),
            scale_calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn unreachable(name: &str) -> Self {
        let mut cluster = Self::new(name);
        cluster.reachable = false;
        cluster
    }

    pub(crate) fn with_pods(self, ordinals: &[i32]) -> Self {
        {
            let mut pods = self.pods.lock().expect("pods mutex poisoned");
            for (index, ordinal) in ordinals.iter().enumerate() {
                pods.push(PodInfo {
                    name: format!("pacman-chunk-{ordinal}"),
                    created_at_epoch_ms: index as i64,
                });
            }
        }
        self
    }

    pub(crate) fn with_next_ordinal(self, ordinal: i32) -> Self {
        self.next_ordinal.store(ordinal, Ordering::Relaxed);
        self
    }

    pub(crate) fn scale_calls(&self) -> Vec<i32> {
        self.scale_calls.lock().expect("scale mutex poisoned").clone()
    }

    pub(crate) fn reserved_ordinals(&self) -> Vec<String> {
        self.reserved
            .lock()
            .expect("reserved mutex poisoned")
            .iter()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ClusterApi for FakeCluster {
    fn cluster_name(&self) -> &str {
        &self.name
    }

    async fn list_pods(&self) -> Result<PodList, String> {
        if !self.reachable {
            return Err("cluster unreachable".to_string());
        }
        let pods = self.pods.lock().expect("pods mutex poisoned");
        Ok(PodList {
            items: pods.clone(),
            resource_version: format!("rv-{}", pods.len()),
        })
    }

    async fn replica_count(&self) -> Result<i32, String> {
        if !self.reachable {
            return Err("cluster unreachable".to_string());
        }
        let pods = self.pods.lock().expect("pods mutex poisoned");
        Ok(pods.len() as i32)
    }

    async fn set_replica_count(&self, replicas: i32) -> Result<(), String> {
        if !self.reachable {
            return Err("cluster unreachable".to_string());
        }
        self.scale_calls
            .lock()
            .expect("scale mutex poisoned")
            .push(replicas);
        // Scale-down removes pods immediately; scale-up pods appear through
        // `wait_for_pod_added`, matching the real controller's behaviour.
        let mut pods = self.pods.lock().expect("pods mutex poisoned");
        while pods.len() > replicas.max(0) as usize {
            pods.pop();
        }
        Ok(())
    }

    async fn reserve_ordinal(&self, ordinal: String) -> Result<(), String> {
        if !self.reachable {
            return Err("cluster unreachable".to_string());
        }
        self.reserved
            .lock()
            .expect("reserved mutex poisoned")
            .push_back(ordinal);
        Ok(())
    }

    async fn release_oldest_ordinal(&self) -> Result<Option<String>, String> {
        if !self.reachable {
            return Err("cluster unreachable".to_string());
        }
        let released = self
            .reserved
            .lock()
            .expect("reserved mutex poisoned")
            .pop_front();
        if let Some(ordinal) = &released {
            let mut pending = self.pending_ordinal.lock().expect("pending mutex poisoned");
            *pending = Some(ordinal.clone());
        }
        Ok(released)
    }

    async fn wait_for_pod_added(&self, _since_resource_version: &str) -> Result<PodInfo, String> {
        if !self.reachable {
            return Err("cluster unreachable".to_string());
        }
        let ordinal = {
            let mut pending = self.pending_ordinal.lock().expect("pending mutex poisoned");
            match pending.take() {
                Some(ordinal) => ordinal,
                None => self.next_ordinal.fetch_add(1, Ordering::Relaxed).to_string(),
            }
        };
        let pod = PodInfo {
            name: format!("pacman-chunk-{ordinal}"),
            created_at_epoch_ms: self.next_created.fetch_add(1, Ordering::Relaxed),
        };
        let mut pods = self.pods.lock().expect("pods mutex poisoned");
        pods.push(pod.clone());
        Ok(pod)
    }
}
