// Chunk placement: pick the emptiest cluster, grow it by one pod, and keep
// the coordinate-to-URL records in step with what actually runs.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::domain::entities::ChunkRecord;
use crate::domain::errors::PlacementError;
use crate::domain::ports::{ChunkStore, ClusterApi};

/// Pod count sentinel for a cluster whose list call failed. Unreachable
/// clusters sort last and are never chosen.
const UNREACHABLE: usize = usize::MAX;

struct ClusterHandle {
    api: Arc<dyn ClusterApi>,
    current_count: usize,
}

pub struct PlacementController {
    clusters: Mutex<Vec<ClusterHandle>>,
    chunks: Arc<dyn ChunkStore>,
    domain: String,
}

impl PlacementController {
    pub fn new(apis: Vec<Arc<dyn ClusterApi>>, chunks: Arc<dyn ChunkStore>, domain: String) -> Self {
        let clusters = apis
            .into_iter()
            .map(|api| ClusterHandle {
                api,
                current_count: 0,
            })
            .collect();
        Self {
            clusters: Mutex::new(clusters),
            chunks,
            domain,
        }
    }

    /// Return the URL serving `(x, y)`, provisioning a new chunk server when
    /// the coordinate has none yet.
    pub async fn get_or_provision(&self, x: i32, y: i32) -> Result<String, PlacementError> {
        if let Some(record) = self.chunks.find(x, y).await.map_err(PlacementError::Store)? {
            return Ok(record.url);
        }

        let url = self.provision().await?;
        self.chunks
            .insert(ChunkRecord {
                x,
                y,
                url: url.clone(),
            })
            .await
            .map_err(PlacementError::Store)?;
        Ok(url)
    }

    /// Grow the least-loaded cluster by one chunk pod and derive its URL.
    ///
    /// The scale-up and the follow-up pod list are not transactional; the new
    /// pod is identified as the one with the latest creation timestamp.
    pub async fn provision(&self) -> Result<String, PlacementError> {
        let api = self.pick_cluster().await?;
        info!(cluster = api.cluster_name(), "growing cluster by one chunk server");

        let before = api.list_pods().await.map_err(PlacementError::Orchestrator)?;
        let replicas = api.replica_count().await.map_err(PlacementError::Orchestrator)?;
        api.set_replica_count(replicas + 1)
            .await
            .map_err(PlacementError::Orchestrator)?;
        // Freeing the oldest parked ordinal lets the orchestrator hand that
        // pod name out again.
        if let Some(ordinal) = api
            .release_oldest_ordinal()
            .await
            .map_err(PlacementError::Orchestrator)?
        {
            info!(ordinal, "released reserved ordinal");
        }

        let added = api
            .wait_for_pod_added(&before.resource_version)
            .await
            .map_err(PlacementError::Orchestrator)?;
        info!(pod = %added.name, "new chunk pod started");

        let mut pods = api.list_pods().await.map_err(PlacementError::Orchestrator)?.items;
        pods.sort_by_key(|pod| pod.created_at_epoch_ms);
        let newest = pods
            .last()
            .ok_or_else(|| PlacementError::Orchestrator("no pods after scale-up".to_string()))?;
        Ok(chunk_url(&newest.name, api.cluster_name(), &self.domain))
    }

    /// Tear down the chunk serving `(x, y)`. The record must exist before any
    /// scaling happens; the record delete follows the orchestrator mutation.
    pub async fn decommission(&self, x: i32, y: i32, url: &str) -> Result<(), PlacementError> {
        if self
            .chunks
            .find(x, y)
            .await
            .map_err(PlacementError::Store)?
            .is_none()
        {
            return Err(PlacementError::UnknownChunk { x, y });
        }

        let cluster_name = url.split('.').next().unwrap_or_default();
        let ordinal = url.split('=').nth(1).unwrap_or_default().to_string();
        let api = self
            .cluster_by_name(cluster_name)
            .await
            .ok_or_else(|| PlacementError::Orchestrator(format!("no cluster matches {cluster_name}")))?;

        let replicas = api.replica_count().await.map_err(PlacementError::Orchestrator)?;
        api.set_replica_count(replicas - 1)
            .await
            .map_err(PlacementError::Orchestrator)?;
        // Park the ordinal so the freed pod name is not immediately recreated.
        api.reserve_ordinal(ordinal)
            .await
            .map_err(PlacementError::Orchestrator)?;

        self.chunks.delete(x, y).await.map_err(PlacementError::Store)?;
        info!(x, y, url, "decommissioned chunk server");
        Ok(())
    }

    /// Enumerate every chunk pod across every cluster as a URL.
    pub async fn list_all_urls(&self) -> Result<Vec<String>, PlacementError> {
        let clusters = self.clusters.lock().await;
        let mut urls = Vec::new();
        for cluster in clusters.iter() {
            let pods = cluster
                .api
                .list_pods()
                .await
                .map_err(PlacementError::Orchestrator)?;
            for pod in pods.items {
                urls.push(chunk_url(&pod.name, cluster.api.cluster_name(), &self.domain));
            }
        }
        Ok(urls)
    }

    /// Pair pods that already exist at startup with expanding-ring coordinates
    /// and seed records for them. Individual insert failures are skipped.
    pub async fn seed_existing_chunks(&self) -> Result<(), PlacementError> {
        let urls = self.list_all_urls().await?;
        let coordinates = ring_coordinates(urls.len());
        for (url, (x, y)) in urls.into_iter().zip(coordinates) {
            if let Err(err) = self
                .chunks
                .insert(ChunkRecord {
                    x,
                    y,
                    url: url.clone(),
                })
                .await
            {
                warn!(%url, x, y, error = %err, "failed to seed chunk record");
            }
        }
        Ok(())
    }

    /// Refresh pod counts and return the cluster with the fewest chunk pods.
    async fn pick_cluster(&self) -> Result<Arc<dyn ClusterApi>, PlacementError> {
        let mut clusters = self.clusters.lock().await;
        for cluster in clusters.iter_mut() {
            match cluster.api.list_pods().await {
                Ok(pods) => cluster.current_count = pods.items.len(),
                Err(err) => {
                    cluster.current_count = UNREACHABLE;
                    warn!(cluster = cluster.api.cluster_name(), error = %err, "pod list failed");
                }
            }
        }
        clusters.sort_by_key(|cluster| cluster.current_count);

        match clusters.first() {
            Some(best) if best.current_count != UNREACHABLE => Ok(best.api.clone()),
            _ => Err(PlacementError::NoReachableCluster),
        }
    }

    async fn cluster_by_name(&self, name: &str) -> Option<Arc<dyn ClusterApi>> {
        let prefixed = format!("kind-{name}");
        let clusters = self.clusters.lock().await;
        clusters
            .iter()
            .find(|cluster| {
                cluster.api.cluster_name() == name || cluster.api.cluster_name() == prefixed
            })
            .map(|cluster| cluster.api.clone())
    }
}

/// `pacman-chunk-7` on cluster `kind-chunk1` becomes `chunk1.<domain>/?id=7`.
pub fn chunk_url(pod_name: &str, cluster_name: &str, domain: &str) -> String {
    let ordinal = pod_name.rsplit('-').next().unwrap_or_default();
    let cluster = cluster_name.strip_prefix("kind-").unwrap_or(cluster_name);
    format!("{cluster}.{domain}/?id={ordinal}")
}

/// Coordinate sequence used to seed records for pre-existing pods: ring 1
/// corners, then ring 2 edges and corners, and so on outward.
pub fn ring_coordinates(count: usize) -> Vec<(i32, i32)> {
    let mut coordinates = Vec::with_capacity(count);
    let mut ring = 1;
    while coordinates.len() < count {
        for m in 1..=ring {
            if m == ring {
                coordinates.extend([(m, m), (-m, m), (m, -m), (-m, -m)]);
            } else {
                coordinates.extend([
                    (ring, m),
                    (-ring, m),
                    (ring, -m),
                    (-ring, -m),
                    (m, ring),
                    (-m, ring),
                    (m, -ring),
                    (-m, -ring),
                ]);
            }
        }
        ring += 1;
    }
    coordinates.truncate(count);
    coordinates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::test_support::{FailureFlags, FakeCluster, MemoryChunkStore};

    fn controller(
        clusters: Vec<Arc<FakeCluster>>,
        chunks: Arc<MemoryChunkStore>,
    ) -> PlacementController {
        let apis = clusters
            .into_iter()
            .map(|cluster| cluster as Arc<dyn ClusterApi>)
            .collect();
        PlacementController::new(apis, chunks, "example.com".to_string())
    }

    #[tokio::test]
    async fn cold_provision_scales_least_loaded_cluster_and_records_url() {
        let cluster_a = Arc::new(FakeCluster::new("A").with_pods(&[3, 5]).with_next_ordinal(7));
        let cluster_b = Arc::new(FakeCluster::unreachable("B"));
        let chunks = Arc::new(MemoryChunkStore::new());
        let controller = controller(vec![cluster_a.clone(), cluster_b], chunks.clone());

        let url = controller
            .get_or_provision(3, 4)
            .await
            .expect("provisioning should succeed");

        assert_eq!(url, "A.example.com/?id=7");
        assert_eq!(cluster_a.scale_calls(), vec![3]);
        let record = chunks
            .find(3, 4)
            .await
            .expect("lookup should succeed")
            .expect("record should exist");
        assert_eq!(record.url, "A.example.com/?id=7");
        assert_eq!(chunks.len(), 1);
    }

    #[tokio::test]
    async fn get_or_provision_returns_existing_record_without_scaling() {
        let cluster = Arc::new(FakeCluster::new("A").with_pods(&[1]));
        let chunks = Arc::new(MemoryChunkStore::new());
        chunks
            .insert(ChunkRecord {
                x: 1,
                y: 2,
                url: "A.example.com/?id=1".to_string(),
            })
            .await
            .expect("seed insert should succeed");
        let controller = controller(vec![cluster.clone()], chunks.clone());

        let url = controller
            .get_or_provision(1, 2)
            .await
            .expect("lookup should succeed");

        assert_eq!(url, "A.example.com/?id=1");
        assert!(cluster.scale_calls().is_empty());
        assert_eq!(chunks.len(), 1);
    }

    #[tokio::test]
    async fn provision_fails_when_every_cluster_is_unreachable() {
        let controller = controller(
            vec![
                Arc::new(FakeCluster::unreachable("A")),
                Arc::new(FakeCluster::unreachable("B")),
            ],
            Arc::new(MemoryChunkStore::new()),
        );

        let result = controller.provision().await;

        assert!(matches!(result, Err(PlacementError::NoReachableCluster)));
    }

    #[tokio::test]
    async fn provision_prefers_the_cluster_with_fewer_pods() {
        let cluster_a = Arc::new(FakeCluster::new("A").with_pods(&[1, 2, 3]).with_next_ordinal(4));
        let cluster_b = Arc::new(FakeCluster::new("B").with_pods(&[1]).with_next_ordinal(2));
        let controller = controller(
            vec![cluster_a.clone(), cluster_b.clone()],
            Arc::new(MemoryChunkStore::new()),
        );

        let url = controller.provision().await.expect("provision should succeed");

        assert_eq!(url, "B.example.com/?id=2");
        assert!(cluster_a.scale_calls().is_empty());
        assert_eq!(cluster_b.scale_calls(), vec![2]);
    }

    #[tokio::test]
    async fn decommission_reserves_ordinal_for_later_reuse() {
        let cluster = Arc::new(FakeCluster::new("clusterA").with_pods(&[5]).with_next_ordinal(6));
        let chunks = Arc::new(MemoryChunkStore::new());
        chunks
            .insert(ChunkRecord {
                x: 1,
                y: 1,
                url: "clusterA.example.com/?id=5".to_string(),
            })
            .await
            .expect("seed insert should succeed");
        let controller = controller(vec![cluster.clone()], chunks.clone());

        controller
            .decommission(1, 1, "clusterA.example.com/?id=5")
            .await
            .expect("decommission should succeed");

        assert_eq!(cluster.scale_calls(), vec![0]);
        assert_eq!(cluster.reserved_ordinals(), vec!["5".to_string()]);
        assert!(chunks.find(1, 1).await.expect("lookup should succeed").is_none());

        // The next provision on the same cluster pops the parked ordinal, so
        // pod 5 is allowed to come back.
        let url = controller.provision().await.expect("provision should succeed");
        assert_eq!(url, "clusterA.example.com/?id=5");
        assert!(cluster.reserved_ordinals().is_empty());
    }

    #[tokio::test]
    async fn decommission_matches_kind_prefixed_cluster_names() {
        let cluster = Arc::new(FakeCluster::new("kind-chunk1").with_pods(&[2]));
        let chunks = Arc::new(MemoryChunkStore::new());
        chunks
            .insert(ChunkRecord {
                x: 0,
                y: 1,
                url: "chunk1.example.com/?id=2".to_string(),
            })
            .await
            .expect("seed insert should succeed");
        let controller = controller(vec![cluster.clone()], chunks);

        controller
            .decommission(0, 1, "chunk1.example.com/?id=2")
            .await
            .expect("decommission should succeed");

        assert_eq!(cluster.reserved_ordinals(), vec!["2".to_string()]);
    }

    #[tokio::test]
    async fn decommission_of_unknown_chunk_fails_without_scaling() {
        let cluster = Arc::new(FakeCluster::new("A").with_pods(&[5]));
        let controller = controller(vec![cluster.clone()], Arc::new(MemoryChunkStore::new()));

        let result = controller.decommission(9, 9, "A.example.com/?id=5").await;

        assert!(matches!(
            result,
            Err(PlacementError::UnknownChunk { x: 9, y: 9 })
        ));
        assert!(cluster.scale_calls().is_empty());
        assert!(cluster.reserved_ordinals().is_empty());
    }

    #[tokio::test]
    async fn provision_surfaces_store_failures() {
        let cluster = Arc::new(FakeCluster::new("A").with_pods(&[1]).with_next_ordinal(2));
        let chunks = Arc::new(MemoryChunkStore::new().with_failures(FailureFlags {
            insert: true,
            ..Default::default()
        }));
        let controller = controller(vec![cluster], chunks);

        let result = controller.get_or_provision(0, 0).await;

        assert!(matches!(result, Err(PlacementError::Store(_))));
    }

    #[tokio::test]
    async fn list_all_urls_covers_every_cluster() {
        let cluster_a = Arc::new(FakeCluster::new("kind-chunk1").with_pods(&[0, 1]));
        let cluster_b = Arc::new(FakeCluster::new("chunk2").with_pods(&[0]));
        let controller = controller(vec![cluster_a, cluster_b], Arc::new(MemoryChunkStore::new()));

        let urls = controller.list_all_urls().await.expect("listing should succeed");

        assert_eq!(
            urls,
            vec![
                "chunk1.example.com/?id=0".to_string(),
                "chunk1.example.com/?id=1".to_string(),
                "chunk2.example.com/?id=0".to_string(),
            ]
        );
    }

    #[test]
    fn chunk_url_strips_kind_prefix_and_uses_trailing_ordinal() {
        assert_eq!(
            chunk_url("pacman-chunk-7", "kind-chunk1", "example.com"),
            "chunk1.example.com/?id=7"
        );
        assert_eq!(
            chunk_url("pacman-chunk-12", "west", "example.com"),
            "west.example.com/?id=12"
        );
    }

    #[test]
    fn ring_coordinates_expand_outward() {
        assert_eq!(
            ring_coordinates(6),
            vec![(1, 1), (-1, 1), (1, -1), (-1, -1), (2, 1), (-2, 1)]
        );
        let twelve = ring_coordinates(12);
        assert_eq!(twelve.len(), 12);
        // No coordinate repeats within the first two rings.
        let unique: std::collections::HashSet<_> = twelve.iter().collect();
        assert_eq!(unique.len(), 12);
    }
}
