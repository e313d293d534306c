// Kubernetes-backed cluster control: pod listing, statefulset scaling,
// pod-added watches, and ordinal parking via the deletion-cost annotation.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams, Patch, PatchParams, WatchEvent, WatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tokio::sync::Mutex;
use tracing::info;

use crate::domain::entities::{PodInfo, PodList};
use crate::domain::ports::ClusterApi;

const CHUNK_LABEL: &str = "app=pacman-chunk";
const NAMESPACE: &str = "default";
const WORKLOAD: &str = "pacman-chunk";
/// Bound on the wait for the post-scale pod-added event.
const POD_ADDED_TIMEOUT: Duration = Duration::from_secs(30);

/// One kubeconfig-backed cluster hosting chunk pods.
pub struct KubeCluster {
    client: Client,
    cluster_name: String,
    reserved: Mutex<VecDeque<String>>,
}

impl KubeCluster {
    /// Build one cluster client per kubeconfig path. The cluster name is the
    /// kubeconfig's current context.
    pub async fn from_kubeconfigs(paths: &[String]) -> Result<Vec<KubeCluster>, String> {
        let mut clusters = Vec::with_capacity(paths.len());
        for path in paths {
            let kubeconfig = Kubeconfig::read_from(path)
                .map_err(|err| format!("failed to read kubeconfig {path}: {err}"))?;
            let cluster_name = kubeconfig.current_context.clone().unwrap_or_default();
            let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|err| format!("invalid kubeconfig {path}: {err}"))?;
            let client = Client::try_from(config)
                .map_err(|err| format!("failed to build cluster client for {path}: {err}"))?;
            info!(cluster = %cluster_name, "connected cluster client");
            clusters.push(KubeCluster {
                client,
                cluster_name,
                reserved: Mutex::new(VecDeque::new()),
            });
        }
        Ok(clusters)
    }

    fn pods(&self) -> Api<Pod> {
        Api::namespaced(self.client.clone(), NAMESPACE)
    }

    fn workloads(&self) -> Api<StatefulSet> {
        Api::namespaced(self.client.clone(), NAMESPACE)
    }
}

fn pod_info(pod: Pod) -> Option<PodInfo> {
    let name = pod.metadata.name?;
    let created_at_epoch_ms = pod
        .metadata
        .creation_timestamp
        .map(|time| time.0.timestamp_millis())
        .unwrap_or_default();
    Some(PodInfo {
        name,
        created_at_epoch_ms,
    })
}

#[async_trait]
impl ClusterApi for KubeCluster {
    fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    async fn list_pods(&self) -> Result<PodList, String> {
        let list = self
            .pods()
            .list(&ListParams::default().labels(CHUNK_LABEL))
            .await
            .map_err(|err| format!("pod list failed: {err}"))?;
        let resource_version = list.metadata.resource_version.clone().unwrap_or_default();
        let items = list.items.into_iter().filter_map(pod_info).collect();
        Ok(PodList {
            items,
            resource_version,
        })
    }

    async fn replica_count(&self) -> Result<i32, String> {
        let scale = self
            .workloads()
            .get_scale(WORKLOAD)
            .await
            .map_err(|err| format!("get scale failed: {err}"))?;
        Ok(scale.spec.and_then(|spec| spec.replicas).unwrap_or_default())
    }

    async fn set_replica_count(&self, replicas: i32) -> Result<(), String> {
        let patch = serde_json::json!({"spec": {"replicas": replicas}});
        self.workloads()
            .patch_scale(WORKLOAD, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map(|_| ())
            .map_err(|err| format!("scale update failed: {err}"))
    }

    async fn reserve_ordinal(&self, ordinal: String) -> Result<(), String> {
        // Lowest deletion cost steers the controller toward removing this pod
        // first on the scale-down that follows.
        let pod_name = format!("{WORKLOAD}-{ordinal}");
        let patch = serde_json::json!({
            "metadata": {
                "annotations": {
                    "controller.kubernetes.io/pod-deletion-cost": i32::MIN.to_string(),
                }
            }
        });
        self.pods()
            .patch(&pod_name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|err| format!("deletion-cost annotation failed for {pod_name}: {err}"))?;
        self.reserved.lock().await.push_back(ordinal);
        Ok(())
    }

    async fn release_oldest_ordinal(&self) -> Result<Option<String>, String> {
        Ok(self.reserved.lock().await.pop_front())
    }

    async fn wait_for_pod_added(&self, since_resource_version: &str) -> Result<PodInfo, String> {
        let params = WatchParams::default().labels(CHUNK_LABEL);
        let stream = self
            .pods()
            .watch(&params, since_resource_version)
            .await
            .map_err(|err| format!("pod watch failed: {err}"))?;

        let wait_for_add = async {
            futures::pin_mut!(stream);
            while let Some(event) = stream
                .try_next()
                .await
                .map_err(|err| format!("pod watch stream failed: {err}"))?
            {
                if let WatchEvent::Added(pod) = event {
                    if let Some(info) = pod_info(pod) {
                        return Ok(info);
                    }
                }
            }
            Err("pod watch ended without an add event".to_string())
        };

        tokio::time::timeout(POD_ADDED_TIMEOUT, wait_for_add)
            .await
            .map_err(|_| "timed out waiting for a pod-added event".to_string())?
    }
}
