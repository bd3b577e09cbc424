// Shared test helpers: an in-memory cluster and object builders

#![allow(dead_code)]

use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt, stream};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use workload_detail::cluster::{ClusterClient, DynamicObject, ObjectStream, Selector};
use workload_detail::error::ClusterError;
use workload_detail::models::ResourceKind;

pub const RC_UID: &str = "rc-uid-1";

/// In-memory cluster. Lists filter by namespace and selector; failures and delays are
/// injected per kind.
#[derive(Default)]
pub struct FakeCluster {
    objects: Vec<(ResourceKind, DynamicObject)>,
    get_failure: Option<ClusterError>,
    get_delay: Option<Duration>,
    list_failures: HashMap<ResourceKind, ClusterError>,
    list_delays: HashMap<ResourceKind, Duration>,
    hanging: HashSet<ResourceKind>,
    get_calls: AtomicUsize,
    list_calls: Mutex<HashMap<ResourceKind, usize>>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, kind: ResourceKind, obj: DynamicObject) -> Self {
        self.objects.push((kind, obj));
        self
    }

    pub fn failing_get(mut self, err: ClusterError) -> Self {
        self.get_failure = Some(err);
        self
    }

    pub fn delayed_get(mut self, delay: Duration) -> Self {
        self.get_delay = Some(delay);
        self
    }

    pub fn failing_list(mut self, kind: ResourceKind, err: ClusterError) -> Self {
        self.list_failures.insert(kind, err);
        self
    }

    pub fn delayed_list(mut self, kind: ResourceKind, delay: Duration) -> Self {
        self.list_delays.insert(kind, delay);
        self
    }

    /// Lists of `kind` never complete.
    pub fn hanging_list(mut self, kind: ResourceKind) -> Self {
        self.hanging.insert(kind);
        self
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self, kind: ResourceKind) -> usize {
        self.list_calls
            .lock()
            .unwrap()
            .get(&kind)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_list_calls(&self) -> usize {
        self.list_calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn get_object(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<DynamicObject, ClusterError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.get_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = &self.get_failure {
            return Err(err.clone());
        }
        self.objects
            .iter()
            .find(|(k, obj)| {
                *k == kind
                    && obj.metadata.namespace.as_deref() == Some(namespace)
                    && obj.metadata.name.as_deref() == Some(name)
            })
            .map(|(_, obj)| obj.clone())
            .ok_or_else(|| ClusterError::NotFound {
                kind,
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }

    fn list_related(
        &self,
        kind: ResourceKind,
        namespace: &str,
        selector: &Selector,
    ) -> ObjectStream {
        *self.list_calls.lock().unwrap().entry(kind).or_default() += 1;
        let items: Vec<DynamicObject> = self
            .objects
            .iter()
            .filter(|(k, obj)| {
                *k == kind
                    && obj.metadata.namespace.as_deref() == Some(namespace)
                    && selector.matches(&obj.metadata.labels.clone().unwrap_or_default())
            })
            .map(|(_, obj)| obj.clone())
            .collect();
        let failure = self.list_failures.get(&kind).cloned();
        let delay = self.list_delays.get(&kind).copied();
        let hang = self.hanging.contains(&kind);

        stream::once(async move {
            if hang {
                futures_util::future::pending::<()>().await;
            }
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            match failure {
                Some(err) => Err(err),
                None => Ok(items),
            }
        })
        .map_ok(|items| stream::iter(items.into_iter().map(Ok::<_, ClusterError>)))
        .try_flatten()
        .boxed()
    }
}

fn object(value: serde_json::Value) -> DynamicObject {
    serde_json::from_value(value).unwrap()
}

/// ReplicationController selecting `app=<name>`.
pub fn replication_controller(namespace: &str, name: &str, replicas: i32) -> DynamicObject {
    object(json!({
        "apiVersion": "v1",
        "kind": "ReplicationController",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "uid": RC_UID,
            "labels": { "app": name },
            "creationTimestamp": "2024-05-01T10:00:00Z"
        },
        "spec": {
            "replicas": replicas,
            "selector": { "app": name },
            "template": {
                "metadata": { "labels": { "app": name } },
                "spec": {
                    "initContainers": [{ "name": "init", "image": "busybox:1.36" }],
                    "containers": [{ "name": name, "image": "nginx:1.25" }]
                }
            }
        },
        "status": { "replicas": replicas }
    }))
}

pub fn deployment(namespace: &str, name: &str, replicas: i32) -> DynamicObject {
    object(json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": { "name": name, "namespace": namespace, "uid": "deploy-uid-1" },
        "spec": {
            "replicas": replicas,
            "selector": {
                "matchLabels": { "app": name },
                "matchExpressions": [{ "key": "tier", "operator": "In", "values": ["web"] }]
            },
            "template": {
                "metadata": { "labels": { "app": name, "tier": "web" } },
                "spec": { "containers": [{ "name": name, "image": "nginx:1.25" }] }
            }
        }
    }))
}

/// Pod labelled `app=<app>`, controlled by the replication controller with [`RC_UID`].
pub fn pod(namespace: &str, name: &str, app: &str, phase: &str) -> DynamicObject {
    object(json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "labels": { "app": app },
            "ownerReferences": [{
                "apiVersion": "v1",
                "kind": "ReplicationController",
                "name": app,
                "uid": RC_UID,
                "controller": true
            }]
        },
        "spec": { "nodeName": "node-1" },
        "status": {
            "phase": phase,
            "podIP": "10.0.0.1",
            "containerStatuses": [{ "name": app, "ready": phase == "Running", "restartCount": 1 }]
        }
    }))
}

/// Pod with extra labels and no owner.
pub fn labelled_pod(
    namespace: &str,
    name: &str,
    labels: serde_json::Value,
    phase: &str,
) -> DynamicObject {
    object(json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": { "name": name, "namespace": namespace, "labels": labels },
        "status": { "phase": phase }
    }))
}

/// Pod controlled by some other object.
pub fn foreign_pod(namespace: &str, name: &str, app: &str) -> DynamicObject {
    object(json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "labels": { "app": app },
            "ownerReferences": [{
                "apiVersion": "apps/v1",
                "kind": "ReplicaSet",
                "name": "other",
                "uid": "other-uid",
                "controller": true
            }]
        },
        "status": { "phase": "Running" }
    }))
}

pub fn event(
    namespace: &str,
    name: &str,
    involved_kind: &str,
    involved_name: &str,
    last_seen: &str,
) -> DynamicObject {
    object(json!({
        "apiVersion": "v1",
        "kind": "Event",
        "metadata": { "name": name, "namespace": namespace },
        "involvedObject": { "kind": involved_kind, "name": involved_name, "namespace": namespace },
        "reason": "Scheduled",
        "message": format!("{} {}", involved_kind, involved_name),
        "type": "Normal",
        "count": 2,
        "source": { "component": "kubelet" },
        "firstTimestamp": "2024-05-01T10:00:00Z",
        "lastTimestamp": last_seen
    }))
}

pub fn service(namespace: &str, name: &str, selector: serde_json::Value) -> DynamicObject {
    object(json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": { "name": name, "namespace": namespace },
        "spec": {
            "type": "ClusterIP",
            "clusterIP": "10.96.0.10",
            "selector": selector,
            "ports": [{ "name": "http", "port": 80, "protocol": "TCP", "targetPort": 8080 }]
        }
    }))
}

/// `nginx-rc` in `default` with three running pods, one pod event, one RC event and a service.
pub fn nginx_cluster() -> FakeCluster {
    FakeCluster::new()
        .with_object(
            ResourceKind::ReplicationController,
            replication_controller("default", "nginx-rc", 3),
        )
        .with_object(ResourceKind::Pod, pod("default", "nginx-rc-a", "nginx-rc", "Running"))
        .with_object(ResourceKind::Pod, pod("default", "nginx-rc-b", "nginx-rc", "Running"))
        .with_object(ResourceKind::Pod, pod("default", "nginx-rc-c", "nginx-rc", "Running"))
        .with_object(
            ResourceKind::Event,
            event(
                "default",
                "nginx-rc.1",
                "ReplicationController",
                "nginx-rc",
                "2024-05-01T10:00:05Z",
            ),
        )
        .with_object(
            ResourceKind::Event,
            event("default", "nginx-rc-a.1", "Pod", "nginx-rc-a", "2024-05-01T10:01:00Z"),
        )
        .with_object(
            ResourceKind::Event,
            event("default", "unrelated.1", "Pod", "unrelated", "2024-05-01T10:02:00Z"),
        )
        .with_object(
            ResourceKind::Service,
            service("default", "nginx", json!({ "app": "nginx-rc" })),
        )
        .with_object(
            ResourceKind::Service,
            service("default", "other", json!({ "app": "other" })),
        )
}
