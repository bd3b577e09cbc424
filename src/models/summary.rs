// Related-resource summaries (pods, events, services) built from cluster objects.
// Object bodies are read through tolerant views: missing or malformed fields fall back to defaults.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use kube::api::DynamicObject;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Presentation view of an object's metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetaView {
    pub name: String,
    pub namespace: Option<String>,
    pub uid: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    pub creation_timestamp: Option<String>,
}

impl From<&ObjectMeta> for ObjectMetaView {
    fn from(meta: &ObjectMeta) -> Self {
        Self {
            name: meta.name.clone().unwrap_or_default(),
            namespace: meta.namespace.clone(),
            uid: meta.uid.clone(),
            labels: meta.labels.clone().unwrap_or_default(),
            annotations: meta.annotations.clone().unwrap_or_default(),
            creation_timestamp: meta.creation_timestamp.as_ref().and_then(format_time),
        }
    }
}

/// RFC 3339 rendering of an API timestamp, exactly as the API serializes it.
fn format_time(time: &Time) -> Option<String> {
    serde_json::to_value(time)
        .ok()
        .and_then(|v| v.as_str().map(str::to_owned))
}

fn parse_body<T: DeserializeOwned + Default>(obj: &DynamicObject) -> T {
    match T::deserialize(&obj.data) {
        Ok(view) => view,
        Err(e) => {
            tracing::debug!(
                name = obj.metadata.name.as_deref().unwrap_or_default(),
                error = %e,
                "object body did not match expected shape; using defaults"
            );
            T::default()
        }
    }
}

/// Pod lifecycle phase. Unrecognized values map to [`PodPhase::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl From<&str> for PodPhase {
    fn from(value: &str) -> Self {
        match value {
            "Pending" => PodPhase::Pending,
            "Running" => PodPhase::Running,
            "Succeeded" => PodPhase::Succeeded,
            "Failed" => PodPhase::Failed,
            _ => PodPhase::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSummary {
    pub name: String,
    pub namespace: Option<String>,
    pub phase: PodPhase,
    /// True when every container reports ready.
    pub ready: bool,
    pub restart_count: i32,
    pub node_name: Option<String>,
    #[serde(rename = "podIP")]
    pub pod_ip: Option<String>,
    pub creation_timestamp: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PodBody {
    spec: PodSpecBody,
    status: PodStatusBody,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PodSpecBody {
    node_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PodStatusBody {
    phase: Option<String>,
    #[serde(rename = "podIP")]
    pod_ip: Option<String>,
    container_statuses: Vec<ContainerStatusBody>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ContainerStatusBody {
    ready: bool,
    restart_count: i32,
}

impl From<&DynamicObject> for PodSummary {
    fn from(obj: &DynamicObject) -> Self {
        let body: PodBody = parse_body(obj);
        let statuses = &body.status.container_statuses;
        Self {
            name: obj.metadata.name.clone().unwrap_or_default(),
            namespace: obj.metadata.namespace.clone(),
            phase: body
                .status
                .phase
                .as_deref()
                .map(PodPhase::from)
                .unwrap_or(PodPhase::Unknown),
            ready: !statuses.is_empty() && statuses.iter().all(|s| s.ready),
            restart_count: statuses.iter().map(|s| s.restart_count).sum(),
            node_name: body.spec.node_name,
            pod_ip: body.status.pod_ip,
            creation_timestamp: obj.metadata.creation_timestamp.as_ref().and_then(format_time),
            labels: obj.metadata.labels.clone().unwrap_or_default(),
        }
    }
}

/// Reference from an event to the object it is about.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvolvedObject {
    pub kind: String,
    pub name: String,
    pub namespace: Option<String>,
    pub uid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub name: String,
    pub reason: Option<String>,
    pub message: Option<String>,
    /// "Normal" or "Warning".
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub count: i32,
    pub involved_object: InvolvedObject,
    pub source_component: Option<String>,
    pub first_seen: Option<String>,
    pub last_seen: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct EventBody {
    reason: Option<String>,
    message: Option<String>,
    #[serde(rename = "type")]
    type_: Option<String>,
    count: Option<i32>,
    involved_object: InvolvedObject,
    source: EventSourceBody,
    first_timestamp: Option<String>,
    last_timestamp: Option<String>,
    event_time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EventSourceBody {
    component: Option<String>,
}

impl From<&DynamicObject> for EventSummary {
    fn from(obj: &DynamicObject) -> Self {
        let body: EventBody = parse_body(obj);
        let last_seen = body
            .last_timestamp
            .or_else(|| body.event_time.clone())
            .or_else(|| body.first_timestamp.clone());
        let first_seen = body.first_timestamp.or(body.event_time);
        Self {
            name: obj.metadata.name.clone().unwrap_or_default(),
            reason: body.reason,
            message: body.message,
            type_: body.type_,
            count: body.count.unwrap_or(1),
            involved_object: body.involved_object,
            source_component: body.source.component,
            first_seen,
            last_seen,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePortSummary {
    pub name: Option<String>,
    pub port: i32,
    pub protocol: Option<String>,
    /// Port number or named port, as declared.
    pub target_port: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSummary {
    pub name: String,
    pub namespace: Option<String>,
    #[serde(rename = "type")]
    pub type_: Option<String>,
    #[serde(rename = "clusterIP")]
    pub cluster_ip: Option<String>,
    #[serde(default)]
    pub selector: BTreeMap<String, String>,
    #[serde(default)]
    pub ports: Vec<ServicePortSummary>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServiceBody {
    spec: ServiceSpecBody,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ServiceSpecBody {
    #[serde(rename = "type")]
    type_: Option<String>,
    #[serde(rename = "clusterIP")]
    cluster_ip: Option<String>,
    selector: BTreeMap<String, String>,
    ports: Vec<ServicePortBody>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ServicePortBody {
    name: Option<String>,
    port: i32,
    protocol: Option<String>,
    target_port: Option<serde_json::Value>,
}

impl From<&DynamicObject> for ServiceSummary {
    fn from(obj: &DynamicObject) -> Self {
        let body: ServiceBody = parse_body(obj);
        Self {
            name: obj.metadata.name.clone().unwrap_or_default(),
            namespace: obj.metadata.namespace.clone(),
            type_: body.spec.type_,
            cluster_ip: body.spec.cluster_ip,
            selector: body.spec.selector,
            ports: body
                .spec
                .ports
                .into_iter()
                .map(|p| ServicePortSummary {
                    name: p.name,
                    port: p.port,
                    protocol: p.protocol,
                    target_port: p.target_port,
                })
                .collect(),
        }
    }
}

/// One entry of a related section. Serializes as the inner summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Summary {
    Event(EventSummary),
    Pod(PodSummary),
    Service(ServiceSummary),
}
