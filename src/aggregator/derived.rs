// Fields derived from the primary workload object: pod selector, template labels,
// container images, desired replicas, pod ownership and the pod phase breakdown.

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::cluster::{DynamicObject, LabelSelector, Selector};
use crate::models::{InvolvedObject, PodInfo, PodPhase, PodSummary, ResourceIdentity, ResourceKind};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct WorkloadBody {
    spec: WorkloadSpec,
    status: WorkloadStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct WorkloadSpec {
    replicas: Option<i32>,
    completions: Option<i32>,
    parallelism: Option<i32>,
    selector: Option<serde_json::Value>,
    template: PodTemplate,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct WorkloadStatus {
    desired_number_scheduled: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PodTemplate {
    metadata: TemplateMeta,
    spec: TemplateSpec,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TemplateMeta {
    labels: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TemplateSpec {
    containers: Vec<ContainerBody>,
    init_containers: Vec<ContainerBody>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContainerBody {
    image: Option<String>,
}

/// The primary object reduced to what the related sections and derived counts need.
#[derive(Debug, Clone)]
pub struct Workload {
    pub identity: ResourceIdentity,
    pub uid: Option<String>,
    pub selector: LabelSelector,
    pub template_labels: BTreeMap<String, String>,
    pub desired_replicas: Option<i32>,
    pub container_images: Vec<String>,
    pub init_container_images: Vec<String>,
}

impl Workload {
    pub fn from_object(identity: &ResourceIdentity, obj: &DynamicObject) -> Self {
        let body = WorkloadBody::deserialize(&obj.data).unwrap_or_else(|e| {
            tracing::warn!(
                kind = %identity.kind,
                namespace = %identity.namespace,
                name = %identity.name,
                error = %e,
                "workload body did not match expected shape; deriving from defaults"
            );
            WorkloadBody::default()
        });
        let template_labels = body.spec.template.metadata.labels;
        let selector = parse_selector(identity.kind, body.spec.selector, &template_labels);
        let desired_replicas = match identity.kind {
            ResourceKind::ReplicationController
            | ResourceKind::ReplicaSet
            | ResourceKind::Deployment
            | ResourceKind::StatefulSet => Some(body.spec.replicas.unwrap_or(1)),
            ResourceKind::DaemonSet => Some(body.status.desired_number_scheduled.unwrap_or(0)),
            ResourceKind::Job => Some(
                body.spec
                    .completions
                    .or(body.spec.parallelism)
                    .unwrap_or(1),
            ),
            ResourceKind::Event | ResourceKind::Pod | ResourceKind::Service => None,
        };
        Self {
            identity: identity.clone(),
            uid: obj.metadata.uid.clone(),
            selector,
            template_labels,
            desired_replicas,
            container_images: images(&body.spec.template.spec.containers),
            init_container_images: images(&body.spec.template.spec.init_containers),
        }
    }

    /// Selector for the pod list; `None` when the workload selects nothing.
    pub fn pod_selector(&self) -> Option<Selector> {
        (!self.selector.is_empty()).then(|| Selector::Labels(self.selector.clone()))
    }

    /// Whether a selector-matched pod belongs to this workload. Pods controlled by another
    /// object are dropped; orphans are kept. Deployments own pods through ReplicaSets, so
    /// every matched pod counts.
    pub fn owns_pod(&self, pod: &DynamicObject) -> bool {
        if self.identity.kind == ResourceKind::Deployment {
            return true;
        }
        let controller = pod
            .metadata
            .owner_references
            .iter()
            .flatten()
            .find(|r| r.controller == Some(true));
        match controller {
            None => true,
            Some(owner) => self.uid.as_deref() == Some(owner.uid.as_str()),
        }
    }

    /// Whether an event's involved object is this workload itself.
    pub fn is_involved(&self, object: &InvolvedObject) -> bool {
        if let (Some(uid), Some(event_uid)) = (self.uid.as_deref(), object.uid.as_deref())
            && !event_uid.is_empty()
        {
            return uid == event_uid;
        }
        object.kind == self.identity.kind.api_kind() && object.name == self.identity.name
    }

    /// Whether a service's selector targets this workload's pod template.
    pub fn is_targeted_by(&self, service_selector: &BTreeMap<String, String>) -> bool {
        !service_selector.is_empty()
            && service_selector
                .iter()
                .all(|(k, v)| self.template_labels.get(k) == Some(v))
    }
}

fn parse_selector(
    kind: ResourceKind,
    raw: Option<serde_json::Value>,
    template_labels: &BTreeMap<String, String>,
) -> LabelSelector {
    match kind {
        // v1 ReplicationController: plain label map, defaulted from the template when absent.
        ResourceKind::ReplicationController => {
            let labels: BTreeMap<String, String> = raw
                .and_then(|v| serde_json::from_value(v).ok())
                .unwrap_or_default();
            if labels.is_empty() {
                LabelSelector::from_labels(template_labels.clone())
            } else {
                LabelSelector::from_labels(labels)
            }
        }
        _ => raw
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default(),
    }
}

fn images(containers: &[ContainerBody]) -> Vec<String> {
    containers
        .iter()
        .filter_map(|c| c.image.clone())
        .collect()
}

/// Phase breakdown of the matched pods.
pub fn pod_info(pods: &[PodSummary], desired: Option<i32>) -> PodInfo {
    let mut info = PodInfo {
        current: pods.len() as u32,
        desired,
        ..Default::default()
    };
    for pod in pods {
        match pod.phase {
            PodPhase::Running => info.running += 1,
            PodPhase::Pending => info.pending += 1,
            PodPhase::Failed => info.failed += 1,
            PodPhase::Succeeded => info.succeeded += 1,
            PodPhase::Unknown => {}
        }
    }
    info
}
