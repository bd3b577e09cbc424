// Resource kinds and the identity triple that keys every request.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::LocatorError;

/// Kubernetes kinds this service knows about, both workloads and their child kinds.
/// Serializes to the lowercase URL path segment (e.g. "replicationcontroller").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    ReplicationController,
    ReplicaSet,
    Deployment,
    StatefulSet,
    DaemonSet,
    Job,
    Event,
    Pod,
    Service,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 9] = [
        ResourceKind::ReplicationController,
        ResourceKind::ReplicaSet,
        ResourceKind::Deployment,
        ResourceKind::StatefulSet,
        ResourceKind::DaemonSet,
        ResourceKind::Job,
        ResourceKind::Event,
        ResourceKind::Pod,
        ResourceKind::Service,
    ];

    /// URL path segment, e.g. `/api/v1/<segment>/...`.
    pub fn path_segment(self) -> &'static str {
        match self {
            ResourceKind::ReplicationController => "replicationcontroller",
            ResourceKind::ReplicaSet => "replicaset",
            ResourceKind::Deployment => "deployment",
            ResourceKind::StatefulSet => "statefulset",
            ResourceKind::DaemonSet => "daemonset",
            ResourceKind::Job => "job",
            ResourceKind::Event => "event",
            ResourceKind::Pod => "pod",
            ResourceKind::Service => "service",
        }
    }

    pub fn from_path_segment(segment: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.path_segment() == segment)
    }

    /// Kind name as the Kubernetes API reports it (`involvedObject.kind`, `ownerReferences[].kind`).
    pub fn api_kind(self) -> &'static str {
        match self {
            ResourceKind::ReplicationController => "ReplicationController",
            ResourceKind::ReplicaSet => "ReplicaSet",
            ResourceKind::Deployment => "Deployment",
            ResourceKind::StatefulSet => "StatefulSet",
            ResourceKind::DaemonSet => "DaemonSet",
            ResourceKind::Job => "Job",
            ResourceKind::Event => "Event",
            ResourceKind::Pod => "Pod",
            ResourceKind::Service => "Service",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// Immutable (kind, namespace, name) key of one namespaced object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceIdentity {
    pub kind: ResourceKind,
    pub namespace: String,
    pub name: String,
}

impl ResourceIdentity {
    /// Builds an identity, rejecting empty segments and segments containing `/`.
    pub fn new(
        kind: ResourceKind,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, LocatorError> {
        let namespace = namespace.into();
        let name = name.into();
        validate_segment("namespace", &namespace)?;
        validate_segment("name", &name)?;
        Ok(Self {
            kind,
            namespace,
            name,
        })
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

pub(crate) fn validate_segment(field: &'static str, value: &str) -> Result<(), LocatorError> {
    if value.is_empty() || value.contains('/') {
        return Err(LocatorError::InvalidIdentity {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}
