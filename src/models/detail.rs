// Detail record: one workload plus its related sections, and the response envelope around it.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::{ObjectMetaView, ResourceIdentity, ResourceKind, Summary};
use crate::error::{ClusterError, ErrorKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeMeta {
    pub kind: String,
}

/// Failure recorded for a related section; also listed in [`DetailRecord::errors`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionError {
    pub section: ResourceKind,
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default)]
    pub timed_out: bool,
}

impl SectionError {
    pub fn new(section: ResourceKind, err: &ClusterError) -> Self {
        Self {
            section,
            kind: err.kind(),
            message: err.to_string(),
            timed_out: err.is_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SectionContent {
    Available { items: Vec<Summary> },
    Unavailable { error: SectionError },
}

/// One related collection (events, pods or services) of a detail record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedSection {
    pub kind: ResourceKind,
    #[serde(flatten)]
    pub content: SectionContent,
}

impl RelatedSection {
    pub fn available(kind: ResourceKind, items: Vec<Summary>) -> Self {
        Self {
            kind,
            content: SectionContent::Available { items },
        }
    }

    pub fn unavailable(kind: ResourceKind, err: &ClusterError) -> Self {
        Self {
            kind,
            content: SectionContent::Unavailable {
                error: SectionError::new(kind, err),
            },
        }
    }

    pub fn items(&self) -> Option<&[Summary]> {
        match &self.content {
            SectionContent::Available { items } => Some(items),
            SectionContent::Unavailable { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&SectionError> {
        match &self.content {
            SectionContent::Available { .. } => None,
            SectionContent::Unavailable { error } => Some(error),
        }
    }
}

/// Pod count that may be unknown. Serializes as a number, or the string `"unknown"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodCount {
    Known(u32),
    Unknown,
}

impl Serialize for PodCount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PodCount::Known(n) => serializer.serialize_u32(*n),
            PodCount::Unknown => serializer.serialize_str("unknown"),
        }
    }
}

impl<'de> Deserialize<'de> for PodCount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PodCountVisitor;

        impl Visitor<'_> for PodCountVisitor {
            type Value = PodCount;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-negative count or \"unknown\"")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<PodCount, E> {
                u32::try_from(v)
                    .map(PodCount::Known)
                    .map_err(|_| E::custom("pod count out of range"))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<PodCount, E> {
                match v {
                    "unknown" => Ok(PodCount::Unknown),
                    other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
                }
            }
        }

        deserializer.deserialize_any(PodCountVisitor)
    }
}

/// Desired vs running replicas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicaCount {
    pub desired: Option<i32>,
    pub running: PodCount,
}

/// Pod phase breakdown of a workload's matched pods.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodInfo {
    pub current: u32,
    pub desired: Option<i32>,
    pub running: u32,
    pub pending: u32,
    pub failed: u32,
    pub succeeded: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailRecord {
    pub identity: ResourceIdentity,
    pub object_meta: ObjectMetaView,
    pub type_meta: TypeMeta,
    /// Pod selector in Kubernetes query syntax; empty when the workload selects nothing.
    pub selector: String,
    pub container_images: Vec<String>,
    pub init_container_images: Vec<String>,
    pub spec: serde_json::Value,
    pub status: serde_json::Value,
    pub derived_replica_count: ReplicaCount,
    pub pod_info: Option<PodInfo>,
    /// Always events, pods, services, in that order.
    pub related: Vec<RelatedSection>,
    /// Non-critical errors: one entry per unavailable section.
    pub errors: Vec<SectionError>,
}

impl DetailRecord {
    pub fn section(&self, kind: ResourceKind) -> Option<&RelatedSection> {
        self.related.iter().find(|s| s.kind == kind)
    }

    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn response_status(&self) -> ResponseStatus {
        if self.is_partial() {
            ResponseStatus::Partial
        } else {
            ResponseStatus::Ok
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMeta {
    pub total_items: usize,
}

/// A page of one related collection, served by the child-list endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedList {
    pub kind: ResourceKind,
    pub list_meta: ListMeta,
    pub items: Vec<Summary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Ok,
    Partial,
    NotFound,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}

/// Envelope of every API response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl<T> ApiResponse<T> {
    pub fn with_status(status: ResponseStatus, data: T) -> Self {
        Self {
            status,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(kind: ErrorKind, message: String) -> Self {
        let status = if kind == ErrorKind::NotFound {
            ResponseStatus::NotFound
        } else {
            ResponseStatus::Error
        };
        Self {
            status,
            data: None,
            error: Some(ErrorBody { kind, message }),
        }
    }
}

impl From<DetailRecord> for ApiResponse<DetailRecord> {
    fn from(record: DetailRecord) -> Self {
        Self::with_status(record.response_status(), record)
    }
}
