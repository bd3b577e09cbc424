// Cluster client adapter: the contract the aggregator consumes, plus the kube-rs implementation.

mod kube_client;
mod selector;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use futures_util::stream::BoxStream;
use std::collections::BTreeMap;

pub use self::kube_client::KubeClusterClient;
pub use self::selector::{LabelSelector, SelectorOperator, SelectorRequirement};
pub use kube::api::DynamicObject;

use crate::error::ClusterError;
use crate::models::ResourceKind;

/// Lazy, finite, single-use sequence of listed objects. Callers drain it once per call.
pub type ObjectStream = BoxStream<'static, Result<DynamicObject, ClusterError>>;

/// What a list call selects within a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    Everything,
    Labels(LabelSelector),
}

impl Selector {
    /// Query-string form; empty for [`Selector::Everything`].
    pub fn to_query(&self) -> String {
        match self {
            Selector::Everything => String::new(),
            Selector::Labels(selector) => selector.to_query(),
        }
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match self {
            Selector::Everything => true,
            Selector::Labels(selector) => selector.matches(labels),
        }
    }
}

/// Read-only access to cluster state.
///
/// Implementations do not retry; retry policy belongs to the transport underneath.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Fetches one namespaced object. Absence is [`ClusterError::NotFound`].
    async fn get_object(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<DynamicObject, ClusterError>;

    /// Lists objects of `kind` in `namespace` matching `selector`.
    /// Nothing is requested until the stream is polled.
    fn list_related(
        &self,
        kind: ResourceKind,
        namespace: &str,
        selector: &Selector,
    ) -> ObjectStream;
}

/// Drains a list stream into memory, stopping at the first error.
pub async fn drain(stream: ObjectStream) -> Result<Vec<DynamicObject>, ClusterError> {
    stream.try_collect().await
}
