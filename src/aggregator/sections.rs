// Related-section fetchers. Every upstream list goes through the per-call response cache.

use futures_util::FutureExt;
use std::collections::HashSet;
use std::sync::Arc;

use super::derived::Workload;
use crate::cache::{FetchKey, FetchResult, ResponseCache};
use crate::cluster::{ClusterClient, Selector, drain};
use crate::error::ClusterError;
use crate::models::{EventSummary, PodSummary, ResourceKind, ServiceSummary};

/// Related collection of a workload, in the order sections appear in a detail record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Events,
    Pods,
    Services,
}

impl Section {
    pub const ALL: [Section; 3] = [Section::Events, Section::Pods, Section::Services];

    pub fn kind(self) -> ResourceKind {
        match self {
            Section::Events => ResourceKind::Event,
            Section::Pods => ResourceKind::Pod,
            Section::Services => ResourceKind::Service,
        }
    }

    pub fn from_kind(kind: ResourceKind) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.kind() == kind)
    }
}

async fn cached_list(
    client: &Arc<dyn ClusterClient>,
    cache: &ResponseCache,
    kind: ResourceKind,
    namespace: &str,
    selector: Selector,
) -> FetchResult {
    let key = FetchKey::new(kind, namespace, &selector);
    let client = Arc::clone(client);
    let namespace = namespace.to_string();
    cache
        .get_or_fetch(&key, move || {
            async move { drain(client.list_related(kind, &namespace, &selector)).await }.boxed()
        })
        .await
}

/// Pods matched by the workload's selector and owned by it, sorted by name.
pub async fn matched_pods(
    client: &Arc<dyn ClusterClient>,
    cache: &ResponseCache,
    workload: &Workload,
) -> Result<Vec<PodSummary>, ClusterError> {
    let Some(selector) = workload.pod_selector() else {
        return Ok(Vec::new());
    };
    let items = cached_list(
        client,
        cache,
        ResourceKind::Pod,
        &workload.identity.namespace,
        selector.clone(),
    )
    .await?;
    let mut pods: Vec<PodSummary> = items
        .iter()
        .filter(|pod| {
            let labels = pod.metadata.labels.clone().unwrap_or_default();
            selector.matches(&labels) && workload.owns_pod(pod)
        })
        .map(PodSummary::from)
        .collect();
    pods.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(pods)
}

/// Namespace events about the workload itself or about any pod. Pod events are narrowed to
/// the workload's own pods by [`correlate_events`] once the pods section has resolved.
pub async fn candidate_events(
    client: &Arc<dyn ClusterClient>,
    cache: &ResponseCache,
    workload: &Workload,
) -> Result<Vec<EventSummary>, ClusterError> {
    let items = cached_list(
        client,
        cache,
        ResourceKind::Event,
        &workload.identity.namespace,
        Selector::Everything,
    )
    .await?;
    Ok(items
        .iter()
        .map(EventSummary::from)
        .filter(|event| {
            workload.is_involved(&event.involved_object)
                || event.involved_object.kind == ResourceKind::Pod.api_kind()
        })
        .collect())
}

/// Keeps events about the workload and its matched pods, newest first. Without a pod list
/// only events about the workload itself remain.
pub fn correlate_events(
    events: Vec<EventSummary>,
    workload: &Workload,
    pods: Option<&[PodSummary]>,
) -> Vec<EventSummary> {
    let pod_names: HashSet<&str> = pods
        .unwrap_or_default()
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    let mut matched: Vec<EventSummary> = events
        .into_iter()
        .filter(|event| {
            let object = &event.involved_object;
            workload.is_involved(object)
                || (object.kind == ResourceKind::Pod.api_kind()
                    && pod_names.contains(object.name.as_str()))
        })
        .collect();
    matched.sort_by(|a, b| {
        b.last_seen
            .cmp(&a.last_seen)
            .then_with(|| a.name.cmp(&b.name))
    });
    matched
}

/// Services whose selector targets the workload's pod template, sorted by name.
pub async fn related_services(
    client: &Arc<dyn ClusterClient>,
    cache: &ResponseCache,
    workload: &Workload,
) -> Result<Vec<ServiceSummary>, ClusterError> {
    let items = cached_list(
        client,
        cache,
        ResourceKind::Service,
        &workload.identity.namespace,
        Selector::Everything,
    )
    .await?;
    let mut services: Vec<ServiceSummary> = items
        .iter()
        .map(ServiceSummary::from)
        .filter(|service| workload.is_targeted_by(&service.selector))
        .collect();
    services.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(services)
}
