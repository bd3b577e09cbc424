// Detail aggregator: primary fetch, then concurrent related fetches joined into one record.
// A related section that fails or overruns its budget is marked unavailable; the record is
// still returned as long as the primary object was found.

mod derived;
mod sections;

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, instrument, warn};

pub use derived::Workload;
pub use sections::Section;

use crate::cache::ResponseCache;
use crate::cluster::{ClusterClient, DynamicObject};
use crate::error::ClusterError;
use crate::models::{
    DetailRecord, ObjectMetaView, PodCount, RelatedSection, ReplicaCount, ResourceIdentity,
    Summary, TypeMeta,
};

pub struct DetailAggregator {
    client: Arc<dyn ClusterClient>,
    section_budget: Duration,
}

impl DetailAggregator {
    /// `section_budget` bounds each related fetch in addition to the caller's deadline.
    pub fn new(client: Arc<dyn ClusterClient>, section_budget: Duration) -> Self {
        Self {
            client,
            section_budget,
        }
    }

    /// Assembles the detail record for `identity`, with a fresh cache scoped to this call.
    pub async fn aggregate(
        &self,
        identity: &ResourceIdentity,
        deadline: Instant,
    ) -> Result<DetailRecord, ClusterError> {
        let cache = ResponseCache::new();
        self.aggregate_with_cache(identity, deadline, &cache).await
    }

    /// Same as [`DetailAggregator::aggregate`], with a caller-provided cache. The cache must not
    /// be shared with another aggregation.
    #[instrument(
        skip(self, cache),
        fields(kind = %identity.kind, namespace = %identity.namespace, name = %identity.name)
    )]
    pub async fn aggregate_with_cache(
        &self,
        identity: &ResourceIdentity,
        deadline: Instant,
        cache: &ResponseCache,
    ) -> Result<DetailRecord, ClusterError> {
        let primary = self.fetch_primary(identity, deadline).await?;
        let workload = Workload::from_object(identity, &primary);

        let (events, pods, services) = tokio::join!(
            self.bounded(
                Section::Events,
                deadline,
                sections::candidate_events(&self.client, cache, &workload)
            ),
            self.bounded(
                Section::Pods,
                deadline,
                sections::matched_pods(&self.client, cache, &workload)
            ),
            self.bounded(
                Section::Services,
                deadline,
                sections::related_services(&self.client, cache, &workload)
            ),
        );

        let events = events
            .map(|events| sections::correlate_events(events, &workload, pods.as_deref().ok()));
        let pod_info = pods
            .as_ref()
            .ok()
            .map(|pods| derived::pod_info(pods, workload.desired_replicas));
        let derived_replica_count = ReplicaCount {
            desired: workload.desired_replicas,
            running: pod_info
                .as_ref()
                .map_or(PodCount::Unknown, |info| PodCount::Known(info.running)),
        };

        let related = vec![
            into_section(Section::Events, events, Summary::Event),
            into_section(Section::Pods, pods, Summary::Pod),
            into_section(Section::Services, services, Summary::Service),
        ];
        let errors: Vec<_> = related.iter().filter_map(|s| s.error().cloned()).collect();
        debug!(
            unavailable_sections = errors.len(),
            cached_lists = cache.len(),
            "detail assembled"
        );

        Ok(DetailRecord {
            identity: identity.clone(),
            object_meta: ObjectMetaView::from(&primary.metadata),
            type_meta: TypeMeta {
                kind: identity.kind.api_kind().to_string(),
            },
            selector: workload.selector.to_query(),
            container_images: workload.container_images.clone(),
            init_container_images: workload.init_container_images.clone(),
            spec: primary.data.get("spec").cloned().unwrap_or_default(),
            status: primary.data.get("status").cloned().unwrap_or_default(),
            derived_replica_count,
            pod_info,
            related,
            errors,
        })
    }

    /// Fetches the primary object, then the single related section `section`. The event list
    /// also needs the pod list for correlation, and fails when that list does.
    #[instrument(
        skip(self),
        fields(kind = %identity.kind, namespace = %identity.namespace, name = %identity.name)
    )]
    pub async fn related(
        &self,
        identity: &ResourceIdentity,
        section: Section,
        deadline: Instant,
    ) -> Result<Vec<Summary>, ClusterError> {
        let primary = self.fetch_primary(identity, deadline).await?;
        let workload = Workload::from_object(identity, &primary);
        let cache = ResponseCache::new();
        let client = &self.client;
        let items = match section {
            Section::Events => {
                let (events, pods) = tokio::join!(
                    self.bounded(
                        section,
                        deadline,
                        sections::candidate_events(client, &cache, &workload)
                    ),
                    self.within_budget(
                        deadline,
                        sections::matched_pods(client, &cache, &workload)
                    ),
                );
                // A standalone event list has no section marker to carry a missing pod list.
                let pods = pods.inspect_err(|e| {
                    warn!(section = %section.kind(), error = %e, "pod correlation unavailable");
                })?;
                sections::correlate_events(events?, &workload, Some(pods.as_slice()))
                    .into_iter()
                    .map(Summary::Event)
                    .collect()
            }
            Section::Pods => self
                .bounded(section, deadline, sections::matched_pods(client, &cache, &workload))
                .await?
                .into_iter()
                .map(Summary::Pod)
                .collect(),
            Section::Services => self
                .bounded(section, deadline, sections::related_services(client, &cache, &workload))
                .await?
                .into_iter()
                .map(Summary::Service)
                .collect(),
        };
        Ok(items)
    }

    async fn fetch_primary(
        &self,
        identity: &ResourceIdentity,
        deadline: Instant,
    ) -> Result<DynamicObject, ClusterError> {
        let started = Instant::now();
        let fetch = self
            .client
            .get_object(identity.kind, &identity.namespace, &identity.name);
        match timeout_at(deadline, fetch).await {
            Ok(result) => result,
            Err(_) => Err(ClusterError::Timeout(
                deadline.saturating_duration_since(started),
            )),
        }
    }

    /// Runs one fetch within the earlier of the request deadline and the section budget.
    async fn within_budget<T>(
        &self,
        deadline: Instant,
        fetch: impl Future<Output = Result<T, ClusterError>>,
    ) -> Result<T, ClusterError> {
        let started = Instant::now();
        let budget_end = deadline.min(started + self.section_budget);
        match timeout_at(budget_end, fetch).await {
            Ok(result) => result,
            Err(_) => Err(ClusterError::Timeout(
                budget_end.saturating_duration_since(started),
            )),
        }
    }

    /// [`Self::within_budget`] for a related section, logging its failure.
    async fn bounded<T>(
        &self,
        section: Section,
        deadline: Instant,
        fetch: impl Future<Output = Result<T, ClusterError>>,
    ) -> Result<T, ClusterError> {
        let result = self.within_budget(deadline, fetch).await;
        if let Err(e) = &result {
            warn!(section = %section.kind(), error = %e, "related section unavailable");
        }
        result
    }
}

fn into_section<T>(
    section: Section,
    result: Result<Vec<T>, ClusterError>,
    wrap: fn(T) -> Summary,
) -> RelatedSection {
    match result {
        Ok(items) => RelatedSection::available(section.kind(), items.into_iter().map(wrap).collect()),
        Err(e) => RelatedSection::unavailable(section.kind(), &e),
    }
}
