// Detail aggregator tests against the in-memory cluster

mod common;

use common::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use workload_detail::aggregator::{DetailAggregator, Section};
use workload_detail::cache::{FetchKey, ResponseCache};
use workload_detail::cluster::{LabelSelector, Selector};
use workload_detail::error::{ClusterError, ErrorKind};
use workload_detail::models::{
    PodCount, ResourceIdentity, ResourceKind, ResponseStatus, Summary,
};

const SECTION_BUDGET: Duration = Duration::from_secs(5);

fn aggregator(cluster: Arc<FakeCluster>) -> DetailAggregator {
    DetailAggregator::new(cluster, SECTION_BUDGET)
}

fn nginx_rc() -> ResourceIdentity {
    ResourceIdentity::new(ResourceKind::ReplicationController, "default", "nginx-rc").unwrap()
}

fn deadline() -> Instant {
    Instant::now() + Duration::from_secs(60)
}

fn names(items: &[Summary]) -> Vec<String> {
    items
        .iter()
        .map(|item| match item {
            Summary::Event(e) => e.name.clone(),
            Summary::Pod(p) => p.name.clone(),
            Summary::Service(s) => s.name.clone(),
        })
        .collect()
}

#[tokio::test]
async fn rc_with_three_running_pods_and_no_events() {
    let cluster = Arc::new(
        FakeCluster::new()
            .with_object(
                ResourceKind::ReplicationController,
                replication_controller("default", "nginx-rc", 3),
            )
            .with_object(ResourceKind::Pod, pod("default", "nginx-rc-a", "nginx-rc", "Running"))
            .with_object(ResourceKind::Pod, pod("default", "nginx-rc-b", "nginx-rc", "Running"))
            .with_object(ResourceKind::Pod, pod("default", "nginx-rc-c", "nginx-rc", "Running")),
    );
    let record = aggregator(cluster)
        .aggregate(&nginx_rc(), deadline())
        .await
        .expect("aggregate");

    assert_eq!(record.derived_replica_count.desired, Some(3));
    assert_eq!(record.derived_replica_count.running, PodCount::Known(3));
    assert_eq!(
        record.section(ResourceKind::Event).unwrap().items(),
        Some(&[][..])
    );
    assert_eq!(record.response_status(), ResponseStatus::Ok);
    assert!(record.errors.is_empty());
}

#[tokio::test]
async fn record_carries_primary_fields() {
    let record = aggregator(Arc::new(nginx_cluster()))
        .aggregate(&nginx_rc(), deadline())
        .await
        .unwrap();

    assert_eq!(record.identity, nginx_rc());
    assert_eq!(record.object_meta.name, "nginx-rc");
    assert_eq!(record.object_meta.uid.as_deref(), Some(RC_UID));
    assert_eq!(
        record.object_meta.creation_timestamp.as_deref(),
        Some("2024-05-01T10:00:00Z")
    );
    assert_eq!(record.type_meta.kind, "ReplicationController");
    assert_eq!(record.selector, "app=nginx-rc");
    assert_eq!(record.container_images, vec!["nginx:1.25".to_string()]);
    assert_eq!(record.init_container_images, vec!["busybox:1.36".to_string()]);
    assert_eq!(record.spec["replicas"], json!(3));
    assert_eq!(record.status["replicas"], json!(3));

    let info = record.pod_info.expect("pod info");
    assert_eq!(info.current, 3);
    assert_eq!(info.desired, Some(3));
    assert_eq!(info.running, 3);
    assert_eq!(info.pending, 0);
}

#[tokio::test]
async fn sections_come_in_fixed_order() {
    let record = aggregator(Arc::new(nginx_cluster()))
        .aggregate(&nginx_rc(), deadline())
        .await
        .unwrap();
    let kinds: Vec<_> = record.related.iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        vec![ResourceKind::Event, ResourceKind::Pod, ResourceKind::Service]
    );
}

#[tokio::test]
async fn related_sections_are_filtered_and_sorted() {
    let record = aggregator(Arc::new(nginx_cluster()))
        .aggregate(&nginx_rc(), deadline())
        .await
        .unwrap();

    let events = record.section(ResourceKind::Event).unwrap().items().unwrap();
    assert_eq!(names(events), vec!["nginx-rc-a.1", "nginx-rc.1"]);

    let pods = record.section(ResourceKind::Pod).unwrap().items().unwrap();
    assert_eq!(names(pods), vec!["nginx-rc-a", "nginx-rc-b", "nginx-rc-c"]);

    let services = record.section(ResourceKind::Service).unwrap().items().unwrap();
    assert_eq!(names(services), vec!["nginx"]);
}

#[tokio::test(start_paused = true)]
async fn sections_keep_fixed_order_when_completing_out_of_order() {
    let cluster = Arc::new(
        nginx_cluster()
            .delayed_list(ResourceKind::Event, Duration::from_secs(3))
            .delayed_list(ResourceKind::Pod, Duration::from_secs(1)),
    );
    let record = aggregator(cluster)
        .aggregate(&nginx_rc(), deadline())
        .await
        .unwrap();

    let kinds: Vec<_> = record.related.iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        vec![ResourceKind::Event, ResourceKind::Pod, ResourceKind::Service]
    );
    assert!(record.errors.is_empty());
    let events = record.section(ResourceKind::Event).unwrap().items().unwrap();
    assert_eq!(names(events), vec!["nginx-rc-a.1", "nginx-rc.1"]);
}

#[tokio::test]
async fn each_upstream_list_is_fetched_once() {
    let cluster = Arc::new(nginx_cluster());
    aggregator(cluster.clone())
        .aggregate(&nginx_rc(), deadline())
        .await
        .unwrap();

    assert_eq!(cluster.get_calls(), 1);
    assert_eq!(cluster.list_calls(ResourceKind::Pod), 1);
    assert_eq!(cluster.list_calls(ResourceKind::Event), 1);
    assert_eq!(cluster.list_calls(ResourceKind::Service), 1);
}

#[tokio::test]
async fn missing_primary_is_not_found_without_related_fetches() {
    let cluster = Arc::new(FakeCluster::new());
    let err = aggregator(cluster.clone())
        .aggregate(&nginx_rc(), deadline())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(cluster.total_list_calls(), 0);
}

#[tokio::test]
async fn permission_denied_on_primary_is_fatal() {
    let cluster = Arc::new(
        nginx_cluster().failing_get(ClusterError::PermissionDenied("forbidden".into())),
    );
    let err = aggregator(cluster.clone())
        .aggregate(&nginx_rc(), deadline())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    assert_eq!(cluster.total_list_calls(), 0);
}

#[tokio::test]
async fn failed_pod_list_yields_partial_record() {
    let cluster = Arc::new(nginx_cluster().failing_list(
        ResourceKind::Pod,
        ClusterError::UpstreamUnavailable("connection reset".into()),
    ));
    let record = aggregator(cluster)
        .aggregate(&nginx_rc(), deadline())
        .await
        .expect("partial record");

    assert_eq!(record.response_status(), ResponseStatus::Partial);
    let pods = record.section(ResourceKind::Pod).unwrap();
    let error = pods.error().expect("pods unavailable");
    assert_eq!(error.kind, ErrorKind::UpstreamUnavailable);
    assert!(!error.timed_out);
    assert_eq!(record.errors, vec![error.clone()]);

    // Without pods only the workload's own events remain.
    let events = record.section(ResourceKind::Event).unwrap().items().unwrap();
    assert_eq!(names(events), vec!["nginx-rc.1"]);
    let services = record.section(ResourceKind::Service).unwrap().items().unwrap();
    assert_eq!(names(services), vec!["nginx"]);

    assert_eq!(record.derived_replica_count.desired, Some(3));
    assert_eq!(record.derived_replica_count.running, PodCount::Unknown);
    assert!(record.pod_info.is_none());
}

#[tokio::test]
async fn permission_denied_on_section_is_downgraded() {
    let cluster = Arc::new(nginx_cluster().failing_list(
        ResourceKind::Service,
        ClusterError::PermissionDenied("services is forbidden".into()),
    ));
    let record = aggregator(cluster)
        .aggregate(&nginx_rc(), deadline())
        .await
        .unwrap();

    assert_eq!(record.response_status(), ResponseStatus::Partial);
    assert_eq!(record.errors.len(), 1);
    assert_eq!(record.errors[0].section, ResourceKind::Service);
    assert_eq!(record.errors[0].kind, ErrorKind::PermissionDenied);
    assert!(record.section(ResourceKind::Pod).unwrap().items().is_some());
}

#[tokio::test(start_paused = true)]
async fn slow_section_times_out_without_blocking_others() {
    let cluster = Arc::new(nginx_cluster().delayed_list(ResourceKind::Pod, Duration::from_secs(30)));
    let started = Instant::now();
    let record = aggregator(cluster)
        .aggregate(&nginx_rc(), started + Duration::from_secs(60))
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(30));
    let error = record
        .section(ResourceKind::Pod)
        .unwrap()
        .error()
        .expect("pods timed out");
    assert!(error.timed_out);
    assert_eq!(error.kind, ErrorKind::UpstreamUnavailable);
    assert!(record.section(ResourceKind::Event).unwrap().items().is_some());
    assert!(record.section(ResourceKind::Service).unwrap().items().is_some());
}

#[tokio::test(start_paused = true)]
async fn request_deadline_caps_section_budget() {
    let cluster = Arc::new(nginx_cluster().delayed_list(ResourceKind::Service, Duration::from_secs(3)));
    let started = Instant::now();
    let record = aggregator(cluster)
        .aggregate(&nginx_rc(), started + Duration::from_secs(1))
        .await
        .unwrap();

    assert!(started.elapsed() <= Duration::from_secs(1));
    let error = record.section(ResourceKind::Service).unwrap().error().unwrap();
    assert!(error.timed_out);
    assert_eq!(record.errors.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn primary_timeout_is_fatal() {
    let cluster = Arc::new(nginx_cluster().delayed_get(Duration::from_secs(10)));
    let err = aggregator(cluster.clone())
        .aggregate(&nginx_rc(), Instant::now() + Duration::from_secs(2))
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);
    assert_eq!(cluster.total_list_calls(), 0);
}

#[tokio::test]
async fn rc_ignores_pods_controlled_by_other_objects() {
    let cluster = Arc::new(
        nginx_cluster().with_object(ResourceKind::Pod, foreign_pod("default", "stray", "nginx-rc")),
    );
    let record = aggregator(cluster)
        .aggregate(&nginx_rc(), deadline())
        .await
        .unwrap();

    let pods = record.section(ResourceKind::Pod).unwrap().items().unwrap();
    assert_eq!(names(pods), vec!["nginx-rc-a", "nginx-rc-b", "nginx-rc-c"]);
}

#[tokio::test]
async fn deployment_matches_set_based_selector() {
    let cluster = Arc::new(
        FakeCluster::new()
            .with_object(ResourceKind::Deployment, deployment("default", "web", 2))
            .with_object(
                ResourceKind::Pod,
                labelled_pod("default", "web-1", json!({ "app": "web", "tier": "web" }), "Running"),
            )
            .with_object(
                ResourceKind::Pod,
                labelled_pod("default", "web-2", json!({ "app": "web", "tier": "web" }), "Pending"),
            )
            .with_object(
                ResourceKind::Pod,
                labelled_pod("default", "web-db", json!({ "app": "web", "tier": "db" }), "Running"),
            ),
    );
    let identity = ResourceIdentity::new(ResourceKind::Deployment, "default", "web").unwrap();
    let record = aggregator(cluster)
        .aggregate(&identity, deadline())
        .await
        .unwrap();

    assert_eq!(record.selector, "app=web,tier in (web)");
    let pods = record.section(ResourceKind::Pod).unwrap().items().unwrap();
    assert_eq!(names(pods), vec!["web-1", "web-2"]);
    let info = record.pod_info.unwrap();
    assert_eq!((info.running, info.pending), (1, 1));
    assert_eq!(record.derived_replica_count.running, PodCount::Known(1));
}

#[tokio::test]
async fn related_returns_single_section() {
    let agg = aggregator(Arc::new(nginx_cluster()));

    let pods = agg
        .related(&nginx_rc(), Section::Pods, deadline())
        .await
        .unwrap();
    assert_eq!(names(&pods), vec!["nginx-rc-a", "nginx-rc-b", "nginx-rc-c"]);

    let events = agg
        .related(&nginx_rc(), Section::Events, deadline())
        .await
        .unwrap();
    assert_eq!(names(&events), vec!["nginx-rc-a.1", "nginx-rc.1"]);
}

#[tokio::test]
async fn related_events_fail_when_pod_correlation_fails() {
    let cluster = Arc::new(nginx_cluster().failing_list(
        ResourceKind::Pod,
        ClusterError::PermissionDenied("pods is forbidden".into()),
    ));
    let err = aggregator(cluster)
        .related(&nginx_rc(), Section::Events, deadline())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
}

#[tokio::test]
async fn related_surfaces_section_failure() {
    let cluster = Arc::new(nginx_cluster().failing_list(
        ResourceKind::Service,
        ClusterError::UpstreamUnavailable("etcd timeout".into()),
    ));
    let err = aggregator(cluster)
        .related(&nginx_rc(), Section::Services, deadline())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);
}

async fn wait_for_in_flight(cache: &ResponseCache) {
    for _ in 0..100 {
        if cache.in_flight() > 0 {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("no fetch went in flight");
}

#[tokio::test]
async fn cancelled_aggregation_leaves_no_unfinished_entries() {
    let cluster = Arc::new(nginx_cluster().hanging_list(ResourceKind::Pod));
    let agg = Arc::new(aggregator(cluster));
    let cache = Arc::new(ResponseCache::new());

    let handle = tokio::spawn({
        let agg = agg.clone();
        let cache = cache.clone();
        async move {
            agg.aggregate_with_cache(&nginx_rc(), deadline(), &cache)
                .await
        }
    });
    wait_for_in_flight(&cache).await;
    handle.abort();
    assert!(handle.await.unwrap_err().is_cancelled());

    assert_eq!(cache.in_flight(), 0);
    let pod_key = FetchKey::new(
        ResourceKind::Pod,
        "default",
        &Selector::Labels(LabelSelector::from_labels(
            [("app".to_string(), "nginx-rc".to_string())].into(),
        )),
    );
    assert!(cache.entry(&pod_key).is_none());
    let service_key = FetchKey::new(ResourceKind::Service, "default", &Selector::Everything);
    assert!(cache.entry(&service_key).is_some());
}

#[tokio::test]
async fn cancelled_aggregation_with_all_lists_pending_empties_cache() {
    let cluster = Arc::new(
        nginx_cluster()
            .hanging_list(ResourceKind::Pod)
            .hanging_list(ResourceKind::Event)
            .hanging_list(ResourceKind::Service),
    );
    let agg = Arc::new(aggregator(cluster));
    let cache = Arc::new(ResponseCache::new());

    let handle = tokio::spawn({
        let agg = agg.clone();
        let cache = cache.clone();
        async move {
            agg.aggregate_with_cache(&nginx_rc(), deadline(), &cache)
                .await
        }
    });
    wait_for_in_flight(&cache).await;
    handle.abort();
    let _ = handle.await;

    assert!(cache.is_empty());
}
