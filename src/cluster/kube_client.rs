// Cluster access through kube-rs: dynamic get/list by kind with paginated, lazily-fetched lists.

use anyhow::Context;
use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt, stream};
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{Event, Pod, ReplicationController, Service};
use kube::api::{ApiResource, DynamicObject, ListParams};
use kube::config::KubeConfigOptions;
use kube::{Api, Client, Config};
use std::time::Duration;
use tracing::{debug, info, instrument};

use super::{ClusterClient, ObjectStream, Selector};
use crate::config::ClusterConfig;
use crate::error::ClusterError;
use crate::models::ResourceKind;

pub struct KubeClusterClient {
    client: Client,
    page_size: u32,
}

impl KubeClusterClient {
    /// Builds a client from the configured kubeconfig context, or the inferred config
    /// (in-cluster service account, then the current kubeconfig context).
    pub async fn connect(config: &ClusterConfig) -> anyhow::Result<Self> {
        let mut kube_config = match config.context.as_deref() {
            Some(context) => {
                let options = KubeConfigOptions {
                    context: Some(context.to_string()),
                    ..Default::default()
                };
                Config::from_kubeconfig(&options)
                    .await
                    .with_context(|| format!("loading kubeconfig context '{}'", context))?
            }
            None => Config::infer().await.context("inferring cluster config")?,
        };
        kube_config.connect_timeout = Some(Duration::from_millis(config.connect_timeout_ms));
        kube_config.read_timeout = Some(Duration::from_millis(config.read_timeout_ms));

        let cluster_url = kube_config.cluster_url.to_string();
        let client = Client::try_from(kube_config).context("building cluster client")?;
        info!(
            cluster_url = %cluster_url,
            context = config.context.as_deref().unwrap_or("<inferred>"),
            "Cluster client ready"
        );
        Ok(Self::new(client, config.page_size))
    }

    pub fn new(client: Client, page_size: u32) -> Self {
        Self { client, page_size }
    }

    fn api(&self, kind: ResourceKind, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, &api_resource(kind))
    }
}

fn api_resource(kind: ResourceKind) -> ApiResource {
    match kind {
        ResourceKind::ReplicationController => ApiResource::erase::<ReplicationController>(&()),
        ResourceKind::ReplicaSet => ApiResource::erase::<ReplicaSet>(&()),
        ResourceKind::Deployment => ApiResource::erase::<Deployment>(&()),
        ResourceKind::StatefulSet => ApiResource::erase::<StatefulSet>(&()),
        ResourceKind::DaemonSet => ApiResource::erase::<DaemonSet>(&()),
        ResourceKind::Job => ApiResource::erase::<Job>(&()),
        ResourceKind::Event => ApiResource::erase::<Event>(&()),
        ResourceKind::Pod => ApiResource::erase::<Pod>(&()),
        ResourceKind::Service => ApiResource::erase::<Service>(&()),
    }
}

/// Maps a kube error onto the adapter taxonomy. 404 is handled by the caller, which knows the identity.
fn classify(err: kube::Error) -> ClusterError {
    match err {
        kube::Error::Api(ae) if ae.code == 401 || ae.code == 403 => {
            ClusterError::PermissionDenied(ae.message)
        }
        kube::Error::Api(ae) => {
            ClusterError::UpstreamUnavailable(format!("{} (HTTP {})", ae.message, ae.code))
        }
        other => ClusterError::UpstreamUnavailable(other.to_string()),
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    #[instrument(skip(self), fields(client = "kube", operation = "get_object"))]
    async fn get_object(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<DynamicObject, ClusterError> {
        match self.api(kind, namespace).get(name).await {
            Ok(obj) => Ok(obj),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Err(ClusterError::NotFound {
                kind,
                namespace: namespace.to_string(),
                name: name.to_string(),
            }),
            Err(e) => Err(classify(e)),
        }
    }

    fn list_related(
        &self,
        kind: ResourceKind,
        namespace: &str,
        selector: &Selector,
    ) -> ObjectStream {
        let api = self.api(kind, namespace);
        let labels = selector.to_query();
        let page_size = self.page_size;
        let namespace = namespace.to_string();

        // Cursor: Some(None) = first page, Some(Some(token)) = next page, None = done.
        stream::try_unfold(Some(None::<String>), move |cursor| {
            let api = api.clone();
            let labels = labels.clone();
            let namespace = namespace.clone();
            async move {
                let Some(token) = cursor else {
                    return Ok::<_, ClusterError>(None);
                };
                let mut params = ListParams::default().limit(page_size);
                if !labels.is_empty() {
                    params = params.labels(&labels);
                }
                if let Some(token) = token.as_deref() {
                    params = params.continue_token(token);
                }
                let page = api.list(&params).await.map_err(classify)?;
                debug!(
                    kind = %kind,
                    namespace = %namespace,
                    selector = %labels,
                    items = page.items.len(),
                    "listed page"
                );
                let next = page.metadata.continue_.filter(|t| !t.is_empty()).map(Some);
                Ok(Some((page.items, next)))
            }
        })
        .map_ok(|items| stream::iter(items.into_iter().map(Ok::<_, ClusterError>)))
        .try_flatten()
        .boxed()
    }
}
