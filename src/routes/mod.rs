// HTTP routes: resource detail and child-list endpoints under /api/v1

mod api;
mod http;

use axum::{Router, routing::get};
use std::sync::Arc;
use tokio::time::Instant;
use tower_http::cors::{Any, CorsLayer};

pub use api::ApiError;

use crate::aggregator::DetailAggregator;
use crate::config::AppConfig;
use crate::locator::ResourceLocator;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) aggregator: Arc<DetailAggregator>,
    pub(crate) locator: Arc<ResourceLocator>,
    pub(crate) config: AppConfig,
}

impl AppState {
    /// Deadline for one request, from an optional caller-supplied timeout.
    pub(crate) fn deadline(&self, requested_ms: Option<u64>) -> Instant {
        Instant::now() + self.config.aggregation.request_budget(requested_ms)
    }
}

pub fn app(
    aggregator: Arc<DetailAggregator>,
    locator: Arc<ResourceLocator>,
    config: AppConfig,
) -> Router {
    let state = AppState {
        aggregator,
        locator,
        config,
    };
    Router::new()
        .route("/healthz", get(http::healthz_handler)) // GET /healthz
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/v1/{kind}/{namespace}/{name}", get(api::detail_handler))
        .route(
            "/api/v1/{kind}/{namespace}/{name}/{child}",
            get(api::related_handler),
        )
        .fallback(api::fallback_handler)
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
