// Resource endpoints: detail record and paginated child lists, plus the error mapping.

use axum::{
    Json,
    extract::{OriginalUri, Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::AppState;
use crate::aggregator::Section;
use crate::error::{ClusterError, ErrorKind, LocatorError};
use crate::models::{ApiResponse, DetailRecord, ListMeta, RelatedList, ResponseStatus, Summary};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Locator(#[from] LocatorError),

    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error("invalid query: {}", .0.body_text())]
    Query(#[from] QueryRejection),

    #[error("no endpoint for {0}")]
    NoRoute(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Locator(e) => e.kind(),
            ApiError::Cluster(e) => e.kind(),
            ApiError::Query(_) => ErrorKind::InvalidQuery,
            ApiError::NoRoute(_) => ErrorKind::NotFound,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::UnknownKind | ErrorKind::InvalidIdentity | ErrorKind::InvalidQuery => {
                StatusCode::BAD_REQUEST
            }
            ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
            ErrorKind::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            warn!(error = %self, status = status.as_u16(), "request failed");
        } else {
            debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        let body = ApiResponse::<()>::failure(self.kind(), self.to_string());
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct DetailQuery {
    timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ListQuery {
    timeout_ms: Option<u64>,
    /// Page size; absent or 0 returns every item.
    items_per_page: Option<usize>,
    /// 1-based page number.
    page: Option<usize>,
}

impl ListQuery {
    fn paginate(&self, items: Vec<Summary>) -> Vec<Summary> {
        match self.items_per_page {
            Some(per_page) if per_page > 0 => {
                let page = self.page.unwrap_or(1).max(1);
                items
                    .into_iter()
                    .skip((page - 1).saturating_mul(per_page))
                    .take(per_page)
                    .collect()
            }
            _ => items,
        }
    }
}

/// GET /api/v1/{kind}/{namespace}/{name}
pub(super) async fn detail_handler(
    State(state): State<AppState>,
    Path((kind, namespace, name)): Path<(String, String, String)>,
    query: Result<Query<DetailQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<DetailRecord>>, ApiError> {
    let Query(query) = query?;
    let endpoint = state.locator.describe(&kind, &namespace, &name, None)?;
    let deadline = state.deadline(query.timeout_ms);
    let record = state
        .aggregator
        .aggregate(&endpoint.identity, deadline)
        .await?;
    let response = ApiResponse::from(record);
    info!(
        endpoint = %endpoint.path(),
        status = ?response.status,
        "detail served"
    );
    Ok(Json(response))
}

/// GET /api/v1/{kind}/{namespace}/{name}/{child}
pub(super) async fn related_handler(
    State(state): State<AppState>,
    Path((kind, namespace, name, child)): Path<(String, String, String, String)>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<RelatedList>>, ApiError> {
    let Query(query) = query?;
    let endpoint = state
        .locator
        .describe(&kind, &namespace, &name, Some(&child))?;
    let child_kind = endpoint
        .child
        .ok_or_else(|| LocatorError::UnmatchedPath(endpoint.path()))?;
    let section = Section::from_kind(child_kind).ok_or_else(|| LocatorError::UnknownChildKind {
        parent: kind.clone(),
        child: child.clone(),
    })?;
    let deadline = state.deadline(query.timeout_ms);
    let items = state
        .aggregator
        .related(&endpoint.identity, section, deadline)
        .await?;
    let total_items = items.len();
    let items = query.paginate(items);
    info!(
        endpoint = %endpoint.path(),
        total_items,
        returned = items.len(),
        "related list served"
    );
    Ok(Json(ApiResponse::with_status(
        ResponseStatus::Ok,
        RelatedList {
            kind: child_kind,
            list_meta: ListMeta { total_items },
            items,
        },
    )))
}

pub(super) async fn fallback_handler(OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::NoRoute(uri.path().to_string())
}
