// GET handlers: version, healthz

use axum::response::IntoResponse;

use crate::version::{NAME, VERSION};

/// GET /version: service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /healthz: liveness only, never touches the cluster.
pub(super) async fn healthz_handler() -> &'static str {
    "ok"
}
