//! Chat-plugin descriptor routes.
//!
//! Serves the plugin manifest and the API schema byte-for-byte from disk.

use std::path::Path;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use super::{AppContext, AppError};

pub fn plugin_routes() -> Router<AppContext> {
    Router::new()
        .route("/.well-known/ai-plugin.json", get(serve_manifest))
        .route("/openapi.yaml", get(serve_openapi))
}

async fn serve_manifest(State(ctx): State<AppContext>) -> Response {
    serve_descriptor(&ctx.config.plugin.manifest_path, "application/json").await
}

async fn serve_openapi(State(ctx): State<AppContext>) -> Response {
    serve_descriptor(&ctx.config.plugin.openapi_path, "text/yaml").await
}

async fn serve_descriptor(path: &Path, content_type: &'static str) -> Response {
    match tokio::fs::read(path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, content_type)], bytes).into_response(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("Plugin descriptor missing: {:?}", path);
            (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({"error": "File not found"})),
            )
                .into_response()
        }
        Err(e) => AppError(e.into()).into_response(),
    }
}
