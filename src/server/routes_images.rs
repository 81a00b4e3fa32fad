//! Satellite image fetch and lookup routes.
//!
//! `/download_image` fetches a fresh snapshot and answers with the relative
//! lookup path; `/show_image/{timestamp}` turns that path into a download URL.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use satsnap_common::Error;

use super::{AppContext, AppError};
use crate::images::{show_image_path, StoredImage};

/// Mount point of the stored PNG files.
pub const STATIC_IMAGES_PREFIX: &str = "/static/images";

const NOT_FOUND_MESSAGE: &str = "Image not found for the specified timestamp";

/// Create image-related routes.
pub fn image_routes() -> Router<AppContext> {
    Router::new()
        .route("/download_image", get(download_image))
        .route("/show_image/:timestamp", get(show_image))
}

// ============================================================================
// Handlers
// ============================================================================

/// Fetch the latest image for the configured area and store it.
///
/// Responds with the plain-text path `/show_image/<timestamp>`.
async fn download_image(State(ctx): State<AppContext>) -> Result<String, AppError> {
    let stored = ctx.images.fetch_and_save().await?;
    Ok(show_image_path(stored.timestamp))
}

/// Resolve a timestamp to a public download URL.
async fn show_image(
    State(ctx): State<AppContext>,
    Path(timestamp): Path<i64>,
    headers: HeaderMap,
) -> impl IntoResponse {
    match ctx.images.lookup(timestamp) {
        Ok(stored) => {
            let url = download_url(&ctx, &headers, &stored);
            Json(serde_json::json!({ "download_url": url })).into_response()
        }
        Err(Error::NotFound { .. }) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": NOT_FOUND_MESSAGE })),
        )
            .into_response(),
        Err(e) => AppError(e).into_response(),
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Build an absolute URL for a stored image.
///
/// Uses `server.public_url` when configured, otherwise the request's `Host`
/// header (and `X-Forwarded-Proto` when a proxy supplies it).
fn download_url(ctx: &AppContext, headers: &HeaderMap, stored: &StoredImage) -> String {
    let base = match ctx.config.server.public_url {
        Some(ref url) => url.trim_end_matches('/').to_string(),
        None => {
            let host = headers
                .get(header::HOST)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
                .unwrap_or_else(|| format!("{}:{}", ctx.config.server.host, ctx.config.server.port));
            let scheme = headers
                .get("x-forwarded-proto")
                .and_then(|v| v.to_str().ok())
                .filter(|s| *s == "http" || *s == "https")
                .unwrap_or("http");
            format!("{scheme}://{host}")
        }
    };
    format!("{base}{STATIC_IMAGES_PREFIX}/{}", stored.file_name)
}
