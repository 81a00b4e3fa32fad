//! Image service coordinating the imagery provider with local storage.
//!
//! Provides the fetch-and-save operation behind `/download_image` and the
//! timestamp lookup behind `/show_image/{timestamp}`.

use std::sync::Arc;

use chrono::Utc;
use satsnap_common::{Error, Result};

use super::storage::{ImageSource, ImageStore, StoredImage};
use crate::imagery::{ImageryProvider, ImageryRequest};

/// High-level image service that coordinates the imagery provider with disk storage.
pub struct ImageService {
    provider: Arc<dyn ImageryProvider>,
    store: Arc<ImageStore>,
    request: ImageryRequest,
}

impl ImageService {
    /// Create a new `ImageService`.
    ///
    /// # Arguments
    ///
    /// * `provider` - The imagery backend to fetch from
    /// * `store` - The filesystem image store
    /// * `request` - The fixed area/layer every fetch renders
    pub fn new(
        provider: Arc<dyn ImageryProvider>,
        store: Arc<ImageStore>,
        request: ImageryRequest,
    ) -> Self {
        Self {
            provider,
            store,
            request,
        }
    }

    pub fn store(&self) -> &ImageStore {
        &self.store
    }

    pub fn request(&self) -> &ImageryRequest {
        &self.request
    }

    /// Fetch the latest acquisition and save it as a new PNG.
    ///
    /// Either exactly one new image is stored or an error is returned. The
    /// image is keyed by the wall-clock second at save time, not by the
    /// provider's acquisition date.
    pub async fn fetch_and_save(&self) -> Result<StoredImage> {
        let acquisition = self.provider.fetch_latest(&self.request).await?;

        let (width, height) = (acquisition.raster.width(), acquisition.raster.height());
        if (width, height) != (self.request.width, self.request.height) {
            tracing::warn!(
                expected_width = self.request.width,
                expected_height = self.request.height,
                width,
                height,
                "Provider raster size differs from request"
            );
        }

        let source = ImageSource {
            acquired: Some(acquisition.acquired),
            provider: self.provider.name().to_string(),
            data_collection: self.request.data_collection,
            layer: self.request.layer.clone(),
        };

        let store = Arc::clone(&self.store);
        let now = Utc::now().timestamp();
        let stored = tokio::task::spawn_blocking(move || {
            store.save(&acquisition.raster, &source, now)
        })
        .await
        .map_err(|e| Error::internal(format!("image save task failed: {e}")))??;

        tracing::info!("Image saved to {}", stored.path.display());

        Ok(stored)
    }

    /// Look up the image saved under exactly `timestamp`.
    pub fn lookup(&self, timestamp: i64) -> Result<StoredImage> {
        self.store
            .lookup(timestamp)
            .ok_or_else(|| Error::not_found("image", timestamp))
    }
}

/// Relative lookup path returned to clients after a save.
pub fn show_image_path(timestamp: i64) -> String {
    format!("/show_image/{timestamp}")
}
