//! Trait definition and types for imagery providers.
//!
//! An [`ImageryProvider`] turns an [`ImageryRequest`] (area, dataset, layer and
//! raster size) into the most recent [`Acquisition`] the provider holds.

use async_trait::async_trait;
use chrono::NaiveDate;
use image::DynamicImage;
use satsnap_common::{BoundingBox, DataCollection, Result};

use crate::config::ImageryConfig;

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Everything needed to render one snapshot of an area.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageryRequest {
    pub data_collection: DataCollection,
    /// Provider-side layer (band composite) name.
    pub layer: String,
    pub bbox: BoundingBox,
    /// Requested raster width in pixels.
    pub width: u32,
    /// Requested raster height in pixels.
    pub height: u32,
    /// Number of days before "now" searched for acquisitions.
    pub lookback_days: u32,
    /// Maximum cloud coverage fraction (0.0 - 1.0).
    pub max_cloud_coverage: f64,
}

impl From<&ImageryConfig> for ImageryRequest {
    fn from(config: &ImageryConfig) -> Self {
        Self {
            data_collection: config.data_collection,
            layer: config.layer.clone(),
            bbox: config.bbox,
            width: config.width,
            height: config.height,
            lookback_days: config.lookback_days,
            max_cloud_coverage: config.max_cloud_coverage,
        }
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// A single rendered acquisition.
#[derive(Debug, Clone)]
pub struct Acquisition {
    /// Date the satellite captured the scene.
    pub acquired: NaiveDate,
    /// Decoded raster pixel data.
    pub raster: DynamicImage,
}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// Async trait that all imagery providers must implement.
///
/// Implementations issue a single attempt against the remote service; any
/// failure (transport, HTTP status, empty catalogue, undecodable raster) is
/// returned as an error and nothing is retried.
#[async_trait]
pub trait ImageryProvider: Send + Sync {
    /// Short, lowercase identifier for this provider (e.g. `"sentinel-hub"`).
    fn name(&self) -> &'static str;

    /// Fetch the most recent acquisition covering `request.bbox`.
    async fn fetch_latest(&self, request: &ImageryRequest) -> Result<Acquisition>;
}
