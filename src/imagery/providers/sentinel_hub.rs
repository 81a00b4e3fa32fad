//! Sentinel Hub imagery provider.
//!
//! Implements [`ImageryProvider`] on top of the Sentinel Hub OGC services.
//!
//! Resolving "the latest" image takes two requests:
//! - a WFS `GetFeature` query lists acquisition tiles intersecting the box
//!   within the look-back window, and the most recent date is picked;
//! - a WMS `GetMap` request renders the configured layer for that date as PNG.
//!
//! Each request is bounded by the configured timeout and never retried.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::header::CONTENT_TYPE;
use satsnap_common::{Error, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::ImageryConfig;
use crate::imagery::provider::{Acquisition, ImageryProvider, ImageryRequest};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const PROVIDER_NAME: &str = "sentinel-hub";
const WMS_VERSION: &str = "1.3.0";
const WFS_VERSION: &str = "2.0.0";
/// Page size of the WFS tile catalogue.
const WFS_PAGE_SIZE: usize = 100;
/// Upper bound on catalogue pages walked per search.
const WFS_MAX_PAGES: usize = 10;
const ERROR_BODY_PREVIEW: usize = 256;

// ---------------------------------------------------------------------------
// WFS response types (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct WfsFeatureCollection {
    #[serde(default)]
    features: Vec<WfsFeature>,
}

#[derive(Debug, Deserialize)]
struct WfsFeature {
    properties: WfsProperties,
}

#[derive(Debug, Deserialize)]
struct WfsProperties {
    date: String,
    #[serde(rename = "cloudCoverPercentage", default)]
    cloud_cover_percentage: Option<f64>,
}

// ---------------------------------------------------------------------------
// Provider implementation
// ---------------------------------------------------------------------------

/// Sentinel Hub imagery provider.
///
/// # Examples
///
/// ```no_run
/// use satsnap::imagery::SentinelHubProvider;
/// use std::time::Duration;
///
/// let provider = SentinelHubProvider::new(
///     "https://services.sentinel-hub.com",
///     Some("your-instance-id".into()),
///     Duration::from_secs(60),
/// );
/// ```
pub struct SentinelHubProvider {
    client: reqwest::Client,
    base_url: String,
    instance_id: Option<String>,
}

impl SentinelHubProvider {
    /// Create a provider against `base_url` using the given configuration instance.
    pub fn new(base_url: &str, instance_id: Option<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {}", e);
                reqwest::Client::new()
            });

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            instance_id: instance_id.filter(|id| !id.trim().is_empty()),
        }
    }

    /// Create a provider from the `[imagery]` configuration section.
    pub fn from_config(config: &ImageryConfig) -> Self {
        Self::new(&config.base_url, config.instance_id.clone(), config.timeout())
    }

    fn instance_id(&self) -> Result<&str> {
        self.instance_id.as_deref().ok_or_else(|| {
            Error::internal("Sentinel Hub instance id is not configured")
        })
    }

    fn service_url(&self, service: &str) -> Result<String> {
        Ok(format!(
            "{}/ogc/{}/{}",
            self.base_url,
            service,
            self.instance_id()?
        ))
    }

    /// Execute a GET request, mapping transport and HTTP failures to upstream errors.
    async fn get(&self, url: &str, params: &[(&str, String)]) -> Result<reqwest::Response> {
        let resp = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| Error::upstream(PROVIDER_NAME, format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::upstream(
                PROVIDER_NAME,
                format!("service returned {status}: {}", preview(&body)),
            ));
        }

        Ok(resp)
    }

    /// List acquisition dates covering the request area in `(end - lookback, end]`,
    /// sorted ascending with duplicates removed.
    pub async fn search_dates(
        &self,
        request: &ImageryRequest,
        end: DateTime<Utc>,
    ) -> Result<Vec<NaiveDate>> {
        let url = self.service_url("wfs")?;
        let start = end - chrono::Duration::days(i64::from(request.lookback_days));
        let time = format!(
            "{}/{}",
            start.format("%Y-%m-%dT%H:%M:%SZ"),
            end.format("%Y-%m-%dT%H:%M:%SZ")
        );

        let mut features = Vec::new();
        for page in 0..WFS_MAX_PAGES {
            let params = [
                ("SERVICE", "WFS".to_string()),
                ("VERSION", WFS_VERSION.to_string()),
                ("REQUEST", "GetFeature".to_string()),
                ("TYPENAMES", request.data_collection.wfs_type_name().to_string()),
                ("BBOX", request.bbox.to_ogc_param()),
                ("SRSNAME", request.bbox.crs().epsg_code().to_string()),
                ("TIME", time.clone()),
                ("MAXFEATURES", WFS_PAGE_SIZE.to_string()),
                ("FEATURE_OFFSET", (page * WFS_PAGE_SIZE).to_string()),
                ("OUTPUTFORMAT", "application/json".to_string()),
            ];
            debug!(page, time = %time, "Sentinel Hub WFS search");

            let body: WfsFeatureCollection = self
                .get(&url, &params)
                .await?
                .json()
                .await
                .map_err(|e| {
                    Error::upstream(PROVIDER_NAME, format!("invalid WFS response: {e}"))
                })?;

            let page_len = body.features.len();
            features.extend(body.features);
            if page_len < WFS_PAGE_SIZE {
                break;
            }
        }

        Ok(acquisition_dates(
            &features,
            request
                .data_collection
                .has_cloud_cover()
                .then_some(request.max_cloud_coverage),
        ))
    }

    /// Render the request's layer for a single acquisition date.
    pub async fn get_map(
        &self,
        request: &ImageryRequest,
        date: NaiveDate,
    ) -> Result<image::DynamicImage> {
        let url = self.service_url("wms")?;
        let day = date.format("%Y-%m-%d").to_string();
        let params = [
            ("SERVICE", "WMS".to_string()),
            ("VERSION", WMS_VERSION.to_string()),
            ("REQUEST", "GetMap".to_string()),
            ("LAYERS", request.layer.clone()),
            ("BBOX", request.bbox.to_ogc_param()),
            ("CRS", request.bbox.crs().epsg_code().to_string()),
            ("WIDTH", request.width.to_string()),
            ("HEIGHT", request.height.to_string()),
            ("FORMAT", "image/png".to_string()),
            ("TIME", format!("{day}/{day}")),
            ("MAXCC", format!("{}", request.max_cloud_coverage * 100.0)),
            ("SHOWLOGO", "false".to_string()),
            ("TRANSPARENT", "false".to_string()),
        ];
        debug!(layer = %request.layer, date = %day, "Sentinel Hub WMS GetMap");

        let resp = self.get(&url, &params).await?;

        // Service exceptions may arrive with a success status and an XML body.
        let is_xml = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("xml"));
        if is_xml {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::upstream(
                PROVIDER_NAME,
                format!("service exception: {}", preview(&body)),
            ));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::upstream(PROVIDER_NAME, format!("failed to read raster: {e}")))?;
        if bytes.is_empty() {
            return Err(Error::upstream(PROVIDER_NAME, "empty raster response"));
        }

        image::load_from_memory(&bytes)
            .map_err(|e| Error::image(format!("failed to decode provider raster: {e}")))
    }
}

#[async_trait]
impl ImageryProvider for SentinelHubProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn fetch_latest(&self, request: &ImageryRequest) -> Result<Acquisition> {
        let dates = self.search_dates(request, Utc::now()).await?;
        let acquired = dates.last().copied().ok_or_else(|| {
            Error::upstream(
                PROVIDER_NAME,
                format!(
                    "no acquisitions of {} within {} days for {}",
                    request.data_collection, request.lookback_days, request.bbox
                ),
            )
        })?;

        info!(
            acquired = %acquired,
            candidates = dates.len(),
            "Fetching latest Sentinel Hub acquisition"
        );
        let raster = self.get_map(request, acquired).await?;

        Ok(Acquisition { acquired, raster })
    }
}

/// Distinct, ascending acquisition dates, dropping tiles above the cloud limit.
fn acquisition_dates(features: &[WfsFeature], max_cloud_coverage: Option<f64>) -> Vec<NaiveDate> {
    let max_percent = max_cloud_coverage.map(|cc| cc * 100.0);
    let mut dates: Vec<NaiveDate> = features
        .iter()
        .filter(|f| match (max_percent, f.properties.cloud_cover_percentage) {
            (Some(max), Some(cover)) => cover <= max,
            _ => true,
        })
        .filter_map(|f| match NaiveDate::parse_from_str(&f.properties.date, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(e) => {
                debug!(date = %f.properties.date, error = %e, "Skipping unparsable WFS date");
                None
            }
        })
        .collect();
    dates.sort_unstable();
    dates.dedup();
    dates
}

fn preview(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(ERROR_BODY_PREVIEW) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
