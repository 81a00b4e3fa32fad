//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which creates a temporary image directory, a
//! default config pointing at it, and a full [`AppContext`] backed by a
//! [`FakeProvider`]. The [`TestHarness::with_server`] constructor starts Axum
//! on a random port for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use chrono::NaiveDate;
use http_body_util::BodyExt;
use satsnap::config::Config;
use satsnap::imagery::{Acquisition, ImageryProvider, ImageryRequest};
use satsnap::server::{create_router, AppContext};
use satsnap_common::{Error, Result};
use tempfile::TempDir;

/// Imagery provider returning a solid raster of the requested size.
pub struct FakeProvider {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ImageryProvider for FakeProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn fetch_latest(&self, request: &ImageryRequest) -> Result<Acquisition> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::upstream("fake", "provider unavailable"));
        }
        let mut raster = image::RgbImage::new(request.width, request.height);
        for pixel in raster.pixels_mut() {
            *pixel = image::Rgb([20, 90, 40]);
        }
        Ok(Acquisition {
            acquired: NaiveDate::from_ymd_opt(2023, 11, 5).unwrap(),
            raster: image::DynamicImage::ImageRgb8(raster),
        })
    }
}

/// Test harness wrapping a fully-constructed [`AppContext`].
pub struct TestHarness {
    pub ctx: AppContext,
    pub provider: Arc<FakeProvider>,
    pub dir: TempDir,
}

impl TestHarness {
    /// Create a new harness with default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a new harness with a custom configuration.
    ///
    /// The image directory and plugin descriptor paths are redirected into a
    /// fresh temporary directory.
    pub fn with_config(mut config: Config) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        config.storage.image_dir = dir.path().join("images");
        config.plugin.manifest_path = dir.path().join("ai-plugin.json");
        config.plugin.openapi_path = dir.path().join("openapi.yaml");
        config.imagery.width = 16;
        config.imagery.height = 24;

        let provider = Arc::new(FakeProvider::new());
        let ctx = AppContext::new(config, provider.clone()).expect("failed to build context");

        Self { ctx, provider, dir }
    }

    pub fn image_dir(&self) -> PathBuf {
        self.dir.path().join("images")
    }

    /// Drop a file into the image directory behind the store's back.
    pub fn write_image_file(&self, name: &str, data: &[u8]) -> PathBuf {
        let path = self.image_dir().join(name);
        std::fs::write(&path, data).expect("failed to write image file");
        path
    }

    pub fn write_descriptor(&self, path: &Path, data: &[u8]) {
        std::fs::write(path, data).expect("failed to write descriptor");
    }

    pub fn router(&self) -> axum::Router {
        create_router(self.ctx.clone())
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        let harness = Self::new();
        let app = harness.router();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }
}

/// Helper to get response body as bytes
pub async fn body_bytes(body: Body) -> Vec<u8> {
    body.collect().await.unwrap().to_bytes().to_vec()
}

/// Helper to get response body as string
pub async fn body_to_string(body: Body) -> String {
    String::from_utf8(body_bytes(body).await).unwrap()
}

/// Helper to get response body as JSON
pub async fn body_to_json(body: Body) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(body).await).unwrap()
}
