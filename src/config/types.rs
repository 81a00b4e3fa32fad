use satsnap_common::{BoundingBox, DataCollection};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub imagery: ImageryConfig,

    #[serde(default)]
    pub plugin: PluginConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Base URL used when building download links (e.g. `https://snap.example.com`).
    /// When unset, links are built from the request's `Host` header.
    #[serde(default)]
    pub public_url: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory holding `satellite_image_<timestamp>.png` files.
    #[serde(default = "default_image_dir")]
    pub image_dir: PathBuf,
}

fn default_image_dir() -> PathBuf {
    PathBuf::from("images")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            image_dir: default_image_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageryConfig {
    /// Root of the Sentinel Hub OGC services.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Configuration instance id (can also be set via `SATSNAP_INSTANCE_ID`)
    #[serde(default)]
    pub instance_id: Option<String>,

    #[serde(default)]
    pub data_collection: DataCollection,

    /// Rendered layer defined in the provider configuration instance
    #[serde(default = "default_layer")]
    pub layer: String,

    #[serde(default)]
    pub bbox: BoundingBox,

    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    /// How far back to search for the latest acquisition
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,

    /// Maximum cloud coverage fraction (0.0 - 1.0)
    #[serde(default = "default_max_cloud_coverage")]
    pub max_cloud_coverage: f64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://services.sentinel-hub.com".to_string()
}
fn default_layer() -> String {
    "TRUE-COLOR-S2L2A".to_string()
}
fn default_width() -> u32 {
    512
}
fn default_height() -> u32 {
    856
}
fn default_lookback_days() -> u32 {
    30
}
fn default_max_cloud_coverage() -> f64 {
    1.0
}
fn default_timeout_secs() -> u64 {
    60
}

impl ImageryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ImageryConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            instance_id: None,
            data_collection: DataCollection::default(),
            layer: default_layer(),
            bbox: BoundingBox::default(),
            width: default_width(),
            height: default_height(),
            lookback_days: default_lookback_days(),
            max_cloud_coverage: default_max_cloud_coverage(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PluginConfig {
    /// Chat plugin manifest served at `/.well-known/ai-plugin.json`
    #[serde(default = "default_manifest_path")]
    pub manifest_path: PathBuf,

    /// API schema served at `/openapi.yaml`
    #[serde(default = "default_openapi_path")]
    pub openapi_path: PathBuf,
}

fn default_manifest_path() -> PathBuf {
    PathBuf::from("ai-plugin.json")
}
fn default_openapi_path() -> PathBuf {
    PathBuf::from("openapi.yaml")
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            manifest_path: default_manifest_path(),
            openapi_path: default_openapi_path(),
        }
    }
}
