mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Environment variable overriding `imagery.instance_id`
pub const INSTANCE_ID_ENV: &str = "SATSNAP_INSTANCE_ID";

/// Largest raster edge the provider renders in one request
const MAX_RASTER_EDGE: u32 = 2500;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    apply_env_overrides(&mut config);

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./config.toml",
        "./satsnap.toml",
        "~/.config/satsnap/config.toml",
        "/etc/satsnap/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    // Return default config if no file found
    let mut config = Config::default();
    apply_env_overrides(&mut config);
    validate_config(&config)?;
    Ok(config)
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(instance_id) = std::env::var(INSTANCE_ID_ENV) {
        if !instance_id.trim().is_empty() {
            config.imagery.instance_id = Some(instance_id.trim().to_string());
        }
    }
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if let Some(ref url) = config.server.public_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!("server.public_url must start with http:// or https://: {}", url);
        }
    }

    let imagery = &config.imagery;
    imagery
        .bbox
        .validate()
        .context("Invalid imagery.bbox")?;

    if imagery.width == 0 || imagery.height == 0 {
        anyhow::bail!("Imagery width and height must be non-zero");
    }
    if imagery.width > MAX_RASTER_EDGE || imagery.height > MAX_RASTER_EDGE {
        anyhow::bail!(
            "Imagery dimensions {}x{} exceed the provider limit of {}px",
            imagery.width,
            imagery.height,
            MAX_RASTER_EDGE
        );
    }
    if !(0.0..=1.0).contains(&imagery.max_cloud_coverage) {
        anyhow::bail!("imagery.max_cloud_coverage must be between 0.0 and 1.0");
    }
    if imagery.lookback_days == 0 {
        anyhow::bail!("imagery.lookback_days must be at least 1");
    }
    if imagery.layer.trim().is_empty() {
        anyhow::bail!("imagery.layer cannot be empty");
    }
    if imagery.instance_id.as_deref().map_or(true, str::is_empty) {
        tracing::warn!(
            "No imagery instance id configured; set imagery.instance_id or {}",
            INSTANCE_ID_ENV
        );
    }

    for path in [&config.plugin.manifest_path, &config.plugin.openapi_path] {
        if !path.exists() {
            tracing::warn!("Plugin descriptor does not exist: {:?}", path);
        }
    }

    Ok(())
}
