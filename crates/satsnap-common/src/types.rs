//! Core type definitions for imagery requests.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Satellite dataset served by the imagery provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataCollection {
    /// Sentinel-2 top-of-atmosphere reflectance.
    #[serde(rename = "sentinel2_l1c")]
    Sentinel2L1C,
    /// Sentinel-2 atmospherically corrected surface reflectance.
    #[serde(rename = "sentinel2_l2a")]
    Sentinel2L2A,
    /// Sentinel-1 interferometric wide swath radar.
    #[serde(rename = "sentinel1_iw")]
    Sentinel1IW,
}

impl DataCollection {
    /// Feature type name used by the provider's WFS tile catalogue.
    pub fn wfs_type_name(&self) -> &'static str {
        match self {
            Self::Sentinel2L1C => "DSS1",
            Self::Sentinel2L2A => "DSS2",
            Self::Sentinel1IW => "DSS3",
        }
    }

    /// Whether acquisitions of this collection carry cloud cover metadata.
    pub fn has_cloud_cover(&self) -> bool {
        !matches!(self, Self::Sentinel1IW)
    }
}

impl Default for DataCollection {
    fn default() -> Self {
        Self::Sentinel2L1C
    }
}

impl fmt::Display for DataCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sentinel2L1C => write!(f, "sentinel2_l1c"),
            Self::Sentinel2L2A => write!(f, "sentinel2_l2a"),
            Self::Sentinel1IW => write!(f, "sentinel1_iw"),
        }
    }
}
