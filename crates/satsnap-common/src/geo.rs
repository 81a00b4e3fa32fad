//! Geographic bounding boxes and coordinate reference systems.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Coordinate reference system of a [`BoundingBox`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Crs {
    /// WGS84 longitude/latitude degrees.
    #[serde(rename = "EPSG:4326", alias = "wgs84")]
    Wgs84,
    /// Spherical Web Mercator metres.
    #[serde(rename = "EPSG:3857", alias = "pop_web")]
    WebMercator,
}

impl Crs {
    /// The `EPSG:xxxx` identifier sent to OGC services.
    pub fn epsg_code(&self) -> &'static str {
        match self {
            Self::Wgs84 => "EPSG:4326",
            Self::WebMercator => "EPSG:3857",
        }
    }

    /// OGC 1.3.0 / 2.0 services expect latitude first for EPSG:4326.
    pub fn is_lat_lon_order(&self) -> bool {
        matches!(self, Self::Wgs84)
    }
}

impl Default for Crs {
    fn default() -> Self {
        Self::Wgs84
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.epsg_code())
    }
}

/// Axis-aligned rectangle in a coordinate reference system.
///
/// `x` is longitude (or easting) and `y` is latitude (or northing),
/// regardless of the axis order a particular service expects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    #[serde(default)]
    pub crs: Crs,
}

impl BoundingBox {
    /// Create a validated bounding box.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64, crs: Crs) -> Result<Self> {
        let bbox = Self {
            min_x,
            min_y,
            max_x,
            max_y,
            crs,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    /// Check that all corners are finite and the box has positive area.
    pub fn validate(&self) -> Result<()> {
        let corners = [self.min_x, self.min_y, self.max_x, self.max_y];
        if corners.iter().any(|c| !c.is_finite()) {
            return Err(Error::invalid_input("bounding box corners must be finite"));
        }
        if self.min_x >= self.max_x || self.min_y >= self.max_y {
            return Err(Error::invalid_input(format!(
                "bounding box is empty or inverted: {}",
                self
            )));
        }
        if self.crs == Crs::Wgs84
            && (self.min_x < -180.0 || self.max_x > 180.0 || self.min_y < -90.0 || self.max_y > 90.0)
        {
            return Err(Error::invalid_input(format!(
                "WGS84 bounding box out of range: {}",
                self
            )));
        }
        Ok(())
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    /// Comma-separated `BBOX` parameter in the axis order the CRS requires.
    pub fn to_ogc_param(&self) -> String {
        if self.crs.is_lat_lon_order() {
            format!("{},{},{},{}", self.min_y, self.min_x, self.max_y, self.max_x)
        } else {
            format!("{},{},{},{}", self.min_x, self.min_y, self.max_x, self.max_y)
        }
    }
}

impl Default for BoundingBox {
    /// The Betsiboka estuary, Madagascar.
    fn default() -> Self {
        Self {
            min_x: 46.16,
            min_y: -16.15,
            max_x: 46.51,
            max_y: -15.58,
            crs: Crs::Wgs84,
        }
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {}) {}",
            self.min_x, self.min_y, self.max_x, self.max_y, self.crs
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bbox_is_valid() {
        assert!(BoundingBox::default().validate().is_ok());
    }

    #[test]
    fn test_inverted_bbox_rejected() {
        let err = BoundingBox::new(46.51, -16.15, 46.16, -15.58, Crs::Wgs84).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_out_of_range_wgs84_rejected() {
        assert!(BoundingBox::new(170.0, 10.0, 190.0, 20.0, Crs::Wgs84).is_err());
        assert!(BoundingBox::new(170.0, 10.0, 190.0, 20.0, Crs::WebMercator).is_ok());
    }

    #[test]
    fn test_nan_rejected() {
        assert!(BoundingBox::new(f64::NAN, 0.0, 1.0, 1.0, Crs::Wgs84).is_err());
    }

    #[test]
    fn test_ogc_param_wgs84_swaps_axes() {
        let bbox = BoundingBox::default();
        assert_eq!(bbox.to_ogc_param(), "-16.15,46.16,-15.58,46.51");
    }

    #[test]
    fn test_ogc_param_web_mercator_keeps_axes() {
        let bbox = BoundingBox::new(1000.0, 2000.0, 3000.0, 4000.0, Crs::WebMercator).unwrap();
        assert_eq!(bbox.to_ogc_param(), "1000,2000,3000,4000");
    }

    #[test]
    fn test_crs_serde_aliases() {
        let crs: Crs = serde_json::from_str(r#""EPSG:4326""#).unwrap();
        assert_eq!(crs, Crs::Wgs84);
        let crs: Crs = serde_json::from_str(r#""wgs84""#).unwrap();
        assert_eq!(crs, Crs::Wgs84);
        assert_eq!(serde_json::to_string(&Crs::WebMercator).unwrap(), r#""EPSG:3857""#);
    }
}
