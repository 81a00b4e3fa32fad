//! Satsnap-Common: Shared types and errors.
//!
//! This crate provides common functionality used across satsnap:
//!
//! - **Geometry**: Bounding boxes and coordinate reference systems
//! - **Core Types**: Imagery data collections
//! - **Error Handling**: Common error type mapped onto HTTP status codes
//!
//! # Examples
//!
//! ```
//! use satsnap_common::{BoundingBox, Crs, DataCollection, Error, Result};
//!
//! let bbox = BoundingBox::new(46.16, -16.15, 46.51, -15.58, Crs::Wgs84).unwrap();
//! assert_eq!(bbox.crs().epsg_code(), "EPSG:4326");
//! assert_eq!(DataCollection::Sentinel2L1C.wfs_type_name(), "DSS1");
//!
//! fn example() -> Result<()> {
//!     Err(Error::not_found("image", 1699317720))
//! }
//! assert!(example().is_err());
//! ```

pub mod error;
pub mod geo;
pub mod types;

pub use error::{Error, Result};
pub use geo::*;
pub use types::*;
