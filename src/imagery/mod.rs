//! Satellite imagery acquisition.
//!
//! This module defines a generic [`ImageryProvider`] trait and the request and
//! result types shared by every imagery backend.
//!
//! # Module layout
//!
//! - [`provider`] -- Trait definition and shared data types.
//! - [`providers`] -- Concrete provider implementations (Sentinel Hub).

pub mod provider;
pub mod providers;

pub use provider::{Acquisition, ImageryProvider, ImageryRequest};
pub use providers::SentinelHubProvider;
