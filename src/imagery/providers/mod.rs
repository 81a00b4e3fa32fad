//! Concrete imagery provider implementations.
//!
//! Each submodule wraps a single external API and implements the
//! [`ImageryProvider`](super::ImageryProvider) trait.

pub mod sentinel_hub;

pub use sentinel_hub::SentinelHubProvider;
