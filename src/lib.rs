//! Satsnap - Satellite snapshot service
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod images;
pub mod imagery;
pub mod server;
