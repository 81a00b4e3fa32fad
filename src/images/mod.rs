//! Satellite image storage and retrieval.
//!
//! This module provides timestamp-keyed local storage for fetched imagery and
//! the service that ties it to an [`ImageryProvider`](crate::imagery::ImageryProvider).

mod service;
mod storage;

pub use service::{show_image_path, ImageService};
pub use storage::{format_file_name, parse_file_name, ImageRecord, ImageSource, ImageStore, StoredImage};
