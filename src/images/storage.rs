//! Filesystem-level image storage keyed by unix timestamp.
//!
//! Images live directly under the store directory as
//! `satellite_image_<timestamp>.png`, each with a JSON sidecar
//! `satellite_image_<timestamp>.json` describing where the raster came from.
//! An in-memory index of timestamps is built when the store opens so lookups
//! never scan the directory.

use std::collections::BTreeSet;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use image::{DynamicImage, ImageFormat};
use parking_lot::{Mutex, RwLock};
use satsnap_common::{DataCollection, Error, Result};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

const FILE_PREFIX: &str = "satellite_image_";
const IMAGE_EXTENSION: &str = ".png";
const SIDECAR_EXTENSION: &str = ".json";
/// Attempts at claiming a fresh timestamp before giving up.
const MAX_SAVE_ATTEMPTS: usize = 8;

/// A stored image located by its timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    /// Unix seconds the image was saved under.
    pub timestamp: i64,
    /// File name relative to the store directory.
    pub file_name: String,
    /// Absolute or store-relative path to the PNG file.
    pub path: PathBuf,
}

/// Sidecar metadata persisted next to each image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub timestamp: i64,
    pub width: u32,
    pub height: u32,
    /// Date the provider captured the scene.
    pub acquired: Option<NaiveDate>,
    pub provider: String,
    pub data_collection: DataCollection,
    pub layer: String,
}

/// Provenance supplied by the caller when saving.
#[derive(Debug, Clone)]
pub struct ImageSource {
    pub acquired: Option<NaiveDate>,
    pub provider: String,
    pub data_collection: DataCollection,
    pub layer: String,
}

/// Filesystem manager for timestamped satellite images.
pub struct ImageStore {
    base_dir: PathBuf,
    index: RwLock<BTreeSet<i64>>,
    last_allocated: Mutex<i64>,
}

impl ImageStore {
    /// Open (creating if needed) the store at `base_dir` and index its contents.
    pub fn open(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;

        let mut index = BTreeSet::new();
        for entry in std::fs::read_dir(&base_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(ts) = entry.file_name().to_str().and_then(parse_file_name) {
                index.insert(ts);
            }
        }

        tracing::debug!(
            dir = %base_dir.display(),
            images = index.len(),
            "Opened image store"
        );

        let last = index.iter().next_back().copied().unwrap_or(i64::MIN);
        Ok(Self {
            base_dir,
            index: RwLock::new(index),
            last_allocated: Mutex::new(last),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Filesystem path of the image saved under `timestamp`.
    pub fn get_path(&self, timestamp: i64) -> PathBuf {
        self.base_dir.join(format_file_name(timestamp))
    }

    fn sidecar_path(&self, timestamp: i64) -> PathBuf {
        self.base_dir
            .join(format!("{FILE_PREFIX}{timestamp}{SIDECAR_EXTENSION}"))
    }

    /// Encode `raster` as PNG and store it under a timestamp no earlier than `now`.
    ///
    /// Timestamps are strictly increasing within a store, so two saves in the
    /// same second land on consecutive seconds instead of overwriting each
    /// other. The PNG is written to a temporary file and renamed into place;
    /// on failure nothing is left behind.
    pub fn save(&self, raster: &DynamicImage, source: &ImageSource, now: i64) -> Result<StoredImage> {
        let mut png = Cursor::new(Vec::new());
        raster
            .write_to(&mut png, ImageFormat::Png)
            .map_err(|e| Error::internal(format!("failed to encode PNG: {e}")))?;
        let png = png.into_inner();

        // The directory may have been removed since the store opened.
        std::fs::create_dir_all(&self.base_dir)?;

        for _ in 0..MAX_SAVE_ATTEMPTS {
            let timestamp = self.allocate_timestamp(now);
            let record = ImageRecord {
                timestamp,
                width: raster.width(),
                height: raster.height(),
                acquired: source.acquired,
                provider: source.provider.clone(),
                data_collection: source.data_collection,
                layer: source.layer.clone(),
            };

            match self.write_files(timestamp, &png, &record) {
                Ok(stored) => {
                    self.index.write().insert(timestamp);
                    return Ok(stored);
                }
                Err(WriteError::Taken) => {
                    tracing::debug!(timestamp, "Timestamp already on disk, trying the next one");
                    if self.get_path(timestamp).is_file() {
                        self.index.write().insert(timestamp);
                    }
                }
                Err(WriteError::Other(e)) => return Err(e),
            }
        }

        Err(Error::internal(format!(
            "could not claim a free timestamp after {MAX_SAVE_ATTEMPTS} attempts"
        )))
    }

    fn allocate_timestamp(&self, now: i64) -> i64 {
        let mut last = self.last_allocated.lock();
        let index = self.index.read();
        let mut candidate = now.max(last.saturating_add(1));
        while index.contains(&candidate) {
            candidate += 1;
        }
        *last = candidate;
        candidate
    }

    fn write_files(
        &self,
        timestamp: i64,
        png: &[u8],
        record: &ImageRecord,
    ) -> std::result::Result<StoredImage, WriteError> {
        let path = self.get_path(timestamp);
        if path.exists() {
            return Err(WriteError::Taken);
        }

        // Claiming the sidecar name is what reserves the timestamp.
        let sidecar = self.sidecar_path(timestamp);
        let json = serde_json::to_vec_pretty(record)
            .map_err(|e| Error::internal(format!("failed to serialize image record: {e}")))?;
        write_atomic(&self.base_dir, &sidecar, &json)?;

        if let Err(e) = write_atomic(&self.base_dir, &path, png) {
            // The sidecar is ours: the claim above would have failed otherwise.
            let _ = std::fs::remove_file(&sidecar);
            return Err(e);
        }

        Ok(StoredImage {
            timestamp,
            file_name: format_file_name(timestamp),
            path,
        })
    }

    /// Find the image saved under exactly `timestamp`.
    ///
    /// A hit requires the PNG to exist right now. The index is reconciled
    /// against the one path the timestamp maps to, so files added or removed
    /// after the store opened are reflected without scanning the directory.
    pub fn lookup(&self, timestamp: i64) -> Option<StoredImage> {
        // Negative keys have no canonical file name.
        if timestamp < 0 {
            return None;
        }

        let path = self.get_path(timestamp);
        let indexed = self.index.read().contains(&timestamp);

        if !path.is_file() {
            if indexed {
                tracing::debug!(timestamp, "Indexed image is gone from disk");
                self.index.write().remove(&timestamp);
            }
            return None;
        }

        if !indexed {
            self.index.write().insert(timestamp);
        }
        Some(StoredImage {
            timestamp,
            file_name: format_file_name(timestamp),
            path,
        })
    }

    /// Read the sidecar record for `timestamp`, if one was written.
    pub fn record(&self, timestamp: i64) -> Result<Option<ImageRecord>> {
        let path = self.sidecar_path(timestamp);
        let data = match std::fs::read(&path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&data)
            .map(Some)
            .map_err(|e| Error::internal(format!("corrupt image record {}: {e}", path.display())))
    }

    /// All indexed timestamps in ascending order.
    pub fn list(&self) -> Vec<i64> {
        self.index.read().iter().copied().collect()
    }
}

enum WriteError {
    Taken,
    Other(Error),
}

impl From<Error> for WriteError {
    fn from(e: Error) -> Self {
        WriteError::Other(e)
    }
}

/// Write `data` next to `dest` and link it into place, never replacing an
/// existing file.
fn write_atomic(dir: &Path, dest: &Path, data: &[u8]) -> std::result::Result<(), WriteError> {
    let mut tmp = NamedTempFile::new_in(dir).map_err(Error::from)?;
    tmp.write_all(data).map_err(Error::from)?;
    tmp.as_file().sync_all().map_err(Error::from)?;

    match tmp.persist_noclobber(dest) {
        Ok(_) => Ok(()),
        Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => Err(WriteError::Taken),
        Err(e) => Err(WriteError::Other(e.error.into())),
    }
}

/// Format the file name for a timestamp.
pub fn format_file_name(timestamp: i64) -> String {
    format!("{FILE_PREFIX}{timestamp}{IMAGE_EXTENSION}")
}

/// Extract the timestamp from a canonical image file name.
///
/// Only names produced by [`format_file_name`] are accepted: the middle part
/// must be a plain decimal number without sign or leading zeros.
pub fn parse_file_name(name: &str) -> Option<i64> {
    let digits = name
        .strip_prefix(FILE_PREFIX)?
        .strip_suffix(IMAGE_EXTENSION)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    digits.parse().ok()
}
