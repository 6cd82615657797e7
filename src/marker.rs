//! Tracks which directories have been fully materialized.
//!
//! A directory is only considered built when a marker written after the last step succeeded sits
//! next to it. The marker records a fingerprint of the inputs used to build the directory, so a
//! changed input or an interrupted build both lead to a rebuild.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};

/// The contents of a completion marker.
#[derive(Debug, Deserialize, PartialEq, Serialize)]
struct Marker {
    fingerprint: String,
    completed_at: DateTime<Utc>,
}

/// Returns the path of the marker for the given target: a hidden file in the same directory.
pub fn marker_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    target.with_file_name(format!(".{name}.complete"))
}

/// Returns the SHA-1 of the given bytes as a hex string.
pub fn fingerprint_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Returns the SHA-1 of the file at the given path as a hex string.
pub fn fingerprint_file(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let mut hasher = Sha1::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Returns the fingerprint the target was completed with, if it exists and has a valid marker.
pub fn stored_fingerprint(target: &Path) -> Option<String> {
    if !target.exists() {
        return None;
    }
    fs::read_to_string(marker_path(target))
        .ok()
        .and_then(|contents| serde_json::from_str::<Marker>(&contents).ok())
        .map(|marker| marker.fingerprint)
}

/// Returns whether the target exists and was completed with the given fingerprint.
pub fn is_complete(target: &Path, fingerprint: &str) -> bool {
    stored_fingerprint(target).is_some_and(|stored| stored == fingerprint)
}

/// Records that the target was completed with the given fingerprint.
pub fn mark_complete(target: &Path, fingerprint: &str) -> Result<()> {
    let marker = Marker {
        fingerprint: fingerprint.to_string(),
        completed_at: Utc::now(),
    };
    let path = marker_path(target);
    fs::write(&path, serde_json::to_string(&marker)?)
        .with_context(|| format!("Failed to write marker: {}", path.display()))
}

/// Removes a target left behind by an incomplete build, along with its marker.
pub fn clear_incomplete(target: &Path) -> Result<()> {
    if target.is_dir() {
        tracing::warn!("Removing incomplete directory {}", target.display());
        fs::remove_dir_all(target)
            .with_context(|| format!("Failed to remove directory: {}", target.display()))?;
    } else if target.exists() {
        fs::remove_file(target)
            .with_context(|| format!("Failed to remove file: {}", target.display()))?;
    }
    let marker = marker_path(target);
    if marker.exists() {
        fs::remove_file(&marker)?;
    }
    Ok(())
}
