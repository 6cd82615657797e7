//! Extracts staged archives into sibling directories.

use anyhow::{Context, Result};
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use crate::marker;

/// Extracts the zip archive at the given path into `dest`.
pub fn extract_zip(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive)
        .with_context(|| format!("Failed to open archive: {}", archive.display()))?;
    let mut zip = zip::ZipArchive::new(file)
        .with_context(|| format!("Failed to read zip archive: {}", archive.display()))?;
    zip.extract(dest)
        .with_context(|| format!("Failed to extract archive: {}", archive.display()))?;
    Ok(())
}

/// Extracts the archive into a directory with the same name minus the extension, unless that
/// directory was already extracted from an identical archive. Returns the directory.
pub fn extract_if_absent(archive: &Path) -> Result<PathBuf> {
    let target = archive.with_extension("");
    let name = target
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let fingerprint = marker::fingerprint_file(archive)?;
    if marker::is_complete(&target, &fingerprint) {
        tracing::info!("{} already unzipped", name);
        return Ok(target);
    }

    marker::clear_incomplete(&target)?;
    tracing::info!("Unzipping files for lesson: {}", name);
    extract_zip(archive, &target)?;
    marker::mark_complete(&target, &fingerprint)?;
    Ok(target)
}

/// Extracts every zip archive directly inside the staging directory, in file name order.
/// Returns the extracted directories.
pub fn extract_all(staging_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut archives = Vec::new();
    let entries = fs::read_dir(staging_dir)
        .with_context(|| format!("Failed to read directory: {}", staging_dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "zip") {
            archives.push(path);
        }
    }
    archives.sort();

    archives.iter().map(|archive| extract_if_absent(archive)).collect()
}
