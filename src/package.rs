//! Packages lesson directories as reproducible zip archives.
//!
//! Entries are written in sorted order with fixed timestamps and permissions, so packaging the
//! same directory twice produces identical archives and unchanged lessons are not re-uploaded
//! downstream.

use anyhow::{bail, Context, Result};
use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;
use zip::{write::SimpleFileOptions, CompressionMethod, DateTime, ZipWriter};

/// The permissions of every file in the archive.
const FILE_PERMISSIONS: u32 = 0o644;

/// The permissions of every directory in the archive.
const DIR_PERMISSIONS: u32 = 0o755;

/// Returns the options shared by every entry.
fn entry_options(permissions: u32) -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(permissions)
}

/// Returns the name of the entry for the given path relative to the packaged directory.
fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Zips the contents of `dir` into `dest` and returns `dest`.
pub fn create_predictable_zip(dir: &Path, dest: &Path) -> Result<PathBuf> {
    if !dir.is_dir() {
        bail!("lesson directory {} does not exist", dir.display());
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    // Write to a temporary file first so a failed packaging never leaves a truncated archive.
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
    let mut zip = ZipWriter::new(temp_file.as_file_mut());

    for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        let relative = entry.path().strip_prefix(dir)?;
        let name = entry_name(relative);
        if entry.file_type().is_dir() {
            zip.add_directory(name, entry_options(DIR_PERMISSIONS))?;
        } else if entry.file_type().is_file() {
            zip.start_file(name, entry_options(FILE_PERMISSIONS))?;
            let mut file = File::open(entry.path())
                .with_context(|| format!("Failed to open file: {}", entry.path().display()))?;
            io::copy(&mut file, &mut zip)?;
        }
    }
    zip.finish()?;

    temp_file
        .persist(dest)
        .with_context(|| format!("Failed to write archive: {}", dest.display()))?;
    Ok(dest.to_path_buf())
}
