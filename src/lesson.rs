//! Builds the self-contained directory of each lesson from the extracted course sources.
//!
//! There are two kinds of lessons. Standard lessons are copied out of an extracted SCORM package,
//! pruned, and patched to be embedded in the channel viewer. Kit lessons ship as a ready to view
//! archive that only needs to be extracted and have its entry point renamed.

use anyhow::{bail, Context, Result};
use fs_extra::dir::CopyOptions;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{catalog::LessonSpec, config::ChefConfig, html_patch, images, marker, materialize};

/// The directory inside a SCORM package holding the lesson content.
const SCORM_CONTENT_DIR: &str = "scormcontent";

/// The directory inside a lesson holding its assets.
const ASSETS_DIR: &str = "assets";

/// The way a lesson's directory is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LessonVariant {
    /// The lesson is copied from a SCORM package and patched.
    Standard,

    /// The lesson is extracted from a kit archive as is.
    Kit,
}

impl LessonVariant {
    fn as_str(&self) -> &'static str {
        match self {
            LessonVariant::Standard => "standard",
            LessonVariant::Kit => "kit",
        }
    }
}

/// Builds lesson directories as described by the configuration.
pub struct LessonBuilder<'a> {
    config: &'a ChefConfig,
}

impl<'a> LessonBuilder<'a> {
    /// Creates a builder for the given configuration.
    pub fn new(config: &'a ChefConfig) -> Self {
        Self { config }
    }

    /// Returns the variant used for lessons of the given course.
    pub fn variant(&self, course_dir: &str) -> LessonVariant {
        if course_dir == self.config.kit_course {
            LessonVariant::Kit
        } else {
            LessonVariant::Standard
        }
    }

    /// Returns the directory of the given lesson.
    pub fn lesson_dir(&self, course_dir: &str, lesson_key: &str) -> PathBuf {
        self.config.data_dir.join(course_dir).join(lesson_key)
    }

    /// Returns the fingerprint of everything a lesson directory is built from. The lesson sources
    /// are represented by the fingerprint of the archive the modules directory was extracted
    /// from, so re-extracting a changed archive rebuilds every lesson.
    fn fingerprint(&self, variant: LessonVariant, spec: &LessonSpec) -> Result<String> {
        let inputs = serde_json::json!({
            "variant": variant.as_str(),
            "source": marker::stored_fingerprint(&self.config.modules_path()),
            "spec": spec,
            "max_image_height": self.config.max_image_height,
            "entry_point": self.config.entry_point,
            "css": html_patch::KOLIBRI_CSS,
            "js": html_patch::KOLIBRI_JS,
        });
        Ok(marker::fingerprint_bytes(
            serde_json::to_string(&inputs)?.as_bytes(),
        ))
    }

    /// Builds the directory of the given lesson unless it was already built from the same
    /// inputs. Returns the lesson directory.
    pub fn prepare(
        &self,
        course_dir: &str,
        lesson_key: &str,
        spec: &LessonSpec,
    ) -> Result<PathBuf> {
        let lesson_dir = self.lesson_dir(course_dir, lesson_key);
        let variant = self.variant(course_dir);
        let fingerprint = self.fingerprint(variant, spec)?;
        if marker::is_complete(&lesson_dir, &fingerprint) {
            tracing::debug!("Lesson {} in {} is already built", lesson_key, course_dir);
            return Ok(lesson_dir);
        }

        marker::clear_incomplete(&lesson_dir)?;
        tracing::info!(
            "Building lesson {} in {} ({})",
            lesson_key,
            course_dir,
            variant.as_str()
        );
        match variant {
            LessonVariant::Standard => self.prepare_standard(spec, &lesson_dir)?,
            LessonVariant::Kit => self.prepare_kit(spec, &lesson_dir)?,
        }
        marker::mark_complete(&lesson_dir, &fingerprint)?;
        Ok(lesson_dir)
    }

    /// Copies, prunes, and patches a standard lesson.
    pub fn prepare_standard(&self, spec: &LessonSpec, lesson_dir: &Path) -> Result<()> {
        let source = self
            .config
            .modules_path()
            .join(&spec.file)
            .join(SCORM_CONTENT_DIR);
        copy_dir_contents(&source, lesson_dir)?;

        let assets_dir = lesson_dir.join(ASSETS_DIR);
        remove_assets(&assets_dir, &spec.remove_assets)?;
        let resized = images::resize_images(&assets_dir, self.config.max_image_height)?;
        if resized > 0 {
            tracing::info!("Resized {} images in {}", resized, lesson_dir.display());
        }

        html_patch::patch_entry_point(&lesson_dir.join(&self.config.entry_point), &spec.route)
    }

    /// Extracts a kit lesson and renames its entry file.
    pub fn prepare_kit(&self, spec: &LessonSpec, lesson_dir: &Path) -> Result<()> {
        let archive = self.config.modules_path().join(&spec.file);
        materialize::extract_zip(&archive, lesson_dir)?;

        let entry_file = lesson_dir.join(&self.config.kit_entry_file);
        let entry_point = lesson_dir.join(&self.config.entry_point);
        fs::rename(&entry_file, &entry_point).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                entry_file.display(),
                entry_point.display()
            )
        })
    }
}

/// Copies the contents of `source` into `dest`, creating it if needed. Files already in `dest`
/// are overwritten only when the copy includes a file with the same name.
pub fn copy_dir_contents(source: &Path, dest: &Path) -> Result<()> {
    if !source.is_dir() {
        bail!("lesson source directory {} does not exist", source.display());
    }
    fs::create_dir_all(dest)
        .with_context(|| format!("Failed to create directory: {}", dest.display()))?;

    let options = CopyOptions {
        overwrite: true,
        content_only: true,
        ..CopyOptions::new()
    };
    fs_extra::dir::copy(source, dest, &options).with_context(|| {
        format!(
            "Failed to copy {} to {}",
            source.display(),
            dest.display()
        )
    })?;
    Ok(())
}

/// Removes the given paths, relative to the assets directory. Directories are removed
/// recursively and missing paths are skipped.
pub fn remove_assets(assets_dir: &Path, assets: &[String]) -> Result<()> {
    for asset in assets {
        let path = assets_dir.join(asset);
        if path.is_dir() {
            fs::remove_dir_all(&path)
                .with_context(|| format!("Failed to remove directory: {}", path.display()))?;
        } else if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove file: {}", path.display()))?;
        } else {
            tracing::debug!("Asset {} does not exist, skipping", path.display());
        }
    }
    Ok(())
}
