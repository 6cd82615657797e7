//! Contains the configuration of a chef run: where files are staged, where the course sources
//! live, and the constants used while preparing lessons.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// The name of the configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "chef.toml";

/// The configuration used by every stage of the pipeline.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChefConfig {
    /// The staging directory for archives, extracted courses, and lesson directories.
    pub data_dir: PathBuf,

    /// The name of the extracted archive containing the source of every lesson.
    pub modules_dir: String,

    /// The JSON file describing courses and lessons. Defaults to `<data_dir>/course_data.json`.
    pub catalog_file: Option<PathBuf>,

    /// The ID of the shared drive folder containing the course archives.
    pub drive_folder_id: String,

    /// Only remote files with this MIME type are downloaded.
    pub archive_mime_type: String,

    /// The OAuth client secret file of the installed application.
    pub client_secret_file: PathBuf,

    /// The file where the OAuth token is persisted between runs.
    pub token_file: PathBuf,

    /// Images taller than this many pixels are downsized.
    pub max_image_height: u32,

    /// The directory name of the course packaged as a kit.
    pub kit_course: String,

    /// The entry file shipped inside kit archives.
    pub kit_entry_file: String,

    /// The canonical name of a lesson's HTML entry point.
    pub entry_point: String,

    /// Where lesson zips are written. Defaults to `<data_dir>/zips`.
    pub zips_dir: Option<PathBuf>,

    /// Where the channel tree is written. Defaults to `<data_dir>/channel.json`.
    pub channel_output: Option<PathBuf>,
}

impl Default for ChefConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("chefdata"),
            modules_dir: "LearningEquality_atingi_Modules".to_string(),
            catalog_file: None,
            drive_folder_id: "1FyXSZXLbXReX-YKjFyIHc8Br_WkzzsnJ".to_string(),
            archive_mime_type: "application/zip".to_string(),
            client_secret_file: PathBuf::from("credentials/credentials.json"),
            token_file: PathBuf::from("credentials/token.json"),
            max_image_height: 640,
            kit_course: "digital_enquirer_kit".to_string(),
            kit_entry_file: "story.html".to_string(),
            entry_point: "index.html".to_string(),
            zips_dir: None,
            channel_output: None,
        }
    }
}

impl ChefConfig {
    /// Loads the configuration from the given TOML file. If no path is given, `chef.toml` in the
    /// working directory is used when present and the defaults otherwise. An explicitly given
    /// file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        if !required && !path.exists() {
            tracing::debug!("No {} found, using the default configuration", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file at path: {}", path.display()))?;
        let config = toml::from_str::<ChefConfig>(&contents)
            .with_context(|| format!("Failed to parse config file at path: {}", path.display()))?;
        tracing::info!("Using configuration from {}", path.display());
        Ok(config)
    }

    /// Returns the directory holding the extracted lesson sources.
    pub fn modules_path(&self) -> PathBuf {
        self.data_dir.join(&self.modules_dir)
    }

    /// Returns the course catalog file.
    pub fn catalog_path(&self) -> PathBuf {
        self.catalog_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("course_data.json"))
    }

    /// Returns the directory where lesson zips are written.
    pub fn zips_path(&self) -> PathBuf {
        self.zips_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("zips"))
    }

    /// Returns the file where the channel tree is written.
    pub fn channel_output_path(&self) -> PathBuf {
        self.channel_output
            .clone()
            .unwrap_or_else(|| self.data_dir.join("channel.json"))
    }
}
