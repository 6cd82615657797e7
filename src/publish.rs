//! Hands the assembled channel tree over to the publishing step.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{built_info, channel::ChannelNode};

/// A destination for channel trees.
pub trait ChannelPublisher {
    /// Publishes the given channel tree.
    fn publish(&mut self, channel: &ChannelNode) -> Result<()>;
}

/// The document written by [JsonPublisher].
#[derive(Debug, Serialize)]
struct PublishedChannel<'a> {
    generated_at: DateTime<Utc>,
    chef_version: &'a str,
    num_lessons: usize,
    channel: &'a ChannelNode,
}

/// Writes the channel tree as a JSON document.
pub struct JsonPublisher {
    output: PathBuf,
}

impl JsonPublisher {
    pub fn new(output: &Path) -> Self {
        Self {
            output: output.to_path_buf(),
        }
    }
}

impl ChannelPublisher for JsonPublisher {
    fn publish(&mut self, channel: &ChannelNode) -> Result<()> {
        if let Some(parent) = self.output.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let document = PublishedChannel {
            generated_at: Utc::now(),
            chef_version: built_info::PKG_VERSION,
            num_lessons: channel.num_leaves(),
            channel,
        };
        let contents = serde_json::to_string_pretty(&document)?;
        fs::write(&self.output, contents)
            .with_context(|| format!("Failed to write channel to {}", self.output.display()))?;
        tracing::info!(
            "Wrote channel with {} lessons to {}",
            document.num_lessons,
            self.output.display()
        );
        Ok(())
    }
}
