//! Assembles the channel tree from the course catalog and the packaged lessons.
//!
//! Each course becomes a topic. Lessons whose title names a module are grouped under a sub-topic
//! named after the module, and consecutive lessons of the same module share one sub-topic. Every
//! other lesson is attached to the course topic directly. Lessons are never reordered.

use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};
use ustr::Ustr;

use crate::catalog::{course_dir, CourseCatalog, CourseLessons};

/// The title of the channel.
pub const CHANNEL_TITLE: &str = "Learn with atingi";

/// The source ID of the channel.
pub const CHANNEL_SOURCE_ID: &str = "atingi";

/// The domain the content comes from.
pub const CHANNEL_SOURCE_DOMAIN: &str = "https://www.atingi.org/";

/// The language of the channel and all of its content.
pub const CHANNEL_LANGUAGE: &str = "en";

/// The description of the channel.
pub const CHANNEL_DESCRIPTION: &str = "Learn digital and professional skills, connect with peers, \
    and take action for your future.";

/// The file name of the channel's thumbnail inside the data directory.
pub const CHANNEL_THUMBNAIL: &str = "logoatingi.png";

/// The author of every topic.
pub const AUTHOR: &str = "Atingi";

/// The subjects every node is tagged with.
pub const CATEGORIES: [&str; 3] = [
    "TECHNICAL_AND_VOCATIONAL_TRAINING",
    "DIGITAL_LITERACY",
    "TOOLS_AND_SOFTWARE_TRAINING",
];

/// The audiences every node is tagged with.
pub const GRADE_LEVELS: [&str; 2] = ["PROFESSIONAL", "WORK_SKILLS"];

/// The kind of a node in the channel tree.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Channel,
    Topic,
    SubTopic,
    Leaf,
}

/// The license of the channel's content.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct License {
    pub license_id: String,
    pub copyright_holder: String,
}

impl Default for License {
    fn default() -> Self {
        Self {
            license_id: "CC BY-SA".to_string(),
            copyright_holder: AUTHOR.to_string(),
        }
    }
}

/// The packaged form of a lesson.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct LessonArtifact {
    pub zip_path: PathBuf,
}

/// The packaged lessons, keyed by course name and lesson key.
#[derive(Clone, Debug, Default)]
pub struct LessonArtifacts {
    artifacts: HashMap<(String, String), LessonArtifact>,
}

impl LessonArtifacts {
    /// Records the artifact of the given lesson.
    pub fn insert(&mut self, course: &str, lesson: &str, artifact: LessonArtifact) {
        self.artifacts
            .insert((course.to_string(), lesson.to_string()), artifact);
    }

    /// Returns the artifact of the given lesson.
    pub fn get(&self, course: &str, lesson: &str) -> Option<&LessonArtifact> {
        self.artifacts.get(&(course.to_string(), lesson.to_string()))
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

/// A node in the channel tree.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ChannelNode {
    pub kind: NodeKind,
    pub source_id: Ustr,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_domain: Option<String>,
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<PathBuf>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub grade_levels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<LessonArtifact>,
    #[serde(default)]
    pub children: Vec<ChannelNode>,
}

impl ChannelNode {
    /// Creates a node of the given kind with the metadata shared by every node.
    fn new(kind: NodeKind, source_id: &str, title: &str) -> Self {
        Self {
            kind,
            source_id: Ustr::from(source_id),
            title: title.to_string(),
            description: None,
            source_domain: None,
            language: CHANNEL_LANGUAGE.to_string(),
            license: None,
            author: None,
            thumbnail: None,
            categories: CATEGORIES.iter().map(|c| c.to_string()).collect(),
            grade_levels: GRADE_LEVELS.iter().map(|g| g.to_string()).collect(),
            artifact: None,
            children: vec![],
        }
    }

    pub fn add_child(&mut self, child: ChannelNode) {
        self.children.push(child);
    }

    /// Returns the number of leaves under this node.
    pub fn num_leaves(&self) -> usize {
        if self.kind == NodeKind::Leaf {
            return 1;
        }
        self.children.iter().map(ChannelNode::num_leaves).sum()
    }
}

/// Returns the source ID of the sub-topic for the given module.
pub fn sub_topic_source_id(module: &str, course_dir: &str) -> String {
    format!("{module}_{course_dir}_id").replace(' ', "_")
}

/// Returns the source ID of the given lesson.
pub fn leaf_source_id(course_dir: &str, lesson_key: &str) -> String {
    format!("{}_{}_id", course_dir, lesson_key.replace(' ', "_"))
}

/// Builds the channel tree.
pub struct ChannelAssembler {
    /// The directory containing the channel and course thumbnails.
    data_dir: PathBuf,
}

impl ChannelAssembler {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
        }
    }

    /// Returns the thumbnail at the given path if it exists.
    fn thumbnail(&self, file_name: &str) -> Option<PathBuf> {
        let path = self.data_dir.join(file_name);
        path.exists().then_some(path)
    }

    /// Returns the root node of the channel.
    fn channel_root(&self) -> ChannelNode {
        let mut channel = ChannelNode::new(NodeKind::Channel, CHANNEL_SOURCE_ID, CHANNEL_TITLE);
        channel.description = Some(CHANNEL_DESCRIPTION.to_string());
        channel.source_domain = Some(CHANNEL_SOURCE_DOMAIN.to_string());
        channel.thumbnail = self.thumbnail(CHANNEL_THUMBNAIL);
        channel
    }

    /// Returns a topic or sub-topic node of the given course.
    fn topic(&self, kind: NodeKind, source_id: &str, title: &str, course_dir: &str) -> ChannelNode {
        let mut topic = ChannelNode::new(kind, source_id, title);
        topic.author = Some(AUTHOR.to_string());
        topic.thumbnail = self.thumbnail(&format!("{course_dir}.png"));
        topic
    }

    /// Attaches the sub-topic to the topic unless no lesson ended up in it.
    fn close_sub_topic(topic: &mut ChannelNode, sub_topic: Option<ChannelNode>) {
        if let Some(sub_topic) = sub_topic {
            if !sub_topic.children.is_empty() {
                topic.add_child(sub_topic);
            }
        }
    }

    /// Returns the topic of the given course with all of its lessons.
    fn course_topic(
        &self,
        course: &str,
        lessons: &CourseLessons,
        artifacts: &LessonArtifacts,
    ) -> ChannelNode {
        let course_dir = course_dir(course);
        let mut topic = self.topic(
            NodeKind::Topic,
            &format!("{course_dir}_id"),
            course,
            &course_dir,
        );

        // The sub-topic of the module being walked, if any.
        let mut sub_topic: Option<ChannelNode> = None;
        for (lesson_key, spec) in lessons {
            match spec.module_name() {
                Some(module) => {
                    let same_module = sub_topic
                        .as_ref()
                        .is_some_and(|sub_topic| sub_topic.title == module);
                    if !same_module {
                        Self::close_sub_topic(&mut topic, sub_topic.take());
                        sub_topic = Some(self.topic(
                            NodeKind::SubTopic,
                            &sub_topic_source_id(module, &course_dir),
                            module,
                            &course_dir,
                        ));
                    }
                }
                None => Self::close_sub_topic(&mut topic, sub_topic.take()),
            }

            let Some(artifact) = artifacts.get(course, lesson_key) else {
                tracing::warn!("Lesson {} in {} has no package, skipping", lesson_key, course);
                continue;
            };
            let mut leaf = ChannelNode::new(
                NodeKind::Leaf,
                &leaf_source_id(&course_dir, lesson_key),
                &spec.title,
            );
            leaf.license = Some(License::default());
            leaf.artifact = Some(artifact.clone());

            match sub_topic.as_mut() {
                Some(sub_topic) => sub_topic.add_child(leaf),
                None => topic.add_child(leaf),
            }
        }
        Self::close_sub_topic(&mut topic, sub_topic);
        topic
    }

    /// Builds the channel tree with one topic per course, in catalog order.
    pub fn assemble(&self, catalog: &CourseCatalog, artifacts: &LessonArtifacts) -> ChannelNode {
        let mut channel = self.channel_root();
        for (course, lessons) in catalog.courses() {
            channel.add_child(self.course_topic(course, lessons, artifacts));
        }
        channel
    }
}
