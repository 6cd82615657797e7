//! Contains the course catalog: the static description of every course and its lessons.

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// The description of a single lesson.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct LessonSpec {
    /// The title shown in the channel.
    pub title: String,

    /// The path of the lesson inside the modules archive.
    pub file: String,

    /// The fragment the in-page router is forced to when the lesson loads.
    pub route: String,

    /// Paths relative to the lesson's `assets` directory that are deleted before packaging.
    #[serde(default)]
    pub remove_assets: Vec<String>,
}

impl LessonSpec {
    /// Returns whether the lesson belongs to a module, based on its title.
    pub fn is_module_lesson(&self) -> bool {
        self.title.contains("Module")
    }

    /// Returns the name of the module this lesson belongs to, which is the portion of the title
    /// before the first colon.
    pub fn module_name(&self) -> Option<&str> {
        if !self.is_module_lesson() {
            return None;
        }
        self.title.split(':').next()
    }
}

/// The lessons of a course, keyed by lesson key and kept in catalog order.
pub type CourseLessons = IndexMap<String, LessonSpec>;

/// Maps each course name to its lessons. Iteration follows the order of the catalog file.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CourseCatalog {
    courses: IndexMap<String, CourseLessons>,
}

impl CourseCatalog {
    /// Reads the catalog from the JSON file at the given path.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read course catalog at path: {}", path.display()))?;
        Self::from_json(&contents)
            .with_context(|| format!("Failed to parse course catalog at path: {}", path.display()))
    }

    /// Parses the catalog from a JSON string.
    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Returns an iterator over the courses and their lessons in catalog order.
    pub fn courses(&self) -> impl Iterator<Item = (&String, &CourseLessons)> {
        self.courses.iter()
    }

    /// Returns the lessons of the given course.
    pub fn course(&self, name: &str) -> Option<&CourseLessons> {
        self.courses.get(name)
    }

    /// Returns the total number of lessons in the catalog.
    pub fn num_lessons(&self) -> usize {
        self.courses.values().map(IndexMap::len).sum()
    }

    /// Adds a lesson to the given course, creating the course if needed.
    #[cfg(test)]
    pub fn insert(&mut self, course: &str, lesson: &str, spec: LessonSpec) {
        self.courses
            .entry(course.to_string())
            .or_default()
            .insert(lesson.to_string(), spec);
    }
}

/// Returns the normalized identifier of a course, used both as its directory name and as the
/// prefix of every source ID generated for it.
pub fn course_dir(course: &str) -> String {
    course.replace(' ', "_").replace('&', "").to_lowercase()
}
