//! Contains the state of the application and the logic to run each stage of the pipeline.

use anyhow::{anyhow, ensure, Context, Result};
use indoc::formatdoc;
use std::path::PathBuf;

use crate::{
    auth::{StoredCredentials, SCOPES},
    built_info,
    catalog::{course_dir, CourseCatalog, CourseLessons},
    channel::{ChannelAssembler, ChannelNode, LessonArtifact, LessonArtifacts},
    config::ChefConfig,
    display,
    drive::{self, AssetFetcher, DriveFolder},
    error::FetchError,
    lesson::LessonBuilder,
    materialize, package,
    publish::{ChannelPublisher, JsonPublisher},
};

/// Stores the configuration and the lessons packaged so far.
pub(crate) struct ChefApp {
    /// The configuration of the run.
    config: ChefConfig,

    /// The packaged lessons, filled in by the prepare stage.
    artifacts: LessonArtifacts,
}

impl ChefApp {
    pub fn new(config: ChefConfig) -> Self {
        Self {
            config,
            artifacts: LessonArtifacts::default(),
        }
    }

    /// Returns the message shown when the chef starts.
    pub fn startup_message() -> String {
        formatdoc! {r#"
                atingi chef - Packages the atingi courses into a content channel

                Chef Version: {}
                Commit Hash: {}

            "#,
            built_info::PKG_VERSION,
            built_info::GIT_COMMIT_HASH.unwrap_or("UNKNOWN"),
        }
    }

    /// Reads the course catalog.
    pub fn load_catalog(&self) -> Result<CourseCatalog> {
        let catalog = CourseCatalog::load(&self.config.catalog_path())?;
        tracing::info!(
            "Loaded {} lessons from {}",
            catalog.num_lessons(),
            self.config.catalog_path().display()
        );
        Ok(catalog)
    }

    /// Downloads the course archives into the data directory.
    pub fn fetch(&mut self) -> Result<Vec<PathBuf>> {
        let http = drive::http_client()?;
        let credentials = StoredCredentials::new(
            &self.config.token_file,
            &self.config.client_secret_file,
            http.clone(),
        );
        let remote = DriveFolder::new(http, credentials);
        let mut fetcher = AssetFetcher::new(remote, &self.config.data_dir);

        match fetcher.fetch(&self.config.drive_folder_id, &self.config.archive_mime_type) {
            Ok(fetched) => {
                tracing::info!(
                    "{} archives staged in {}",
                    fetched.len(),
                    self.config.data_dir.display()
                );
                Ok(fetched)
            }
            Err(e @ FetchError::Auth(_)) => {
                tracing::error!(
                    "Authorize the client for the scopes {} and store its token at {}",
                    SCOPES.join(", "),
                    self.config.token_file.display()
                );
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Extracts every staged archive.
    pub fn extract(&mut self) -> Result<Vec<PathBuf>> {
        ensure!(
            self.config.data_dir.is_dir(),
            "data directory {} does not exist",
            self.config.data_dir.display()
        );
        materialize::extract_all(&self.config.data_dir)
    }

    /// Returns the path of the zip of the given lesson.
    fn lesson_zip_path(&self, course_dir: &str, lesson_key: &str) -> PathBuf {
        self.config
            .zips_path()
            .join(course_dir)
            .join(format!("{lesson_key}.zip"))
    }

    /// Builds and packages every lesson of the given course.
    fn prepare_course(&mut self, course: &str, lessons: &CourseLessons) -> Result<()> {
        let course_dir = course_dir(course);
        let builder = LessonBuilder::new(&self.config);
        for (lesson_key, spec) in lessons {
            let lesson_dir = builder
                .prepare(&course_dir, lesson_key, spec)
                .with_context(|| format!("Failed to prepare lesson {lesson_key} in {course}"))?;
            let zip_path = package::create_predictable_zip(
                &lesson_dir,
                &self.lesson_zip_path(&course_dir, lesson_key),
            )?;
            self.artifacts
                .insert(course, lesson_key, LessonArtifact { zip_path });
        }
        Ok(())
    }

    /// Builds and packages the lessons of every course, or only those of the given course.
    pub fn prepare(&mut self, catalog: &CourseCatalog, course: Option<&str>) -> Result<()> {
        match course {
            Some(name) => {
                let lessons = catalog
                    .course(name)
                    .ok_or_else(|| anyhow!("course {} is not in the catalog", name))?;
                self.prepare_course(name, lessons)?;
            }
            None => {
                for (name, lessons) in catalog.courses() {
                    self.prepare_course(name, lessons)?;
                }
            }
        }
        tracing::info!("{} lessons packaged", self.artifacts.len());
        Ok(())
    }

    /// Records the lesson zips left by a previous run.
    pub fn collect_existing_artifacts(&mut self, catalog: &CourseCatalog) {
        for (course, lessons) in catalog.courses() {
            let course_dir = course_dir(course);
            for lesson_key in lessons.keys() {
                let zip_path = self.lesson_zip_path(&course_dir, lesson_key);
                if zip_path.is_file() {
                    self.artifacts
                        .insert(course, lesson_key, LessonArtifact { zip_path });
                }
            }
        }
    }

    /// Builds the channel tree from the packaged lessons.
    pub fn assemble(&self, catalog: &CourseCatalog) -> ChannelNode {
        ChannelAssembler::new(&self.config.data_dir).assemble(catalog, &self.artifacts)
    }

    /// Hands the channel tree to the given publisher.
    pub fn publish(
        &self,
        channel: &ChannelNode,
        publisher: &mut impl ChannelPublisher,
    ) -> Result<()> {
        publisher.publish(channel)
    }

    /// Runs every stage of the pipeline. A failure to fetch is logged and the run continues with
    /// the archives already staged.
    pub fn run(&mut self, skip_fetch: bool) -> Result<()> {
        let catalog = self.load_catalog()?;
        if skip_fetch {
            tracing::info!("Skipping the fetch stage");
        } else if let Err(e) = self.fetch() {
            tracing::warn!("Error fetching archives: {:#}", e);
        }

        self.extract()?;
        self.prepare(&catalog, None)?;
        if self.artifacts.is_empty() {
            tracing::warn!("No lessons were packaged, the channel will be empty");
        }
        let channel = self.assemble(&catalog);
        let mut publisher = JsonPublisher::new(&self.config.channel_output_path());
        self.publish(&channel, &mut publisher)
    }

    /// Prints the channel tree built from the lesson zips already on disk.
    pub fn show_tree(&mut self) -> Result<()> {
        let catalog = self.load_catalog()?;
        self.collect_existing_artifacts(&catalog);
        display::print_tree(&self.assemble(&catalog));
        Ok(())
    }

    /// Prints the courses in the catalog.
    pub fn list_courses(&self) -> Result<()> {
        let catalog = self.load_catalog()?;
        println!("{:<40} {:>8}  Directory", "Course", "Lessons");
        for (name, lessons) in catalog.courses() {
            println!("{:<40} {:>8}  {}", name, lessons.len(), course_dir(name));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::{fs, io::Write, path::Path};
    use zip::write::SimpleFileOptions;

    use super::*;
    use crate::channel::NodeKind;

    /// Writes a modules archive with one SCORM lesson whose body is the given text.
    fn write_modules_archive(data_dir: &Path, body: &str) {
        let file = fs::File::create(data_dir.join("LearningEquality_atingi_Modules.zip")).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        zip.start_file("intro/scormcontent/index.html", options)
            .unwrap();
        write!(zip, "<html><head></head><body>{body}</body></html>").unwrap();
        zip.start_file("intro/scormcontent/assets/video.mp4", options)
            .unwrap();
        zip.write_all(b"video").unwrap();
        zip.finish().unwrap();
    }

    /// Writes a modules archive with one SCORM lesson to the data directory and a catalog that
    /// references it.
    fn stage_course(data_dir: &Path) {
        fs::create_dir_all(data_dir).unwrap();
        write_modules_archive(data_dir, "intro");

        fs::write(
            data_dir.join("course_data.json"),
            r#"{
                "Digital Marketing": {
                    "lesson_1": {
                        "title": "Module 1: Intro",
                        "file": "intro",
                        "route": "abc",
                        "remove_assets": ["video.mp4"]
                    }
                }
            }"#,
        )
        .unwrap();
    }

    fn test_app(root: &Path) -> ChefApp {
        let config = ChefConfig {
            data_dir: root.join("chefdata"),
            ..Default::default()
        };
        stage_course(&config.data_dir);
        ChefApp::new(config)
    }

    /// Verifies running the pipeline without fetching.
    #[test]
    fn test_run_offline() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut app = test_app(temp_dir.path());
        app.run(true).unwrap();

        let data_dir = temp_dir.path().join("chefdata");
        let lesson_dir = data_dir.join("digital_marketing").join("lesson_1");
        let html = fs::read_to_string(lesson_dir.join("index.html")).unwrap();
        assert!(html.contains("#/lessons/abc"));
        assert!(!lesson_dir.join("assets").join("video.mp4").exists());

        let zip_path = data_dir
            .join("zips")
            .join("digital_marketing")
            .join("lesson_1.zip");
        assert!(zip_path.is_file());

        let document: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(data_dir.join("channel.json")).unwrap())
                .unwrap();
        assert_eq!(1, document["num_lessons"]);
    }

    /// Verifies that a second run leaves the lesson zips untouched.
    #[test]
    fn test_run_twice() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut app = test_app(temp_dir.path());
        app.run(true).unwrap();
        let zip_path = temp_dir
            .path()
            .join("chefdata")
            .join("zips")
            .join("digital_marketing")
            .join("lesson_1.zip");
        let first = fs::read(&zip_path).unwrap();

        let mut app = ChefApp::new(app.config.clone());
        app.run(true).unwrap();
        assert_eq!(first, fs::read(&zip_path).unwrap());
    }

    /// Verifies that staging a new modules archive rebuilds and repackages the lessons.
    #[test]
    fn test_run_after_archive_change() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut app = test_app(temp_dir.path());
        app.run(true).unwrap();

        let data_dir = temp_dir.path().join("chefdata");
        let zip_path = data_dir
            .join("zips")
            .join("digital_marketing")
            .join("lesson_1.zip");
        let first_zip = fs::read(&zip_path).unwrap();
        write_modules_archive(&data_dir, "corrected");

        let mut app = ChefApp::new(app.config.clone());
        app.run(true).unwrap();
        let extracted = data_dir
            .join("LearningEquality_atingi_Modules")
            .join("intro/scormcontent/index.html");
        assert!(fs::read_to_string(extracted).unwrap().contains("corrected"));
        let lesson_html = data_dir
            .join("digital_marketing")
            .join("lesson_1")
            .join("index.html");
        let html = fs::read_to_string(lesson_html).unwrap();
        assert!(html.contains("<body>corrected</body>"));
        assert!(html.contains("#/lessons/abc"));
        assert_ne!(first_zip, fs::read(&zip_path).unwrap());
    }

    /// Verifies that preparing an unknown course fails.
    #[test]
    fn test_prepare_unknown_course() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut app = test_app(temp_dir.path());
        let catalog = app.load_catalog().unwrap();
        assert!(app.prepare(&catalog, Some("Unknown")).is_err());
    }

    /// Verifies that the zips of a previous run are picked up when assembling the tree.
    #[test]
    fn test_collect_existing_artifacts() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut app = test_app(temp_dir.path());
        app.extract().unwrap();
        let catalog = app.load_catalog().unwrap();
        app.prepare(&catalog, Some("Digital Marketing")).unwrap();

        let mut app = ChefApp::new(app.config.clone());
        assert_eq!(0, app.assemble(&catalog).num_leaves());
        app.collect_existing_artifacts(&catalog);
        let channel = app.assemble(&catalog);
        assert_eq!(1, channel.num_leaves());
        assert_eq!(NodeKind::SubTopic, channel.children[0].children[0].kind);
    }

    /// A publisher that keeps the published trees in memory.
    #[derive(Default)]
    struct RecordingPublisher {
        published: Vec<ChannelNode>,
    }

    impl ChannelPublisher for RecordingPublisher {
        fn publish(&mut self, channel: &ChannelNode) -> Result<()> {
            self.published.push(channel.clone());
            Ok(())
        }
    }

    /// Verifies that the assembled tree is handed to the publisher.
    #[test]
    fn test_publish() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut app = test_app(temp_dir.path());
        app.extract().unwrap();
        let catalog = app.load_catalog().unwrap();
        app.prepare(&catalog, None).unwrap();

        let channel = app.assemble(&catalog);
        let mut publisher = RecordingPublisher::default();
        app.publish(&channel, &mut publisher).unwrap();
        assert_eq!(vec![channel], publisher.published);
    }

    /// Verifies that a missing data directory is reported.
    #[test]
    fn test_extract_missing_data_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut app = ChefApp::new(ChefConfig {
            data_dir: temp_dir.path().join("missing"),
            ..Default::default()
        });
        assert!(app.extract().is_err());
    }
}
