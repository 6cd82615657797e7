//! Contains the logic to parse and execute command-line instructions.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::{app::ChefApp, config::ChefConfig};

/// Contains the available subcommands.
#[derive(Debug, Subcommand)]
pub(crate) enum Subcommands {
    #[clap(about = "List the courses in the catalog with their lesson counts")]
    Courses,

    #[clap(about = "Extract the staged course archives")]
    Extract,

    #[clap(about = "Download the course archives from the shared drive folder")]
    Fetch,

    #[clap(about = "Build and package the lessons of every course or of the given course")]
    Prepare {
        #[clap(help = "The name of the course, as written in the catalog")]
        #[clap(long = "course")]
        course: Option<String>,
    },

    #[clap(about = "Run the whole pipeline and write the channel tree")]
    Run {
        #[clap(help = "Work with the archives already staged instead of downloading them")]
        #[clap(long = "skip-fetch")]
        skip_fetch: bool,
    },

    #[clap(about = "Show the channel tree built from the lessons packaged so far")]
    Tree,
}

/// A command-line interface for the atingi chef.
#[derive(Debug, Parser)]
#[clap(name = "atingi-chef")]
#[clap(author, version, about, long_about = None)]
pub(crate) struct ChefCli {
    #[clap(help = "The TOML configuration file. Defaults to chef.toml if present")]
    #[clap(long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[clap(help = "Overrides the data directory set in the configuration")]
    #[clap(long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    #[clap(help = "Log debug messages")]
    #[clap(long = "verbose", short = 'v', global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub commands: Subcommands,
}

impl ChefCli {
    /// Loads the configuration and applies the overrides given in the command line.
    pub fn load_config(&self) -> Result<ChefConfig> {
        let mut config = ChefConfig::load(self.config.as_deref())?;
        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
        Ok(config)
    }

    /// Executes the parsed subcommand.
    pub fn execute_subcommand(&self, app: &mut ChefApp) -> Result<()> {
        match &self.commands {
            Subcommands::Courses => app.list_courses(),

            Subcommands::Extract => {
                let extracted = app.extract()?;
                println!("Extracted {} archives", extracted.len());
                Ok(())
            }

            Subcommands::Fetch => {
                let fetched = app.fetch()?;
                println!("Fetched {} archives", fetched.len());
                Ok(())
            }

            Subcommands::Prepare { course } => {
                let catalog = app.load_catalog()?;
                app.prepare(&catalog, course.as_deref())
            }

            Subcommands::Run { skip_fetch } => app.run(*skip_fetch),

            Subcommands::Tree => app.show_tree(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Verifies parsing the global flags and a subcommand.
    #[test]
    fn test_parse_run() {
        let cli = ChefCli::try_parse_from([
            "atingi-chef",
            "run",
            "--skip-fetch",
            "--data-dir",
            "staging",
        ])
        .unwrap();
        assert!(matches!(cli.commands, Subcommands::Run { skip_fetch: true }));
        assert_eq!(Some(PathBuf::from("staging")), cli.data_dir);
        assert!(!cli.verbose);
    }

    /// Verifies parsing the course given to the prepare subcommand.
    #[test]
    fn test_parse_prepare() {
        let cli =
            ChefCli::try_parse_from(["atingi-chef", "prepare", "--course", "Digital Marketing"])
                .unwrap();
        match cli.commands {
            Subcommands::Prepare { course } => {
                assert_eq!(Some("Digital Marketing".to_string()), course)
            }
            _ => panic!("expected the prepare subcommand"),
        }

        let cli = ChefCli::try_parse_from(["atingi-chef", "-v", "prepare"]).unwrap();
        assert!(matches!(cli.commands, Subcommands::Prepare { course: None }));
        assert!(cli.verbose);
    }

    /// Verifies that unknown subcommands are rejected.
    #[test]
    fn test_parse_unknown() {
        assert!(ChefCli::try_parse_from(["atingi-chef", "publish"]).is_err());
        assert!(ChefCli::try_parse_from(["atingi-chef"]).is_err());
    }

    /// Verifies that the data directory flag overrides the configuration.
    #[test]
    fn test_load_config_override() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("chef.toml");
        std::fs::write(&path, "data_dir = \"from_file\"\nmax_image_height = 320\n").unwrap();
        let path_arg = path.to_string_lossy().to_string();

        let cli = ChefCli::try_parse_from([
            "atingi-chef",
            "--config",
            path_arg.as_str(),
            "--data-dir",
            "from_flag",
            "tree",
        ])
        .unwrap();
        let config = cli.load_config().unwrap();
        assert_eq!(PathBuf::from("from_flag"), config.data_dir);
        assert_eq!(320, config.max_image_height);
    }
}
