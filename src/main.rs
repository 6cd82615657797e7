//! A content chef that packages the atingi courses into a content channel.

mod app;
mod auth;
mod built_info {
    // The file has been placed there by the build script.
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}
mod catalog;
mod channel;
mod cli;
mod config;
mod display;
mod drive;
mod error;
mod html_patch;
mod images;
mod lesson;
mod marker;
mod materialize;
mod package;
mod publish;

use anyhow::Result;
use app::ChefApp;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::ChefCli;

/// Sets up logging to stderr. `RUST_LOG` takes precedence over the verbosity flag.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// The entry-point for the command-line interface.
fn main() -> Result<()> {
    let cli = ChefCli::parse();
    init_logging(cli.verbose);

    eprint!("{}", ChefApp::startup_message());
    let config = cli.load_config()?;
    let mut app = ChefApp::new(config);
    cli.execute_subcommand(&mut app)
}
