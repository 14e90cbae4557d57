pub mod cli;
pub mod dispatch;
pub mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use stepwise_app::{App, FileSessionStore};
use stepwise_core::definition::resolve_session_dir;
use tracing::debug;

use crate::cli::Cli;

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose)?;

    let session_dir = match &cli.session_dir {
        Some(dir) => dir.clone(),
        None => resolve_session_dir().context("failed to resolve session directory")?,
    };
    let store = FileSessionStore::open(&session_dir, &cli.session);
    debug!(path = %store.path().display(), "using session file");
    let app = App::new(&store);

    dispatch::run_with_deps(cli, &app, &store)
}
