//! CLI module for the feature evaluation API
//!
//! `serve` runs the HTTP server, `version` prints the API version the
//! server would report and exits.

use clap::{Parser, Subcommand};

use crate::{
    configuration::{init_config, AppState, State},
    error::Error,
    server,
};

/// Feature Evaluation API
///
/// `--version` prints the package version of this binary. The `version`
/// subcommand prints the API version served by `GET /version`, which comes
/// from `API_VERSION` and may differ.
#[derive(Parser)]
#[command(name = "feature-evaluation-api")]
#[command(about = "Feature evaluation REST API server", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the API server (default if no command specified)
    Serve,

    /// Print the API version reported by the version endpoint
    /// (not the package version shown by `--version`)
    Version,
}

/// Run the API server until it is stopped
pub async fn run_serve() -> Result<(), Error> {
    let app_state = init_state()?;
    server::server_task(&app_state).await
}

fn init_state() -> Result<AppState<State>, Error> {
    let config = init_config()?;

    tracing::info!("Starting API version {:?}", config.api_version.as_str());

    Ok(AppState::new(State::new(config)))
}

/// Print the resolved API version
pub fn run_version() -> Result<(), Error> {
    let config = init_config()?;
    println!("{}", config.api_version);
    Ok(())
}
