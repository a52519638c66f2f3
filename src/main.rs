use clap::Parser;
use tracing::{error, Level};

use feature_evaluation_api::{
    cli::{self, Cli, Commands},
    error::Error,
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let result = app_main().await;

    if let Err(err) = &result {
        error!("{}", err);
    }

    result
}

async fn app_main() -> Result<(), Error> {
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_level(true)
        .with_max_level({
            #[cfg(debug_assertions)]
            {
                Level::DEBUG
            }

            #[cfg(not(debug_assertions))]
            {
                Level::INFO
            }
        })
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => cli::run_serve().await,
        Commands::Version => cli::run_version(),
    }
}
