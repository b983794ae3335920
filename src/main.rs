use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use cachegate::cli::Cli;
use cachegate::config::Config;
use cachegate::server;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = cachegate::telemetry::init(config.log_file_path.as_deref()) {
        eprintln!("failed to initialize logging: {err}");
        return ExitCode::FAILURE;
    }

    let state = match server::build_state(config) {
        Ok(state) => state,
        Err(err) => {
            error!(%err, "failed to build upstream client");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = server::serve(state).await {
        error!(%err, "server exited with error");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
