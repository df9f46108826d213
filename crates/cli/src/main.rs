use crate::{
    error::CliError,
    output::JsonLinesSink,
    shutdown::{Exit, SignalShutdown},
};
use clap::Parser;
use commands::Commands;
use connectors::factory::SqlConnectionFactory;
use engine_config::{
    env::EnvManager,
    report::plan::StatementPlan,
    settings::{PollStepConfig, validated::ValidatedPollSettings, validator::validate},
};
use engine_runtime::execution::executor::PollStep;
use std::{path::Path, process::ExitCode};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod conn;
mod error;
mod output;
mod shutdown;

#[derive(Parser)]
#[command(name = "sluice", version, about = "Incremental SQL poller")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout carries JSON lines.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let shutdown = SignalShutdown::install();

    let exit = match run(cli.command, &shutdown).await {
        Ok(()) if shutdown.signalled() => Exit::Interrupted,
        Ok(()) => Exit::Ok,
        Err(err) => {
            error!(%err, "Command failed");
            Exit::Failed
        }
    };
    exit.into()
}

async fn run(command: Commands, shutdown: &SignalShutdown) -> Result<(), CliError> {
    match command {
        Commands::Poll { config, env_file } => {
            let settings = load_settings(&config, env_file.as_deref())?;
            info!(step = %settings.name, endpoint = %settings.connection.target(), "Starting poll");

            let mut step = PollStep::from_settings(settings)?;
            let mut sink = JsonLinesSink::stdout();
            step.run(&mut sink, shutdown.token()).await?;
        }
        Commands::Check { config, env_file } => {
            let settings = load_settings(&config, env_file.as_deref())?;
            output::print_report(&StatementPlan::new(&settings)?)?;
        }
        Commands::TestConn { config, env_file } => {
            let settings = load_settings(&config, env_file.as_deref())?;
            let factory = SqlConnectionFactory::new(settings.connection.clone());
            conn::ping(&factory, &settings.connection.target()).await?;
        }
    }

    Ok(())
}

fn load_settings(config: &Path, env_file: Option<&Path>) -> Result<ValidatedPollSettings, CliError> {
    let mut env = EnvManager::from_system();
    if let Some(path) = env_file {
        env.load_from_file(path)?;
    }
    let config = PollStepConfig::from_file(config, &env)?;
    Ok(validate(config)?)
}
