use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Poll the configured query and stream converted output as JSON lines
    Poll {
        #[arg(long, help = "Poll step config file path")]
        config: PathBuf,

        #[arg(long, help = ".env file layered over the process environment")]
        env_file: Option<PathBuf>,
    },
    /// Validate the config and print the statement plan
    Check {
        #[arg(long, help = "Poll step config file path")]
        config: PathBuf,

        #[arg(long, help = ".env file layered over the process environment")]
        env_file: Option<PathBuf>,
    },
    /// Connect to the configured database and run `SELECT 1`
    TestConn {
        #[arg(long, help = "Poll step config file path")]
        config: PathBuf,

        #[arg(long, help = ".env file layered over the process environment")]
        env_file: Option<PathBuf>,
    },
}
