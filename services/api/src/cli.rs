use crate::plan::{run_plan, PlanArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use linkdesk::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "linkdesk",
    about = "Plan and serve domain-to-line-item assignments for link placement orders",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Compute assignment plans for the orders in a fixture file and print them
    Plan(PlanArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// JSON fixture used to seed the in-memory order and domain stores
    #[arg(long)]
    pub(crate) fixture: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Plan(args) => run_plan(args),
    }
}
