use crate::demo::{run_claim, run_demo, run_list, ClaimArgs, DemoArgs, ListArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use shelter_rescue::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Shelter Rescue Dispatch",
    about = "Run and exercise the rescue assignment engine from the command line",
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
    /// Inspect or claim open rescues against a one-shot in-memory dataset
    Rescues {
        #[command(subcommand)]
        command: RescuesCommand,
    },
    /// Walk through claim, conflict, training gaps and a simulated claim race
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum RescuesCommand {
    /// Rank open rescues for a volunteer
    List(ListArgs),
    /// Claim a rescue for a volunteer
    Claim(ClaimArgs),
}

/// CSV sources used to seed the in-memory stores. The bundled sample data fills any gap.
#[derive(Args, Debug, Default, Clone)]
pub(crate) struct DataArgs {
    /// Incident report CSV export
    #[arg(long)]
    pub(crate) reports_csv: Option<PathBuf>,
    /// Volunteer roster CSV export
    #[arg(long)]
    pub(crate) volunteers_csv: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    #[command(flatten)]
    pub(crate) data: DataArgs,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Rescues {
            command: RescuesCommand::List(args),
        } => run_list(args),
        Command::Rescues {
            command: RescuesCommand::Claim(args),
        } => run_claim(args),
        Command::Demo(args) => run_demo(args),
    }
}
