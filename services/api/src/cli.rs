use crate::demo::{run_badge, run_demo, BadgeArgs, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use no_dues::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "No-Dues Clearance",
    about = "Run and demonstrate the student no-dues clearance service from the command line",
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
    /// Walk a sample application through every departmental sign-off
    Demo(DemoArgs),
    /// Print the display badge for a stored status string
    Badge(BadgeArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args),
        Command::Badge(args) => run_badge(args),
    }
}
