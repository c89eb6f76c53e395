use crate::report::{run_counts, run_search, CountsArgs, SearchArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use soup_directory::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Soup Directory",
    about = "Run the soup restaurant directory service or query a seeded directory",
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
    /// Search a seeded directory and print matching restaurants
    Search(SearchArgs),
    /// Print per-city and per-soup-type counts for a seeded directory
    Counts(CountsArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Seed the in-memory directory from a CSV export before serving
    #[arg(long, value_name = "PATH")]
    pub(crate) seed_csv: Option<std::path::PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Search(args) => run_search(args),
        Command::Counts(args) => run_counts(args),
    }
}
