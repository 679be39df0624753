use crate::demo::{run_demo, DemoArgs};
use crate::ranking::{run_score, ScoreArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use profitrack::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "profitrack",
    about = "Rank products by profitability with the SMART and MOORA scoring pipelines",
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
    /// Score products from CSV files, archive the run, and print the ranking
    Score(ScoreArgs),
    /// Walk through the reference data set with both algorithms
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Criteria CSV (id,name,weight,type); built-in criteria are used otherwise
    #[arg(long)]
    pub(crate) criteria: Option<PathBuf>,
    /// Products CSV (id,name,purchase_cost,price_sale,stock,sold,category)
    #[arg(long)]
    pub(crate) products: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Score(args) => run_score(args),
        Command::Demo(args) => run_demo(args),
    }
}
