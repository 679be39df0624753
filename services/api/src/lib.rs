mod cli;
mod demo;
mod infra;
mod ranking;
mod routes;
mod server;

use profitrack::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
