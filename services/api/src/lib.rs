mod cli;
mod demo;
mod infra;
mod routes;
mod server;

use knock_squared::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
