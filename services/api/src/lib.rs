mod cli;
mod infra;
mod plan;
mod routes;
mod server;

use linkdesk::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
