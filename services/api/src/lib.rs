mod cli;
mod infra;
mod review;
mod routes;
mod server;

use loan_review::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
