mod cli;
mod infra;
mod reconcile;
mod routes;
mod server;

use exam_alerts::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
