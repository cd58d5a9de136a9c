mod cli;
mod demo;
mod infra;
mod pages;
mod routes;
mod server;

use admitdesk::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
