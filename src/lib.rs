pub mod api;
pub mod app;
pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod fetch;
pub mod labels;
pub mod mail;
pub mod output;
pub mod report;

use cli::Cli;
use error::AppResult;
use output::Output;

pub async fn run(cli: Cli, output: Output) -> AppResult<()> {
    app::run(cli, output).await
}
