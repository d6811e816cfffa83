use std::{path::PathBuf, process::ExitCode, sync::Arc};

use clap::Parser;
use client::{ApiClient, FileTokenStore};

use crate::{cli::Cli, commands::Context, error::Result};

mod cli;
mod commands;
mod config;
mod error;
mod render;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!("command failed: {err:?}");
            eprintln!("{}", err.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = config::load(&cli.global)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "dividi={level},client={level},engine={level}",
            level = settings.level
        ))
        .with_writer(std::io::stderr)
        .init();

    let tz = settings.tz()?;
    let tokens = Arc::new(FileTokenStore::load_or_empty(PathBuf::from(
        &settings.token_path,
    )));
    let api = ApiClient::new(&settings.base_url, tokens, settings.request_timeout())?;
    tracing::debug!(base_url = %api.base_url(), "client ready");

    let ctx = Context {
        api,
        config: settings,
        tz,
    };
    commands::run(cli.command, &ctx).await
}
