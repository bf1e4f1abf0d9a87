use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    kingworks::logging::init().context("init logging")?;

    let cli = kingworks::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        kingworks::cli::Command::Scrape(args) => {
            kingworks::scrape::run(args).await.context("scrape")?;
        }
        kingworks::cli::Command::Render(args) => {
            kingworks::render::run(args).context("render")?;
        }
        kingworks::cli::Command::ClearCache(args) => {
            kingworks::cache::run(args).context("clear cache")?;
        }
    }

    Ok(())
}
