//! tortlens: medical-device mass-tort research toolkit.
//! Entry point for the command-line binary.

mod cli;
mod commands;
mod config;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, DatasetCommand, DocketsCommand, MaudeCommand, ReferenceCommand};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays clean for reports
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tortlens=info,warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = config::Config::load(cli.config.as_deref())?;
    info!(version = env!("CARGO_PKG_VERSION"), "tortlens starting");

    match cli.command {
        Command::Maude { action } => match action {
            MaudeCommand::Search { filters, max_pages, dedup, out } => {
                commands::maude::search(&config, &filters, max_pages, &dedup, &out).await
            }
            MaudeCommand::Count { filters, field, top } => {
                commands::maude::count(&config, &filters, &field, top).await
            }
        },
        Command::Dockets { action } => match action {
            DocketsCommand::Search { q, filed_after, max_pages, out } => {
                commands::dockets::search(&config, &q, filed_after, max_pages, &out).await
            }
        },
        Command::Dataset { action } => match action {
            DatasetCommand::Merge { base, dockets, cases, reference, in_place } => {
                commands::dataset::merge(&base, &dockets, &cases, reference, in_place)
            }
            DatasetCommand::Summary { base } => commands::dataset::summary(&base),
            DatasetCommand::Match { base, events, out } => {
                commands::dataset::match_events(&base, &events, out.as_deref())
            }
        },
        Command::Reference { action } => match action {
            ReferenceCommand::Show { mdl, manufacturer } => {
                commands::reference::show(mdl, manufacturer.as_deref())
            }
        },
    }
}
