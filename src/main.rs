mod app;
mod board;
mod cli;
mod commands;
mod config;
mod entry;
mod logging;
mod model;
mod storage;
mod timer;
mod ui;

use anyhow::Result;
use clap::Parser;
use tracing::info;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let settings = config::Settings::resolve(args.db, args.log_level)?;
    let _guard = logging::init(&settings.log_dir, &settings.log_level)?;
    info!(db = %settings.db_path.display(), "taskdeck starting");

    let command = args.command.unwrap_or(cli::Command::Tui);
    match command {
        cli::Command::Tui => commands::tui(&settings),
        cli::Command::List { stage } => commands::list(&settings, stage),
        cli::Command::Add {
            title,
            description,
            stage,
        } => commands::add(&settings, title, description, stage),
        cli::Command::Export => commands::export(&settings),
        cli::Command::Clear { yes } => commands::clear(&settings, yes),
    }
}
