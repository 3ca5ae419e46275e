use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "taskdeck",
    version,
    about = "Terminal task board with a pomodoro timer"
)]
pub struct Cli {
    /// Path to the task database (defaults to the user data directory)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,
    /// Log filter, e.g. `debug` or `taskdeck=trace` (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Launch the interactive board
    Tui,
    /// Print tasks per column
    List {
        /// Only show one stage (todo, doing, done)
        #[arg(long)]
        stage: Option<String>,
    },
    /// Add a new task
    Add {
        /// Title of the task
        title: String,
        /// Optional description
        #[arg(long)]
        description: Option<String>,
        /// Stage to place the task in (defaults to todo)
        #[arg(long)]
        stage: Option<String>,
    },
    /// Print every stored task as YAML
    Export,
    /// Remove every task
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}
