use crate::app;
use crate::board::Board;
use crate::config::Settings;
use crate::model::{NewTask, Stage, Task};
use crate::storage::{SqliteStore, TaskStore};
use anyhow::{anyhow, Context, Result};
use std::io::{self, BufRead, Write};
use tracing::info;

pub fn tui(settings: &Settings) -> Result<()> {
    let store = open_store(settings)?;
    let board = app::run(Board::new(Box::new(store)))?;
    board
        .into_store()
        .close()
        .context("closing task store")?;
    Ok(())
}

pub fn list(settings: &Settings, stage: Option<String>) -> Result<()> {
    let filter = stage.as_deref().map(parse_stage).transpose()?;
    let mut store = open_store(settings)?;
    let stdout = io::stdout();
    write_list(&mut store, filter, &mut stdout.lock())
}

pub fn add(
    settings: &Settings,
    title: String,
    description: Option<String>,
    stage: Option<String>,
) -> Result<()> {
    let stage = stage
        .as_deref()
        .map(parse_stage)
        .transpose()?
        .unwrap_or(Stage::Todo);
    let title = title.trim().to_string();
    if title.is_empty() {
        return Err(anyhow!("title is required"));
    }
    let mut store = open_store(settings)?;
    let task = NewTask::new(stage, title, description.unwrap_or_default());
    let id = store.create(&task).context("adding task")?;
    println!("Added task {} to {}", id, stage.label());
    Ok(())
}

pub fn export(settings: &Settings) -> Result<()> {
    let mut store = open_store(settings)?;
    let records = store.records().context("reading tasks")?;
    let yaml = serde_yaml::to_string(&records).context("serializing tasks")?;
    print!("{}", yaml);
    Ok(())
}

pub fn clear(settings: &Settings, yes: bool) -> Result<()> {
    if !yes {
        print!("Remove every task? [y/N] ");
        io::stdout().flush()?;
        if !confirmed(&mut io::stdin().lock())? {
            println!("Clear canceled");
            return Ok(());
        }
    }
    let mut store = open_store(settings)?;
    store.clear_all().context("clearing tasks")?;
    println!("Board cleared");
    Ok(())
}

fn open_store(settings: &Settings) -> Result<SqliteStore> {
    let store = SqliteStore::open(&settings.db_path)
        .with_context(|| format!("opening task store at {}", settings.db_path.display()))?;
    info!(path = %settings.db_path.display(), "task store ready");
    Ok(store)
}

fn parse_stage(raw: &str) -> Result<Stage> {
    Stage::parse(raw).ok_or_else(|| anyhow!("unknown stage `{}` (use todo, doing or done)", raw))
}

fn confirmed(input: &mut impl BufRead) -> Result<bool> {
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn write_list(store: &mut dyn TaskStore, filter: Option<Stage>, out: &mut impl Write) -> Result<()> {
    let tasks = store.load_all().context("loading tasks")?;
    for stage in Stage::ALL {
        if filter.is_some_and(|wanted| wanted != stage) {
            continue;
        }
        let column: Vec<&Task> = tasks.iter().filter(|t| t.stage == stage).collect();
        writeln!(out, "{} ({})", stage.label(), stage.key())?;
        if column.is_empty() {
            writeln!(out, "  (empty)")?;
        }
        for task in column {
            writeln!(out, "  - {}: {}", task.id, task.title)?;
            for line in task.description.lines() {
                writeln!(out, "    {}", line)?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}
