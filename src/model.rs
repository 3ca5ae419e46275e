use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TaskId(pub i64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Stage {
    Todo,
    InProgress,
    Done,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Todo, Stage::InProgress, Stage::Done];

    pub fn index(self) -> usize {
        match self {
            Stage::Todo => 0,
            Stage::InProgress => 1,
            Stage::Done => 2,
        }
    }

    pub fn from_index(idx: usize) -> Option<Stage> {
        Stage::ALL.get(idx).copied()
    }

    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Todo => Some(Stage::InProgress),
            Stage::InProgress => Some(Stage::Done),
            Stage::Done => None,
        }
    }

    pub fn prev(self) -> Option<Stage> {
        match self {
            Stage::Todo => None,
            Stage::InProgress => Some(Stage::Todo),
            Stage::Done => Some(Stage::InProgress),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Todo => "To Do",
            Stage::InProgress => "In Progress",
            Stage::Done => "Done",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Stage::Todo => "todo",
            Stage::InProgress => "doing",
            Stage::Done => "done",
        }
    }

    pub fn parse(input: &str) -> Option<Stage> {
        match input.trim().to_ascii_lowercase().as_str() {
            "todo" | "to-do" | "0" => Some(Stage::Todo),
            "doing" | "in-progress" | "inprogress" | "1" => Some(Stage::InProgress),
            "done" | "2" => Some(Stage::Done),
            _ => None,
        }
    }

    pub fn to_db(self) -> i64 {
        self.index() as i64
    }

    pub fn from_db(value: i64) -> Option<Stage> {
        usize::try_from(value).ok().and_then(Stage::from_index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub stage: Stage,
    pub title: String,
    pub description: String,
}

impl NewTask {
    pub fn new(stage: Stage, title: impl Into<String>, description: impl Into<String>) -> Self {
        NewTask {
            stage,
            title: title.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub stage: Stage,
    pub title: String,
    pub description: String,
}

impl Task {
    pub fn from_new(id: TaskId, task: NewTask) -> Self {
        Task {
            id,
            stage: task.stage,
            title: task.title,
            description: task.description,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub stage: Stage,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
