use crate::model::{NewTask, Stage, Task, TaskId, TaskRecord};
use rusqlite::{params, Connection};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

const SCHEMA_SQL: &str = "CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT,
    status INTEGER,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);";

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("cannot create directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot open task database {path:?}: {source}")]
    Open {
        path: PathBuf,
        source: rusqlite::Error,
    },
    #[error("storage failure: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("stored task has unknown status {0}")]
    InvalidStage(i64),
    #[error("task {0} not found")]
    NotFound(TaskId),
}

pub trait TaskStore {
    fn create(&mut self, task: &NewTask) -> StoreResult<TaskId>;
    fn load_all(&mut self) -> StoreResult<Vec<Task>>;
    fn update(&mut self, id: TaskId, title: &str, description: &str) -> StoreResult<()>;
    fn set_stage(&mut self, id: TaskId, stage: Stage) -> StoreResult<()>;
    fn delete(&mut self, id: TaskId) -> StoreResult<()>;
    fn clear_all(&mut self) -> StoreResult<()>;
    fn records(&mut self) -> StoreResult<Vec<TaskRecord>>;
    fn close(self: Box<Self>) -> StoreResult<()>;
}

pub struct SqliteStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let store = SqliteStore {
            conn,
            path: Some(path.to_path_buf()),
        };
        store.bootstrap()?;
        info!(path = %path.display(), "opened task store");
        Ok(store)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = SqliteStore { conn, path: None };
        store.bootstrap()?;
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn bootstrap(&self) -> StoreResult<()> {
        self.conn.busy_timeout(Duration::from_secs(5))?;
        self.conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    fn mutate_one<P: rusqlite::Params>(&mut self, id: TaskId, sql: &str, params: P) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        let changed = tx.execute(sql, params)?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        tx.commit()?;
        Ok(())
    }
}

impl TaskStore for SqliteStore {
    fn create(&mut self, task: &NewTask) -> StoreResult<TaskId> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO tasks (title, description, status) VALUES (?1, ?2, ?3)",
            params![task.title, task.description, task.stage.to_db()],
        )?;
        let id = TaskId(tx.last_insert_rowid());
        tx.commit()?;
        debug!(%id, stage = ?task.stage, "inserted task");
        Ok(id)
    }

    fn load_all(&mut self) -> StoreResult<Vec<Task>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, title, description, status FROM tasks ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(id, title, description, status)| {
                let raw = status.unwrap_or_default();
                let stage = Stage::from_db(raw).ok_or(StoreError::InvalidStage(raw))?;
                Ok(Task {
                    id: TaskId(id),
                    stage,
                    title,
                    description: description.unwrap_or_default(),
                })
            })
            .collect()
    }

    fn update(&mut self, id: TaskId, title: &str, description: &str) -> StoreResult<()> {
        self.mutate_one(
            id,
            "UPDATE tasks SET title = ?1, description = ?2, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?3",
            params![title, description, id.0],
        )
    }

    fn set_stage(&mut self, id: TaskId, stage: Stage) -> StoreResult<()> {
        self.mutate_one(
            id,
            "UPDATE tasks SET status = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2",
            params![stage.to_db(), id.0],
        )
    }

    fn delete(&mut self, id: TaskId) -> StoreResult<()> {
        self.mutate_one(id, "DELETE FROM tasks WHERE id = ?1", params![id.0])
    }

    fn clear_all(&mut self) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        let removed = tx.execute("DELETE FROM tasks", [])?;
        tx.commit()?;
        info!(removed, "cleared task store");
        Ok(())
    }

    fn records(&mut self) -> StoreResult<Vec<TaskRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, description, status, created_at, updated_at
             FROM tasks ORDER BY status, id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                    row.get::<_, chrono::NaiveDateTime>(4)?,
                    row.get::<_, chrono::NaiveDateTime>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(id, title, description, status, created_at, updated_at)| {
                let raw = status.unwrap_or_default();
                Ok(TaskRecord {
                    id: TaskId(id),
                    title,
                    description: description.unwrap_or_default(),
                    stage: Stage::from_db(raw).ok_or(StoreError::InvalidStage(raw))?,
                    created_at,
                    updated_at,
                })
            })
            .collect()
    }

    fn close(self: Box<Self>) -> StoreResult<()> {
        let path = self.path().map(Path::to_path_buf);
        self.conn.close().map_err(|(_, err)| StoreError::Sqlite(err))?;
        if let Some(path) = path {
            info!(path = %path.display(), "closed task store");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory().expect("in-memory store should open")
    }

    #[test]
    fn create_then_load_contains_task_once() {
        let mut store = store();
        let new = NewTask::new(Stage::Todo, "A", "desc");
        let id = store.create(&new).unwrap();

        let tasks = store.load_all().unwrap();
        assert_eq!(tasks, vec![Task::from_new(id, new)]);
    }

    #[test]
    fn load_all_keeps_insertion_order() {
        let mut store = store();
        for title in ["first", "second", "third"] {
            store.create(&NewTask::new(Stage::Done, title, "")).unwrap();
        }
        let titles: Vec<_> = store
            .load_all()
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, ["first", "second", "third"]);
    }

    #[test]
    fn clear_all_then_load_is_empty() {
        let mut store = store();
        store.create(&NewTask::new(Stage::Todo, "a", "")).unwrap();
        store.create(&NewTask::new(Stage::Done, "b", "")).unwrap();
        store.clear_all().unwrap();
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn duplicate_content_rows_are_targeted_individually() {
        let mut store = store();
        let twin = NewTask::new(Stage::Todo, "same", "same");
        let first = store.create(&twin).unwrap();
        let second = store.create(&twin).unwrap();
        assert_ne!(first, second);

        store.delete(first).unwrap();
        let remaining = store.load_all().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, second);

        store.set_stage(second, Stage::Done).unwrap();
        store.update(second, "renamed", "body").unwrap();
        let task = &store.load_all().unwrap()[0];
        assert_eq!(task.stage, Stage::Done);
        assert_eq!(task.title, "renamed");
        assert_eq!(task.description, "body");
    }

    #[test]
    fn mutations_on_missing_rows_report_not_found() {
        let mut store = store();
        let ghost = TaskId(42);
        assert!(matches!(store.delete(ghost), Err(StoreError::NotFound(id)) if id == ghost));
        assert!(matches!(
            store.set_stage(ghost, Stage::Done),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.update(ghost, "t", "d"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn unknown_status_is_rejected_on_load() {
        let mut store = store();
        store
            .conn
            .execute(
                "INSERT INTO tasks (title, description, status) VALUES ('bad', '', 9)",
                [],
            )
            .unwrap();
        assert!(matches!(store.load_all(), Err(StoreError::InvalidStage(9))));
    }

    #[test]
    fn null_description_loads_as_empty() {
        let mut store = store();
        store
            .conn
            .execute(
                "INSERT INTO tasks (title, status) VALUES ('bare', 1)",
                [],
            )
            .unwrap();
        let tasks = store.load_all().unwrap();
        assert_eq!(tasks[0].description, "");
        assert_eq!(tasks[0].stage, Stage::InProgress);
    }

    #[test]
    fn records_carry_timestamps() {
        let mut store = store();
        let id = store.create(&NewTask::new(Stage::InProgress, "t", "d")).unwrap();
        let records = store.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, id);
        assert!(records[0].updated_at >= records[0].created_at);
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tasks.db");
        {
            let mut store = SqliteStore::open(&path).unwrap();
            store.create(&NewTask::new(Stage::Todo, "kept", "")).unwrap();
            Box::new(store).close().unwrap();
        }
        let mut reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.path(), Some(path.as_path()));
        let tasks = reopened.load_all().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "kept");
    }

    #[test]
    fn open_fails_when_parent_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let result = SqliteStore::open(&blocker.join("tasks.db"));
        assert!(matches!(result, Err(StoreError::CreateDir { .. })));
    }
}
