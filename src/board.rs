use crate::app::{Deferred, Transition};
use crate::entry::EntryForm;
use crate::model::{NewTask, Stage, Task, TaskId};
use crate::storage::{StoreResult, TaskStore};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusDirection {
    Left,
    Right,
}

pub struct Board {
    store: Box<dyn TaskStore>,
    columns: [Vec<Task>; 3],
    selected: [usize; 3],
    focus: Stage,
    loaded: bool,
    viewport: (u16, u16),
    error: Option<String>,
    status: String,
    confirm_clear: bool,
}

impl Board {
    pub fn new(store: Box<dyn TaskStore>) -> Self {
        Board {
            store,
            columns: [Vec::new(), Vec::new(), Vec::new()],
            selected: [0; 3],
            focus: Stage::Todo,
            loaded: false,
            viewport: (0, 0),
            error: None,
            status: String::new(),
            confirm_clear: false,
        }
    }

    pub fn initialize(&mut self, width: u16, height: u16) {
        self.viewport = (width, height);
        if self.loaded {
            return;
        }
        self.loaded = true;
        let Some(tasks) = self.record(|store| store.load_all(), "load tasks") else {
            return;
        };
        let count = tasks.len();
        for task in tasks {
            self.columns[task.stage.index()].push(task);
        }
        self.status = format!("Loaded {} task(s)", count);
        info!(count, width, height, "board loaded");
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn focus(&self) -> Stage {
        self.focus
    }

    pub fn column(&self, stage: Stage) -> &[Task] {
        &self.columns[stage.index()]
    }

    pub fn selected_index(&self, stage: Stage) -> usize {
        self.selected[stage.index()]
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.columns[self.focus.index()].get(self.selected[self.focus.index()])
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn confirming_clear(&self) -> bool {
        self.confirm_clear
    }

    pub fn into_store(self) -> Box<dyn TaskStore> {
        self.store
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Transition {
        if self.confirm_clear {
            return self.handle_confirm_key(key);
        }
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Transition::Quit
            }
            KeyCode::Char('q') | KeyCode::Esc => return Transition::Quit,
            KeyCode::Left | KeyCode::Char('h') => self.move_focus(FocusDirection::Left),
            KeyCode::Right | KeyCode::Char('l') => self.move_focus(FocusDirection::Right),
            KeyCode::Up | KeyCode::Char('k') => self.select_prev(),
            KeyCode::Down | KeyCode::Char('j') => self.select_next(),
            KeyCode::Char('>') | KeyCode::Char('m') => self.advance(),
            KeyCode::Char('<') | KeyCode::Char('b') => self.retreat(),
            KeyCode::Char('n') => return Transition::OpenEntry(EntryForm::create(self.focus)),
            KeyCode::Char('e') => {
                if let Some(form) = self.begin_edit() {
                    return Transition::OpenEntry(form);
                }
            }
            KeyCode::Delete | KeyCode::Backspace | KeyCode::Char('x') => self.delete_selected(),
            KeyCode::Char('c') => {
                self.confirm_clear = true;
                self.status = "Clear every task? (y to confirm, n/Esc to cancel)".into();
            }
            KeyCode::Char('t') => return Transition::OpenTimer,
            _ => {}
        }
        Transition::Stay
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) -> Transition {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                self.confirm_clear = false;
                self.status = "Clearing board...".into();
                Transition::Defer(Deferred::ClearBoard)
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.confirm_clear = false;
                self.status = "Clear canceled".into();
                Transition::Stay
            }
            _ => Transition::Stay,
        }
    }

    pub fn move_focus(&mut self, direction: FocusDirection) {
        let idx = self.focus.index();
        let next = match direction {
            FocusDirection::Left => (idx + 2) % 3,
            FocusDirection::Right => (idx + 1) % 3,
        };
        self.focus = Stage::from_index(next).unwrap_or(Stage::Todo);
    }

    pub fn select_next(&mut self) {
        let idx = self.focus.index();
        if self.selected[idx] + 1 < self.columns[idx].len() {
            self.selected[idx] += 1;
        }
    }

    pub fn select_prev(&mut self) {
        let idx = self.focus.index();
        self.selected[idx] = self.selected[idx].saturating_sub(1);
    }

    pub fn advance(&mut self) {
        self.shift_selected(Stage::next);
    }

    pub fn retreat(&mut self) {
        self.shift_selected(Stage::prev);
    }

    fn shift_selected(&mut self, step: fn(Stage) -> Option<Stage>) {
        let src = self.focus.index();
        let pos = self.selected[src];
        let Some(task) = self.columns[src].get(pos) else {
            return;
        };
        let Some(dest) = step(task.stage) else {
            return;
        };
        let id = task.id;
        if self
            .record(|store| store.set_stage(id, dest), "move task")
            .is_none()
        {
            return;
        }
        let mut task = self.columns[src].remove(pos);
        task.stage = dest;
        debug!(%id, stage = ?dest, "moved task");
        self.status = format!("Moved \"{}\" to {}", task.title, dest.label());
        self.columns[dest.index()].push(task);
        self.clamp_selection(src);
    }

    pub fn delete_selected(&mut self) {
        let src = self.focus.index();
        let pos = self.selected[src];
        let Some(task) = self.columns[src].get(pos) else {
            return;
        };
        let id = task.id;
        if self.record(|store| store.delete(id), "delete task").is_none() {
            return;
        }
        let removed = self.columns[src].remove(pos);
        debug!(%id, "deleted task");
        self.status = format!("Deleted \"{}\"", removed.title);
        self.clamp_selection(src);
    }

    pub fn clear_board(&mut self) {
        if self.record(|store| store.clear_all(), "clear board").is_none() {
            return;
        }
        for column in self.columns.iter_mut() {
            column.clear();
        }
        self.selected = [0; 3];
        self.status = "Board cleared".into();
    }

    pub fn receive_created(&mut self, task: NewTask) {
        let Some(id) = self.record(|store| store.create(&task), "save task") else {
            return;
        };
        let idx = task.stage.index();
        self.status = format!("Created \"{}\"", task.title);
        self.columns[idx].push(Task::from_new(id, task));
        self.selected[idx] = self.columns[idx].len() - 1;
        debug!(%id, "created task");
    }

    pub fn receive_edited(&mut self, id: TaskId, title: String, description: String) {
        if self
            .record(|store| store.update(id, &title, &description), "update task")
            .is_none()
        {
            return;
        }
        if let Some(task) = self
            .columns
            .iter_mut()
            .flat_map(|column| column.iter_mut())
            .find(|task| task.id == id)
        {
            task.title = title;
            task.description = description;
            self.status = format!("Updated \"{}\"", task.title);
        }
    }

    pub fn begin_edit(&mut self) -> Option<EntryForm> {
        match self.selected_task() {
            Some(task) => Some(EntryForm::edit(task)),
            None => {
                self.status = "No task selected to edit".into();
                None
            }
        }
    }

    fn clamp_selection(&mut self, idx: usize) {
        let len = self.columns[idx].len();
        self.selected[idx] = self.selected[idx].min(len.saturating_sub(1));
    }

    /// Runs a store call; success clears the sticky error, failure replaces it.
    fn record<T>(
        &mut self,
        op: impl FnOnce(&mut dyn TaskStore) -> StoreResult<T>,
        action: &str,
    ) -> Option<T> {
        match op(self.store.as_mut()) {
            Ok(value) => {
                self.error = None;
                Some(value)
            }
            Err(err) => {
                error!(error = %err, action, "store operation failed");
                self.error = Some(format!("{} failed: {}", action, err));
                None
            }
        }
    }
}
