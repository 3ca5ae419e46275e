use crate::app::Transition;
use crate::model::{NewTask, Stage, Task, TaskId};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Create(NewTask),
    Edit {
        id: TaskId,
        title: String,
        description: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryField {
    Title,
    Description,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryTarget {
    Create(Stage),
    Edit(TaskId),
}

#[derive(Debug, Clone)]
pub struct FieldValue {
    value: String,
    cursor: usize,
}

impl FieldValue {
    fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    fn move_left(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor = prev_char_boundary(self.cursor, &self.value);
    }

    fn move_right(&mut self) {
        if self.cursor >= self.value.len() {
            return;
        }
        self.cursor = next_char_boundary(self.cursor, &self.value);
    }

    fn move_up(&mut self) {
        let (line_starts, line_idx, col) = line_state(&self.value, self.cursor);
        if line_idx == 0 {
            return;
        }
        self.cursor = index_at_col(&self.value, line_starts[line_idx - 1], col);
    }

    fn move_down(&mut self) {
        let (line_starts, line_idx, col) = line_state(&self.value, self.cursor);
        if line_idx + 1 >= line_starts.len() {
            return;
        }
        self.cursor = index_at_col(&self.value, line_starts[line_idx + 1], col);
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_char_boundary(self.cursor, &self.value);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    pub fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }
}

#[derive(Debug, Clone)]
pub struct EntryForm {
    target: EntryTarget,
    title: FieldValue,
    description: FieldValue,
    field: EntryField,
    notice: Option<String>,
}

impl EntryForm {
    pub fn create(stage: Stage) -> Self {
        EntryForm {
            target: EntryTarget::Create(stage),
            title: FieldValue::new(""),
            description: FieldValue::new(""),
            field: EntryField::Title,
            notice: None,
        }
    }

    pub fn edit(task: &Task) -> Self {
        EntryForm {
            target: EntryTarget::Edit(task.id),
            title: FieldValue::new(&task.title),
            description: FieldValue::new(&task.description),
            field: EntryField::Title,
            notice: None,
        }
    }

    pub fn heading(&self) -> String {
        match self.target {
            EntryTarget::Create(stage) => format!("New Task ({})", stage.label()),
            EntryTarget::Edit(id) => format!("Edit Task {}", id),
        }
    }

    pub fn field(&self) -> EntryField {
        self.field
    }

    pub fn title(&self) -> &FieldValue {
        &self.title
    }

    pub fn description(&self) -> &FieldValue {
        &self.description
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Transition {
        match key.code {
            KeyCode::Esc => return Transition::BackToBoard,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Transition::BackToBoard
            }
            KeyCode::Tab | KeyCode::BackTab => self.toggle_field(),
            KeyCode::Left => self.active_field_mut().move_left(),
            KeyCode::Right => self.active_field_mut().move_right(),
            KeyCode::Up => self.active_field_mut().move_up(),
            KeyCode::Down => self.active_field_mut().move_down(),
            KeyCode::Enter => match self.field {
                EntryField::Title => self.field = EntryField::Description,
                EntryField::Description if key.modifiers.contains(KeyModifiers::ALT) => {
                    self.description.insert_char('\n')
                }
                EntryField::Description => {
                    if let Some(submission) = self.submit() {
                        return Transition::Submit(submission);
                    }
                }
            },
            KeyCode::Backspace => self.active_field_mut().backspace(),
            KeyCode::Char(c) => {
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                {
                    self.active_field_mut().insert_char(c);
                }
            }
            _ => {}
        }
        Transition::Stay
    }

    fn submit(&mut self) -> Option<Submission> {
        let title = self.title.value.trim();
        if title.is_empty() {
            self.notice = Some("title is required".into());
            self.field = EntryField::Title;
            return None;
        }
        let title = title.to_string();
        let description = self.description.value.trim_end().to_string();
        Some(match self.target {
            EntryTarget::Create(stage) => Submission::Create(NewTask::new(stage, title, description)),
            EntryTarget::Edit(id) => Submission::Edit {
                id,
                title,
                description,
            },
        })
    }

    fn toggle_field(&mut self) {
        self.field = match self.field {
            EntryField::Title => EntryField::Description,
            EntryField::Description => EntryField::Title,
        };
    }

    fn active_field_mut(&mut self) -> &mut FieldValue {
        match self.field {
            EntryField::Title => &mut self.title,
            EntryField::Description => &mut self.description,
        }
    }
}

fn prev_char_boundary(cursor: usize, text: &str) -> usize {
    text[..cursor]
        .char_indices()
        .next_back()
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn next_char_boundary(cursor: usize, text: &str) -> usize {
    text[cursor..]
        .chars()
        .next()
        .map(|ch| cursor + ch.len_utf8())
        .unwrap_or(text.len())
}

fn line_state(text: &str, cursor: usize) -> (Vec<usize>, usize, usize) {
    let mut starts = vec![0];
    starts.extend(
        text.char_indices()
            .filter(|(_, ch)| *ch == '\n')
            .map(|(idx, _)| idx + 1),
    );
    let line_idx = starts
        .iter()
        .rposition(|start| *start <= cursor)
        .unwrap_or(0);
    let col = text[starts[line_idx]..cursor].chars().count();
    (starts, line_idx, col)
}

fn index_at_col(text: &str, start: usize, target_col: usize) -> usize {
    let slice = &text[start..];
    let limit = slice.find('\n').unwrap_or(slice.len());
    slice[..limit]
        .char_indices()
        .nth(target_col)
        .map(|(idx, _)| start + idx)
        .unwrap_or(start + limit)
}
