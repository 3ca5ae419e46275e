use crate::board::Board;
use crate::entry::{EntryForm, Submission};
use crate::timer::Timer;
use crate::ui;
use anyhow::Result;
use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::collections::VecDeque;
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};
use tracing::{debug, info};

const IDLE_POLL: Duration = Duration::from_millis(200);

pub enum Transition {
    Stay,
    Quit,
    OpenEntry(EntryForm),
    OpenTimer,
    BackToBoard,
    Submit(Submission),
    Defer(Deferred),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deferred {
    ClearBoard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveScreen {
    Board,
    Entry,
    Timer,
}

pub struct App {
    board: Board,
    entry: Option<EntryForm>,
    timer: Timer,
    active: ActiveScreen,
    deferred: VecDeque<Deferred>,
    quit: bool,
}

pub fn run(board: Board) -> Result<Board> {
    let mut terminal = setup_terminal()?;
    let mut app = App::new(board);
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    result.map(|_| app.into_board())
}

impl App {
    pub fn new(board: Board) -> Self {
        App {
            board,
            entry: None,
            timer: Timer::default(),
            active: ActiveScreen::Board,
            deferred: VecDeque::new(),
            quit: false,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    pub fn entry(&self) -> Option<&EntryForm> {
        self.entry.as_ref()
    }

    pub fn active(&self) -> ActiveScreen {
        self.active
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn into_board(self) -> Board {
        self.board
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let size = terminal.size()?;
        self.handle_resize(size.width, size.height);
        loop {
            terminal.draw(|f| ui::draw(f, self))?;
            if self.run_deferred() {
                continue;
            }
            if self.should_quit() {
                break;
            }
            if event::poll(self.poll_timeout(Instant::now()))? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        self.handle_key(key, Instant::now())
                    }
                    Event::Resize(width, height) => self.handle_resize(width, height),
                    _ => {}
                }
            }
            self.fire_due_tick(Instant::now());
        }
        info!("event loop finished");
        Ok(())
    }

    pub fn handle_resize(&mut self, width: u16, height: u16) {
        self.board.initialize(width, height);
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        let transition = match self.active {
            ActiveScreen::Board => self.board.handle_key(key),
            ActiveScreen::Timer => self.timer.handle_key(key, now),
            ActiveScreen::Entry => match self.entry.as_mut() {
                Some(form) => form.handle_key(key),
                None => Transition::BackToBoard,
            },
        };
        self.apply(transition);
    }

    fn apply(&mut self, transition: Transition) {
        match transition {
            Transition::Stay => {}
            Transition::Quit => self.quit = true,
            Transition::OpenEntry(form) => {
                self.entry = Some(form);
                self.switch_to(ActiveScreen::Entry);
            }
            Transition::OpenTimer => self.switch_to(ActiveScreen::Timer),
            Transition::BackToBoard => {
                self.entry = None;
                self.switch_to(ActiveScreen::Board);
            }
            Transition::Submit(submission) => {
                self.entry = None;
                self.switch_to(ActiveScreen::Board);
                match submission {
                    Submission::Create(task) => self.board.receive_created(task),
                    Submission::Edit {
                        id,
                        title,
                        description,
                    } => self.board.receive_edited(id, title, description),
                }
            }
            Transition::Defer(request) => self.deferred.push_back(request),
        }
    }

    fn switch_to(&mut self, screen: ActiveScreen) {
        if self.active != screen {
            debug!(from = ?self.active, to = ?screen, "switching screen");
            self.active = screen;
        }
    }

    pub fn run_deferred(&mut self) -> bool {
        let mut ran = false;
        while let Some(request) = self.deferred.pop_front() {
            match request {
                Deferred::ClearBoard => self.board.clear_board(),
            }
            ran = true;
        }
        ran
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timer.armed().map(|tick| tick.due)
    }

    fn poll_timeout(&self, now: Instant) -> Duration {
        self.next_deadline()
            .map(|due| due.saturating_duration_since(now).min(IDLE_POLL))
            .unwrap_or(IDLE_POLL)
    }

    /// Delivers the armed tick once its deadline has passed, whichever screen
    /// is active.
    pub fn fire_due_tick(&mut self, now: Instant) {
        if let Some(tick) = self.timer.armed() {
            if now >= tick.due {
                self.timer.on_tick(tick.token, now);
            }
        }
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
