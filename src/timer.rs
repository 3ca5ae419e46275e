use crate::app::Transition;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub const DEFAULT_WORK_MINUTES: u32 = 25;
pub const DEFAULT_BREAK_MINUTES: u32 = 5;
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);
pub const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const EDIT_BUFFER_LIMIT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Stopped,
    Running,
    Paused,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Work,
    Break,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    Work,
    Break,
}

/// Identifies one armed tick. A new token is minted every time a tick is
/// armed, so a tick carrying an older token is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickToken(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTick {
    pub token: TickToken,
    pub due: Instant,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum DurationError {
    #[error("`{0}` is not a whole number of minutes")]
    NotANumber(String),
    #[error("duration must be positive, got {0}")]
    NotPositive(i64),
}

pub fn parse_minutes(input: &str) -> Result<u32, DurationError> {
    let trimmed = input.trim();
    let value: i64 = trimmed
        .parse()
        .map_err(|_| DurationError::NotANumber(trimmed.to_string()))?;
    if value <= 0 {
        return Err(DurationError::NotPositive(value));
    }
    u32::try_from(value).map_err(|_| DurationError::NotANumber(trimmed.to_string()))
}

fn minutes(value: u32) -> Duration {
    Duration::from_secs(u64::from(value) * 60)
}

#[derive(Debug)]
pub struct Timer {
    state: TimerState,
    phase: Phase,
    work_duration: Duration,
    break_duration: Duration,
    time_left: Duration,
    last_tick: Option<Instant>,
    work_input: String,
    break_input: String,
    editing: EditField,
    frame: usize,
    generation: u64,
    armed: Option<ScheduledTick>,
}

impl Default for Timer {
    fn default() -> Self {
        Timer::new(minutes(DEFAULT_WORK_MINUTES), minutes(DEFAULT_BREAK_MINUTES))
    }
}

impl Timer {
    pub fn new(work_duration: Duration, break_duration: Duration) -> Self {
        Timer {
            state: TimerState::Stopped,
            phase: Phase::Work,
            work_duration,
            break_duration,
            time_left: work_duration,
            last_tick: None,
            work_input: String::new(),
            break_input: String::new(),
            editing: EditField::Work,
            frame: 0,
            generation: 0,
            armed: None,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn time_left(&self) -> Duration {
        self.time_left
    }

    pub fn work_duration(&self) -> Duration {
        self.work_duration
    }

    pub fn break_duration(&self) -> Duration {
        self.break_duration
    }

    pub fn armed(&self) -> Option<ScheduledTick> {
        self.armed
    }

    pub fn edit_buffers(&self) -> (&str, &str) {
        (&self.work_input, &self.break_input)
    }

    pub fn editing_field(&self) -> EditField {
        self.editing
    }

    pub fn spinner(&self) -> &'static str {
        SPINNER_FRAMES[self.frame % SPINNER_FRAMES.len()]
    }

    pub fn progress(&self) -> f64 {
        let total = match self.phase {
            Phase::Work => self.work_duration,
            Phase::Break => self.break_duration,
        };
        if total.is_zero() {
            return 0.0;
        }
        (1.0 - self.time_left.as_secs_f64() / total.as_secs_f64()).clamp(0.0, 1.0)
    }

    pub fn start(&mut self, now: Instant) {
        if !matches!(self.state, TimerState::Stopped | TimerState::Paused) {
            return;
        }
        self.state = TimerState::Running;
        self.phase = Phase::Work;
        self.time_left = self.work_duration;
        self.frame = 0;
        self.last_tick = Some(now);
        self.arm(now);
        info!(work_secs = self.work_duration.as_secs(), "timer started");
    }

    pub fn pause(&mut self) {
        if self.state != TimerState::Running {
            return;
        }
        self.state = TimerState::Paused;
        self.disarm();
        debug!(left_secs = self.time_left.as_secs(), "timer paused");
    }

    pub fn resume(&mut self, now: Instant) {
        if self.state != TimerState::Paused {
            return;
        }
        self.state = TimerState::Running;
        self.last_tick = Some(now);
        self.arm(now);
        debug!(left_secs = self.time_left.as_secs(), "timer resumed");
    }

    pub fn toggle_pause(&mut self, now: Instant) {
        match self.state {
            TimerState::Running => self.pause(),
            TimerState::Paused => self.resume(now),
            TimerState::Stopped | TimerState::Editing => {}
        }
    }

    pub fn stop(&mut self) {
        self.state = TimerState::Stopped;
        self.reset_to_work();
        self.disarm();
        debug!("timer stopped");
    }

    pub fn edit(&mut self) {
        if matches!(self.state, TimerState::Running | TimerState::Editing) {
            return;
        }
        self.state = TimerState::Editing;
        self.disarm();
        self.work_input = (self.work_duration.as_secs() / 60).to_string();
        self.break_input = (self.break_duration.as_secs() / 60).to_string();
        self.editing = EditField::Work;
    }

    pub fn save(&mut self) {
        if self.state != TimerState::Editing {
            return;
        }
        let work = parse_minutes(&self.work_input).unwrap_or_else(|err| {
            debug!(error = %err, "work duration rejected, using default");
            DEFAULT_WORK_MINUTES
        });
        let rest = parse_minutes(&self.break_input).unwrap_or_else(|err| {
            debug!(error = %err, "break duration rejected, using default");
            DEFAULT_BREAK_MINUTES
        });
        self.work_duration = minutes(work);
        self.break_duration = minutes(rest);
        self.state = TimerState::Stopped;
        self.reset_to_work();
        info!(work_minutes = work, break_minutes = rest, "timer durations saved");
    }

    pub fn cancel(&mut self) {
        if self.state != TimerState::Editing {
            return;
        }
        self.state = TimerState::Stopped;
        self.reset_to_work();
    }

    pub fn switch_field(&mut self) {
        if self.state != TimerState::Editing {
            return;
        }
        self.editing = match self.editing {
            EditField::Work => EditField::Break,
            EditField::Break => EditField::Work,
        };
    }

    fn active_buffer_mut(&mut self) -> &mut String {
        match self.editing {
            EditField::Work => &mut self.work_input,
            EditField::Break => &mut self.break_input,
        }
    }

    /// Advances the countdown by the wall-clock time since the previous tick.
    /// Returns `false` when the tick was stale and ignored.
    pub fn on_tick(&mut self, token: TickToken, now: Instant) -> bool {
        let live = self.state == TimerState::Running
            && self.armed.map(|tick| tick.token) == Some(token);
        if !live {
            debug!(?token, state = ?self.state, "discarding stale tick");
            return false;
        }
        self.armed = None;
        let elapsed = self
            .last_tick
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or_default();
        self.last_tick = Some(now);
        self.frame = (self.frame + 1) % SPINNER_FRAMES.len();

        if elapsed < self.time_left {
            self.time_left -= elapsed;
            self.arm(now);
            return true;
        }

        let overshoot = elapsed - self.time_left;
        match self.phase {
            Phase::Work => {
                self.phase = Phase::Break;
                self.time_left = self.break_duration.saturating_sub(overshoot);
                self.arm(now);
                info!(break_secs = self.break_duration.as_secs(), "work phase complete");
            }
            Phase::Break => {
                self.state = TimerState::Stopped;
                self.reset_to_work();
                info!("break phase complete");
            }
        }
        true
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> Transition {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Transition::Quit;
        }
        if self.state == TimerState::Editing {
            match key.code {
                KeyCode::Char('s') | KeyCode::Enter => self.save(),
                KeyCode::Char('x') | KeyCode::Char('q') | KeyCode::Esc => self.cancel(),
                KeyCode::Tab | KeyCode::BackTab => self.switch_field(),
                KeyCode::Backspace => {
                    self.active_buffer_mut().pop();
                }
                KeyCode::Char(c) => {
                    let buffer = self.active_buffer_mut();
                    if buffer.chars().count() < EDIT_BUFFER_LIMIT {
                        buffer.push(c);
                    }
                }
                _ => {}
            }
            return Transition::Stay;
        }
        match key.code {
            KeyCode::Char('s') => self.start(now),
            KeyCode::Char('p') => self.toggle_pause(now),
            KeyCode::Char('x') => self.stop(),
            KeyCode::Char('e') => self.edit(),
            KeyCode::Char('q') | KeyCode::Esc => return Transition::BackToBoard,
            _ => {}
        }
        Transition::Stay
    }

    fn reset_to_work(&mut self) {
        self.phase = Phase::Work;
        self.time_left = self.work_duration;
    }

    fn arm(&mut self, now: Instant) {
        self.generation += 1;
        self.armed = Some(ScheduledTick {
            token: TickToken(self.generation),
            due: now + TICK_INTERVAL,
        });
    }

    fn disarm(&mut self) {
        self.armed = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn tick(timer: &mut Timer, at: Instant) -> bool {
        let token = timer.armed().expect("a tick should be armed").token;
        timer.on_tick(token, at)
    }

    #[test]
    fn start_arms_one_tick_with_full_work_time() {
        let t0 = Instant::now();
        let mut timer = Timer::default();
        timer.start(t0);
        assert_eq!(timer.state(), TimerState::Running);
        assert_eq!(timer.time_left(), timer.work_duration());
        let armed = timer.armed().unwrap();
        assert_eq!(armed.due, t0 + TICK_INTERVAL);
    }

    #[test]
    fn tick_subtracts_real_elapsed_time() {
        let t0 = Instant::now();
        let mut timer = Timer::default();
        timer.start(t0);
        assert!(tick(&mut timer, t0 + Duration::from_millis(2500)));
        assert_eq!(timer.time_left(), secs(25 * 60) - Duration::from_millis(2500));
        assert_eq!(timer.state(), TimerState::Running);
        assert!(timer.armed().is_some());
    }

    #[test]
    fn work_completion_chains_into_break() {
        let t0 = Instant::now();
        let mut timer = Timer::new(secs(10), secs(5));
        timer.start(t0);
        tick(&mut timer, t0 + secs(10));
        assert_eq!(timer.state(), TimerState::Running);
        assert_eq!(timer.phase(), Phase::Break);
        assert_eq!(timer.time_left(), secs(5));
        assert!(timer.armed().is_some());
    }

    #[test]
    fn overshoot_is_charged_to_the_break() {
        let t0 = Instant::now();
        let mut timer = Timer::new(secs(10), secs(5));
        timer.start(t0);
        tick(&mut timer, t0 + secs(12));
        assert_eq!(timer.phase(), Phase::Break);
        assert_eq!(timer.time_left(), secs(3));
    }

    #[test]
    fn break_completion_stops_and_resets_to_work() {
        let t0 = Instant::now();
        let mut timer = Timer::new(secs(10), secs(5));
        timer.start(t0);
        tick(&mut timer, t0 + secs(10));
        assert!(tick(&mut timer, t0 + secs(15)));
        assert_eq!(timer.state(), TimerState::Stopped);
        assert_eq!(timer.phase(), Phase::Work);
        assert_eq!(timer.time_left(), secs(10));
        assert!(timer.armed().is_none());
    }

    #[test]
    fn default_session_reaches_break_after_1500_ticks() {
        let t0 = Instant::now();
        let mut timer = Timer::default();
        timer.start(t0);
        for i in 1..=1500 {
            assert!(tick(&mut timer, t0 + secs(i)));
        }
        assert_eq!(timer.state(), TimerState::Running);
        assert_eq!(timer.phase(), Phase::Break);
        assert_eq!(timer.time_left(), secs(5 * 60));

        for i in 1501..=1510 {
            tick(&mut timer, t0 + secs(i));
        }
        assert_eq!(timer.time_left(), secs(5 * 60 - 10));
    }

    #[test]
    fn stale_ticks_are_ignored() {
        let t0 = Instant::now();
        let mut timer = Timer::default();
        timer.start(t0);
        let first = timer.armed().unwrap().token;
        timer.pause();
        assert!(!timer.on_tick(first, t0 + secs(1)));
        assert_eq!(timer.state(), TimerState::Paused);
        assert_eq!(timer.time_left(), secs(25 * 60));

        timer.resume(t0 + secs(30));
        assert!(!timer.on_tick(first, t0 + secs(31)));
        assert!(tick(&mut timer, t0 + secs(31)));
        assert_eq!(timer.time_left(), secs(25 * 60 - 1));

        let pending = timer.armed().unwrap().token;
        timer.stop();
        assert!(!timer.on_tick(pending, t0 + secs(32)));
        assert_eq!(timer.state(), TimerState::Stopped);
    }

    #[test]
    fn paused_time_is_not_counted() {
        let t0 = Instant::now();
        let mut timer = Timer::default();
        timer.start(t0);
        tick(&mut timer, t0 + secs(1));
        timer.pause();
        timer.resume(t0 + secs(100));
        tick(&mut timer, t0 + secs(101));
        assert_eq!(timer.time_left(), secs(25 * 60 - 2));
    }

    #[test]
    fn stop_resets_from_any_state() {
        let t0 = Instant::now();
        let mut timer = Timer::new(secs(60), secs(30));
        timer.start(t0);
        tick(&mut timer, t0 + secs(20));
        timer.stop();
        assert_eq!(timer.state(), TimerState::Stopped);
        assert_eq!(timer.time_left(), secs(60));
    }

    #[test]
    fn edit_is_refused_while_running() {
        let mut timer = Timer::default();
        timer.start(Instant::now());
        timer.edit();
        assert_eq!(timer.state(), TimerState::Running);
    }

    #[test]
    fn cancel_edit_keeps_durations() {
        let mut timer = Timer::new(secs(20 * 60), secs(4 * 60));
        timer.edit();
        assert_eq!(timer.edit_buffers(), ("20", "4"));
        timer.handle_key(KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE), Instant::now());
        timer.cancel();
        assert_eq!(timer.state(), TimerState::Stopped);
        assert_eq!(timer.work_duration(), secs(20 * 60));
        assert_eq!(timer.break_duration(), secs(4 * 60));
    }

    #[test]
    fn invalid_buffers_fall_back_to_defaults() {
        let mut timer = Timer::new(secs(60), secs(60));
        timer.edit();
        timer.work_input = "0".into();
        timer.break_input = "abc".into();
        timer.save();
        assert_eq!(timer.state(), TimerState::Stopped);
        assert_eq!(timer.work_duration(), secs(25 * 60));
        assert_eq!(timer.break_duration(), secs(5 * 60));
        assert_eq!(timer.time_left(), secs(25 * 60));
    }

    #[test]
    fn typed_durations_are_saved() {
        let now = Instant::now();
        let mut timer = Timer::default();
        let key = |code| KeyEvent::new(code, KeyModifiers::NONE);
        timer.handle_key(key(KeyCode::Char('e')), now);
        timer.handle_key(key(KeyCode::Backspace), now);
        timer.handle_key(key(KeyCode::Backspace), now);
        for ch in "50".chars() {
            timer.handle_key(key(KeyCode::Char(ch)), now);
        }
        timer.handle_key(key(KeyCode::Tab), now);
        assert_eq!(timer.editing_field(), EditField::Break);
        timer.handle_key(key(KeyCode::Backspace), now);
        for ch in "1000".chars() {
            timer.handle_key(key(KeyCode::Char(ch)), now);
        }
        assert_eq!(timer.edit_buffers(), ("50", "100"));
        timer.handle_key(key(KeyCode::Char('s')), now);
        assert_eq!(timer.work_duration(), secs(50 * 60));
        assert_eq!(timer.break_duration(), secs(100 * 60));
    }

    #[test]
    fn parse_minutes_classifies_failures() {
        assert_eq!(parse_minutes(" 15 "), Ok(15));
        assert_eq!(parse_minutes("0"), Err(DurationError::NotPositive(0)));
        assert_eq!(parse_minutes("-3"), Err(DurationError::NotPositive(-3)));
        assert_eq!(
            parse_minutes("abc"),
            Err(DurationError::NotANumber("abc".into()))
        );
    }

    fn press(timer: &mut Timer, ch: char, now: Instant) -> Transition {
        timer.handle_key(KeyEvent::new(KeyCode::Char(ch), KeyModifiers::NONE), now)
    }

    #[test]
    fn edit_from_paused_disarms_and_cancel_resets_work_time() {
        let t0 = Instant::now();
        let mut timer = Timer::default();
        timer.start(t0);
        tick(&mut timer, t0 + secs(5));
        press(&mut timer, 'p', t0 + secs(5));
        assert_eq!(timer.state(), TimerState::Paused);

        press(&mut timer, 'e', t0 + secs(6));
        assert_eq!(timer.state(), TimerState::Editing);
        assert!(timer.armed().is_none());
        assert_eq!(timer.edit_buffers(), ("25", "5"));

        press(&mut timer, 'x', t0 + secs(7));
        assert_eq!(timer.state(), TimerState::Stopped);
        assert_eq!(timer.phase(), Phase::Work);
        assert_eq!(timer.time_left(), secs(25 * 60));
        assert!(timer.armed().is_none());
    }

    #[test]
    fn edit_from_paused_then_save_resets_work_time() {
        let t0 = Instant::now();
        let mut timer = Timer::new(secs(10 * 60), secs(2 * 60));
        timer.start(t0);
        tick(&mut timer, t0 + secs(30));
        timer.pause();
        press(&mut timer, 'e', t0 + secs(31));
        press(&mut timer, 's', t0 + secs(32));
        assert_eq!(timer.state(), TimerState::Stopped);
        assert_eq!(timer.phase(), Phase::Work);
        assert_eq!(timer.time_left(), secs(10 * 60));
        assert!(timer.armed().is_none());
    }

    #[test]
    fn start_from_paused_restarts_a_fresh_work_phase() {
        let t0 = Instant::now();
        let mut timer = Timer::new(secs(10), secs(5));
        timer.start(t0);
        let first = timer.armed().unwrap().token;
        tick(&mut timer, t0 + secs(12));
        assert_eq!(timer.phase(), Phase::Break);
        press(&mut timer, 'p', t0 + secs(13));
        assert_eq!(timer.state(), TimerState::Paused);

        press(&mut timer, 's', t0 + secs(20));
        assert_eq!(timer.state(), TimerState::Running);
        assert_eq!(timer.phase(), Phase::Work);
        assert_eq!(timer.time_left(), secs(10));
        let armed = timer.armed().unwrap();
        assert_ne!(armed.token, first);
        assert_eq!(armed.due, t0 + secs(21));
        assert!(!timer.on_tick(first, t0 + secs(21)));
    }

    #[test]
    fn p_key_toggles_pause_and_resume() {
        let t0 = Instant::now();
        let mut timer = Timer::default();
        press(&mut timer, 'p', t0);
        assert_eq!(timer.state(), TimerState::Stopped);

        press(&mut timer, 's', t0);
        press(&mut timer, 'p', t0 + secs(1));
        assert_eq!(timer.state(), TimerState::Paused);
        assert!(timer.armed().is_none());

        press(&mut timer, 'p', t0 + secs(50));
        assert_eq!(timer.state(), TimerState::Running);
        assert_eq!(timer.armed().unwrap().due, t0 + secs(51));
        tick(&mut timer, t0 + secs(51));
        assert_eq!(timer.time_left(), secs(25 * 60 - 1));
    }

    #[test]
    fn quit_key_leaves_timer_running() {
        let t0 = Instant::now();
        let mut timer = Timer::default();
        timer.start(t0);
        let key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        assert!(matches!(timer.handle_key(key, t0), Transition::BackToBoard));
        assert_eq!(timer.state(), TimerState::Running);
        assert!(timer.armed().is_some());
    }

    #[test]
    fn spinner_cycles_on_ticks() {
        let t0 = Instant::now();
        let mut timer = Timer::default();
        timer.start(t0);
        assert_eq!(timer.spinner(), SPINNER_FRAMES[0]);
        for i in 1..=11 {
            tick(&mut timer, t0 + secs(i));
        }
        assert_eq!(timer.spinner(), SPINNER_FRAMES[1]);
    }
}
