use crate::app::{ActiveScreen, App};
use crate::board::Board;
use crate::entry::{EntryField, EntryForm, FieldValue};
use crate::model::{Stage, Task};
use crate::timer::{EditField, Phase, Timer, TimerState};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use std::time::Duration;

const PROGRESS_WIDTH: usize = 20;

pub fn draw(f: &mut Frame<'_>, app: &App) {
    let board = app.board();
    if !board.is_loaded() {
        f.render_widget(Paragraph::new("Loading..."), f.size());
        return;
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(6),
            Constraint::Length(4),
        ])
        .split(f.size());

    draw_header(f, layout[0], app);
    match app.active() {
        ActiveScreen::Board | ActiveScreen::Entry => draw_board(f, layout[1], board),
        ActiveScreen::Timer => draw_timer(f, layout[1], app.timer()),
    }
    draw_footer(f, layout[2], app);

    if let Some(form) = app.entry().filter(|_| app.active() == ActiveScreen::Entry) {
        draw_form(f, form);
    }
    if board.confirming_clear() {
        draw_confirm_clear(f);
    }
}

fn draw_header(f: &mut Frame<'_>, area: Rect, app: &App) {
    let timer = app.timer();
    let mut spans = vec![Span::styled(
        "taskdeck ",
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )];
    for stage in Stage::ALL {
        spans.push(Span::raw("  •  "));
        spans.push(Span::styled(
            format!("{} {}", stage.label(), app.board().column(stage).len()),
            Style::default().fg(color_for_stage(stage)),
        ));
    }
    if timer.state() != TimerState::Stopped {
        spans.push(Span::raw("  •  "));
        spans.push(Span::styled(
            format!("{} {}", phase_label(timer), format_clock(timer.time_left())),
            Style::default().fg(Color::LightMagenta),
        ));
    }
    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(Color::DarkGray));
    f.render_widget(
        Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .block(block),
        area,
    );
}

fn draw_board(f: &mut Frame<'_>, area: Rect, board: &Board) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(area);

    for stage in Stage::ALL {
        let focused = board.focus() == stage;
        let accent = color_for_stage(stage);
        let width = chunks[stage.index()].width.saturating_sub(4) as usize;
        let tasks = board.column(stage);
        let items = if tasks.is_empty() {
            vec![ListItem::new(Span::styled(
                "(empty)",
                Style::default().fg(Color::DarkGray),
            ))]
        } else {
            tasks.iter().map(|task| task_item(task, width)).collect()
        };
        let mut state = ListState::default();
        if focused && !tasks.is_empty() {
            state.select(Some(board.selected_index(stage)));
        }
        let block = Block::default()
            .title(Span::styled(
                format!("{} ({})", stage.label(), tasks.len()),
                Style::default().fg(accent).add_modifier(if focused {
                    Modifier::BOLD | Modifier::UNDERLINED
                } else {
                    Modifier::BOLD
                }),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if focused { accent } else { Color::DarkGray }));
        let list = List::new(items).block(block).highlight_style(
            Style::default()
                .bg(Color::Rgb(252, 214, 112))
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        );
        f.render_stateful_widget(list, chunks[stage.index()], &mut state);
    }
}

fn draw_timer(f: &mut Frame<'_>, area: Rect, timer: &Timer) {
    let block = Block::default()
        .title(Span::styled(
            format!("Pomodoro Timer {}", if timer.state() == TimerState::Running {
                timer.spinner()
            } else {
                ""
            }),
            Style::default()
                .fg(Color::LightMagenta)
                .add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::LightMagenta));

    let lines = if timer.state() == TimerState::Editing {
        let (work, rest) = timer.edit_buffers();
        vec![
            Line::from(Span::styled(
                "Edit durations",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            buffer_line("Work (min)", work, timer.editing_field() == EditField::Work),
            buffer_line("Break (min)", rest, timer.editing_field() == EditField::Break),
        ]
    } else {
        vec![
            Line::from(Span::styled(
                format_clock(timer.time_left()),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(progress_bar(timer.progress())),
            Line::from(Span::styled(
                state_label(timer),
                Style::default().fg(Color::Gray),
            )),
            Line::from(Span::styled(
                format!(
                    "work {}m  •  break {}m",
                    timer.work_duration().as_secs() / 60,
                    timer.break_duration().as_secs() / 60
                ),
                Style::default().fg(Color::DarkGray),
            )),
        ]
    };
    let inner = centered_rect(50, 60, area);
    f.render_widget(Clear, inner);
    f.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(block),
        inner,
    );
}

fn draw_footer(f: &mut Frame<'_>, area: Rect, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Length(2)])
        .split(area);

    let help_bar = Paragraph::new(help_line(app))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
    f.render_widget(help_bar, rows[0]);

    let board = app.board();
    let status = match board.error() {
        Some(err) => Line::from(Span::styled(
            format!("Error: {}", err),
            Style::default()
                .fg(Color::LightRed)
                .add_modifier(Modifier::BOLD),
        )),
        None => Line::from(Span::styled(
            board.status().to_string(),
            Style::default().fg(Color::Gray),
        )),
    };
    f.render_widget(Paragraph::new(status).wrap(Wrap { trim: true }), rows[1]);
}

fn help_line(app: &App) -> Line<'static> {
    let key = |k: &'static str, color: Color| Span::styled(k, Style::default().fg(color));
    let spans = match app.active() {
        ActiveScreen::Board => vec![
            key("←→ / h l", Color::LightCyan),
            Span::raw(" column  "),
            key("↑↓ / k j", Color::LightCyan),
            Span::raw(" select  "),
            key("</b >/m", Color::LightGreen),
            Span::raw(" move  "),
            key("n", Color::LightMagenta),
            Span::raw(" new  "),
            key("e", Color::LightYellow),
            Span::raw(" edit  "),
            key("del/x", Color::LightRed),
            Span::raw(" delete  "),
            key("c", Color::LightRed),
            Span::raw(" clear  "),
            key("t", Color::LightMagenta),
            Span::raw(" timer  "),
            key("q", Color::LightRed),
            Span::raw(" quit"),
        ],
        ActiveScreen::Entry => vec![
            key("Enter", Color::LightGreen),
            Span::raw(" next/save  "),
            key("Alt+Enter", Color::LightCyan),
            Span::raw(" newline  "),
            key("Tab", Color::LightCyan),
            Span::raw(" field  "),
            key("Esc", Color::LightRed),
            Span::raw(" discard"),
        ],
        ActiveScreen::Timer if app.timer().state() == TimerState::Editing => vec![
            key("s", Color::LightGreen),
            Span::raw(" save  "),
            key("Tab", Color::LightCyan),
            Span::raw(" field  "),
            key("x/Esc", Color::LightRed),
            Span::raw(" cancel"),
        ],
        ActiveScreen::Timer => vec![
            key("s", Color::LightGreen),
            Span::raw(" start  "),
            key("p", Color::LightYellow),
            Span::raw(" pause/resume  "),
            key("x", Color::LightRed),
            Span::raw(" stop  "),
            key("e", Color::LightCyan),
            Span::raw(" edit  "),
            key("q/Esc", Color::LightMagenta),
            Span::raw(" board  "),
            key("Ctrl+C", Color::LightRed),
            Span::raw(" quit"),
        ],
    };
    Line::from(spans)
}

fn draw_form(f: &mut Frame<'_>, form: &EntryForm) {
    let area = centered_rect(70, 60, f.size());
    let mut lines = Vec::new();
    lines.extend(field_lines(
        "Title",
        form.title(),
        form.field() == EntryField::Title,
    ));
    lines.push(Line::from(""));
    lines.extend(field_lines(
        "Description",
        form.description(),
        form.field() == EntryField::Description,
    ));
    if let Some(notice) = form.notice() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            notice.to_string(),
            Style::default().fg(Color::LightRed),
        )));
    }
    let dialog = Paragraph::new(lines)
        .block(
            Block::default()
                .title(Span::styled(
                    form.heading(),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(Clear, area);
    f.render_widget(dialog, area);
}

fn draw_confirm_clear(f: &mut Frame<'_>) {
    let area = centered_rect(50, 30, f.size());
    let body = vec![
        Line::from(Span::styled(
            "Remove every task from the board?",
            Style::default()
                .fg(Color::LightRed)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Press y to confirm, n or Esc to cancel"),
    ];
    let dialog = Paragraph::new(body).alignment(Alignment::Center).block(
        Block::default()
            .title(Span::styled(
                "Confirm Clear",
                Style::default()
                    .fg(Color::LightRed)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::LightRed)),
    );
    f.render_widget(Clear, area);
    f.render_widget(dialog, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn color_for_stage(stage: Stage) -> Color {
    match stage {
        Stage::Todo => Color::Cyan,
        Stage::InProgress => Color::LightYellow,
        Stage::Done => Color::LightGreen,
    }
}

fn task_item(task: &Task, width: usize) -> ListItem<'static> {
    let mut lines = vec![Line::from(Span::styled(
        truncate_text(&task.title, width),
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    ))];
    if let Some(first) = task.description.lines().next().filter(|l| !l.is_empty()) {
        lines.push(Line::from(Span::styled(
            truncate_text(first, width),
            Style::default().fg(Color::Gray).add_modifier(Modifier::DIM),
        )));
    }
    ListItem::new(lines)
}

fn field_lines(label: &str, field: &FieldValue, active: bool) -> Vec<Line<'static>> {
    let label_style = Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::BOLD | Modifier::DIM);
    let value_style = Style::default().fg(if active { Color::Cyan } else { Color::White });
    let prefix = format!("{}: ", label);
    let spacer = " ".repeat(prefix.chars().count());
    let text = if active {
        field.with_caret()
    } else {
        field.value().to_string()
    };
    text.split('\n')
        .enumerate()
        .map(|(idx, line)| {
            Line::from(vec![
                Span::styled(
                    if idx == 0 {
                        prefix.clone()
                    } else {
                        spacer.clone()
                    },
                    label_style,
                ),
                Span::styled(line.to_string(), value_style),
            ])
        })
        .collect()
}

fn buffer_line(label: &str, value: &str, active: bool) -> Line<'static> {
    let shown = if active {
        format!("{}▌", value)
    } else {
        value.to_string()
    };
    Line::from(vec![
        Span::styled(format!("{}: ", label), Style::default().fg(Color::Gray)),
        Span::styled(
            shown,
            Style::default().fg(if active { Color::Cyan } else { Color::White }),
        ),
    ])
}

fn phase_label(timer: &Timer) -> &'static str {
    match timer.phase() {
        Phase::Work => "work",
        Phase::Break => "break",
    }
}

fn state_label(timer: &Timer) -> &'static str {
    match (timer.state(), timer.phase()) {
        (TimerState::Stopped, _) => "Stopped",
        (TimerState::Running, Phase::Work) => "Working",
        (TimerState::Running, Phase::Break) => "On break",
        (TimerState::Paused, _) => "Paused",
        (TimerState::Editing, _) => "Editing",
    }
}

fn format_clock(left: Duration) -> String {
    let secs = left.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn progress_bar(progress: f64) -> String {
    let completed = (progress * PROGRESS_WIDTH as f64) as usize;
    (0..PROGRESS_WIDTH)
        .map(|i| if i < completed { '█' } else { '░' })
        .collect()
}

fn truncate_text(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}
