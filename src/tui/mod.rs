//! Minimal frame for the interactive session: menu page, lyric window and
//! a player line, placed where [`crate::menu::Layout`] expects them.

use crate::app::Controller;
use crate::menu::Columns;
use crate::playback::PlaybackState;
use anyhow::Context;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};
use std::io::{self, Stdout};
use std::time::Duration;

pub type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;

pub struct TerminalGuard {
    terminal: TuiTerminal,
    mouse: bool,
}

impl TerminalGuard {
    pub fn enter(mouse: bool) -> anyhow::Result<Self> {
        enable_raw_mode().context("enable raw mode")?;

        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).context("enter alt screen")?;
        if mouse {
            execute!(stdout, EnableMouseCapture).context("enable mouse capture")?;
        }

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend).context("create terminal")?;

        Ok(Self { terminal, mouse })
    }

    pub fn terminal_mut(&mut self) -> &mut TuiTerminal {
        &mut self.terminal
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        // Best-effort cleanup; don't panic in Drop.
        let _ = disable_raw_mode();
        let mut stdout = io::stdout();
        if self.mouse {
            let _ = execute!(stdout, DisableMouseCapture);
        }
        let _ = execute!(stdout, LeaveAlternateScreen);
    }
}

pub fn draw(terminal: &mut TuiTerminal, c: &Controller) -> anyhow::Result<()> {
    terminal
        .draw(|f| render(f, c))
        .context("terminal draw")?;
    Ok(())
}

fn render(f: &mut Frame, c: &Controller) {
    let area = f.area();
    let layout = c.layout();
    let per_row = layout.columns.per_row();
    let menu_rows = layout.page_size.div_ceil(per_row) as u16;

    let [top, menu, lyrics, player] = Layout::vertical([
        Constraint::Length(area.height / 3),
        Constraint::Length(menu_rows),
        Constraint::Length(layout.lyric_rows as u16),
        Constraint::Min(0),
    ])
    .areas(area);

    render_title(f, c, top);
    render_menu(f, c, menu);
    render_lyrics(f, c, lyrics);
    render_player(f, c, player);
}

fn render_title(f: &mut Frame, c: &Controller, area: Rect) {
    if area.height == 0 {
        return;
    }
    let nav = c.nav();
    let mut spans = vec![Span::styled(
        nav.title().to_string(),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )];
    if nav.total_pages() > 1 {
        spans.push(Span::raw(format!("  {}/{}", nav.page(), nav.total_pages())));
    }
    if c.is_loading() {
        spans.push(Span::styled("  loading...", Style::default().fg(Color::DarkGray)));
    }
    let row = Rect {
        y: area.y + area.height - 1,
        height: 1,
        ..area
    };
    f.render_widget(Paragraph::new(Line::from(spans)), row);
}

fn render_menu(f: &mut Frame, c: &Controller, area: Rect) {
    let nav = c.nav();
    let first = nav.page_index() * nav.page_size();
    let per_row = nav.columns().per_row();
    let col_width = (area.width as usize / per_row).saturating_sub(1);

    let mut lines: Vec<Line> = Vec::new();
    for (row, chunk) in nav.current_page_items().chunks(per_row).enumerate() {
        let mut spans = Vec::new();
        for (col, item) in chunk.iter().enumerate() {
            let index = first + row * per_row + col;
            let selected = index == nav.cursor();
            let marker = if selected { "> " } else { "  " };
            let text = truncate_str(
                &format!("{marker}{}. {}  {}", index + 1, item.title, item.subtitle),
                col_width,
            );
            let style = if selected {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            if nav.columns() == Columns::Double && col == 0 {
                spans.push(Span::styled(format!("{text:<col_width$} "), style));
            } else {
                spans.push(Span::styled(text, style));
            }
        }
        lines.push(Line::from(spans));
    }
    f.render_widget(Paragraph::new(lines), area);
}

fn render_lyrics(f: &mut Frame, c: &Controller, area: Rect) {
    let Some(window) = c.session().lyrics().window() else {
        return;
    };
    let middle = window.lines.len() / 2;
    let lines: Vec<Line> = window
        .lines
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let style = if i == middle {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            Line::from(Span::styled(text.clone(), style))
        })
        .collect();
    f.render_widget(Paragraph::new(lines), area);
}

fn render_player(f: &mut Frame, c: &Controller, area: Rect) {
    let session = c.session();
    let width = area.width as usize;

    let now = match session.current_track() {
        Some(t) if t.artists.is_empty() => t.title.clone(),
        Some(t) => format!("{} - {}", t.title, t.artist_line()),
        None => "Not playing".to_string(),
    };
    let state = match session.state() {
        PlaybackState::Idle => "idle",
        PlaybackState::Resolving => "loading",
        PlaybackState::Playing => "playing",
        PlaybackState::Paused => "paused",
        PlaybackState::Stopped => "stopped",
        PlaybackState::Failed => "failed",
    };
    let total = session
        .current_track()
        .and_then(|t| t.duration())
        .unwrap_or_default();

    let mut lines = vec![
        Line::from(Span::styled(
            truncate_str(&now, width),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::raw(format!(
                "{}/{}  ",
                format_time(session.elapsed()),
                format_time(total)
            )),
            Span::styled(state, Style::default().fg(Color::Cyan)),
            Span::raw(format!("  [{}]", session.mode().label())),
        ]),
    ];
    if let Some(status) = c.status() {
        lines.push(Line::from(Span::styled(
            truncate_str(status, width),
            Style::default().fg(Color::Red),
        )));
    }
    f.render_widget(Paragraph::new(lines), area);
}

fn format_time(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn truncate_str(s: &str, max_len: usize) -> String {
    if max_len == 0 {
        return String::new();
    }
    let char_count: usize = s.chars().count();
    if char_count <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    } else {
        s.chars().take(max_len).collect()
    }
}
