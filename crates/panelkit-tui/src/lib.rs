// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use panelkit_core::{
    DashboardCore, Key, KeyOutcome, MessageLevel, Picker, TableContent, TableSurface, Viewport,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table};
use std::io;
use std::time::Duration;
use tracing::{debug, info, warn};

const FULL_PAGE_ROWS: isize = 20;
const MESSAGE_PANEL_LINES: usize = 3;
const EVENT_POLL: Duration = Duration::from_millis(120);

/// What a plugin supplies to run inside the terminal dashboard.
pub trait DashboardRuntime {
    fn title(&self) -> &str;

    /// Installs headers, data sources and key bindings into a fresh core.
    fn install(&mut self, core: &mut DashboardCore) -> Result<()>;

    /// Names offered by the `:` context picker. Empty disables the picker.
    fn contexts(&self) -> Vec<String> {
        Vec::new()
    }

    fn switch_context(&mut self, _core: &mut DashboardCore, _name: &str) -> Result<()> {
        Ok(())
    }

    /// Enter on a row. Returns whether the plugin did anything with it.
    fn open_row(&mut self, _core: &mut DashboardCore, _row: &[String]) -> Result<bool> {
        Ok(false)
    }

    /// Auto-refresh period, started once the plugin is installed.
    fn auto_refresh(&self) -> Option<Duration> {
        None
    }
}

/// Ratatui-side mirror of the table shape. Cells are never copied here;
/// rendering pulls them from the core for the visible window only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableView {
    headers: Vec<String>,
    row_count: usize,
    selected: Option<usize>,
    viewport: Viewport,
}

impl TableSurface for TableView {
    fn set_headers(&mut self, headers: &[String]) {
        if self.headers != headers {
            self.headers = headers.to_vec();
        }
    }

    fn set_row_count(&mut self, rows: usize) {
        self.row_count = rows;
    }

    fn set_selected(&mut self, selected: Option<usize>) {
        self.selected = selected;
        self.viewport.follow(selected, self.row_count);
    }
}

impl TableView {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn resize(&mut self, height: usize) {
        self.viewport.resize(height);
        self.viewport.follow(self.selected, self.row_count);
    }
}

#[derive(Debug, Default)]
struct ViewData {
    table: TableView,
    picker: Option<Picker>,
}

pub fn run_app<R: DashboardRuntime>(core: &mut DashboardCore, runtime: &mut R) -> Result<()> {
    install_movement_handler(core);
    runtime
        .install(core)
        .with_context(|| format!("install {}", runtime.title()))?;
    drop(core.refresh());
    if let Some(interval) = runtime.auto_refresh() {
        core.start_auto_refresh(interval);
    }

    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    info!(plugin = runtime.title(), "dashboard started");

    let result = event_loop(&mut terminal, core, runtime, &mut view_data);

    core.stop_auto_refresh();
    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    info!(plugin = runtime.title(), "dashboard stopped");
    result
}

fn event_loop<R: DashboardRuntime>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    core: &mut DashboardCore,
    runtime: &mut R,
    view_data: &mut ViewData,
) -> Result<()> {
    loop {
        core.poll_notices();
        core.sync_surface(&mut view_data.table);

        terminal
            .draw(|frame| render(frame, core, runtime.title(), view_data))
            .context("draw frame")?;

        if !event::poll(EVENT_POLL).context("poll event")? {
            continue;
        }
        match event::read().context("read event")? {
            Event::Key(key) if key.kind != KeyEventKind::Release => {
                if handle_key_event(core, runtime, view_data, key) {
                    return Ok(());
                }
            }
            Event::Resize(width, height) => {
                debug!(width, height, "terminal resized");
            }
            _ => {}
        }
    }
}

/// Selection movement for keys the dispatcher forwards.
pub fn install_movement_handler(core: &mut DashboardCore) {
    core.set_outer_handler(Box::new(|core: &mut DashboardCore, key: Key| {
        match key {
            Key::Up | Key::Char('k') => core.move_selection(-1),
            Key::Down | Key::Char('j') => core.move_selection(1),
            Key::PageUp => core.move_selection(-FULL_PAGE_ROWS),
            Key::PageDown => core.move_selection(FULL_PAGE_ROWS),
            Key::Home | Key::Char('g') => core.select_first(),
            Key::End | Key::Char('G') => core.select_last(),
            _ => return false,
        };
        true
    }));
}

pub fn key_from_event(event: KeyEvent) -> Key {
    match event.code {
        KeyCode::Char(ch) if event.modifiers.contains(KeyModifiers::CONTROL) => Key::Ctrl(ch),
        KeyCode::Char(ch) => Key::Char(ch),
        KeyCode::Esc => Key::Esc,
        KeyCode::Enter => Key::Enter,
        KeyCode::Tab => Key::Tab,
        KeyCode::BackTab => Key::BackTab,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        _ => Key::Other,
    }
}

/// Returns true when the app should quit.
fn handle_key_event<R: DashboardRuntime>(
    core: &mut DashboardCore,
    runtime: &mut R,
    view_data: &mut ViewData,
    event: KeyEvent,
) -> bool {
    let key = key_from_event(event);
    if matches!(key, Key::Ctrl('q') | Key::Ctrl('c')) {
        return true;
    }

    if view_data.picker.is_some() {
        handle_picker_key(core, runtime, view_data, key);
        return false;
    }

    match core.handle_key(key) {
        KeyOutcome::Consumed(resolution) => {
            debug!(%key, ?resolution, "key consumed");
            false
        }
        KeyOutcome::Forwarded(key) => handle_global_key(core, runtime, view_data, key),
    }
}

fn handle_global_key<R: DashboardRuntime>(
    core: &mut DashboardCore,
    runtime: &mut R,
    view_data: &mut ViewData,
    key: Key,
) -> bool {
    match key {
        Key::Char('q') => return true,
        Key::Char(':') => {
            let contexts = runtime.contexts();
            if contexts.is_empty() {
                core.messages_mut().warn("no contexts to switch to");
            } else {
                view_data.picker = Some(Picker::new("switch context", contexts));
            }
        }
        Key::Enter => {
            let Some(row) = core.selected_row_data() else {
                return false;
            };
            if let Err(error) = runtime.open_row(core, &row) {
                warn!(error = %error, "open row failed");
                core.messages_mut().error(format!("open failed: {error:#}"));
            }
        }
        other => debug!(key = %other, "unhandled key"),
    }
    false
}

fn handle_picker_key<R: DashboardRuntime>(
    core: &mut DashboardCore,
    runtime: &mut R,
    view_data: &mut ViewData,
    key: Key,
) {
    let Some(picker) = view_data.picker.as_mut() else {
        return;
    };
    match key {
        Key::Esc => view_data.picker = None,
        Key::Up => picker.move_up(),
        Key::Down | Key::Tab => picker.move_down(),
        Key::Backspace => picker.pop_char(),
        Key::Char(ch) => picker.push_char(ch),
        Key::Enter => {
            let choice = picker.selected().map(str::to_owned);
            view_data.picker = None;
            let Some(name) = choice else {
                return;
            };
            match runtime.switch_context(core, &name) {
                Ok(()) => {
                    info!(context = %name, "context switched");
                    core.messages_mut().info(format!("switched to {name}"));
                }
                Err(error) => {
                    warn!(context = %name, error = %error, "context switch failed");
                    core.messages_mut()
                        .error(format!("switch to {name} failed: {error:#}"));
                }
            }
        }
        _ => {}
    }
}

fn render(
    frame: &mut ratatui::Frame<'_>,
    core: &DashboardCore,
    title: &str,
    view_data: &mut ViewData,
) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(MESSAGE_PANEL_LINES as u16 + 2),
            Constraint::Length(2),
        ])
        .split(frame.area());

    let breadcrumb = Paragraph::new(core.breadcrumb())
        .block(Block::default().title(title.to_owned()).borders(Borders::ALL));
    frame.render_widget(breadcrumb, layout[0]);

    // borders plus the header row
    let body_rows = usize::from(layout[1].height.saturating_sub(3));
    view_data.table.resize(body_rows);
    render_table(frame, layout[1], core, &view_data.table);

    let messages = Paragraph::new(message_lines(core, MESSAGE_PANEL_LINES))
        .block(Block::default().title("messages").borders(Borders::ALL));
    frame.render_widget(messages, layout[2]);

    let status = Paragraph::new(status_text(core))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(status, layout[3]);

    if let Some(draft) = core.filter_prompt() {
        let area = bottom_rect(3, layout[1]);
        frame.render_widget(Clear, area);
        let prompt = Paragraph::new(format!("/{draft}"))
            .block(Block::default().title("filter").borders(Borders::ALL));
        frame.render_widget(prompt, area);
    }

    if let Some(picker) = &view_data.picker {
        let area = centered_rect(50, 50, frame.area());
        frame.render_widget(Clear, area);
        let overlay = Paragraph::new(picker_overlay_text(picker))
            .block(Block::default().title(picker.title().to_owned()).borders(Borders::ALL));
        frame.render_widget(overlay, area);
    }

    if core.help_expanded() {
        let area = centered_rect(70, 70, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text(core))
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_table(frame: &mut ratatui::Frame<'_>, area: Rect, core: &DashboardCore, table: &TableView) {
    let window = table.viewport().window(table.row_count());
    let selected = table.selected();

    let (header, rows) = core.with_content(|content| {
        let columns = content.column_count();
        let header = (0..columns)
            .map(|col| {
                Cell::from(content.header(col).unwrap_or_default().to_owned()).style(
                    Style::default()
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD),
                )
            })
            .collect::<Vec<_>>();
        let rows = window
            .clone()
            .map(|row| {
                let cells = (0..columns)
                    .map(|col| Cell::from(content.cell(row, col).unwrap_or_default().to_owned()))
                    .collect::<Vec<_>>();
                let style = if Some(row) == selected {
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                Row::new(cells).style(style)
            })
            .collect::<Vec<_>>();
        (header, rows)
    });

    let widths = vec![Constraint::Min(8); table.headers().len().max(1)];
    let widget = Table::new(rows, widths)
        .header(Row::new(header))
        .column_spacing(1)
        .block(
            Block::default()
                .title(table_title(table, window.start))
                .borders(Borders::ALL),
        );
    frame.render_widget(widget, area);
}

fn table_title(table: &TableView, first_visible: usize) -> String {
    if table.row_count() == 0 {
        return "no rows".to_owned();
    }
    match table.selected() {
        Some(selected) => format!("row {}/{}", selected + 1, table.row_count()),
        None => format!("from row {}", first_visible + 1),
    }
}

fn message_lines(core: &DashboardCore, count: usize) -> Vec<Line<'static>> {
    core.messages()
        .recent(count)
        .map(|message| {
            let color = match message.level {
                MessageLevel::Info => Color::Gray,
                MessageLevel::Warn => Color::Yellow,
                MessageLevel::Error => Color::Red,
            };
            Line::from(Span::styled(message.to_string(), Style::default().fg(color)))
        })
        .collect()
}

fn status_text(core: &DashboardCore) -> String {
    let status = core.status().render();
    if core.filter_prompt().is_some() {
        return format!("{status}  |  enter apply  esc cancel");
    }
    format!("{status}  |  ? help  : context  q quit")
}

fn help_overlay_text(core: &DashboardCore) -> String {
    let mut lines = vec!["keys".to_owned()];
    for binding in core.key_bindings() {
        lines.push(format!("  {:<8} {}", binding.key, binding.description));
    }
    lines.push(String::new());
    lines.push("navigation".to_owned());
    for (key, description) in [
        ("j/k", "move selection"),
        ("g/G", "first / last row"),
        ("pgdn", "next page or load more"),
        ("enter", "open row"),
        ("esc", "back"),
        (":", "switch context"),
        ("q", "quit"),
    ] {
        lines.push(format!("  {key:<8} {description}"));
    }
    lines.join("\n")
}

fn picker_overlay_text(picker: &Picker) -> String {
    let mut lines = vec![format!("> {}", picker.query()), String::new()];
    if picker.visible_len() == 0 {
        lines.push("  no matches".to_owned());
    }
    for (index, candidate) in picker.visible().enumerate() {
        let marker = if index == picker.cursor() { ">" } else { " " };
        lines.push(format!("{marker} {candidate}"));
    }
    lines.join("\n")
}

fn bottom_rect(height: u16, area: Rect) -> Rect {
    let height = height.min(area.height);
    Rect {
        x: area.x,
        y: area.y + area.height - height,
        width: area.width,
        height,
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
