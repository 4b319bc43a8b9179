use std::collections::HashMap;
use std::io::stdout;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, MouseEvent,
        MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use frame_timeline_core::{
    EventSource, Key, MemorySource, Timeline, TimelineConfig, TimelineHandle, TimelineRegistry, format_time,
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Paragraph},
};
use tracing::{debug, info};

use crate::renderer::TuiRenderer;
use crate::synthetic::{HISTORY, SyntheticClient};

const TICK: Duration = Duration::from_millis(16);
/// Most terminals never report key releases; a key counts as released once
/// it has not repeated for this long.
const KEY_RELEASE_AFTER: Duration = Duration::from_millis(120);
/// Lines above the timeline rows: title and axis labels.
const HEADER_LINES: u16 = 2;
const FOOTER_LINES: u16 = 1;

struct App {
    source: MemorySource,
    client: SyntheticClient,
    registry: TimelineRegistry<TuiRenderer>,
    handle: TimelineHandle,
    last_press: HashMap<Key, Instant>,
    hover: Option<(u16, u16)>,
    first_row: usize,
    follow: bool,
}

impl App {
    fn new(config: TimelineConfig, threads: usize, size: Rect) -> Self {
        let mut source = MemorySource::with_history(HISTORY);
        let client = SyntheticClient::new(threads, 0x5eed);
        client.install(&mut source);

        let (width, height) = timeline_size(size);
        let timeline = Timeline::new(&source, config, width, height);
        let mut registry = TimelineRegistry::new();
        let handle = registry.register(timeline, TuiRenderer::new(size.width));

        Self {
            source,
            client,
            registry,
            handle,
            last_press: HashMap::new(),
            hover: None,
            first_row: 0,
            follow: true,
        }
    }

    fn timeline(&self) -> Option<&Timeline> {
        self.registry.get(self.handle)
    }

    fn timeline_mut(&mut self) -> Option<&mut Timeline> {
        self.registry.get_mut(self.handle)
    }

    /// Pull whatever the client produced and hand it to the timeline.
    fn pump(&mut self, dt: f64) {
        for (thread, frame) in self.client.advance(dt, &mut self.source) {
            self.registry.new_data(&self.source, thread, frame);
        }
        if self.follow
            && let Some(timeline) = self.registry.get_mut(self.handle)
        {
            let window = timeline.viewport().window_width();
            timeline.scroll_to(timeline.highest_end_time() - window * 0.9);
        }
    }

    fn release_stale_keys(&mut self, now: Instant) {
        let stale: Vec<Key> = self
            .last_press
            .iter()
            .filter(|(_, at)| now.duration_since(**at) >= KEY_RELEASE_AFTER)
            .map(|(key, _)| *key)
            .collect();
        for key in stale {
            self.last_press.remove(&key);
            if let Some(timeline) = self.timeline_mut() {
                timeline.key_up(key);
            }
        }
    }

    fn resize(&mut self, size: Rect) {
        let (width, height) = timeline_size(size);
        if let Some((timeline, renderer)) = self.registry.parts_mut(self.handle) {
            renderer.resize(size.width);
            if (width, height) == (timeline.width(), timeline.height()) {
                // The grid was wiped even though the timeline size held.
                timeline.force_redraw(&self.source, renderer);
            } else {
                timeline.changed_size(width, height, &self.source, renderer);
            }
        }
    }

    /// Returns false when the user asked to quit.
    fn on_key(&mut self, key: KeyEvent, now: Instant) -> bool {
        let timeline_key = match key.code {
            KeyCode::Left | KeyCode::Char('a') => Some(Key::Left),
            KeyCode::Right | KeyCode::Char('d') => Some(Key::Right),
            KeyCode::Up | KeyCode::Char('w') => Some(Key::Up),
            KeyCode::Down | KeyCode::Char('s') => Some(Key::Down),
            _ => None,
        };
        if let Some(k) = timeline_key {
            match key.kind {
                KeyEventKind::Release => {
                    self.last_press.remove(&k);
                    if let Some(timeline) = self.timeline_mut() {
                        timeline.key_up(k);
                    }
                }
                KeyEventKind::Press | KeyEventKind::Repeat => {
                    if k == Key::Left || k == Key::Right {
                        self.follow = false;
                    }
                    self.last_press.insert(k, now);
                    if let Some(timeline) = self.timeline_mut() {
                        timeline.key_down(k);
                    }
                }
            }
            return true;
        }
        if key.kind == KeyEventKind::Release {
            return true;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return false,
            KeyCode::Char('f') | KeyCode::End => self.follow = true,
            KeyCode::Home => {
                self.follow = false;
                if let Some(timeline) = self.timeline_mut() {
                    let start = timeline.lowest_start_time();
                    timeline.scroll_to(start);
                }
            }
            KeyCode::PageDown => self.scroll_rows(1),
            KeyCode::PageUp => self.scroll_rows(-1),
            _ => {}
        }
        true
    }

    fn on_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::Moved => {
                self.hover = Some((mouse.column, mouse.row));
                if let Some(timeline) = self.timeline_mut() {
                    timeline.set_zoom_center(i32::from(mouse.column));
                }
            }
            MouseEventKind::ScrollDown => self.scroll_rows(1),
            MouseEventKind::ScrollUp => self.scroll_rows(-1),
            _ => {}
        }
    }

    fn scroll_rows(&mut self, delta: isize) {
        let total_rows = self.timeline().map_or(0, |t| t.index().total_rows());
        self.first_row = step_first_row(self.first_row, delta, total_rows);
    }

    /// The tooltip for the bar under the mouse, if any.
    fn tooltip(&self) -> String {
        let (Some((column, line)), Some(timeline)) = (self.hover, self.timeline()) else {
            return String::new();
        };
        let Some(row) = line.checked_sub(HEADER_LINES) else {
            return String::new();
        };
        let row = self.first_row + usize::from(row);
        timeline.bar_tooltip(&self.source, row, i32::from(column))
    }

    fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let Some(timeline) = self.timeline() else {
            return;
        };

        let threads = self.source.num_threads();
        let title = format!(
            " frame-timeline | {threads} threads | ←→ scroll | ↑↓ zoom | f follow{} | q quit ",
            if self.follow { " (on)" } else { "" }
        );
        frame.render_widget(
            Paragraph::new(title).style(Style::default().fg(Color::White).bg(Color::DarkGray)),
            Rect::new(area.x, area.y, area.width, 1),
        );

        let axis = Rect::new(area.x, area.y + 1, area.width, 1);
        let buf = frame.buffer_mut();
        for bar in timeline.guide_bars() {
            let x = timeline.viewport().timestamp_to_pixel(bar.height);
            let Ok(x) = u16::try_from(x) else {
                continue;
            };
            if x < axis.width && !bar.label.is_empty() {
                buf.set_string(axis.x + x, axis.y, &bar.label, Style::default().fg(Color::Gray));
            }
        }

        let content = Rect::new(
            area.x,
            area.y + HEADER_LINES,
            area.width,
            area.height.saturating_sub(HEADER_LINES + FOOTER_LINES),
        );
        frame.render_widget(Block::default().style(Style::default().bg(Color::Reset)), content);
        if let Some(renderer) = self.registry.renderer(self.handle) {
            renderer.paint(frame.buffer_mut(), content, self.first_row);
        }

        // Thread names sit on the separator line below each thread's rows.
        let buf = frame.buffer_mut();
        for thread in timeline.index().threads() {
            let separator = thread.row_offset + thread.rows.len();
            let Some(line) = separator.checked_sub(self.first_row) else {
                continue;
            };
            let Ok(line) = u16::try_from(line) else {
                continue;
            };
            if line < content.height {
                let label = format!(" {} ", thread.label);
                buf.set_string(content.x + 1, content.y + line, label, Style::default().fg(Color::Yellow));
            }
        }

        let viewport = timeline.viewport();
        let config = timeline.config();
        let status = format!(
            " {} per column | {} ",
            format_time(viewport.time_scale(), config.time_unit, config.show_units),
            self.tooltip()
        );
        frame.render_widget(
            Paragraph::new(status).style(Style::default().fg(Color::White)),
            Rect::new(area.x, area.bottom().saturating_sub(1), area.width, 1),
        );
    }
}

/// Move the top visible row by `delta`, keeping at least the last row on
/// screen.
fn step_first_row(first_row: usize, delta: isize, total_rows: usize) -> usize {
    first_row
        .saturating_add_signed(delta)
        .min(total_rows.saturating_sub(1))
}

/// Timeline pixel size for a terminal of `size`: one pixel per column, one
/// row per line below the header.
fn timeline_size(size: Rect) -> (i32, i32) {
    let height = size.height.saturating_sub(HEADER_LINES + FOOTER_LINES);
    (i32::from(size.width), i32::from(height))
}

pub fn run(config: TimelineConfig, threads: usize) -> Result<()> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, config, threads);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    result
}

fn event_loop<B>(terminal: &mut Terminal<B>, config: TimelineConfig, threads: usize) -> Result<()>
where
    B: ratatui::backend::Backend,
{
    let size = terminal.size()?;
    let mut app = App::new(config, threads, Rect::new(0, 0, size.width, size.height));
    info!(threads, width = size.width, height = size.height, "timeline started");

    let mut last_tick = Instant::now();
    loop {
        terminal.draw(|frame| app.draw(frame))?;

        let timeout = TICK.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            let now = Instant::now();
            match event::read()? {
                Event::Key(key) => {
                    if !app.on_key(key, now) {
                        debug!("quit requested");
                        break;
                    }
                }
                Event::Mouse(mouse) => app.on_mouse(mouse),
                Event::Resize(width, height) => app.resize(Rect::new(0, 0, width, height)),
                _ => {}
            }
        }

        let now = Instant::now();
        if now.duration_since(last_tick) >= TICK {
            let dt = now.duration_since(last_tick).as_secs_f64();
            last_tick = now;
            app.release_stale_keys(now);
            app.pump(dt);
            app.registry.animate(dt, &app.source);
        }
    }
    Ok(())
}
