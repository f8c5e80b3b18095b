use std::{
    fs::{self, File},
    io::{self, Stdout},
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use aquarium_core::{Aquarium, FishId, HostServices, PointerEvent, Viewport};
use aquarium_render::{AsciiSurface, Cell, CellKind, VisualAdapter};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::{Backend, CrosstermBackend, TestBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use serde::Serialize;
use supports_color::{ColorLevel, Stream, on_cached};
use tracing::info;

use crate::{DemoFeed, EventDrain, EventSubmit, HostEvent, SelectionLog};

const TARGET_TICK_HZ: f32 = 60.0;
const MAX_TICKS_PER_FRAME: usize = 240;
const UI_TICK_MILLIS: u64 = 33;
const DEFAULT_HEADLESS_FRAMES: usize = 12;
const MAX_HEADLESS_FRAMES: usize = 600;
const HEADLESS_COLS: u16 = 100;
const HEADLESS_ROWS: u16 = 36;
const HEADLESS_DEMO_REFRESH_FRAMES: usize = 30;
const DEMO_REFRESH: Duration = Duration::from_secs(3);
const SIDEBAR_WIDTH: u16 = 34;
/// Terminal cells are roughly twice as tall as they are wide.
const CELL_ASPECT: f32 = 2.0;

/// Everything the terminal shell needs to drive one aquarium.
pub struct TerminalContext {
    pub aquarium: Aquarium,
    pub drain: EventDrain,
    pub submit: EventSubmit,
    pub demo: Option<DemoFeed>,
    pub selection_log: SelectionLog,
}

impl TerminalContext {
    /// Convenience constructor used by tests and by the binary.
    pub fn new(
        aquarium: Aquarium,
        drain: EventDrain,
        submit: EventSubmit,
        demo: Option<DemoFeed>,
        selection_log: SelectionLog,
    ) -> Self {
        Self {
            aquarium,
            drain,
            submit,
            demo,
            selection_log,
        }
    }
}

/// Host services wired to the shell's selection log.
#[must_use]
pub fn host_services(selection_log: &SelectionLog) -> HostServices {
    HostServices {
        selection: Box::new(selection_log.clone()),
        ..HostServices::default()
    }
}

pub struct TerminalRenderer {
    tick_interval: Duration,
    draw_interval: Duration,
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs_f32(1.0 / TARGET_TICK_HZ),
            draw_interval: Duration::from_millis(UI_TICK_MILLIS),
        }
    }
}

impl TerminalRenderer {
    /// Runs until the user quits, or for a fixed frame budget when headless.
    pub fn run(&self, ctx: TerminalContext) -> Result<()> {
        if std::env::var_os("AQUARIUM_HEADLESS").is_some() {
            let report = self.run_headless(ctx)?;
            info!(
                target = "aquarium::terminal",
                frames = report.summary.frame_count,
                final_tick = report.summary.final_tick,
                initial_fish = report.initial.fish,
                final_fish = report.summary.final_fish,
                max_fish = report.summary.max_fish,
                selection_broadcasts = report.summary.selection_broadcasts,
                "Terminal headless run completed"
            );
            return Ok(());
        }

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enable raw mode")?;
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
            .context("failed to enter alternate screen")?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to build terminal backend")?;
        terminal.hide_cursor().ok();

        let result = run_event_loop(self, &mut terminal, ctx);

        terminal.show_cursor().ok();
        if let Err(err) = disable_raw_mode() {
            tracing::error!(?err, "failed to disable raw mode");
        }
        if let Err(err) = execute!(
            terminal.backend_mut(),
            DisableMouseCapture,
            LeaveAlternateScreen
        ) {
            tracing::error!(?err, "failed to leave alternate screen");
        }

        result
    }

    fn run_headless(&self, ctx: TerminalContext) -> Result<HeadlessReport> {
        let backend = TestBackend::new(HEADLESS_COLS, HEADLESS_ROWS);
        let mut terminal = Terminal::new(backend).context("failed to build test backend")?;
        let area = terminal_area(&terminal)?;
        let mut app = TerminalApp::new(self, ctx, area)?;
        let frames = self.headless_frame_budget();

        let report = app.run_session(|app| {
            app.pump_events();
            let mut report = HeadlessReport::new(app.frame_stats());
            for frame in 0..frames {
                if frame > 0 && frame % HEADLESS_DEMO_REFRESH_FRAMES == 0 {
                    app.refresh_demo();
                }
                if frame == frames / 2 {
                    app.click_topmost_fish();
                }
                app.step_once();
                report.record(app.frame_stats());
                terminal.draw(|frame| app.draw(frame))?;
            }
            report.finalize(app.selection_log.entries().len());
            Ok(report)
        })?;

        if let Some(path) = report_file_path_from_env() {
            report.write_json(&path).with_context(|| {
                format!("failed to write headless report to {}", path.display())
            })?;
        }

        Ok(report)
    }

    fn headless_frame_budget(&self) -> usize {
        std::env::var("AQUARIUM_HEADLESS_FRAMES")
            .ok()
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|value| *value > 0)
            .map(|value| value.min(MAX_HEADLESS_FRAMES))
            .unwrap_or(DEFAULT_HEADLESS_FRAMES)
    }
}

fn terminal_area<B: Backend>(terminal: &Terminal<B>) -> Result<Rect> {
    let size = terminal.size().context("failed to query terminal size")?;
    Ok(Rect::new(0, 0, size.width, size.height))
}

fn run_event_loop(
    renderer: &TerminalRenderer,
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ctx: TerminalContext,
) -> Result<()> {
    let mut app = TerminalApp::new(renderer, ctx, terminal_area(terminal)?)?;
    app.run_session(|app| drive_interactive(app, terminal))
}

fn drive_interactive(
    app: &mut TerminalApp,
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
) -> Result<()> {
    loop {
        let now = Instant::now();
        app.sync_layout(terminal_area(terminal)?)?;
        app.maybe_step(now);

        if now.duration_since(app.last_draw) >= app.draw_interval {
            terminal.draw(|frame| app.draw(frame))?;
            app.last_draw = now;
        }

        let timeout = app.draw_interval.saturating_sub(now.elapsed());
        if event::poll(timeout).unwrap_or(false) {
            match event::read()? {
                Event::Key(key) => {
                    if app.handle_key(key)? {
                        break;
                    }
                }
                Event::Mouse(mouse) => app.handle_mouse(mouse),
                _ => {}
            }
        }
    }
    Ok(())
}

/// Splits the screen into the aquarium map and the sidebar.
fn split_layout(area: Rect) -> (Rect, Rect) {
    let sidebar = SIDEBAR_WIDTH.min(area.width / 2);
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(sidebar)])
        .split(area);
    (columns[0], columns[1])
}

fn map_inner(area: Rect) -> Rect {
    let (map, _) = split_layout(area);
    Block::default().borders(Borders::ALL).inner(map)
}

fn viewport_for(inner: Rect) -> Option<Viewport> {
    if inner.width == 0 || inner.height == 0 {
        return None;
    }
    Some(Viewport::new(
        f32::from(inner.width),
        f32::from(inner.height) * CELL_ASPECT,
    ))
}

struct TerminalApp {
    aquarium: Aquarium,
    adapter: VisualAdapter<AsciiSurface>,
    drain: EventDrain,
    submit: EventSubmit,
    demo: Option<DemoFeed>,
    selection_log: SelectionLog,
    tick_interval: Duration,
    draw_interval: Duration,
    tick_accumulator: f32,
    last_tick: Instant,
    last_draw: Instant,
    last_refresh: Instant,
    map_area: Rect,
    hovered: Option<FishId>,
    palette: Palette,
}

impl TerminalApp {
    fn new(renderer: &TerminalRenderer, ctx: TerminalContext, area: Rect) -> Result<Self> {
        let inner = map_inner(area);
        let surface = AsciiSurface::new(inner.width.max(1), inner.height.max(1))
            .context("failed to allocate aquarium surface")?;
        let mut app = Self {
            aquarium: ctx.aquarium,
            adapter: VisualAdapter::new(surface),
            drain: ctx.drain,
            submit: ctx.submit,
            demo: ctx.demo,
            selection_log: ctx.selection_log,
            tick_interval: renderer.tick_interval,
            draw_interval: renderer.draw_interval,
            tick_accumulator: 0.0,
            last_tick: Instant::now(),
            last_draw: Instant::now(),
            last_refresh: Instant::now(),
            map_area: Rect::default(),
            hovered: None,
            palette: Palette::detect(),
        };
        app.aquarium.init(&mut app.adapter);
        app.sync_layout(area)?;
        Ok(app)
    }

    /// Tracks the map area and reports viewport changes to the scene.
    fn sync_layout(&mut self, area: Rect) -> Result<()> {
        let inner = map_inner(area);
        if inner == self.map_area {
            return Ok(());
        }
        self.map_area = inner;
        if inner.width > 0 && inner.height > 0 {
            self.adapter
                .surface_mut()
                .resize(inner.width, inner.height)
                .context("failed to resize aquarium surface")?;
        }
        (self.submit.as_ref())(HostEvent::Resize(viewport_for(inner)));
        Ok(())
    }

    fn pump_events(&mut self) -> usize {
        (self.drain.as_ref())(&mut self.aquarium, &mut self.adapter)
    }

    fn maybe_step(&mut self, now: Instant) {
        let delta = now - self.last_tick;
        self.last_tick = now;

        let step_interval = self.tick_interval.as_secs_f32();
        let mut steps = 0usize;
        if step_interval > f32::EPSILON {
            self.tick_accumulator += delta.as_secs_f32();
            let max_accumulator = step_interval * MAX_TICKS_PER_FRAME as f32;
            if self.tick_accumulator > max_accumulator {
                self.tick_accumulator = max_accumulator;
            }
            steps = ((self.tick_accumulator / step_interval).floor() as usize)
                .min(MAX_TICKS_PER_FRAME);
            if steps > 0 {
                self.tick_accumulator -= step_interval * steps as f32;
            }
        }

        if self.demo.is_some() && now.duration_since(self.last_refresh) >= DEMO_REFRESH {
            self.refresh_demo();
            self.last_refresh = now;
        }

        self.pump_events();
        for _ in 0..steps {
            self.aquarium.tick(&mut self.adapter);
        }
    }

    fn step_once(&mut self) {
        self.pump_events();
        self.aquarium.tick(&mut self.adapter);
    }

    fn refresh_demo(&mut self) {
        if let Some(feed) = self.demo.as_mut() {
            let snapshot = feed.next_snapshot();
            (self.submit.as_ref())(HostEvent::Dataset(Some(snapshot)));
        }
    }

    fn click_topmost_fish(&mut self) {
        let topmost = self.aquarium.registry().iter().map(|(id, _)| id).last();
        if topmost.is_some() {
            (self.submit.as_ref())(HostEvent::Pointer(PointerEvent::Click(topmost)));
        }
    }

    fn shutdown(&mut self) {
        self.aquarium.destroy(&mut self.adapter);
    }

    /// Runs `session`, then tears the aquarium down whether it succeeded or not.
    fn run_session<T>(&mut self, session: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let result = session(self);
        self.shutdown();
        result
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        match (key.code, key.modifiers) {
            (KeyCode::Esc, _)
            | (KeyCode::Char('q'), _)
            | (KeyCode::Char('Q'), _)
            | (KeyCode::Char('c'), KeyModifiers::CONTROL) => {
                return Ok(true);
            }
            (KeyCode::Char('r'), _) => {
                self.refresh_demo();
                self.last_refresh = Instant::now();
            }
            (KeyCode::Char('x'), _) => {
                (self.submit.as_ref())(HostEvent::Pointer(PointerEvent::Click(None)));
            }
            (KeyCode::Char('S'), _) => {
                let path = Path::new("screenshots")
                    .join(format!("frame_{}.txt", self.aquarium.driver().tick().0));
                self.adapter
                    .surface()
                    .write_snapshot(&path)
                    .context("failed to save ASCII screenshot")?;
                info!(path = %path.display(), "saved ASCII screenshot");
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let hit = self.fish_at(mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let inside = self.map_contains(mouse.column, mouse.row);
                if inside {
                    (self.submit.as_ref())(HostEvent::Pointer(PointerEvent::Click(hit)));
                }
            }
            MouseEventKind::Moved | MouseEventKind::Drag(_) => self.update_hover(hit),
            _ => {}
        }
    }

    fn map_contains(&self, column: u16, row: u16) -> bool {
        column >= self.map_area.x
            && column < self.map_area.x + self.map_area.width
            && row >= self.map_area.y
            && row < self.map_area.y + self.map_area.height
    }

    fn fish_at(&self, column: u16, row: u16) -> Option<FishId> {
        if !self.map_contains(column, row) {
            return None;
        }
        let point = self
            .adapter
            .surface()
            .cell_center(column - self.map_area.x, row - self.map_area.y);
        self.adapter.hit_test(point)
    }

    fn update_hover(&mut self, hit: Option<FishId>) {
        if hit == self.hovered {
            return;
        }
        if let Some(previous) = self.hovered {
            (self.submit.as_ref())(HostEvent::Pointer(PointerEvent::HoverOut(previous)));
        }
        if let Some(current) = hit {
            (self.submit.as_ref())(HostEvent::Pointer(PointerEvent::HoverIn(current)));
        }
        self.hovered = hit;
    }

    fn frame_stats(&self) -> FrameStats {
        FrameStats {
            tick: self.aquarium.driver().tick().0,
            fish: self.aquarium.registry().len(),
            handles: self.adapter.handle_count(),
            selected: self.aquarium.selection().selected().is_some(),
        }
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let (map, sidebar) = split_layout(frame.area());
        self.draw_map(frame, map);

        let panels = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(7),
                Constraint::Min(6),
                Constraint::Length(8),
                Constraint::Length(3),
            ])
            .split(sidebar);
        self.draw_status(frame, panels[0]);
        self.draw_focus(frame, panels[1]);
        self.draw_selection_log(frame, panels[2]);
        self.draw_help(frame, panels[3]);
    }

    fn draw_map(&self, frame: &mut Frame<'_>, area: Rect) {
        let title = format!("Aquarium · {} fish", self.aquarium.registry().len());
        let block = Block::default()
            .title(self.palette.title(title))
            .borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if inner.width < 2 || inner.height < 2 {
            return;
        }

        let surface = self.adapter.surface();
        let rows = inner.height.min(surface.rows());
        let cols = usize::from(inner.width.min(surface.cols()));
        let mut lines = Vec::with_capacity(usize::from(rows));
        for row in 0..rows {
            let spans: Vec<Span<'static>> = surface
                .row(row)
                .iter()
                .take(cols)
                .map(|cell| Span::styled(cell.ch.to_string(), self.palette.cell_style(cell)))
                .collect();
            lines.push(Line::from(spans));
        }
        frame.render_widget(Paragraph::new(Text::from(lines)), inner);
    }

    fn draw_status(&self, frame: &mut Frame<'_>, area: Rect) {
        let driver = self.aquarium.driver();
        let viewport = self
            .aquarium
            .viewport()
            .map(|v| format!("{:.0}×{:.0}", v.width, v.height))
            .unwrap_or_else(|| "none".to_string());
        let lines = vec![
            Line::from(vec![
                Span::raw("Tick "),
                Span::styled(driver.tick().0.to_string(), self.palette.accent_style()),
                Span::raw(format!("  {:?}", driver.state())),
            ]),
            Line::from(format!(
                "Fish {}  Handles {}",
                self.aquarium.registry().len(),
                self.adapter.handle_count()
            )),
            Line::from(format!("Viewport {viewport}")),
            Line::from(match self.demo.as_ref() {
                Some(feed) => format!("Demo refreshes {}", feed.refreshes()),
                None => "Dataset from file".to_string(),
            }),
        ];
        let paragraph = Paragraph::new(Text::from(lines)).block(
            Block::default()
                .title(self.palette.title("Status"))
                .borders(Borders::ALL),
        );
        frame.render_widget(paragraph, area);
    }

    fn draw_focus(&self, frame: &mut Frame<'_>, area: Rect) {
        let focus = self.hovered.or(self.aquarium.selection().selected());
        let focused = focus.and_then(|id| self.aquarium.registry().get(id));
        let lines: Vec<Line<'static>> = match focused {
            Some(fish) => {
                let mut lines: Vec<Line<'static>> = fish
                    .tooltip
                    .items
                    .iter()
                    .map(|item| {
                        Line::from(vec![
                            Span::styled(
                                format!("{}: ", item.display_name),
                                self.palette.accent_style(),
                            ),
                            Span::raw(item.value.clone()),
                        ])
                    })
                    .collect();
                lines.push(Line::from(format!("size {:+.3}  speed {:+.2}", fish.size, fish.speed)));
                if fish.paused {
                    lines.push(Line::styled("paused", self.palette.paused_style()));
                }
                lines
            }
            None => vec![Line::from("Hover or click a fish")],
        };
        let title = if self.aquarium.selection().selected().is_some() {
            "Selected"
        } else {
            "Fish"
        };
        let paragraph = Paragraph::new(Text::from(lines))
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .title(self.palette.title(title))
                    .borders(Borders::ALL),
            );
        frame.render_widget(paragraph, area);
    }

    fn draw_selection_log(&self, frame: &mut Frame<'_>, area: Rect) {
        let capacity = usize::from(area.height.saturating_sub(2));
        let entries = self.selection_log.entries();
        let lines: Vec<Line<'static>> = entries
            .iter()
            .rev()
            .take(capacity)
            .map(|entry| Line::from(entry.clone()))
            .collect();
        let paragraph = Paragraph::new(Text::from(lines)).block(
            Block::default()
                .title(self.palette.title("Broadcasts"))
                .borders(Borders::ALL),
        );
        frame.render_widget(paragraph, area);
    }

    fn draw_help(&self, frame: &mut Frame<'_>, area: Rect) {
        let paragraph = Paragraph::new("q quit · r refresh · x clear · S snap")
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(paragraph, area);
    }
}

#[derive(Debug, Clone, Serialize)]
struct HeadlessReport {
    initial: FrameStats,
    frames: Vec<FrameStats>,
    summary: ReportSummary,
}

impl HeadlessReport {
    fn new(initial: FrameStats) -> Self {
        Self {
            initial,
            frames: Vec::new(),
            summary: ReportSummary::default(),
        }
    }

    fn record(&mut self, stats: FrameStats) {
        self.frames.push(stats);
    }

    fn finalize(&mut self, selection_broadcasts: usize) {
        self.summary = ReportSummary::from(&self.initial, &self.frames, selection_broadcasts);
    }

    fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self).context("failed to serialize headless report")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
struct FrameStats {
    tick: u64,
    fish: usize,
    handles: usize,
    selected: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
struct ReportSummary {
    frame_count: usize,
    final_tick: u64,
    final_fish: usize,
    min_fish: usize,
    max_fish: usize,
    frames_with_selection: usize,
    selection_broadcasts: usize,
}

impl ReportSummary {
    fn from(initial: &FrameStats, frames: &[FrameStats], selection_broadcasts: usize) -> Self {
        let Some(last) = frames.last() else {
            return Self {
                final_tick: initial.tick,
                final_fish: initial.fish,
                min_fish: initial.fish,
                max_fish: initial.fish,
                selection_broadcasts,
                ..Self::default()
            };
        };
        Self {
            frame_count: frames.len(),
            final_tick: last.tick,
            final_fish: last.fish,
            min_fish: frames.iter().map(|f| f.fish).min().unwrap_or(initial.fish),
            max_fish: frames.iter().map(|f| f.fish).max().unwrap_or(initial.fish),
            frames_with_selection: frames.iter().filter(|f| f.selected).count(),
            selection_broadcasts,
        }
    }
}

fn report_file_path_from_env() -> Option<PathBuf> {
    std::env::var_os("AQUARIUM_REPORT_FILE").and_then(|raw| {
        if raw.is_empty() {
            None
        } else {
            Some(PathBuf::from(raw))
        }
    })
}

struct Palette {
    level: Option<ColorLevel>,
}

impl Palette {
    fn detect() -> Self {
        Self {
            level: on_cached(Stream::Stdout),
        }
    }

    fn header_style(&self) -> Style {
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    }

    fn accent_style(&self) -> Style {
        Style::default().fg(Color::LightMagenta)
    }

    fn paused_style(&self) -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD)
    }

    fn title<T: Into<String>>(&self, title: T) -> Span<'static> {
        Span::styled(title.into(), self.header_style())
    }

    fn cell_style(&self, cell: &Cell) -> Style {
        let style = match cell.kind {
            CellKind::Water => Style::default(),
            CellKind::Pebble => Style::default().fg(Color::DarkGray),
            CellKind::Reed => Style::default().fg(Color::Green),
            CellKind::Fish => match cell.color {
                Some(color) => Style::default()
                    .fg(self.fish_color(color))
                    .add_modifier(Modifier::BOLD),
                None => Style::default().add_modifier(Modifier::BOLD),
            },
        };
        if cell.faded {
            style.remove_modifier(Modifier::BOLD).add_modifier(Modifier::DIM)
        } else {
            style
        }
    }

    fn fish_color(&self, color: aquarium_core::Color) -> Color {
        match self.level {
            Some(level) if level.has_16m => Color::Rgb(color.r, color.g, color.b),
            Some(level) if level.has_256 => Color::Indexed(ansi256(color)),
            Some(_) => basic_color(color),
            None => Color::Reset,
        }
    }
}

/// Nearest entry of the 6×6×6 ANSI colour cube.
fn ansi256(color: aquarium_core::Color) -> u8 {
    let level = |channel: u8| -> u8 { ((u16::from(channel) * 5 + 127) / 255) as u8 };
    16 + 36 * level(color.r) + 6 * level(color.g) + level(color.b)
}

fn basic_color(color: aquarium_core::Color) -> Color {
    let (r, g, b) = (color.r > 127, color.g > 127, color.b > 127);
    match (r, g, b) {
        (false, false, false) => Color::DarkGray,
        (true, false, false) => Color::Red,
        (false, true, false) => Color::Green,
        (false, false, true) => Color::Blue,
        (true, true, false) => Color::Yellow,
        (true, false, true) => Color::Magenta,
        (false, true, true) => Color::Cyan,
        (true, true, true) => Color::White,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{create_event_bus, make_event_drain, make_event_submit};
    use aquarium_core::AquariumConfig;

    fn context(demo: bool) -> TerminalContext {
        let (tx, rx) = create_event_bus(64);
        let log = SelectionLog::new();
        let config = AquariumConfig {
            rng_seed: Some(12),
            ..AquariumConfig::default()
        };
        let aquarium = Aquarium::new(config, host_services(&log)).expect("aquarium");
        let submit = make_event_submit(tx);
        let mut feed = demo.then(|| DemoFeed::new(8, 12));
        if let Some(feed) = feed.as_mut() {
            submit(HostEvent::Dataset(Some(feed.next_snapshot())));
        }
        TerminalContext::new(aquarium, make_event_drain(rx), submit, feed, log)
    }

    fn app(demo: bool) -> TerminalApp {
        TerminalApp::new(
            &TerminalRenderer::default(),
            context(demo),
            Rect::new(0, 0, HEADLESS_COLS, HEADLESS_ROWS),
        )
        .expect("app")
    }

    #[test]
    fn layout_reserves_sidebar_and_borders() {
        let inner = map_inner(Rect::new(0, 0, 100, 36));
        assert_eq!(inner, Rect::new(1, 1, 64, 34));
        assert_eq!(viewport_for(inner), Some(Viewport::new(64.0, 68.0)));
        assert_eq!(viewport_for(Rect::new(0, 0, 0, 10)), None);
    }

    #[test]
    fn startup_applies_dataset_and_viewport() {
        let mut app = app(true);
        app.step_once();
        assert_eq!(app.aquarium.registry().len(), app.adapter.handle_count());
        assert!(app.aquarium.registry().len() > 0);
        assert_eq!(app.aquarium.viewport(), Some(Viewport::new(64.0, 68.0)));
        assert_eq!(app.aquarium.driver().tick().0, 1);
    }

    #[test]
    fn mouse_outside_map_hits_nothing() {
        let mut app = app(true);
        app.step_once();
        assert_eq!(app.fish_at(99, 10), None);
        assert_eq!(app.fish_at(0, 0), None);
    }

    #[test]
    fn hover_pauses_and_unpauses_through_the_bus() {
        let mut app = app(true);
        app.step_once();
        let id = app.aquarium.registry().iter().map(|(id, _)| id).next().expect("fish");
        app.update_hover(Some(id));
        app.pump_events();
        assert!(app.aquarium.registry().get(id).is_some_and(|fish| fish.paused));
        app.update_hover(None);
        app.pump_events();
        assert!(app.aquarium.registry().get(id).is_some_and(|fish| !fish.paused));
    }

    #[test]
    fn failed_session_still_destroys_the_aquarium() {
        let mut app = app(true);
        app.step_once();
        assert!(app.adapter.handle_count() > 0);

        let result: Result<()> = app.run_session(|_| Err(anyhow::anyhow!("draw failed")));
        assert!(result.is_err());
        assert!(app.aquarium.is_destroyed());
        assert_eq!(app.adapter.handle_count(), 0);
        assert!(app.aquarium.registry().is_empty());
    }

    #[test]
    fn headless_draw_renders_fish_glyphs() {
        let mut app = app(true);
        let backend = TestBackend::new(HEADLESS_COLS, HEADLESS_ROWS);
        let mut terminal = Terminal::new(backend).expect("terminal");
        for _ in 0..3 {
            app.step_once();
            terminal.draw(|frame| app.draw(frame)).expect("draw");
        }
        let fish_cells = (0..app.adapter.surface().rows())
            .flat_map(|row| app.adapter.surface().row(row).to_vec())
            .filter(|cell| cell.kind == CellKind::Fish)
            .count();
        assert!(fish_cells > 0);
        app.shutdown();
        assert_eq!(app.adapter.handle_count(), 0);
    }

    #[test]
    fn ansi_cube_maps_extremes() {
        assert_eq!(ansi256(aquarium_core::Color::rgb(0, 0, 0)), 16);
        assert_eq!(ansi256(aquarium_core::Color::rgb(255, 255, 255)), 231);
    }
}
