use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::core::dashboard::{CacheEntry, DashboardRuntime, MetricPayload, SnapshotCache};
use crate::error::DashError;

use super::event_handler::DashboardEvent;
use super::render::render_ui;

/// Dashboard application state
pub struct DashboardApp {
    /// Snapshot taken at the start of the current frame.
    pub entries: Vec<CacheEntry>,
    pub should_quit: bool,
    pub show_help: bool,
    pub refresh_requested: bool,
    pub ascii_sparklines: bool,
    pub tick_ms: u64,
}

impl DashboardApp {
    pub fn new(config: DashboardAppConfig) -> Self {
        Self {
            entries: Vec::new(),
            should_quit: false,
            show_help: false,
            refresh_requested: false,
            ascii_sparklines: config.ascii_sparklines,
            tick_ms: config.tick_ms,
        }
    }

    /// Copy the current cache contents for rendering.
    pub fn update_snapshot(&mut self, cache: &SnapshotCache) {
        self.entries = cache.get_all();
    }

    pub fn entry(&self, source_id: &str) -> Option<&CacheEntry> {
        self.entries.iter().find(|e| e.source_id == source_id)
    }

    pub fn payload(&self, source_id: &str) -> Option<&MetricPayload> {
        self.entry(source_id).and_then(CacheEntry::payload)
    }

    /// Handle keyboard events
    pub fn handle_event(&mut self, event: DashboardEvent) {
        match event {
            DashboardEvent::Quit => self.should_quit = true,
            DashboardEvent::ToggleHelp => self.show_help = !self.show_help,
            DashboardEvent::RefreshAll => self.refresh_requested = true,
            DashboardEvent::None => {}
        }
    }

    /// Take a pending refresh request, if any.
    pub fn take_refresh_request(&mut self) -> bool {
        std::mem::take(&mut self.refresh_requested)
    }
}

/// Configuration for the dashboard app
#[derive(Debug, Clone)]
pub struct DashboardAppConfig {
    pub tick_ms: u64,
    pub ascii_sparklines: bool,
}

impl Default for DashboardAppConfig {
    fn default() -> Self {
        Self {
            tick_ms: 1000,
            ascii_sparklines: false,
        }
    }
}

/// Run the dashboard until the user quits or `interrupted` is set.
pub fn run_dashboard(
    runtime: &DashboardRuntime,
    config: DashboardAppConfig,
    interrupted: &AtomicBool,
) -> Result<()> {
    // Setup terminal
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(e).context("Failed to enter alternate screen");
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = match Terminal::new(backend) {
        Ok(terminal) => terminal,
        Err(e) => {
            restore_terminal();
            return Err(e).context("Failed to create terminal");
        }
    };

    let mut app = DashboardApp::new(config);
    let result = event_loop(&mut terminal, &mut app, runtime, interrupted);

    // Restore terminal even when the loop failed
    restore_terminal();
    terminal.show_cursor().context("Failed to show cursor")?;

    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut DashboardApp,
    runtime: &DashboardRuntime,
    interrupted: &AtomicBool,
) -> Result<()> {
    let tick_rate = Duration::from_millis(app.tick_ms.max(1));
    app.update_snapshot(runtime.cache());
    let mut last_tick = Instant::now();

    loop {
        // Draw on every tick, and right away after a key press
        if last_tick.elapsed() >= tick_rate {
            app.update_snapshot(runtime.cache());
            last_tick = Instant::now();
        }
        terminal
            .draw(|frame| render_ui(frame, app))
            .map_err(|e| DashError::tui(format!("draw failed: {}", e)))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);

        if event::poll(timeout).context("Event poll failed")? {
            if let Event::Key(key) = event::read().context("Event read failed")? {
                app.handle_event(DashboardEvent::from_key(key));
            }
        }

        if app.take_refresh_request() {
            runtime.request_refresh();
        }

        if app.should_quit || interrupted.load(Ordering::SeqCst) {
            log::info!("Dashboard exiting");
            return Ok(());
        }
    }
}

fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
}
