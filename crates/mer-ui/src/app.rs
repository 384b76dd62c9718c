//! Application state and TUI event loops.
//!
//! [`App`] owns the theme and the chart state. It drives the static report
//! view for one month and the series chart, which fills in once the
//! background build delivers.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Frame, Terminal};
use tokio::sync::mpsc;

use mer_core::calculations::ClassReport;
use mer_runtime::orchestrator::SeriesUpdate;
use mer_runtime::series::MonthlySeries;

use crate::chart_view;
use crate::table_view;
use crate::themes::Theme;

const TICK_RATE: Duration = Duration::from_millis(250);

// ── ChartState ────────────────────────────────────────────────────────────────

/// What the chart view currently shows.
#[derive(Debug, Clone)]
pub enum ChartState {
    Loading,
    Loaded(MonthlySeries),
    Failed(String),
}

// ── App ───────────────────────────────────────────────────────────────────────

/// Root application state for the MER statistics TUI.
pub struct App {
    pub theme: Theme,
    pub chart: ChartState,
}

impl App {
    pub fn new(theme_name: &str) -> Self {
        Self {
            theme: Theme::from_name(theme_name),
            chart: ChartState::Loading,
        }
    }

    // ── Public event loops ────────────────────────────────────────────────────

    /// Show the class report for one month until `q` / `Ctrl+C`.
    pub async fn run_report(self, title: String, report: ClassReport) -> io::Result<()> {
        let mut terminal = enter_terminal()?;

        let result = loop {
            terminal.draw(|frame| {
                let area = frame.area();
                if report.total_losses == 0 {
                    table_view::render_no_data(frame, area, &title, &self.theme);
                } else {
                    table_view::render_report(frame, area, &title, &report, &self.theme);
                }
            })?;

            match poll_quit() {
                Ok(true) => break Ok(()),
                Ok(false) => {}
                Err(e) => break Err(e),
            }
            tokio::task::yield_now().await;
        };

        leave_terminal(&mut terminal)?;
        result
    }

    /// Show the series chart, receiving the series from `rx`.
    ///
    /// Uses `crossterm::event::poll` (synchronous, 250 ms timeout) for keys
    /// and yields to the runtime once per tick, so a caller racing this loop
    /// in `tokio::select!` (e.g. against `ctrl_c`) still gets polled.
    pub async fn run_chart(mut self, mut rx: mpsc::Receiver<SeriesUpdate>) -> io::Result<()> {
        let mut terminal = enter_terminal()?;

        let result = loop {
            terminal.draw(|frame| self.render_chart(frame))?;

            match poll_quit() {
                Ok(true) => break Ok(()),
                Ok(false) => {}
                Err(e) => break Err(e),
            }

            self.pump(&mut rx).await;
        };

        leave_terminal(&mut terminal)?;
        result
    }

    /// Take at most one pending update, then yield.
    async fn pump(&mut self, rx: &mut mpsc::Receiver<SeriesUpdate>) {
        match rx.try_recv() {
            Ok(update) => self.apply(update),
            Err(mpsc::error::TryRecvError::Empty) => {}
            Err(mpsc::error::TryRecvError::Disconnected) => {
                if matches!(self.chart, ChartState::Loading) {
                    self.chart = ChartState::Failed("Series build stopped".to_string());
                }
            }
        }
        tokio::task::yield_now().await;
    }

    /// Store a build outcome.
    pub fn apply(&mut self, update: SeriesUpdate) {
        self.chart = match update {
            SeriesUpdate::Loaded(series) => ChartState::Loaded(series),
            SeriesUpdate::Failed(reason) => ChartState::Failed(reason),
        };
    }

    // ── Private helpers ───────────────────────────────────────────────────────

    fn render_chart(&self, frame: &mut Frame) {
        let area = frame.area();
        match &self.chart {
            ChartState::Loading => chart_view::render_loading(frame, area, &self.theme),
            ChartState::Loaded(series) => chart_view::render_chart(frame, area, series, &self.theme),
            ChartState::Failed(reason) => chart_view::render_failed(frame, area, reason, &self.theme),
        }
    }
}

/// Whether a key press ends the session: `q`, `Q` or `Ctrl+C`.
pub fn is_quit_key(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        KeyCode::Char('q') | KeyCode::Char('Q') => true,
        _ => false,
    }
}

fn poll_quit() -> io::Result<bool> {
    if event::poll(TICK_RATE)? {
        if let Event::Key(key) = event::read()? {
            return Ok(is_quit_key(&key));
        }
    }
    Ok(false)
}

fn enter_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Terminal::new(CrosstermBackend::new(stdout))
}

/// Undo raw mode and the alternate screen when an event loop was dropped
/// before it could clean up.
pub fn restore_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show)
}

fn leave_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()
}

// ── Tests ──────────────────────────────────────────────────────────────────────
