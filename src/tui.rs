use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    text::Line,
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
};
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::analysis::{self, Dashboard};
use crate::comfy_table::format_timestamp;
use crate::heatmap::{self, HeatGrid};
use crate::pulse::classify::{TrendLabel, TrendPolicy};
use crate::pulse::{self, PulseReport};
use crate::results::{self, DetailedRow};
use crate::storage_utils::{AppConfig, AsyncStorageManager};

/// Row limits offered for the Best Pairs table.
pub const TOP_N_CHOICES: [usize; 5] = [10, 15, 20, 30, 50];

// --- Data & App State ---

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum View {
    CurrencyPulse,
    HeatMap,
    DetailedResults,
}

impl View {
    const ALL: [View; 3] = [View::CurrencyPulse, View::HeatMap, View::DetailedResults];

    fn title(self) -> &'static str {
        match self {
            View::CurrencyPulse => "Currency Pulse",
            View::HeatMap => "Heat Map",
            View::DetailedResults => "Detailed Results",
        }
    }
}

/// Outcome of a background refresh: whatever is now on disk, plus the
/// failure message if any request failed.
struct RefreshResult {
    dashboard: Dashboard,
    error: Option<String>,
}

/// Index of the choice closest to `top_n`, the smaller one on a tie.
fn nearest_top_n_index(top_n: usize) -> usize {
    let index = TOP_N_CHOICES
        .iter()
        .enumerate()
        .min_by_key(|(_, n)| n.abs_diff(top_n))
        .map(|(i, _)| i)
        .unwrap_or(0);
    if TOP_N_CHOICES[index] != top_n {
        tracing::warn!(
            requested = top_n,
            shown = TOP_N_CHOICES[index],
            "top N not among the dashboard choices, using the nearest"
        );
    }
    index
}

struct App {
    storage: AsyncStorageManager,
    config: AppConfig,
    dashboard: Dashboard,
    report: PulseReport,
    grid: HeatGrid,
    detailed: Vec<DetailedRow>,
    is_refreshing: bool,
    error: Option<String>,
    selected_view: usize,
    top_n_index: usize,
}

impl App {
    fn new(storage: AsyncStorageManager, config: AppConfig, dashboard: Dashboard) -> Self {
        let top_n_index = nearest_top_n_index(config.top_n);
        let policy = config.trend_policy;

        let mut app = Self {
            storage,
            config,
            dashboard: Dashboard::default(),
            report: pulse::analyze(&Default::default(), policy),
            grid: heatmap::build_grid(&Default::default()),
            detailed: Vec::new(),
            is_refreshing: false,
            error: None,
            selected_view: 0,
            top_n_index,
        };
        app.set_data(dashboard);
        app
    }

    fn view(&self) -> View {
        View::ALL[self.selected_view]
    }

    fn top_n(&self) -> usize {
        TOP_N_CHOICES[self.top_n_index]
    }

    fn set_data(&mut self, dashboard: Dashboard) {
        self.dashboard = dashboard;
        self.recompute();
        self.is_refreshing = false;
    }

    /// Derived tables are rebuilt in full from the current snapshots.
    fn recompute(&mut self) {
        let batch = self
            .dashboard
            .analysis
            .as_ref()
            .map(|s| s.data.clone())
            .unwrap_or_default();
        self.report = pulse::analyze(&batch, self.config.trend_policy);
        self.detailed = results::detailed_rows(&batch);
        self.grid = match &self.dashboard.heatmap {
            Some(s) => heatmap::build_grid(&s.data),
            None => heatmap::build_grid(&Default::default()),
        };
    }

    fn toggle_policy(&mut self) {
        self.config.trend_policy = match self.config.trend_policy {
            TrendPolicy::Quartile => TrendPolicy::SignOnly,
            TrendPolicy::SignOnly => TrendPolicy::Quartile,
        };
        self.recompute();
    }
}

// --- TUI ---

pub async fn run_tui(storage: AsyncStorageManager, config: AppConfig) -> Result<()> {
    let dashboard = analysis::load_dashboard(&storage).await;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, App::new(storage, config, dashboard)).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    res
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, mut app: App) -> Result<()> {
    let (data_tx, mut data_rx) = mpsc::channel::<RefreshResult>(1);

    loop {
        terminal.draw(|f| ui(f, &app))?;

        if let Ok(result) = data_rx.try_recv() {
            app.error = result.error;
            app.set_data(result.dashboard);
        }

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) => {
                    if !handle_key_event(key, &mut app, &data_tx) {
                        tracing::info!("quit requested");
                        return Ok(());
                    }
                }
                // the next draw picks up the new size
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }
}

fn spawn_refresh(app: &mut App, tx: &mpsc::Sender<RefreshResult>) {
    app.is_refreshing = true;
    app.error = None;

    let tx_clone = tx.clone();
    let storage = app.storage.clone();
    let config = app.config.clone();
    tokio::spawn(async move {
        let outcome = analysis::refresh_all(&storage, &config).await;
        let error = outcome.err().map(|e| format!("{:#}", e));
        if let Some(message) = &error {
            tracing::warn!(error = %message, "refresh failed");
        }
        let dashboard = analysis::load_dashboard(&storage).await;
        let _ = tx_clone.send(RefreshResult { dashboard, error }).await;
    });
}

fn handle_key_event(key: KeyEvent, app: &mut App, tx: &mpsc::Sender<RefreshResult>) -> bool {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return false,
        KeyCode::F(5) | KeyCode::Char('r') if !app.is_refreshing => spawn_refresh(app, tx),
        KeyCode::Up => {
            app.selected_view = app
                .selected_view
                .checked_sub(1)
                .unwrap_or(View::ALL.len() - 1);
        }
        KeyCode::Down | KeyCode::Tab => {
            app.selected_view = (app.selected_view + 1) % View::ALL.len();
        }
        KeyCode::Char('+') | KeyCode::Right => {
            app.top_n_index = (app.top_n_index + 1).min(TOP_N_CHOICES.len() - 1);
        }
        KeyCode::Char('-') | KeyCode::Left => {
            app.top_n_index = app.top_n_index.saturating_sub(1);
        }
        KeyCode::Char('p') => app.toggle_policy(),
        KeyCode::Char(c) => {
            if let Some(digit) = c.to_digit(10) {
                if digit > 0 && digit as usize <= View::ALL.len() {
                    app.selected_view = (digit - 1) as usize;
                }
            }
        }
        _ => {}
    }
    true
}

fn strength_color(strength: i8) -> Color {
    match strength {
        s if s >= 2 => Color::Rgb(0, 200, 83),
        1 => Color::Rgb(129, 199, 132),
        0 => Color::Gray,
        -1 => Color::Rgb(229, 115, 115),
        _ => Color::Rgb(229, 57, 53),
    }
}

fn trend_color(trend: TrendLabel) -> Color {
    strength_color(trend.strength())
}

fn score_color(score: i32) -> Color {
    match score {
        s if s > 0 => Color::Green,
        s if s < 0 => Color::Red,
        _ => Color::Gray,
    }
}

fn header_row<'a>(names: &[&'a str]) -> Row<'a> {
    Row::new(names.iter().map(|n| Cell::from(*n))).style(Style::default().bg(Color::DarkGray))
}

fn ui(f: &mut Frame, app: &App) {
    let main_layout = Layout::horizontal([Constraint::Percentage(18), Constraint::Percentage(82)])
        .split(f.size());

    let right_chunks = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(0),
        Constraint::Length(if app.error.is_some() { 3 } else { 0 }),
    ])
    .split(main_layout[1]);

    // Sidebar
    let sidebar_block = Block::default()
        .borders(Borders::ALL)
        .title("Views")
        .title_alignment(Alignment::Center);
    let inner_sidebar_area = sidebar_block.inner(main_layout[0]);
    f.render_widget(sidebar_block, main_layout[0]);

    let sidebar_chunks = Layout::vertical([
        Constraint::Min(1),    // view list
        Constraint::Length(4), // key help
    ])
    .split(inner_sidebar_area);

    let view_lines: Vec<Line> = View::ALL
        .iter()
        .enumerate()
        .map(|(i, view)| {
            let mut line = Line::from(format!("{} {}", i + 1, view.title()));
            if i == app.selected_view {
                line = line.style(Style::default().fg(Color::Yellow).bg(Color::DarkGray));
            }
            line
        })
        .collect();
    f.render_widget(Paragraph::new(view_lines), sidebar_chunks[0]);

    f.render_widget(
        Paragraph::new(vec![
            Line::from("F5 refreshes data"),
            Line::from("+/- top N"),
            Line::from("p trend policy"),
            Line::from("q quits"),
        ])
        .alignment(Alignment::Center),
        sidebar_chunks[1],
    );

    let time_str = format_timestamp(app.dashboard.last_updated());
    let query = &app.config.query;
    f.render_widget(
        Block::default()
            .borders(Borders::ALL)
            .title_alignment(Alignment::Center)
            .title(format!(
                "Last Updated: {} | {} | {} | {}",
                time_str, query.screener, query.timeframe, query.symbols
            )),
        right_chunks[0],
    );

    match app.view() {
        View::CurrencyPulse => render_pulse(f, app, right_chunks[1]),
        View::HeatMap => render_heatmap(f, &app.grid, right_chunks[1]),
        View::DetailedResults => render_results(f, &app.detailed, right_chunks[1]),
    }

    if let Some(error) = &app.error {
        f.render_widget(
            Paragraph::new(format!("Error: {}", error))
                .style(Style::default().fg(Color::Red))
                .block(Block::default().borders(Borders::ALL)),
            right_chunks[2],
        );
    }

    if app.is_refreshing {
        let area = centered_rect(60, 20, main_layout[1]);
        f.render_widget(Clear, area);
        f.render_widget(
            Paragraph::new("Fetching analysis and heat map...\nPlease wait.")
                .block(Block::default().title("Refreshing").borders(Borders::ALL))
                .alignment(Alignment::Center),
            area,
        );
    }
}

fn render_pulse(f: &mut Frame, app: &App, area: Rect) {
    let chunks =
        Layout::horizontal([Constraint::Percentage(35), Constraint::Percentage(65)]).split(area);

    let summary = app.report.summary();
    let summary_rows = summary.iter().map(|(currency, score)| {
        Row::new([
            Cell::from(currency.clone()),
            Cell::from(score.to_string()).style(Style::default().fg(score_color(*score))),
        ])
    });
    f.render_widget(
        Table::new(summary_rows, [Constraint::Percentage(50), Constraint::Percentage(50)])
            .header(header_row(&["Currency", "Score"]))
            .block(Block::default().borders(Borders::ALL).title("Summary")),
        chunks[0],
    );

    let pair_rows = app.report.top(app.top_n()).iter().enumerate().map(|(i, row)| {
        let trend = row.trend.unwrap_or(TrendLabel::Neutral);
        Row::new([
            Cell::from(format!("{}", i + 1)).style(Style::default().fg(Color::DarkGray)),
            Cell::from(row.pair.clone()).style(Style::default().fg(Color::Cyan)),
            Cell::from(row.abs_diff.to_string()),
            Cell::from(trend.as_str()).style(
                Style::default()
                    .fg(trend_color(trend))
                    .add_modifier(Modifier::BOLD),
            ),
        ])
        .height(1)
    });
    f.render_widget(
        Table::new(
            pair_rows,
            [
                Constraint::Length(6),
                Constraint::Percentage(30),
                Constraint::Percentage(30),
                Constraint::Percentage(40),
            ],
        )
        .header(header_row(&["Rank", "Pair", "Score Difference", "Trend Type"]))
        .block(Block::default().borders(Borders::ALL).title(format!(
            "Best Pairs (Top {}, {})",
            app.top_n(),
            app.report.policy.name()
        ))),
        chunks[1],
    );
}

fn render_heatmap(f: &mut Frame, grid: &HeatGrid, area: Rect) {
    let mut names = vec!["Pair"];
    names.extend(grid.timeframes.iter().copied());

    let rows = grid.rows.iter().map(|row| {
        let mut cells = vec![Cell::from(row.symbol.clone()).style(Style::default().bold())];
        cells.extend(row.cells.iter().map(|c| {
            let color = match c.recommendation {
                Some(rec) => strength_color(rec.score() as i8),
                None => Color::DarkGray,
            };
            Cell::from(c.label()).style(Style::default().fg(color))
        }));
        Row::new(cells)
    });

    let widths = std::iter::once(Constraint::Length(10))
        .chain(grid.timeframes.iter().map(|_| Constraint::Min(14)))
        .collect::<Vec<_>>();

    f.render_widget(
        Table::new(rows, widths)
            .header(header_row(&names))
            .block(Block::default().borders(Borders::ALL).title("Technical Heat Map")),
        area,
    );
}

fn render_results(f: &mut Frame, rows: &[DetailedRow], area: Rect) {
    let table_rows = rows.iter().map(|r| {
        Row::new([
            Cell::from(r.pair.clone()).style(Style::default().fg(Color::Cyan)),
            Cell::from(r.trend.as_str()).style(Style::default().fg(trend_color(r.trend))),
            Cell::from(r.base.clone()),
            Cell::from(r.base_score.to_string()).style(Style::default().fg(score_color(r.base_score))),
            Cell::from(r.quote.clone()),
            Cell::from(r.quote_score.to_string())
                .style(Style::default().fg(score_color(r.quote_score))),
        ])
    });

    f.render_widget(
        Table::new(table_rows, [Constraint::Ratio(1, 6); 6])
            .header(header_row(&[
                "Pair",
                "Trend",
                "Base Currency",
                "Base Score",
                "Quote Currency",
                "Quote Score",
            ]))
            .block(Block::default().borders(Borders::ALL).title("Detailed Results")),
        area,
    );
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .split(r);
    Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use ratatui::backend::TestBackend;

    fn app() -> App {
        let storage = AsyncStorageManager {
            base_dir: std::env::temp_dir().join("currency-pulse-tui-test"),
        };
        App::new(storage, AppConfig::default(), Dashboard::default())
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        let (tx, _rx) = mpsc::channel(1);
        handle_key_event(KeyEvent::new(code, KeyModifiers::NONE), app, &tx)
    }

    #[test]
    fn views_cycle_with_arrows_and_digits() {
        let mut app = app();
        assert_eq!(app.view(), View::CurrencyPulse);

        press(&mut app, KeyCode::Up);
        assert_eq!(app.view(), View::DetailedResults);
        press(&mut app, KeyCode::Down);
        assert_eq!(app.view(), View::CurrencyPulse);
        press(&mut app, KeyCode::Char('2'));
        assert_eq!(app.view(), View::HeatMap);
        press(&mut app, KeyCode::Char('9'));
        assert_eq!(app.view(), View::HeatMap);
    }

    #[test]
    fn top_n_steps_through_choices_and_clamps() {
        let mut app = app();
        assert_eq!(app.top_n(), 15);

        for _ in 0..10 {
            press(&mut app, KeyCode::Char('+'));
        }
        assert_eq!(app.top_n(), 50);
        for _ in 0..10 {
            press(&mut app, KeyCode::Char('-'));
        }
        assert_eq!(app.top_n(), 10);
    }

    #[test]
    fn configured_top_n_snaps_to_nearest_choice() {
        assert_eq!(TOP_N_CHOICES[nearest_top_n_index(15)], 15);
        assert_eq!(TOP_N_CHOICES[nearest_top_n_index(25)], 20);
        assert_eq!(TOP_N_CHOICES[nearest_top_n_index(27)], 30);
        assert_eq!(TOP_N_CHOICES[nearest_top_n_index(0)], 10);
        assert_eq!(TOP_N_CHOICES[nearest_top_n_index(500)], 50);

        let storage = AsyncStorageManager {
            base_dir: std::env::temp_dir().join("currency-pulse-tui-test"),
        };
        let config = AppConfig {
            top_n: 25,
            ..AppConfig::default()
        };
        let app = App::new(storage, config, Dashboard::default());
        assert_eq!(app.top_n(), 20);
    }

    #[test]
    fn policy_toggle_reclassifies() {
        let mut app = app();
        press(&mut app, KeyCode::Char('p'));
        assert_eq!(app.report.policy, TrendPolicy::SignOnly);
        press(&mut app, KeyCode::Char('p'));
        assert_eq!(app.report.policy, TrendPolicy::Quartile);
    }

    #[test]
    fn q_quits() {
        let mut app = app();
        assert!(!press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn every_view_renders_without_data() {
        let mut app = app();
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();

        for i in 0..View::ALL.len() {
            app.selected_view = i;
            terminal.draw(|f| ui(f, &app)).unwrap();
        }
        app.error = Some("Failed to fetch analysis data".to_string());
        app.is_refreshing = true;
        terminal.draw(|f| ui(f, &app)).unwrap();
    }
}
