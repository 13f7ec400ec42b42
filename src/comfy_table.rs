use chrono::DateTime;
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ContentArrangement, Table, modifiers::UTF8_ROUND_CORNERS,
    presets::UTF8_BORDERS_ONLY,
};

use crate::heatmap::{HeatCell, HeatGrid};
use crate::pulse::PulseReport;
use crate::pulse::classify::{TrendLabel, TrendPolicy};
use crate::pulse::recommendation::Recommendation;
use crate::results::DetailedRow;

pub fn format_timestamp(ts_ms: i64) -> String {
    if ts_ms == 0 {
        return "Never".to_string();
    }
    let seconds = ts_ms / 1000;
    let nanoseconds = ((ts_ms % 1000) * 1_000_000) as u32;

    DateTime::from_timestamp(seconds, nanoseconds)
        .map(|dt| dt.format("%d-%m-%Y %H:%M:%S").to_string())
        .unwrap_or_else(|| "Unknown Time".to_string())
}

/// Badge colour for a signed strength: deep for strong, light for plain.
fn strength_color(strength: i8) -> Color {
    match strength {
        s if s >= 2 => Color::Rgb { r: 0, g: 200, b: 83 },
        1 => Color::Rgb { r: 129, g: 199, b: 132 },
        0 => Color::Grey,
        -1 => Color::Rgb { r: 229, g: 115, b: 115 },
        _ => Color::Rgb { r: 229, g: 57, b: 53 },
    }
}

fn score_color(score: i32) -> Color {
    match score {
        s if s > 0 => Color::Green,
        s if s < 0 => Color::Red,
        _ => Color::Grey,
    }
}

fn trend_cell(trend: TrendLabel) -> Cell {
    Cell::new(trend.as_str())
        .fg(strength_color(trend.strength()))
        .add_attribute(Attribute::Bold)
}

fn header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|n| Cell::new(n).add_attribute(Attribute::Bold))
        .collect()
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_BORDERS_ONLY)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Currency / Score, strongest currency first.
pub fn summary_table(report: &PulseReport) -> Table {
    let mut table = new_table();
    table.set_header(header(&["Currency", "Score"]));

    let rows = report.summary();
    if rows.is_empty() {
        table.add_row(vec![Cell::new("No data yet").fg(Color::DarkGrey), Cell::new("")]);
    }
    for (currency, score) in rows {
        table.add_row(vec![
            Cell::new(&currency),
            Cell::new(score)
                .fg(score_color(score))
                .set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

/// Ranked pairs with their absolute score difference and trend label.
pub fn best_pairs_table(report: &PulseReport, top_n: usize) -> Table {
    let mut table = new_table();
    table.set_header(vec![
        Cell::new("Rank").add_attribute(Attribute::Bold),
        Cell::new("Pair").add_attribute(Attribute::Bold),
        Cell::new("Score Difference")
            .add_attribute(Attribute::Bold)
            .set_alignment(CellAlignment::Right),
        Cell::new("Trend Type").add_attribute(Attribute::Bold),
    ]);

    let pairs = report.top(top_n);
    if pairs.is_empty() {
        table.add_row(vec![
            Cell::new(""),
            Cell::new("No pairs yet").fg(Color::DarkGrey),
            Cell::new(""),
            Cell::new(""),
        ]);
    }

    for (i, row) in pairs.iter().enumerate() {
        let trend = row.trend.unwrap_or(TrendLabel::Neutral);
        table.add_row(vec![
            Cell::new(i + 1).fg(Color::DarkGrey),
            Cell::new(&row.pair).fg(Color::Cyan),
            Cell::new(row.abs_diff).set_alignment(CellAlignment::Right),
            trend_cell(trend),
        ]);
    }
    table
}

pub fn policy_note(policy: TrendPolicy) -> &'static str {
    match policy {
        TrendPolicy::Quartile => {
            "*Score Difference = base cumulative score - quote cumulative score. \
             <= 25th percentile -> Neutral, >= 75th percentile -> Strong."
        }
        TrendPolicy::SignOnly => {
            "*Score Difference = base cumulative score - quote cumulative score. \
             Positive -> Bullish, otherwise Bearish."
        }
    }
}

fn heat_cell(cell: &HeatCell) -> Cell {
    let strength = cell.recommendation.map(|r| r.score() as i8);
    let text = match cell.votes() {
        Some(votes) => format!("{}\n{}", cell.label(), votes),
        None => cell.label().to_string(),
    };
    let cell = Cell::new(text).set_alignment(CellAlignment::Center);
    match strength {
        Some(s) => cell.fg(strength_color(s)),
        None => cell.fg(Color::DarkGrey),
    }
}

/// Pair x timeframe grid of recommendation sentiment.
pub fn heatmap_table(grid: &HeatGrid) -> Table {
    let mut table = new_table();

    let mut head = vec![Cell::new("Pair").add_attribute(Attribute::Bold)];
    head.extend(grid.timeframes.iter().map(|tf| {
        Cell::new(tf)
            .add_attribute(Attribute::Bold)
            .set_alignment(CellAlignment::Center)
    }));
    table.set_header(head);

    if grid.rows.is_empty() {
        table.add_row(vec![Cell::new("No data yet").fg(Color::DarkGrey)]);
    }

    for row in &grid.rows {
        let mut cells = vec![Cell::new(&row.symbol).add_attribute(Attribute::Bold)];
        cells.extend(row.cells.iter().map(heat_cell));
        table.add_row(cells);
    }
    table
}

pub fn heatmap_legend() -> String {
    Recommendation::ALL
        .iter()
        .map(|r| r.sentiment())
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Raw per-pair recommendation with the score split onto each currency.
pub fn results_table(rows: &[DetailedRow]) -> Table {
    let mut table = new_table();
    table.set_header(header(&[
        "Pair",
        "Trend",
        "Base Currency",
        "Base Score",
        "Quote Currency",
        "Quote Score",
    ]));

    if rows.is_empty() {
        table.add_row(vec![
            Cell::new("No FX pairs parsed from response. Use keys like OANDA:USDCAD.")
                .fg(Color::DarkGrey),
        ]);
    }

    for row in rows {
        table.add_row(vec![
            Cell::new(&row.pair).fg(Color::Cyan),
            trend_cell(row.trend),
            Cell::new(&row.base),
            Cell::new(row.base_score).fg(score_color(row.base_score)),
            Cell::new(&row.quote),
            Cell::new(row.quote_score).fg(score_color(row.quote_score)),
        ]);
    }
    table
}

pub fn print_pulse(report: &PulseReport, top_n: usize, last_updated: i64) {
    let title = format!("(Data taken at {} UTC)", format_timestamp(last_updated));
    println!("\nCurrency Pulse Analysis {}", title);
    println!("\nSummary\n{}", summary_table(report));
    println!(
        "\nBest Pairs (top {})\n{}\n{}",
        top_n,
        best_pairs_table(report, top_n),
        policy_note(report.policy)
    );
}

pub fn print_heatmap(grid: &HeatGrid, last_updated: i64) {
    let title = format!("(Data taken at {} UTC)", format_timestamp(last_updated));
    println!("\nTechnical Heat Map {}\n{}\n{}", title, heatmap_table(grid), heatmap_legend());
}

pub fn print_results(rows: &[DetailedRow], last_updated: i64) {
    let title = format!("(Data taken at {} UTC)", format_timestamp(last_updated));
    println!("\nDetailed Results {}\n{}", title, results_table(rows));
}
