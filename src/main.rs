mod analysis;
mod cli;
mod comfy_table;
mod heatmap;
mod logger;
mod pulse;
mod results;
mod storage_utils;
mod technicals;
mod tui;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Command};
use storage_utils::{AppConfig, AsyncStorageManager};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = AsyncStorageManager::new_relative("storage").await?;

    match cli.command {
        Some(Command::Tui) => {
            logger::init_file_logger(&storage.base_dir.join("currency-pulse.log"))?
        }
        _ => logger::init_logger(),
    }

    let mut config: AppConfig = storage.load_or_init("config").await?;
    cli.overrides.apply(&mut config);

    let command = cli.command.unwrap_or(Command::Pulse { from_heatmap: None });
    if let Err(e) = run(command, storage, config, cli.overrides.cached, cli.json).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(
    command: Command,
    storage: AsyncStorageManager,
    config: AppConfig,
    cached: bool,
    json: bool,
) -> Result<()> {
    match command {
        Command::Pulse { from_heatmap: None } => {
            let snapshot = analysis::latest_analysis(&storage, &config, cached).await?;
            let report = pulse::analyze(&snapshot.data, config.trend_policy);

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                comfy_table::print_pulse(&report, config.top_n, snapshot.last_updated_timestamp);
            }
        }
        Command::Pulse { from_heatmap: Some(tf) } => {
            let snapshot = analysis::latest_heatmap(&storage, &config, cached).await?;
            let batch = heatmap::timeframe_batch(&snapshot.data, &tf);
            let report = pulse::analyze(&batch, config.trend_policy);

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("\nTimeframe: {}", tf);
                comfy_table::print_pulse(&report, config.top_n, snapshot.last_updated_timestamp);
            }
        }
        Command::Heatmap => {
            let snapshot = analysis::latest_heatmap(&storage, &config, cached).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot.data)?);
            } else {
                let grid = heatmap::build_grid(&snapshot.data);
                comfy_table::print_heatmap(&grid, snapshot.last_updated_timestamp);
            }
        }
        Command::Results => {
            let snapshot = analysis::latest_analysis(&storage, &config, cached).await?;
            let rows = results::detailed_rows(&snapshot.data);

            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                comfy_table::print_results(&rows, snapshot.last_updated_timestamp);
            }
        }
        Command::Tui => tui::run_tui(storage, config).await?,
    }
    Ok(())
}
