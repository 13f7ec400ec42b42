use clap::{Args, Parser, Subcommand};

use crate::pulse::classify::TrendPolicy;
use crate::storage_utils::AppConfig;

#[derive(Debug, Parser)]
#[command(
    name = "currency-pulse",
    version,
    about = "Currency strength and trend dashboard built on technical-analysis ratings"
)]
pub struct Cli {
    #[command(flatten)]
    pub overrides: Overrides,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Per-run overrides of `storage/config.json`.
#[derive(Debug, Args, Default)]
pub struct Overrides {
    /// Analysis API base URL
    #[arg(long, global = true)]
    pub api: Option<String>,

    /// Comma separated instrument keys, e.g. OANDA:USDCAD,OANDA:EURUSD
    #[arg(long, global = true)]
    pub symbols: Option<String>,

    /// Screener passed to the API (forex, crypto, america)
    #[arg(long, global = true)]
    pub screener: Option<String>,

    /// Timeframe passed to the API (1m, 5m, 15m, 30m, 1h, 2h, 4h, 1d, 1W, 1M)
    #[arg(long, global = true)]
    pub timeframe: Option<String>,

    /// Rows shown in the Best Pairs table
    #[arg(long, global = true)]
    pub top: Option<usize>,

    /// Trend classification policy
    #[arg(long, global = true, value_enum)]
    pub policy: Option<TrendPolicy>,

    /// Use the last stored snapshot instead of calling the API
    #[arg(long, global = true)]
    pub cached: bool,
}

impl Overrides {
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(api) = &self.api {
            config.api.base_url = api.clone();
        }
        if let Some(symbols) = &self.symbols {
            config.query.symbols = symbols.clone();
        }
        if let Some(screener) = &self.screener {
            config.query.screener = screener.clone();
        }
        if let Some(timeframe) = &self.timeframe {
            config.query.timeframe = timeframe.clone();
        }
        if let Some(top) = self.top {
            config.top_n = top;
        }
        if let Some(policy) = self.policy {
            config.trend_policy = policy;
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Currency summary and best pairs (default)
    Pulse {
        /// Run the engine on one heat map timeframe column instead of /get_analysis
        #[arg(long, value_name = "TF")]
        from_heatmap: Option<String>,
    },
    /// Pair x timeframe recommendation grid
    Heatmap,
    /// Raw recommendation per pair with base/quote scores
    Results,
    /// Interactive dashboard
    Tui,
}
