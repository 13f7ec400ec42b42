use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::pulse::classify::TrendPolicy;

// CONFIGURATION STRUCTS
// `storage/config.json` deserializes straight into these.

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,  // e.g. "http://127.0.0.1:8000"
    pub timeout_secs: u64, // per request
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Parameters of the `/get_analysis` request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AnalysisQuery {
    pub symbols: String,   // comma separated, e.g. "OANDA:USDCAD,OANDA:USDCHF"
    pub screener: String,  // "forex", "crypto", "america"
    pub timeframe: String, // "1m" .. "1M"
}

impl Default for AnalysisQuery {
    fn default() -> Self {
        Self {
            symbols: "OANDA:USDCAD,OANDA:USDCHF,OANDA:USDJPY,OANDA:GBPUSD".to_string(),
            screener: "forex".to_string(),
            timeframe: "1d".to_string(),
        }
    }
}

impl AnalysisQuery {
    pub fn symbol_count(&self) -> usize {
        self.symbols.split(',').filter(|s| !s.trim().is_empty()).count()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub query: AnalysisQuery,
    pub top_n: usize,
    pub trend_policy: TrendPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            query: AnalysisQuery::default(),
            top_n: 15,
            trend_policy: TrendPolicy::Quartile,
        }
    }
}

/// Fetched data plus the time (ms since epoch) it was taken.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Snapshot<T> {
    pub last_updated_timestamp: i64,
    pub data: T,
}

impl<T> Snapshot<T> {
    pub fn now(data: T) -> Self {
        Self {
            last_updated_timestamp: chrono::Utc::now().timestamp_millis(),
            data,
        }
    }
}

// STORAGE MANAGER

#[derive(Debug, Clone)]
pub struct AsyncStorageManager {
    // Absolute path to the storage directory (e.g. ".../target/debug/storage")
    pub base_dir: PathBuf,
}

impl AsyncStorageManager {
    /// Storage directory next to the running binary.
    pub async fn new_relative<P: AsRef<Path>>(relative_path: P) -> anyhow::Result<Self> {
        let exe_path = std::env::current_exe()?;

        let base_dir = exe_path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Could not find binary directory"))?
            .join(relative_path);

        Self::new(base_dir).await
    }

    /// Storage rooted at an explicit directory, created if missing.
    pub async fn new<P: Into<PathBuf>>(base_dir: P) -> anyhow::Result<Self> {
        let base_dir = base_dir.into();
        if !base_dir.exists() {
            fs::create_dir_all(&base_dir).await?;
        }
        Ok(Self { base_dir })
    }

    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", filename))
    }

    /// Writes `data` as pretty JSON through a `.tmp` file and a rename, so a
    /// crash mid-write never leaves a truncated file behind.
    pub async fn save<T: Serialize>(&self, filename: &str, data: &T) -> anyhow::Result<()> {
        let final_path = self.path_for(filename);
        let tmp_path = self.base_dir.join(format!("{}.json.tmp", filename));

        let json_bytes = serde_json::to_vec_pretty(data)?;

        fs::write(&tmp_path, json_bytes).await?;
        fs::rename(tmp_path, final_path).await?;

        Ok(())
    }

    pub async fn load<T: DeserializeOwned>(&self, filename: &str) -> anyhow::Result<T> {
        // serde_json validates UTF-8 itself, so read raw bytes
        let content = fs::read(self.path_for(filename)).await?;
        let data = serde_json::from_slice(&content)?;
        Ok(data)
    }

    /// Loads `filename`, writing `T::default()` first if it does not exist yet.
    pub async fn load_or_init<T>(&self, filename: &str) -> anyhow::Result<T>
    where
        T: DeserializeOwned + Serialize + Default,
    {
        if !self.path_for(filename).exists() {
            let data = T::default();
            self.save(filename, &data).await?;
            tracing::info!(path = ?self.path_for(filename), "wrote default file");
            return Ok(data);
        }
        self.load(filename).await
    }
}
