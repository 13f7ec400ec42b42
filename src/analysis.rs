//! Fetch-and-store pipeline feeding the tables and the TUI.

use anyhow::{Context, Result};

use crate::heatmap::HeatMap;
use crate::pulse::input::AnalysisBatch;
use crate::storage_utils::{AppConfig, AsyncStorageManager, Snapshot};
use crate::technicals::TechnicalsClient;

pub const ANALYSIS_FILE: &str = "analysis";
pub const HEATMAP_FILE: &str = "heatmap";

/// Latest data available to the views. Either half may be missing before the
/// first successful fetch.
#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    pub analysis: Option<Snapshot<AnalysisBatch>>,
    pub heatmap: Option<Snapshot<HeatMap>>,
}

impl Dashboard {
    pub fn last_updated(&self) -> i64 {
        let a = self.analysis.as_ref().map_or(0, |s| s.last_updated_timestamp);
        let h = self.heatmap.as_ref().map_or(0, |s| s.last_updated_timestamp);
        a.max(h)
    }
}

/// Fetches the ratings for the configured symbols and stores the snapshot.
pub async fn fetch_analysis(
    storage: &AsyncStorageManager,
    config: &AppConfig,
) -> Result<Snapshot<AnalysisBatch>> {
    let client = TechnicalsClient::new(&config.api)?;
    let batch = client
        .get_analysis(&config.query)
        .await
        .context("Failed to fetch analysis data")?;

    let snapshot = Snapshot::now(batch);
    storage.save(ANALYSIS_FILE, &snapshot).await?;
    Ok(snapshot)
}

pub async fn fetch_heatmap(
    storage: &AsyncStorageManager,
    config: &AppConfig,
) -> Result<Snapshot<HeatMap>> {
    let client = TechnicalsClient::new(&config.api)?;
    let heatmap = client
        .get_heatmap()
        .await
        .context("Failed to fetch heat map data")?;

    let snapshot = Snapshot::now(heatmap);
    storage.save(HEATMAP_FILE, &snapshot).await?;
    Ok(snapshot)
}

/// Runs both requests concurrently. Whichever succeeds is stored even when
/// the other fails; the first failure is returned.
pub async fn refresh_all(storage: &AsyncStorageManager, config: &AppConfig) -> Result<Dashboard> {
    let (analysis, heatmap) =
        futures::join!(fetch_analysis(storage, config), fetch_heatmap(storage, config));

    Ok(Dashboard {
        analysis: Some(analysis?),
        heatmap: Some(heatmap?),
    })
}

/// The stored analysis snapshot when `cached`, otherwise a fresh fetch.
pub async fn latest_analysis(
    storage: &AsyncStorageManager,
    config: &AppConfig,
    cached: bool,
) -> Result<Snapshot<AnalysisBatch>> {
    if cached {
        return storage
            .load(ANALYSIS_FILE)
            .await
            .context("No stored analysis snapshot, run once without --cached");
    }
    fetch_analysis(storage, config).await
}

pub async fn latest_heatmap(
    storage: &AsyncStorageManager,
    config: &AppConfig,
    cached: bool,
) -> Result<Snapshot<HeatMap>> {
    if cached {
        return storage
            .load(HEATMAP_FILE)
            .await
            .context("No stored heat map snapshot, run once without --cached");
    }
    fetch_heatmap(storage, config).await
}

/// Reads whatever snapshots are on disk. Missing or unreadable files leave
/// the corresponding half empty.
pub async fn load_dashboard(storage: &AsyncStorageManager) -> Dashboard {
    let analysis = match storage.load::<Snapshot<AnalysisBatch>>(ANALYSIS_FILE).await {
        Ok(s) => Some(s),
        Err(e) => {
            tracing::debug!(error = %e, "no analysis snapshot");
            None
        }
    };
    let heatmap = match storage.load::<Snapshot<HeatMap>>(HEATMAP_FILE).await {
        Ok(s) => Some(s),
        Err(e) => {
            tracing::debug!(error = %e, "no heat map snapshot");
            None
        }
    };

    Dashboard { analysis, heatmap }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pulse::input::RecommendationPayload;

    #[tokio::test]
    async fn dashboard_reloads_stored_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let storage = AsyncStorageManager::new(dir.path()).await.unwrap();

        let empty = load_dashboard(&storage).await;
        assert!(empty.analysis.is_none());
        assert!(empty.heatmap.is_none());
        assert_eq!(empty.last_updated(), 0);

        let mut batch = AnalysisBatch::new();
        batch.push("OANDA:USDCAD", Some(RecommendationPayload::with_recommendation("BUY")));
        let snapshot = Snapshot {
            last_updated_timestamp: 1_700_000_000_000,
            data: batch.clone(),
        };
        storage.save(ANALYSIS_FILE, &snapshot).await.unwrap();

        let loaded = load_dashboard(&storage).await;
        assert_eq!(loaded.analysis.as_ref().map(|s| &s.data), Some(&batch));
        assert!(loaded.heatmap.is_none());
        assert_eq!(loaded.last_updated(), 1_700_000_000_000);
    }

    #[tokio::test]
    async fn unreachable_api_reports_context() {
        let dir = tempfile::tempdir().unwrap();
        let storage = AsyncStorageManager::new(dir.path()).await.unwrap();
        let mut config = AppConfig::default();
        // port 9 (discard) is closed on test machines
        config.api.base_url = "http://127.0.0.1:9".to_string();
        config.api.timeout_secs = 2;

        let err = fetch_analysis(&storage, &config).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch analysis data");
        assert!(!storage.path_for(ANALYSIS_FILE).exists());
    }

    #[tokio::test]
    async fn cached_mode_never_touches_the_network() {
        let dir = tempfile::tempdir().unwrap();
        let storage = AsyncStorageManager::new(dir.path()).await.unwrap();
        let config = AppConfig::default();

        let err = latest_heatmap(&storage, &config, true).await.unwrap_err();
        assert!(err.to_string().contains("--cached"));

        let snapshot = Snapshot {
            last_updated_timestamp: 42,
            data: HeatMap::new(),
        };
        storage.save(HEATMAP_FILE, &snapshot).await.unwrap();
        let loaded = latest_heatmap(&storage, &config, true).await.unwrap();
        assert_eq!(loaded.last_updated_timestamp, 42);
        assert!(loaded.data.is_empty());
    }
}
