use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::heatmap::HeatMap;
use crate::pulse::input::AnalysisBatch;
use crate::storage_utils::{AnalysisQuery, ApiConfig};

#[derive(Debug, Error)]
pub enum FetchError {
    /// Non-2xx answer, carrying the API's `detail` field when present.
    #[error("{0}")]
    Api(String),
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Deserialize, Debug, Default)]
struct AnalysisResponse {
    #[serde(default)]
    analysis_data: AnalysisBatch,
}

/// Thin client for the ratings provider.
pub struct TechnicalsClient {
    client: Client,
    base_url: String,
}

impl TechnicalsClient {
    pub fn new(config: &ApiConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// `GET /get_analysis` for a comma separated symbol list.
    pub async fn get_analysis(&self, query: &AnalysisQuery) -> Result<AnalysisBatch, FetchError> {
        let start = Instant::now();
        let url = format!("{}/get_analysis", self.base_url);

        let params = [
            ("symbols", query.symbols.as_str()),
            ("screener", query.screener.as_str()),
            ("timeframe", query.timeframe.as_str()),
        ];
        let response = self.client.get(&url).query(&params).send().await?;
        let body = read_body(response).await?;

        let parsed: AnalysisResponse = serde_json::from_slice(&body)?;
        if parsed.analysis_data.is_empty() {
            tracing::warn!(symbols = %query.symbols, "analysis response carried no instruments");
        }

        tracing::info!(
            symbols = query.symbol_count(),
            screener = %query.screener,
            timeframe = %query.timeframe,
            entries = parsed.analysis_data.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "analysis fetched"
        );
        Ok(parsed.analysis_data)
    }

    /// `GET /get_heatmap`.
    pub async fn get_heatmap(&self) -> Result<HeatMap, FetchError> {
        let start = Instant::now();
        let url = format!("{}/get_heatmap", self.base_url);

        let response = self.client.get(&url).send().await?;
        let body = read_body(response).await?;
        let heatmap = parse_heatmap(&body)?;

        tracing::info!(
            instruments = heatmap.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "heat map fetched"
        );
        Ok(heatmap)
    }
}

async fn read_body(response: reqwest::Response) -> Result<Vec<u8>, FetchError> {
    let status = response.status();
    let body = response.bytes().await?.to_vec();

    if !status.is_success() {
        let message = error_message(status, &body);
        tracing::warn!(%status, %message, "analysis API returned an error");
        return Err(FetchError::Api(message));
    }
    Ok(body)
}

/// Accepts both `{"heatmap_data": {...}}` and the already unwrapped map.
pub fn parse_heatmap(body: &[u8]) -> Result<HeatMap, serde_json::Error> {
    let value: Value = serde_json::from_slice(body)?;
    match value {
        Value::Object(mut obj) if obj.contains_key("heatmap_data") => {
            let inner = obj.remove("heatmap_data").unwrap_or(Value::Null);
            serde_json::from_value(inner)
        }
        other => serde_json::from_value(other),
    }
}

/// Error text shown to the user: the body's `detail` when it is a string,
/// otherwise the HTTP status line.
pub fn error_message(status: StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(Value::as_str).map(str::to_string))
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| format!("HTTP {}", status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_detail() {
        let msg = error_message(
            StatusCode::BAD_REQUEST,
            br#"{"detail": "Invalid screener"}"#,
        );
        assert_eq!(msg, "Invalid screener");
    }

    #[test]
    fn error_message_falls_back_to_status() {
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, b"<html>oops</html>"),
            "HTTP 502 Bad Gateway"
        );
        assert_eq!(
            error_message(StatusCode::NOT_FOUND, br#"{"detail": [{"loc": "symbols"}]}"#),
            "HTTP 404 Not Found"
        );
    }

    #[test]
    fn analysis_response_tolerates_missing_data() {
        let parsed: AnalysisResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.analysis_data.is_empty());

        let parsed: AnalysisResponse = serde_json::from_str(
            r#"{"analysis_data": {"OANDA:USDCAD": {"RECOMMENDATION": "BUY", "BUY": 11}}}"#,
        )
        .unwrap();
        assert_eq!(parsed.analysis_data.len(), 1);
    }

    #[test]
    fn heatmap_accepts_wrapped_and_bare_bodies() {
        let wrapped = br#"{"heatmap_data": {"OANDA:EURUSD": {"1h": {"RECOMMENDATION": "BUY"}}}}"#;
        let bare = br#"{"OANDA:EURUSD": {"1h": {"RECOMMENDATION": "BUY"}}}"#;

        let a = parse_heatmap(wrapped).unwrap();
        let b = parse_heatmap(bare).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn client_trims_trailing_slash() {
        let config = ApiConfig {
            base_url: "http://localhost:8000/".to_string(),
            timeout_secs: 5,
        };
        let client = TechnicalsClient::new(&config).unwrap();
        assert_eq!(client.base_url, "http://localhost:8000");
    }
}
