use crate::pulse::input::{AnalysisBatch, Keyed, RecommendationPayload};
use crate::pulse::pair;
use crate::pulse::recommendation::Recommendation;

/// Column order of the heat map.
pub const TF_ORDER: &[&str] = &["1m", "5m", "15m", "30m", "1h", "4h", "1d"];

/// Instrument key -> (timeframe -> payload), as found in `heatmap_data`.
pub type HeatMap = Keyed<Keyed<RecommendationPayload>>;

#[derive(Debug, Clone, PartialEq)]
pub struct HeatCell {
    pub recommendation: Option<Recommendation>,
    pub buy: Option<u32>,
    pub sell: Option<u32>,
    pub neutral: Option<u32>,
}

impl HeatCell {
    fn from_payload(payload: Option<&RecommendationPayload>) -> Self {
        match payload {
            Some(p) => Self {
                recommendation: p.recommendation.as_deref().and_then(Recommendation::parse),
                buy: p.buy,
                sell: p.sell,
                neutral: p.neutral,
            },
            None => Self {
                recommendation: None,
                buy: None,
                sell: None,
                neutral: None,
            },
        }
    }

    pub fn label(&self) -> &'static str {
        self.recommendation.map(Recommendation::sentiment).unwrap_or("-")
    }

    /// `B:12 S:3 N:10` when the provider sent vote counts.
    pub fn votes(&self) -> Option<String> {
        if self.buy.is_none() && self.sell.is_none() && self.neutral.is_none() {
            return None;
        }
        let show = |v: Option<u32>| v.map_or_else(|| "-".to_string(), |n| n.to_string());
        Some(format!(
            "B:{} S:{} N:{}",
            show(self.buy),
            show(self.sell),
            show(self.neutral)
        ))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeatRow {
    /// Symbol without its exchange prefix.
    pub symbol: String,
    pub cells: Vec<HeatCell>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeatGrid {
    pub timeframes: Vec<&'static str>,
    pub rows: Vec<HeatRow>,
}

/// Columns are the known timeframes present in the first instrument, or all
/// of them when the map is empty or the first instrument carries no data.
pub fn timeframes(heatmap: &HeatMap) -> Vec<&'static str> {
    match heatmap.iter().next() {
        Some((_, Some(first))) => TF_ORDER
            .iter()
            .copied()
            .filter(|tf| first.contains_key(tf))
            .collect(),
        _ => TF_ORDER.to_vec(),
    }
}

pub fn build_grid(heatmap: &HeatMap) -> HeatGrid {
    let timeframes = timeframes(heatmap);

    // reversed before the stable sort so dedup keeps the last occurrence,
    // the same entry `Keyed::get` and `timeframe_batch` resolve to
    let mut keys: Vec<(&str, Option<&Keyed<RecommendationPayload>>)> = heatmap.iter().collect();
    keys.reverse();
    keys.sort_by(|a, b| a.0.cmp(b.0));
    keys.dedup_by(|a, b| a.0 == b.0);

    let rows = keys
        .into_iter()
        .map(|(key, frames)| HeatRow {
            symbol: pair::symbol_part(key).to_string(),
            cells: timeframes
                .iter()
                .map(|tf| HeatCell::from_payload(frames.and_then(|f| f.get(tf))))
                .collect(),
        })
        .collect();

    HeatGrid { timeframes, rows }
}

/// One timeframe column as a flat batch, ready for the pulse engine.
pub fn timeframe_batch(heatmap: &HeatMap, timeframe: &str) -> AnalysisBatch {
    heatmap
        .iter()
        .map(|(key, frames)| (key, frames.and_then(|f| f.get(timeframe)).cloned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> HeatMap {
        serde_json::from_str(
            r#"{
                "OANDA:USDJPY": {
                    "1h": {"RECOMMENDATION": "SELL", "BUY": 2, "SELL": 10, "NEUTRAL": 8},
                    "1m": {"RECOMMENDATION": "strong_buy"},
                    "1d": null
                },
                "OANDA:EURUSD": {
                    "1m": {"RECOMMENDATION": "NEUTRAL"},
                    "1h": {"RECOMMENDATION": "BUY"}
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn columns_follow_canonical_order_of_first_row() {
        assert_eq!(timeframes(&sample()), vec!["1m", "1h", "1d"]);
        assert_eq!(timeframes(&HeatMap::new()), TF_ORDER.to_vec());
    }

    #[test]
    fn rows_are_sorted_and_labelled() {
        let grid = build_grid(&sample());

        assert_eq!(grid.rows.len(), 2);
        assert_eq!(grid.rows[0].symbol, "EURUSD");
        assert_eq!(grid.rows[1].symbol, "USDJPY");

        let labels: Vec<&str> = grid.rows[1].cells.iter().map(HeatCell::label).collect();
        assert_eq!(labels, vec!["Strong Bullish", "Bearish", "-"]);
        assert_eq!(grid.rows[1].cells[1].votes().as_deref(), Some("B:2 S:10 N:8"));
        assert_eq!(grid.rows[1].cells[0].votes(), None);

        // EURUSD has no 1d entry at all
        assert_eq!(grid.rows[0].cells[2].label(), "-");
    }

    #[test]
    fn timeframe_column_feeds_the_engine() {
        let batch = timeframe_batch(&sample(), "1h");
        assert_eq!(batch.len(), 2);
        assert_eq!(
            batch.get("OANDA:EURUSD").and_then(|p| p.recommendation.as_deref()),
            Some("BUY")
        );

        let missing = timeframe_batch(&sample(), "4h");
        assert!(missing.iter().all(|(_, p)| p.is_none()));
    }

    #[test]
    fn duplicate_instrument_keeps_last_entry() {
        let heatmap: HeatMap = serde_json::from_str(
            r#"{
                "OANDA:EURUSD": {"1h": {"RECOMMENDATION": "BUY"}},
                "OANDA:GBPUSD": {"1h": {"RECOMMENDATION": "NEUTRAL"}},
                "OANDA:EURUSD": {"1h": {"RECOMMENDATION": "SELL"}}
            }"#,
        )
        .unwrap();

        let grid = build_grid(&heatmap);
        assert_eq!(grid.rows.len(), 2);
        assert_eq!(grid.rows[0].symbol, "EURUSD");
        assert_eq!(grid.rows[0].cells[0].label(), "Bearish");

        let batch = timeframe_batch(&heatmap, "1h");
        assert_eq!(
            batch.get("OANDA:EURUSD").and_then(|p| p.recommendation.as_deref()),
            Some("SELL")
        );
    }
}
