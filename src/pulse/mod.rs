//! Currency Pulse: turns a batch of per-pair recommendations into per-currency
//! strength and a ranked list of pairs.
//!
//! The pipeline is pure. Every call starts from the batch alone:
//!
//! 1. parse each instrument key into a base/quote pair ([`pair`])
//! 2. score its recommendation in `-2..=2` ([`recommendation`])
//! 3. net the scores per currency ([`aggregate`])
//! 4. derive `score[base] - score[quote]` per pair ([`differential`])
//! 5. bucket each pair into a trend label ([`classify`])

pub mod aggregate;
pub mod classify;
pub mod differential;
pub mod input;
pub mod pair;
pub mod recommendation;

use serde::Serialize;
use std::time::Instant;

use aggregate::CurrencyScoreMap;
use classify::TrendPolicy;
use differential::PairDifferential;
use input::AnalysisBatch;

#[derive(Debug, Clone, Serialize)]
pub struct PulseReport {
    pub policy: TrendPolicy,
    pub currency_scores: CurrencyScoreMap,
    /// Classified pairs, largest `|diff|` first.
    pub pairs: Vec<PairDifferential>,
}

impl PulseReport {
    /// Currencies ordered for the summary table.
    pub fn summary(&self) -> Vec<(String, i32)> {
        aggregate::ranked(&self.currency_scores)
    }

    /// Display slice; the limit is purely presentational.
    pub fn top(&self, n: usize) -> &[PairDifferential] {
        &self.pairs[..n.min(self.pairs.len())]
    }
}

pub fn analyze(batch: &AnalysisBatch, policy: TrendPolicy) -> PulseReport {
    let start = Instant::now();

    let currency_scores = aggregate::aggregate(batch);
    let mut pairs = differential::build_differentials(batch, &currency_scores);
    classify::classify(&mut pairs, policy);
    differential::sort_by_magnitude(&mut pairs);

    tracing::info!(
        entries = batch.len(),
        currencies = currency_scores.len(),
        pairs = pairs.len(),
        policy = policy.name(),
        elapsed_us = start.elapsed().as_micros() as u64,
        "currency pulse computed"
    );

    PulseReport {
        policy,
        currency_scores,
        pairs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use classify::TrendLabel;
    use input::RecommendationPayload;

    fn batch(entries: &[(&str, &str)]) -> AnalysisBatch {
        entries
            .iter()
            .map(|(k, rec)| (*k, Some(RecommendationPayload::with_recommendation(rec))))
            .collect()
    }

    #[test]
    fn end_to_end_quartile_report() {
        let report = analyze(
            &batch(&[
                ("OANDA:USDCAD", "BUY"),
                ("OANDA:EURUSD", "SELL"),
                ("OANDA:USDJPY", "STRONG_BUY"),
                ("OANDA:GBPUSD", "NEUTRAL"),
                ("NASDAQ:TSLA", "STRONG_BUY"),
            ]),
            TrendPolicy::Quartile,
        );

        // USD: +1 +1 +2 +0 = 4, CAD -1, EUR -1, JPY -2, GBP 0
        assert_eq!(report.currency_scores["USD"], 4);
        assert_eq!(report.currency_scores.values().sum::<i32>(), 0);

        let pairs: Vec<(&str, i32)> = report.pairs.iter().map(|p| (p.pair.as_str(), p.diff)).collect();
        assert_eq!(
            pairs,
            vec![("USD/JPY", 6), ("USD/CAD", 5), ("EUR/USD", -5), ("GBP/USD", -4)]
        );

        // magnitudes 4,5,5,6 -> q1 = 4.75, q3 = 5.25
        let trends: Vec<TrendLabel> = report.pairs.iter().map(|p| p.trend.unwrap()).collect();
        assert_eq!(
            trends,
            vec![
                TrendLabel::StrongBullish,
                TrendLabel::Bullish,
                TrendLabel::Bearish,
                TrendLabel::Neutral,
            ]
        );
    }

    #[test]
    fn sign_only_report_uses_two_labels() {
        let report = analyze(
            &batch(&[("OANDA:USDCAD", "BUY"), ("OANDA:EURUSD", "SELL")]),
            TrendPolicy::SignOnly,
        );

        assert_eq!(report.pairs[0].trend, Some(TrendLabel::Bullish));
        assert_eq!(report.pairs[1].trend, Some(TrendLabel::Bearish));
    }

    #[test]
    fn top_never_exceeds_available_rows() {
        let report = analyze(&batch(&[("OANDA:USDCAD", "BUY")]), TrendPolicy::Quartile);
        assert_eq!(report.top(15).len(), 1);
        assert_eq!(report.top(0).len(), 0);
    }

    #[test]
    fn empty_batch_produces_empty_report() {
        let report = analyze(&AnalysisBatch::new(), TrendPolicy::Quartile);
        assert!(report.currency_scores.is_empty());
        assert!(report.pairs.is_empty());
        assert!(report.summary().is_empty());
    }
}
