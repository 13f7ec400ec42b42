use std::collections::HashMap;

use crate::pulse::input::AnalysisBatch;
use crate::pulse::pair;
use crate::pulse::recommendation;

/// Net score per currency code, rebuilt from scratch for every batch.
pub type CurrencyScoreMap = HashMap<String, i32>;

/// Sums every pair's recommendation into its two currencies: `+s` for the
/// base and `-s` for the quote. Entries without a payload or without a
/// recognizable FX key are skipped.
///
/// Each pair contributes zero in total, so the map's values always sum to 0.
pub fn aggregate(batch: &AnalysisBatch) -> CurrencyScoreMap {
    let mut scores = CurrencyScoreMap::new();

    for (key, payload) in batch.iter() {
        let Some(payload) = payload else { continue };
        let Some(pair) = pair::parse(key).pair() else { continue };

        let s = recommendation::score(payload.recommendation.as_deref());
        *scores.entry(pair.base).or_insert(0) += s;
        *scores.entry(pair.quote).or_insert(0) -= s;
    }

    scores
}

/// Currency rows for the summary table, strongest first. Ties are ordered by
/// currency code so the output is stable across runs.
pub fn ranked(scores: &CurrencyScoreMap) -> Vec<(String, i32)> {
    let mut rows: Vec<(String, i32)> = scores.iter().map(|(c, s)| (c.clone(), *s)).collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pulse::input::RecommendationPayload;

    fn batch(entries: &[(&str, Option<&str>)]) -> AnalysisBatch {
        entries
            .iter()
            .map(|(k, rec)| (*k, rec.map(RecommendationPayload::with_recommendation)))
            .collect()
    }

    #[test]
    fn accumulates_base_and_quote_contributions() {
        let scores = aggregate(&batch(&[
            ("OANDA:USDCAD", Some("BUY")),
            ("OANDA:EURUSD", Some("SELL")),
        ]));

        assert_eq!(scores.len(), 3);
        assert_eq!(scores["USD"], 2);
        assert_eq!(scores["CAD"], -1);
        assert_eq!(scores["EUR"], -1);
    }

    #[test]
    fn skips_missing_payloads_and_non_fx_keys() {
        let scores = aggregate(&batch(&[
            ("OANDA:GBPJPY", None),
            ("NASDAQ:TSLA", Some("STRONG_BUY")),
            ("OANDA:AUDNZD", Some("strong_sell")),
        ]));

        assert_eq!(scores.len(), 2);
        assert_eq!(scores["AUD"], -2);
        assert_eq!(scores["NZD"], 2);
    }

    #[test]
    fn neutral_pairs_still_register_their_currencies() {
        let scores = aggregate(&batch(&[("OANDA:USDCHF", Some("whatever"))]));
        assert_eq!(scores["USD"], 0);
        assert_eq!(scores["CHF"], 0);
    }

    #[test]
    fn empty_batch_gives_empty_map() {
        assert!(aggregate(&AnalysisBatch::new()).is_empty());
    }

    #[test]
    fn aggregation_is_repeatable() {
        let b = batch(&[
            ("OANDA:USDCAD", Some("BUY")),
            ("OANDA:USDJPY", Some("STRONG_BUY")),
            ("OANDA:EURJPY", Some("SELL")),
        ]);
        assert_eq!(aggregate(&b), aggregate(&b));
    }

    #[test]
    fn ranking_orders_by_score_then_code() {
        let scores = aggregate(&batch(&[
            ("OANDA:USDCAD", Some("BUY")),
            ("OANDA:EURUSD", Some("SELL")),
        ]));

        assert_eq!(
            ranked(&scores),
            vec![
                ("USD".to_string(), 2),
                ("CAD".to_string(), -1),
                ("EUR".to_string(), -1),
            ]
        );
    }
}
