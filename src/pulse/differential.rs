use serde::Serialize;
use std::collections::HashMap;

use crate::pulse::aggregate::CurrencyScoreMap;
use crate::pulse::classify::TrendLabel;
use crate::pulse::input::AnalysisBatch;
use crate::pulse::pair;

/// Relative strength of a pair's base currency over its quote currency.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PairDifferential {
    /// Display form, e.g. `USD/CAD`.
    pub pair: String,
    /// `score[base] - score[quote]`.
    pub diff: i32,
    pub abs_diff: u32,
    /// Filled in by the classifier.
    pub trend: Option<TrendLabel>,
}

/// One differential per distinct pair in the batch, in first-seen order.
///
/// When two keys normalize to the same pair (`OANDA:EURUSD` and `FX:EURUSD`)
/// the later entry's values replace the earlier one in place. Unlike the
/// aggregator, keys without a payload still produce a row.
pub fn build_differentials(batch: &AnalysisBatch, scores: &CurrencyScoreMap) -> Vec<PairDifferential> {
    let mut rows: Vec<PairDifferential> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (key, _) in batch.iter() {
        let Some(pair) = pair::parse(key).pair() else { continue };

        let base = scores.get(&pair.base).copied().unwrap_or(0);
        let quote = scores.get(&pair.quote).copied().unwrap_or(0);
        let diff = base - quote;
        let row = PairDifferential {
            pair: pair.display(),
            diff,
            abs_diff: diff.unsigned_abs(),
            trend: None,
        };

        match index.get(&row.pair) {
            Some(&i) => rows[i] = row,
            None => {
                index.insert(row.pair.clone(), rows.len());
                rows.push(row);
            }
        }
    }

    rows
}

/// Largest magnitude first. `sort_by` is stable, so equal magnitudes keep
/// their batch order.
pub fn sort_by_magnitude(rows: &mut [PairDifferential]) {
    rows.sort_by(|a, b| b.abs_diff.cmp(&a.abs_diff));
}
