use serde::Serialize;

use crate::pulse::classify::TrendLabel;
use crate::pulse::input::AnalysisBatch;
use crate::pulse::pair;
use crate::pulse::recommendation;

/// Per-pair view of the raw recommendation, before any currency netting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailedRow {
    pub pair: String,
    pub trend: TrendLabel,
    pub base: String,
    pub base_score: i32,
    pub quote: String,
    pub quote_score: i32,
}

pub fn detailed_rows(batch: &AnalysisBatch) -> Vec<DetailedRow> {
    batch
        .iter()
        .filter_map(|(key, payload)| {
            let payload = payload?;
            let pair = pair::parse(key).pair()?;
            let score = recommendation::score(payload.recommendation.as_deref());
            Some(DetailedRow {
                pair: pair.display(),
                trend: TrendLabel::from_sign(score),
                base: pair.base,
                base_score: score,
                quote: pair.quote,
                quote_score: -score,
            })
        })
        .collect()
}
