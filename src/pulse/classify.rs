use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::pulse::differential::PairDifferential;

/// Human-facing trend bucket for a pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrendLabel {
    #[serde(rename = "Strong Bullish")]
    StrongBullish,
    Bullish,
    Neutral,
    Bearish,
    #[serde(rename = "Strong Bearish")]
    StrongBearish,
}

impl TrendLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StrongBullish => "Strong Bullish",
            Self::Bullish => "Bullish",
            Self::Neutral => "Neutral",
            Self::Bearish => "Bearish",
            Self::StrongBearish => "Strong Bearish",
        }
    }

    /// Three-way direction of a signed value, used where magnitude is not ranked.
    pub fn from_sign(value: i32) -> Self {
        match value {
            v if v > 0 => Self::Bullish,
            v if v < 0 => Self::Bearish,
            _ => Self::Neutral,
        }
    }

    /// Positive for bullish buckets, negative for bearish ones. Drives colouring.
    pub fn strength(self) -> i8 {
        match self {
            Self::StrongBullish => 2,
            Self::Bullish => 1,
            Self::Neutral => 0,
            Self::Bearish => -1,
            Self::StrongBearish => -2,
        }
    }
}

impl fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How pairs are bucketed into trend labels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TrendPolicy {
    /// Five levels from the batch's 25th/75th percentile of `|diff|`.
    #[default]
    Quartile,
    /// Two levels from the sign of `diff` alone.
    SignOnly,
}

impl TrendPolicy {
    pub fn name(self) -> &'static str {
        match self {
            Self::Quartile => "quartile",
            Self::SignOnly => "sign-only",
        }
    }
}

/// Percentile with linear interpolation between order statistics.
///
/// The value sits at position `(n - 1) * q` of the ascending sort; a
/// fractional position blends the two neighbours. Empty input yields 0.
pub fn quantile(values: &[u32], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable();

    let pos = (sorted.len() - 1) as f64 * q;
    let lower = pos.floor() as usize;
    let rest = pos - lower as f64;

    match sorted.get(lower + 1) {
        Some(&upper) => {
            let low = sorted[lower] as f64;
            low + rest * (upper as f64 - low)
        }
        None => sorted[lower] as f64,
    }
}

/// Quartile bucket for a single differential given the batch thresholds.
pub fn quartile_label(diff: i32, abs_diff: u32, q1: f64, q3: f64) -> TrendLabel {
    let magnitude = abs_diff as f64;
    if magnitude <= q1 {
        return TrendLabel::Neutral;
    }
    if magnitude >= q3 {
        return match diff {
            d if d > 0 => TrendLabel::StrongBullish,
            d if d < 0 => TrendLabel::StrongBearish,
            _ => TrendLabel::Neutral,
        };
    }
    TrendLabel::from_sign(diff)
}

pub fn sign_only_label(diff: i32) -> TrendLabel {
    if diff > 0 { TrendLabel::Bullish } else { TrendLabel::Bearish }
}

/// Attaches a trend label to every differential.
///
/// Quartile thresholds come from the rows passed in, so the same `diff` can
/// land in different buckets from one batch to the next.
pub fn classify(rows: &mut [PairDifferential], policy: TrendPolicy) {
    match policy {
        TrendPolicy::Quartile => {
            let magnitudes: Vec<u32> = rows.iter().map(|r| r.abs_diff).collect();
            let q1 = quantile(&magnitudes, 0.25);
            let q3 = quantile(&magnitudes, 0.75);
            tracing::debug!(q1, q3, rows = rows.len(), "quartile thresholds");

            for row in rows.iter_mut() {
                row.trend = Some(quartile_label(row.diff, row.abs_diff, q1, q3));
            }
        }
        TrendPolicy::SignOnly => {
            for row in rows.iter_mut() {
                row.trend = Some(sign_only_label(row.diff));
            }
        }
    }
}
