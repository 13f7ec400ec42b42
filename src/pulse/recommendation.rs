use std::fmt;

/// Categorical verdict published by the analysis provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Recommendation {
    StrongBuy,
    Buy,
    Neutral,
    Sell,
    StrongSell,
}

impl Recommendation {
    pub const ALL: [Recommendation; 5] = [
        Recommendation::StrongBuy,
        Recommendation::Buy,
        Recommendation::Neutral,
        Recommendation::Sell,
        Recommendation::StrongSell,
    ];

    /// Case-insensitive lookup. Returns `None` for anything outside the table,
    /// padded values included.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "STRONG_BUY" => Some(Self::StrongBuy),
            "BUY" => Some(Self::Buy),
            "NEUTRAL" => Some(Self::Neutral),
            "SELL" => Some(Self::Sell),
            "STRONG_SELL" => Some(Self::StrongSell),
            _ => None,
        }
    }

    /// Total mapping: a missing or unrecognized value is treated as `Neutral`.
    pub fn from_raw(raw: Option<&str>) -> Self {
        raw.and_then(Self::parse).unwrap_or(Self::Neutral)
    }

    pub fn score(self) -> i32 {
        match self {
            Self::StrongBuy => 2,
            Self::Buy => 1,
            Self::Neutral => 0,
            Self::Sell => -1,
            Self::StrongSell => -2,
        }
    }

    pub fn as_api_str(self) -> &'static str {
        match self {
            Self::StrongBuy => "STRONG_BUY",
            Self::Buy => "BUY",
            Self::Neutral => "NEUTRAL",
            Self::Sell => "SELL",
            Self::StrongSell => "STRONG_SELL",
        }
    }

    /// Sentiment wording used by the heat map cells and legend.
    pub fn sentiment(self) -> &'static str {
        match self {
            Self::StrongBuy => "Strong Bullish",
            Self::Buy => "Bullish",
            Self::Neutral => "Neutral",
            Self::Sell => "Bearish",
            Self::StrongSell => "Strong Bearish",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_api_str())
    }
}

/// Signed strength of a recommendation in `-2..=2`.
pub fn score(recommendation: Option<&str>) -> i32 {
    Recommendation::from_raw(recommendation).score()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_are_case_insensitive() {
        assert_eq!(score(Some("buy")), 1);
        assert_eq!(score(Some("Strong_Buy")), 2);
        assert_eq!(score(Some("STRONG_SELL")), -2);
        assert_eq!(score(Some("sell")), -1);
        assert_eq!(score(Some("NEUTRAL")), 0);
    }

    #[test]
    fn missing_or_unknown_values_are_neutral() {
        assert_eq!(score(None), 0);
        assert_eq!(score(Some("garbage")), 0);
        assert_eq!(score(Some("")), 0);
        assert_eq!(Recommendation::from_raw(Some("HOLD")), Recommendation::Neutral);
    }

    #[test]
    fn padded_values_are_not_recognized() {
        assert_eq!(score(Some(" BUY")), 0);
        assert_eq!(score(Some(" buy ")), 0);
        assert_eq!(Recommendation::parse("SELL\n"), None);
    }

    #[test]
    fn api_names_round_trip_through_parse() {
        for rec in Recommendation::ALL {
            assert_eq!(Recommendation::parse(rec.as_api_str()), Some(rec));
        }
    }

    #[test]
    fn sentiment_labels_follow_strength() {
        assert_eq!(Recommendation::StrongBuy.sentiment(), "Strong Bullish");
        assert_eq!(Recommendation::Sell.sentiment(), "Bearish");
    }
}
