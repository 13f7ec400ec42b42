use once_cell::sync::Lazy;
use regex::Regex;

static FX_PAIR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{6}$").unwrap());

/// A base/quote currency pair such as `USD/CAD`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CurrencyPair {
    pub base: String,
    pub quote: String,
}

impl CurrencyPair {
    pub fn display(&self) -> String {
        format!("{}/{}", self.base, self.quote)
    }
}

/// Outcome of reading an instrument key.
///
/// Batches routinely mix FX pairs with stocks or crypto symbols, so a
/// `Rejected` key is a filtering result and not an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedKey {
    Pair(CurrencyPair),
    Rejected,
}

impl ParsedKey {
    pub fn pair(self) -> Option<CurrencyPair> {
        match self {
            ParsedKey::Pair(pair) => Some(pair),
            ParsedKey::Rejected => None,
        }
    }
}

/// Strips the exchange prefix from an instrument key (`OANDA:USDCAD` -> `USDCAD`).
pub fn symbol_part(key: &str) -> &str {
    match key.rfind(':') {
        Some(idx) => &key[idx + 1..],
        None => key,
    }
}

pub fn parse(key: &str) -> ParsedKey {
    let raw = symbol_part(key).trim().to_ascii_uppercase();
    if !FX_PAIR.is_match(&raw) {
        return ParsedKey::Rejected;
    }

    ParsedKey::Pair(CurrencyPair {
        base: raw[..3].to_string(),
        quote: raw[3..].to_string(),
    })
}
