use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

// --- Payloads ---

/// One instrument's rating as returned by the analysis API.
///
/// Only `RECOMMENDATION` drives the engine; the vote counts are kept for the
/// heat map tooltips. Every field is read leniently so that a malformed value
/// degrades to "absent" instead of rejecting the whole batch.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct RecommendationPayload {
    #[serde(
        rename = "RECOMMENDATION",
        default,
        deserialize_with = "deserialize_str_lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub recommendation: Option<String>,
    #[serde(
        rename = "BUY",
        default,
        deserialize_with = "deserialize_u32_lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub buy: Option<u32>,
    #[serde(
        rename = "SELL",
        default,
        deserialize_with = "deserialize_u32_lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub sell: Option<u32>,
    #[serde(
        rename = "NEUTRAL",
        default,
        deserialize_with = "deserialize_u32_lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub neutral: Option<u32>,
}

#[cfg(test)]
impl RecommendationPayload {
    pub fn with_recommendation(rec: &str) -> Self {
        Self {
            recommendation: Some(rec.to_string()),
            ..Self::default()
        }
    }
}

fn deserialize_str_lenient<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn deserialize_u32_lenient<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    })
}

// --- Ordered keyed entries ---

/// Instrument/timeframe keyed entries in the order the API sent them.
///
/// A JSON object is read into a `Vec` rather than a map so that first-seen
/// order survives deserialization. Duplicate keys are kept as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyed<T>(pub Vec<(String, Option<T>)>);

impl<T> Default for Keyed<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> Keyed<T> {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&T>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    /// Last value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&T> {
        self.0
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_ref())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }
}

#[cfg(test)]
impl<T> Keyed<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: Option<T>) {
        self.0.push((key.into(), value));
    }
}

impl<K: Into<String>, T> FromIterator<(K, Option<T>)> for Keyed<T> {
    fn from_iter<I: IntoIterator<Item = (K, Option<T>)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

struct KeyedVisitor<T>(std::marker::PhantomData<T>);

impl<'de, T> Visitor<'de> for KeyedVisitor<T>
where
    T: de::DeserializeOwned,
{
    type Value = Keyed<T>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an object keyed by instrument or timeframe")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, Value>()? {
            // null, scalars and wrongly shaped objects all count as "no payload"
            let payload = match value {
                Value::Object(_) => serde_json::from_value::<T>(value).ok(),
                _ => None,
            };
            entries.push((key, payload));
        }
        Ok(Keyed(entries))
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E> {
        Ok(Keyed::default())
    }
}

impl<'de, T> Deserialize<'de> for Keyed<T>
where
    T: de::DeserializeOwned,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(KeyedVisitor(std::marker::PhantomData))
    }
}

impl<T: Serialize> Serialize for Keyed<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Instrument key -> recommendation payload, as found in `analysis_data`.
pub type AnalysisBatch = Keyed<RecommendationPayload>;
