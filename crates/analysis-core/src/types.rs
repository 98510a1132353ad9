use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::AnalysisError;

/// OHLCV bar data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Time-ordered bars for one symbol.
///
/// Construction enforces strictly increasing timestamps and positive closes, so every
/// consumer can divide by a close and index the last bar without re-checking.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PriceSeries {
    bars: Vec<Bar>,
}

impl PriceSeries {
    pub fn new(bars: Vec<Bar>) -> Result<Self, AnalysisError> {
        for (i, bar) in bars.iter().enumerate() {
            if !(bar.close > 0.0) || !bar.close.is_finite() {
                return Err(AnalysisError::InvalidData(format!(
                    "bar {} at {} has non-positive close {}",
                    i, bar.timestamp, bar.close
                )));
            }
        }
        if let Some(w) = bars.windows(2).find(|w| w[1].timestamp <= w[0].timestamp) {
            return Err(AnalysisError::InvalidData(format!(
                "bar timestamps not strictly increasing: {} then {}",
                w[0].timestamp, w[1].timestamp
            )));
        }
        Ok(Self { bars })
    }

    /// A series with no bars, used when the fetch produced nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }
}

/// One entry of a fundamentals mapping: providers mix numbers and labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FundamentalValue {
    Number(f64),
    Text(String),
}

impl FundamentalValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FundamentalValue::Number(n) => Some(*n),
            FundamentalValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FundamentalValue::Text(s) => Some(s),
            FundamentalValue::Number(_) => None,
        }
    }
}

impl From<f64> for FundamentalValue {
    fn from(value: f64) -> Self {
        FundamentalValue::Number(value)
    }
}

impl From<&str> for FundamentalValue {
    fn from(value: &str) -> Self {
        FundamentalValue::Text(value.to_string())
    }
}

/// Company information keyed by provider metric name (`trailingPE`, `marketCap`, ...).
/// An absent key means unavailable; a present zero is a real zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FundamentalsSnapshot {
    values: BTreeMap<String, FundamentalValue>,
}

impl FundamentalsSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&FundamentalValue> {
        self.values.get(key)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(FundamentalValue::as_f64)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(FundamentalValue::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FundamentalValue)> {
        self.values.iter()
    }
}

impl<K: Into<String>, V: Into<FundamentalValue>> FromIterator<(K, V)> for FundamentalsSnapshot {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Exchange the symbol trades on; decides the provider ticker suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Market {
    #[default]
    Us,
    Hk,
    Cn,
}

impl Market {
    pub fn as_str(&self) -> &'static str {
        match self {
            Market::Us => "US",
            Market::Hk => "HK",
            Market::Cn => "CN",
        }
    }

    /// Rewrite a plain ticker into the provider's form: `0700` -> `0700.HK`,
    /// `600519` -> `600519.SS` (Shanghai listing).
    pub fn provider_symbol(&self, symbol: &str) -> String {
        match self {
            Market::Us => symbol.to_string(),
            Market::Hk => format!("{}.HK", symbol),
            Market::Cn => format!("{}.SS", symbol),
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Market {
    type Err = AnalysisError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "US" => Ok(Market::Us),
            "HK" => Ok(Market::Hk),
            "CN" => Ok(Market::Cn),
            other => Err(AnalysisError::InvalidInput(format!("unknown market '{}'", other))),
        }
    }
}

macro_rules! provider_enum {
    ($(#[$meta:meta])* $name:ident, $what:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = AnalysisError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                let value = value.trim().to_ascii_lowercase();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == value)
                    .ok_or_else(|| AnalysisError::InvalidInput(format!("unknown {} '{}'", $what, value)))
            }
        }
    };
}

provider_enum!(
    /// Look-back window requested from the provider.
    Period, "period", {
        OneDay => "1d",
        FiveDays => "5d",
        OneMonth => "1mo",
        ThreeMonths => "3mo",
        SixMonths => "6mo",
        OneYear => "1y",
        TwoYears => "2y",
        FiveYears => "5y",
        TenYears => "10y",
        YearToDate => "ytd",
        Max => "max",
    }
);

provider_enum!(
    /// Bar size requested from the provider.
    Interval, "interval", {
        Minute1 => "1m",
        Minute2 => "2m",
        Minute5 => "5m",
        Minute15 => "15m",
        Minute30 => "30m",
        Minute60 => "60m",
        Minute90 => "90m",
        Hour1 => "1h",
        Day1 => "1d",
        Day5 => "5d",
        Week1 => "1wk",
        Month1 => "1mo",
        Month3 => "3mo",
    }
);

impl Default for Period {
    fn default() -> Self {
        Period::OneYear
    }
}

impl Default for Interval {
    fn default() -> Self {
        Interval::Day1
    }
}
