use analysis_core::stats::round_to;
use analysis_core::{FundamentalValue, FundamentalsSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Provider key -> report key for every ratio the extractor carries over.
pub const FUNDAMENTAL_METRICS: &[(&str, &str)] = &[
    ("trailingPE", "pe_ratio"),
    ("forwardPE", "forward_pe"),
    ("priceToBook", "pb_ratio"),
    ("priceToSalesTrailing12Months", "ps_ratio"),
    ("enterpriseToRevenue", "ev_revenue"),
    ("enterpriseToEbitda", "ev_ebitda"),
    ("profitMargins", "profit_margin"),
    ("operatingMargins", "operating_margin"),
    ("returnOnEquity", "roe"),
    ("returnOnAssets", "roa"),
    ("debtToEquity", "debt_equity"),
    ("currentRatio", "current_ratio"),
    ("quickRatio", "quick_ratio"),
    ("totalRevenue", "revenue"),
    ("revenueGrowth", "revenue_growth"),
    ("earningsGrowth", "earnings_growth"),
    ("freeCashflow", "free_cash_flow"),
    ("operatingCashflow", "operating_cash_flow"),
];

/// Sparse fundamentals keyed by report name. Keys the provider did not send are absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FundamentalMetrics {
    values: BTreeMap<String, FundamentalValue>,
}

impl FundamentalMetrics {
    pub fn get(&self, key: &str) -> Option<&FundamentalValue> {
        self.values.get(key)
    }

    /// Numeric value for `key`; text values read as missing.
    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(FundamentalValue::as_f64)
    }

    pub fn pe_ratio(&self) -> Option<f64> {
        self.number("pe_ratio")
    }

    pub fn profit_margin(&self) -> Option<f64> {
        self.number("profit_margin")
    }

    pub fn revenue_growth(&self) -> Option<f64> {
        self.number("revenue_growth")
    }

    pub fn debt_equity(&self) -> Option<f64> {
        self.number("debt_equity")
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

impl<K: Into<String>, V: Into<FundamentalValue>> FromIterator<(K, V)> for FundamentalMetrics {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Headline company facts. Missing values serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicInfo {
    pub symbol: String,
    pub name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub country: Option<String>,
    pub market_cap: Option<f64>,
    pub current_price: Option<f64>,
    #[serde(rename = "52_week_high")]
    pub fifty_two_week_high: Option<f64>,
    #[serde(rename = "52_week_low")]
    pub fifty_two_week_low: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub pb_ratio: Option<f64>,
}

pub struct FundamentalAnalysisEngine;

impl FundamentalAnalysisEngine {
    pub fn new() -> Self {
        Self
    }

    /// Pull the allowlisted ratios out of the provider snapshot.
    ///
    /// Numbers are rounded to 3 places, text passes through, absent keys stay absent.
    /// Adds `market_cap_to_revenue` when market cap and a positive revenue are both known.
    pub fn extract(&self, snapshot: &FundamentalsSnapshot) -> FundamentalMetrics {
        let mut values = BTreeMap::new();

        for (provider_key, report_key) in FUNDAMENTAL_METRICS {
            let value = match snapshot.get(provider_key) {
                Some(FundamentalValue::Number(n)) => FundamentalValue::Number(round_to(*n, 3)),
                Some(other) => other.clone(),
                None => continue,
            };
            values.insert(report_key.to_string(), value);
        }

        let revenue = values.get("revenue").and_then(FundamentalValue::as_f64);
        if let (Some(market_cap), Some(revenue)) = (snapshot.number("marketCap"), revenue) {
            if let Some(ratio) = self.calculate_market_cap_to_revenue(market_cap, revenue) {
                values.insert("market_cap_to_revenue".to_string(), FundamentalValue::Number(ratio));
            }
        }

        FundamentalMetrics { values }
    }

    fn calculate_market_cap_to_revenue(&self, market_cap: f64, revenue: f64) -> Option<f64> {
        if market_cap != 0.0 && revenue > 0.0 {
            Some(round_to(market_cap / revenue, 2))
        } else {
            None
        }
    }

    /// Headline facts for the report; `symbol` is the user-facing ticker.
    pub fn basic_info(&self, symbol: &str, snapshot: &FundamentalsSnapshot) -> BasicInfo {
        let text = |key: &str| snapshot.text(key).map(str::to_string);

        BasicInfo {
            symbol: symbol.to_string(),
            name: text("longName"),
            sector: text("sector"),
            industry: text("industry"),
            country: text("country"),
            market_cap: snapshot.number("marketCap"),
            current_price: snapshot.number("currentPrice"),
            fifty_two_week_high: snapshot.number("fiftyTwoWeekHigh"),
            fifty_two_week_low: snapshot.number("fiftyTwoWeekLow"),
            dividend_yield: snapshot.number("dividendYield"),
            pe_ratio: snapshot.number("trailingPE"),
            pb_ratio: snapshot.number("priceToBook"),
        }
    }
}

impl Default for FundamentalAnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}
