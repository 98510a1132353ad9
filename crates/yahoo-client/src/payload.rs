//! Yahoo Finance response shapes and their conversion into core types.

use analysis_core::{AnalysisError, Bar, FundamentalValue, FundamentalsSnapshot, PriceSeries};
use chrono::DateTime;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
pub(crate) struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteColumns>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteColumns {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuoteSummaryResponse {
    quote_summary: QuoteSummaryBody,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryBody {
    result: Option<Vec<BTreeMap<String, Value>>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    code: Option<String>,
    description: Option<String>,
}

impl YahooError {
    fn into_analysis_error(self, symbol: &str) -> AnalysisError {
        let description = self.description.unwrap_or_default();
        match self.code.as_deref() {
            Some("Not Found") => AnalysisError::NoDataAvailable(format!("{}: {}", symbol, description)),
            code => AnalysisError::ProviderError(format!(
                "{}: {} {}",
                symbol,
                code.unwrap_or("unknown"),
                description
            )),
        }
    }
}

/// Turn a chart payload into a validated series.
///
/// Rows with a missing OHLC value or a non-positive close are dropped. When the provider
/// repeats a timestamp the later row wins.
pub(crate) fn parse_chart(symbol: &str, response: ChartResponse) -> Result<PriceSeries, AnalysisError> {
    if let Some(error) = response.chart.error {
        return Err(error.into_analysis_error(symbol));
    }

    let result = response
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| AnalysisError::NoDataAvailable(format!("No chart data for {}", symbol)))?;

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let mut rows = BTreeMap::new();
    for (i, ts) in result.timestamp.iter().enumerate() {
        let column = |c: &Vec<Option<f64>>| c.get(i).copied().flatten();
        let (Some(open), Some(high), Some(low), Some(close)) = (
            column(&quote.open),
            column(&quote.high),
            column(&quote.low),
            column(&quote.close),
        ) else {
            continue;
        };
        if !(close > 0.0) {
            continue;
        }
        let Some(timestamp) = DateTime::from_timestamp(*ts, 0) else {
            continue;
        };
        rows.insert(
            *ts,
            Bar {
                timestamp,
                open,
                high,
                low,
                close,
                volume: column(&quote.volume).unwrap_or(0.0),
            },
        );
    }

    if rows.is_empty() {
        return Err(AnalysisError::NoDataAvailable(format!("No price rows for {}", symbol)));
    }

    PriceSeries::new(rows.into_values().collect())
}

/// Flatten the quoteSummary modules into one provider-keyed snapshot.
///
/// `{"raw": x, "fmt": ".."}` wrappers contribute `x`; plain numbers and non-empty strings
/// pass through; empty objects, nulls and nested lists are skipped. The first module that
/// carries a key wins.
pub(crate) fn parse_quote_summary(
    symbol: &str,
    response: QuoteSummaryResponse,
) -> Result<FundamentalsSnapshot, AnalysisError> {
    if let Some(error) = response.quote_summary.error {
        return Err(error.into_analysis_error(symbol));
    }

    let modules = response
        .quote_summary
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| AnalysisError::NoDataAvailable(format!("No company info for {}", symbol)))?;

    let mut values: BTreeMap<String, FundamentalValue> = BTreeMap::new();
    for module_name in crate::QUOTE_SUMMARY_MODULES {
        let Some(Value::Object(fields)) = modules.get(*module_name) else {
            continue;
        };
        for (key, raw) in fields {
            if key == "maxAge" {
                continue;
            }
            if let Some(value) = flatten_value(raw) {
                values.entry(key.clone()).or_insert(value);
            }
        }
    }

    Ok(values.into_iter().collect())
}

fn flatten_value(value: &Value) -> Option<FundamentalValue> {
    match value {
        Value::Number(n) => n.as_f64().map(FundamentalValue::Number),
        Value::String(s) if !s.is_empty() => Some(FundamentalValue::Text(s.clone())),
        Value::Object(map) => map.get("raw").and_then(Value::as_f64).map(FundamentalValue::Number),
        _ => None,
    }
}
