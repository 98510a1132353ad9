mod payload;

use analysis_core::{AnalysisError, FundamentalsSnapshot, Interval, MarketDataProvider, Period, PriceSeries};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::Mutex;

use payload::{parse_chart, parse_quote_summary, ChartResponse, QuoteSummaryResponse};

const CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const QUOTE_SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";
const COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_URLS: [&str; 2] = [
    "https://query1.finance.yahoo.com/v1/test/getcrumb",
    "https://query2.finance.yahoo.com/v1/test/getcrumb",
];
const REFERER: &str = "https://finance.yahoo.com/";

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// quoteSummary modules requested for company info, in precedence order.
pub const QUOTE_SUMMARY_MODULES: &[&str] = &[
    "summaryDetail",
    "defaultKeyStatistics",
    "financialData",
    "assetProfile",
    "price",
];

/// Base URLs the client talks to. Symbols are appended to `chart` and `quote_summary`;
/// crumb URLs are tried in order.
#[derive(Debug, Clone)]
pub struct YahooEndpoints {
    pub chart: String,
    pub quote_summary: String,
    pub cookie: String,
    pub crumb: Vec<String>,
}

impl Default for YahooEndpoints {
    fn default() -> Self {
        Self {
            chart: CHART_URL.to_string(),
            quote_summary: QUOTE_SUMMARY_URL.to_string(),
            cookie: COOKIE_URL.to_string(),
            crumb: CRUMB_URLS.iter().map(|u| u.to_string()).collect(),
        }
    }
}

/// Yahoo Finance market data over the public chart and quoteSummary endpoints.
///
/// quoteSummary needs a session cookie plus a crumb token. The cookie lives in the
/// client's jar; the crumb is cached here and refreshed when Yahoo rejects it.
pub struct YahooClient {
    client: Client,
    endpoints: YahooEndpoints,
    crumb: Mutex<Option<String>>,
}

impl YahooClient {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, AnalysisError> {
        Self::with_endpoints(user_agent, timeout, YahooEndpoints::default())
    }

    pub fn with_endpoints(
        user_agent: &str,
        timeout: Duration,
        endpoints: YahooEndpoints,
    ) -> Result<Self, AnalysisError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .map_err(|e| AnalysisError::ProviderError(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            client,
            endpoints,
            crumb: Mutex::new(None),
        })
    }

    /// Cached crumb, fetching a fresh cookie and crumb when none is held.
    async fn crumb(&self) -> Result<String, AnalysisError> {
        let mut crumb = self.crumb.lock().await;
        if let Some(value) = crumb.as_ref() {
            return Ok(value.clone());
        }
        let fresh = self.fetch_crumb().await?;
        *crumb = Some(fresh.clone());
        Ok(fresh)
    }

    async fn invalidate_crumb(&self) {
        *self.crumb.lock().await = None;
    }

    async fn fetch_crumb(&self) -> Result<String, AnalysisError> {
        // fc.yahoo.com answers 404 but still sets the session cookie
        if let Err(e) = self.client.get(&self.endpoints.cookie).header("referer", REFERER).send().await {
            return Err(AnalysisError::ProviderError(format!("Yahoo cookie request failed: {}", e)));
        }

        for url in &self.endpoints.crumb {
            let response = match self.client.get(url).header("referer", REFERER).send().await {
                Ok(r) => r,
                Err(e) => {
                    tracing::debug!("Crumb request to {} failed: {}", url, e);
                    continue;
                }
            };

            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                return Err(AnalysisError::ProviderError(
                    "Yahoo rate limited while fetching crumb".to_string(),
                ));
            }
            if !response.status().is_success() {
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            let body = body.trim();
            if !body.is_empty() && body.len() < 100 && !body.contains(' ') && !body.contains('<') {
                tracing::debug!("Obtained Yahoo crumb from {}", url);
                return Ok(body.to_string());
            }
        }

        Err(AnalysisError::ProviderError(
            "Failed to fetch Yahoo crumb from all endpoints".to_string(),
        ))
    }

    /// GET `url` and decode the JSON body.
    ///
    /// With `with_crumb`, a 401 or 429 drops the cached crumb and the request is sent once
    /// more with a fresh one. A 404 body is still decoded since Yahoo reports unknown
    /// symbols through the payload's `error` field.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        with_crumb: bool,
    ) -> Result<T, AnalysisError> {
        for attempt in 0..2u32 {
            let mut request = self.client.get(url).query(query);
            if with_crumb {
                request = request.query(&[("crumb", self.crumb().await?)]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| AnalysisError::ProviderError(e.to_string()))?;
            let status = response.status();

            if with_crumb
                && attempt == 0
                && (status == StatusCode::UNAUTHORIZED || status == StatusCode::TOO_MANY_REQUESTS)
            {
                tracing::warn!("Yahoo answered {} for {}, refreshing crumb and retrying", status, url);
                self.invalidate_crumb().await;
                continue;
            }

            if !status.is_success() && status != StatusCode::NOT_FOUND {
                return Err(AnalysisError::ProviderError(format!(
                    "HTTP {}: {}",
                    status,
                    response.text().await.unwrap_or_default()
                )));
            }

            return response
                .json::<T>()
                .await
                .map_err(|e| AnalysisError::ProviderError(format!("Malformed Yahoo payload: {}", e)));
        }

        Err(AnalysisError::ProviderError(format!(
            "Yahoo rejected {} after refreshing the crumb",
            url
        )))
    }
}

#[async_trait]
impl MarketDataProvider for YahooClient {
    async fn fetch_history(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<PriceSeries, AnalysisError> {
        tracing::debug!("Fetching {} history for {} at {}", period, symbol, interval);
        let url = format!("{}/{}", self.endpoints.chart, symbol);
        let query = [
            ("range", period.to_string()),
            ("interval", interval.to_string()),
            ("includePrePost", "false".to_string()),
        ];
        let response: ChartResponse = self.get_json(&url, &query, false).await?;
        parse_chart(symbol, response)
    }

    async fn fetch_info(&self, symbol: &str) -> Result<FundamentalsSnapshot, AnalysisError> {
        tracing::debug!("Fetching company info for {}", symbol);
        let url = format!("{}/{}", self.endpoints.quote_summary, symbol);
        let query = [("modules", QUOTE_SUMMARY_MODULES.join(","))];
        let response: QuoteSummaryResponse = self.get_json(&url, &query, true).await?;
        parse_quote_summary(symbol, response)
    }
}
