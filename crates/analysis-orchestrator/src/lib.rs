use analysis_core::{AnalysisError, FundamentalsSnapshot, MarketDataProvider, PriceSeries};
use fundamental_analysis::FundamentalAnalysisEngine;
use futures_util::stream::{self, StreamExt};
use quant_analysis::QuantAnalysisEngine;
use recommendation_engine::RecommendationEngine;
use std::future::Future;
use std::sync::Arc;
use technical_analysis::TechnicalAnalysisEngine;

pub mod config;
pub mod report;

pub use config::AnalyzerConfig;
pub use report::{ComparisonEntry, ComparisonReport, StockReport, ANALYSIS_DATE_FORMAT};

/// Attempts per provider call: the first try plus one retry.
const FETCH_ATTEMPTS: u32 = 2;

pub struct AnalysisOrchestrator {
    provider: Arc<dyn MarketDataProvider>,
    config: AnalyzerConfig,
    technical_analyzer: TechnicalAnalysisEngine,
    fundamental_analyzer: FundamentalAnalysisEngine,
    quant_analyzer: QuantAnalysisEngine,
    recommendation_engine: RecommendationEngine,
}

impl AnalysisOrchestrator {
    pub fn new(provider: Arc<dyn MarketDataProvider>, config: AnalyzerConfig) -> Self {
        Self {
            provider,
            config,
            technical_analyzer: TechnicalAnalysisEngine::new(),
            fundamental_analyzer: FundamentalAnalysisEngine::new(),
            quant_analyzer: QuantAnalysisEngine::new(),
            recommendation_engine: RecommendationEngine::new(),
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Fetch and analyse one symbol.
    ///
    /// Only a malformed symbol is an error. Fetch failures are logged, recorded in the
    /// report's `warnings` and the analysis continues on empty data.
    pub async fn analyze(&self, symbol: &str) -> Result<StockReport, AnalysisError> {
        let symbol = normalize_symbol(symbol)?;
        let provider_symbol = self.config.market.provider_symbol(&symbol);
        tracing::info!(
            "Starting analysis for {} ({}, period {}, interval {})",
            symbol,
            provider_symbol,
            self.config.period,
            self.config.interval
        );

        let (history_result, info_result) = tokio::join!(
            self.fetch_with_retry("price history", &provider_symbol, || {
                self.provider
                    .fetch_history(&provider_symbol, self.config.period, self.config.interval)
            }),
            self.fetch_with_retry("company info", &provider_symbol, || {
                self.provider.fetch_info(&provider_symbol)
            }),
        );

        let mut warnings = Vec::new();
        let series = history_result.unwrap_or_else(|e| {
            tracing::warn!("Continuing {} without price history: {}", symbol, e);
            warnings.push(format!("price history unavailable: {}", e));
            PriceSeries::empty()
        });
        let info = info_result.unwrap_or_else(|e| {
            tracing::warn!("Continuing {} without company info: {}", symbol, e);
            warnings.push(format!("company info unavailable: {}", e));
            FundamentalsSnapshot::empty()
        });

        let report = self.build_report(&symbol, &series, &info, warnings);
        tracing::info!(
            "Finished analysis for {}: {} {} (score {}, {} bars)",
            symbol,
            report.trading_recommendation.action.as_str(),
            report.trading_recommendation.conviction.as_str(),
            report.trading_recommendation.total_score,
            report.data_points
        );
        Ok(report)
    }

    /// Pure part of the analysis: every section computed from already-fetched data.
    pub fn build_report(
        &self,
        symbol: &str,
        series: &PriceSeries,
        info: &FundamentalsSnapshot,
        warnings: Vec<String>,
    ) -> StockReport {
        let returns = self.quant_analyzer.analyze(series);
        let technicals = self.technical_analyzer.analyze(series);
        let fundamentals = self.fundamental_analyzer.extract(info);
        let recommendation =
            self.recommendation_engine
                .recommend(returns.as_ref(), technicals.as_ref(), &fundamentals);

        StockReport {
            basic_info: self.fundamental_analyzer.basic_info(symbol, info),
            returns_analysis: returns,
            technical_analysis: technicals,
            fundamental_analysis: fundamentals,
            trading_recommendation: recommendation,
            analysis_date: chrono::Local::now().format(ANALYSIS_DATE_FORMAT).to_string(),
            data_period: self.config.period.to_string(),
            data_points: series.len(),
            warnings,
        }
    }

    /// Analyse several symbols, at most `config.concurrency` at a time, keeping request
    /// order. Repeated symbols are analysed once.
    pub async fn compare(&self, symbols: &[String]) -> Result<ComparisonReport, AnalysisError> {
        let mut unique: Vec<String> = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let symbol = normalize_symbol(symbol)?;
            if !unique.contains(&symbol) {
                unique.push(symbol);
            }
        }

        tracing::info!("Comparing {} symbols", unique.len());
        let reports: Vec<Result<StockReport, AnalysisError>> = stream::iter(unique.iter())
            .map(|symbol| self.analyze(symbol))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let entries = reports
            .into_iter()
            .map(|r| r.map(ComparisonEntry::from))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ComparisonReport { entries })
    }

    /// Run a provider call under the configured timeout, retrying once.
    ///
    /// `NoDataAvailable` is returned immediately since asking again will not help.
    async fn fetch_with_retry<T, F, Fut>(
        &self,
        what: &str,
        symbol: &str,
        mut fetch: F,
    ) -> Result<T, AnalysisError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AnalysisError>>,
    {
        let timeout = self.config.fetch_timeout;
        let mut last_error = String::new();

        for attempt in 1..=FETCH_ATTEMPTS {
            match tokio::time::timeout(timeout, fetch()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e @ AnalysisError::NoDataAvailable(_))) => return Err(e),
                Ok(Err(e)) => last_error = e.to_string(),
                Err(_) => last_error = format!("timed out after {}s", timeout.as_secs_f64()),
            }
            tracing::warn!(
                "Fetching {} for {} failed (attempt {}/{}): {}",
                what,
                symbol,
                attempt,
                FETCH_ATTEMPTS,
                last_error
            );
        }

        Err(AnalysisError::ProviderError(format!(
            "{} for {} failed after {} attempts: {}",
            what, symbol, FETCH_ATTEMPTS, last_error
        )))
    }
}

/// Trim and upper-case a user-supplied ticker.
pub fn normalize_symbol(symbol: &str) -> Result<String, AnalysisError> {
    let symbol = symbol.trim();
    if symbol.is_empty() || symbol.chars().any(char::is_whitespace) {
        return Err(AnalysisError::InvalidInput(format!("invalid symbol '{}'", symbol)));
    }
    Ok(symbol.to_uppercase())
}

#[cfg(test)]
mod tests;
