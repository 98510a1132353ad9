use async_trait::async_trait;
use crate::{AnalysisError, FundamentalsSnapshot, Interval, Period, PriceSeries};

/// Source of price history and company information.
///
/// `symbol` is already in provider form (market suffix applied).
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn fetch_history(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<PriceSeries, AnalysisError>;

    async fn fetch_info(&self, symbol: &str) -> Result<FundamentalsSnapshot, AnalysisError>;
}
