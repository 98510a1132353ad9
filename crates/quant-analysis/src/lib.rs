use analysis_core::stats::{round_to, TRADING_DAYS_PER_YEAR};
use analysis_core::PriceSeries;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Return and risk figures for one price series, already rounded for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnMetrics {
    pub cumulative_return_pct: f64,
    pub annual_volatility_pct: f64,
    pub sharpe_ratio: f64,
    /// Always <= 0.
    pub max_drawdown_pct: f64,
    pub avg_daily_return_pct: f64,
    pub positive_days_pct: f64,
}

pub struct QuantAnalysisEngine;

impl QuantAnalysisEngine {
    pub fn new() -> Self {
        Self
    }

    /// Calculate simple returns from prices
    fn calculate_returns(&self, prices: &[f64]) -> Vec<f64> {
        prices
            .windows(2)
            .map(|w| w[1] / w[0] - 1.0)
            .collect()
    }

    /// Calculate volatility (annualized, percent)
    fn calculate_volatility(&self, returns: &[f64]) -> f64 {
        if returns.len() < 2 {
            return 0.0;
        }

        returns.std_dev() * TRADING_DAYS_PER_YEAR.sqrt() * 100.0
    }

    /// Calculate Sharpe Ratio (annualized, zero risk-free rate)
    fn calculate_sharpe_ratio(&self, returns: &[f64]) -> f64 {
        if returns.len() < 2 {
            return 0.0;
        }

        let std_dev = returns.std_dev();
        if !(std_dev > 0.0) {
            return 0.0;
        }

        returns.mean() / std_dev * TRADING_DAYS_PER_YEAR.sqrt()
    }

    /// Maximum drawdown of the compounded return curve, in percent (<= 0).
    ///
    /// The curve starts at the first compounded value, not at 1.0, so a loss on the very
    /// first day is not a drawdown.
    fn calculate_max_drawdown(&self, returns: &[f64]) -> f64 {
        let mut cumulative = 1.0;
        let mut running_max = f64::NEG_INFINITY;
        let mut max_dd: f64 = 0.0;

        for r in returns {
            cumulative *= 1.0 + r;
            running_max = running_max.max(cumulative);
            let drawdown = (cumulative - running_max) / running_max;
            max_dd = max_dd.min(drawdown);
        }

        max_dd * 100.0
    }

    fn calculate_positive_days(&self, returns: &[f64]) -> f64 {
        if returns.is_empty() {
            return 0.0;
        }

        let positive = returns.iter().filter(|&&r| r > 0.0).count();
        positive as f64 / returns.len() as f64 * 100.0
    }

    /// Compute return and risk metrics. `None` with fewer than two bars.
    pub fn analyze(&self, series: &PriceSeries) -> Option<ReturnMetrics> {
        if series.len() < 2 {
            return None;
        }

        let prices = series.closes();
        let returns = self.calculate_returns(&prices);
        let first = prices[0];
        let last = prices[prices.len() - 1];

        let cumulative_return = (last / first - 1.0) * 100.0;
        let avg_daily_return = returns.as_slice().mean() * 100.0;

        Some(ReturnMetrics {
            cumulative_return_pct: round_to(cumulative_return, 2),
            annual_volatility_pct: round_to(self.calculate_volatility(&returns), 2),
            sharpe_ratio: round_to(self.calculate_sharpe_ratio(&returns), 2),
            max_drawdown_pct: round_to(self.calculate_max_drawdown(&returns), 2),
            avg_daily_return_pct: round_to(avg_daily_return, 3),
            positive_days_pct: round_to(self.calculate_positive_days(&returns), 1),
        })
    }
}

impl Default for QuantAnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}
