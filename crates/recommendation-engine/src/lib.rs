//! Point-based rubric that turns indicator snapshots into a BUY/HOLD/SELL call.
//!
//! Three independent parts are summed:
//! - technical score, 0 to 50 (MA alignment, RSI, Bollinger position, trend)
//! - fundamental score, 0 to 50 (valuation, profitability, growth, leverage)
//! - risk penalty, -50 to 0 (volatility, drawdown)
//!
//! The total is banded top-down into an action and a conviction label.

use analysis_core::stats::round_to;
use fundamental_analysis::FundamentalMetrics;
use quant_analysis::ReturnMetrics;
use serde::{Deserialize, Serialize};
use technical_analysis::{BbPosition, MaSignal, TechnicalSnapshot, NEUTRAL_RSI};

pub const TIME_HORIZON: &str = "3-6 months";

pub const MIN_TOTAL_SCORE: i32 = -50;
pub const MAX_TOTAL_SCORE: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Hold,
    Sell,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Buy => "BUY",
            Action::Hold => "HOLD",
            Action::Sell => "SELL",
        }
    }

    pub fn position_sizing(&self) -> &'static str {
        match self {
            Action::Buy => "Moderate (3-5% of portfolio)",
            Action::Hold => "Minimal (1-2%)",
            Action::Sell => "Avoid or Reduce",
        }
    }

    /// (target, stop) multipliers applied to the current price.
    fn price_multipliers(&self) -> (f64, f64) {
        match self {
            Action::Buy => (1.10, 0.90),
            Action::Sell => (0.90, 1.10),
            Action::Hold => (1.0, 0.95),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Conviction {
    Strong,
    Moderate,
    Neutral,
    Cautious,
}

impl Conviction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Conviction::Strong => "STRONG",
            Conviction::Moderate => "MODERATE",
            Conviction::Neutral => "NEUTRAL",
            Conviction::Cautious => "CAUTIOUS",
        }
    }
}

/// Final call for one symbol snapshot.
///
/// Serialized with the legacy report keys: `action` as `recommendation` and
/// `risk_penalty` as `risk_score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "recommendation")]
    pub action: Action,
    pub conviction: Conviction,
    pub total_score: i32,
    pub technical_score: i32,
    pub fundamental_score: i32,
    #[serde(rename = "risk_score")]
    pub risk_penalty: i32,
    pub rationale: String,
    /// `None` when no positive current price is known.
    pub price_target: Option<f64>,
    pub stop_loss: Option<f64>,
    pub time_horizon: String,
    pub position_sizing: String,
}

pub struct RecommendationEngine;

impl RecommendationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Score the snapshots. Total over its inputs: missing pieces fall back to the
    /// rubric defaults instead of failing.
    pub fn recommend(
        &self,
        returns: Option<&ReturnMetrics>,
        technicals: Option<&TechnicalSnapshot>,
        fundamentals: &FundamentalMetrics,
    ) -> Recommendation {
        let technical_score = self.technical_score(returns, technicals);
        let fundamental_score = self.fundamental_score(fundamentals);
        let risk_penalty = self.risk_penalty(returns);
        let total_score = technical_score + fundamental_score + risk_penalty;

        let (action, conviction, rationale) = band(total_score);

        let current_price = technicals.map(|t| t.current_price).unwrap_or(0.0);
        let (price_target, stop_loss) = price_levels(action, current_price);

        Recommendation {
            action,
            conviction,
            total_score,
            technical_score,
            fundamental_score,
            risk_penalty,
            rationale: rationale.to_string(),
            price_target,
            stop_loss,
            time_horizon: TIME_HORIZON.to_string(),
            position_sizing: action.position_sizing().to_string(),
        }
    }

    /// 0 to 50. A missing snapshot scores the MA rubric's middle value and the
    /// Bollinger rubric's lowest one.
    pub fn technical_score(
        &self,
        returns: Option<&ReturnMetrics>,
        technicals: Option<&TechnicalSnapshot>,
    ) -> i32 {
        let mut score = 0;

        // Price vs moving averages (15)
        score += match technicals.map(|t| t.ma_signal) {
            Some(MaSignal::Bullish) => 15,
            Some(MaSignal::Bearish) => 5,
            None => 10,
        };

        // RSI (10)
        let rsi = technicals.map(|t| t.rsi_or_neutral()).unwrap_or(NEUTRAL_RSI);
        score += if (30.0..=70.0).contains(&rsi) {
            10
        } else if rsi < 30.0 {
            8
        } else {
            4
        };

        // Bollinger position (10)
        score += match technicals.map(|t| t.bb_position) {
            Some(BbPosition::LowerBand) => 10,
            Some(BbPosition::MiddleRange) => 7,
            Some(BbPosition::UpperBand) | None => 4,
        };

        // Trend strength (15)
        let cumulative_return = returns.map(|r| r.cumulative_return_pct).unwrap_or(0.0);
        score += if cumulative_return > 10.0 {
            15
        } else if cumulative_return > 0.0 {
            10
        } else if cumulative_return > -10.0 {
            5
        } else {
            0
        };

        score
    }

    /// 0 to 50.
    pub fn fundamental_score(&self, fundamentals: &FundamentalMetrics) -> i32 {
        let mut score = 0;

        // Valuation (15); a zero P/E counts as unknown
        score += match fundamentals.pe_ratio().filter(|pe| *pe != 0.0) {
            Some(pe) if pe < 15.0 => 15,
            Some(pe) if pe < 25.0 => 10,
            Some(pe) if pe < 40.0 => 5,
            Some(_) => 0,
            None => 7,
        };

        // Profitability (10)
        score += ratio_points(fundamentals.profit_margin().unwrap_or(0.0));

        // Growth (10)
        score += ratio_points(fundamentals.revenue_growth().unwrap_or(0.0));

        // Financial health (15); unknown leverage scores as moderate debt
        score += match fundamentals.debt_equity() {
            Some(de) if de < 0.5 => 15,
            Some(de) if de < 1.0 => 10,
            Some(de) if de < 2.0 => 5,
            Some(_) => 0,
            None => 10,
        };

        score
    }

    /// -50 to 0.
    pub fn risk_penalty(&self, returns: Option<&ReturnMetrics>) -> i32 {
        let volatility = returns.map(|r| r.annual_volatility_pct).unwrap_or(0.0);
        let max_drawdown = returns.map(|r| r.max_drawdown_pct.abs()).unwrap_or(0.0);

        volatility_penalty(volatility) + drawdown_penalty(max_drawdown)
    }
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Margin and growth share the same bands.
fn ratio_points(value: f64) -> i32 {
    if value > 0.2 {
        10
    } else if value > 0.1 {
        7
    } else if value > 0.0 {
        4
    } else {
        0
    }
}

/// Annual volatility in percent.
fn volatility_penalty(volatility: f64) -> i32 {
    if volatility < 20.0 {
        0
    } else if volatility < 30.0 {
        -10
    } else if volatility < 40.0 {
        -15
    } else {
        -25
    }
}

/// Drawdown magnitude in percent.
fn drawdown_penalty(drawdown: f64) -> i32 {
    if drawdown < 10.0 {
        0
    } else if drawdown < 20.0 {
        -10
    } else if drawdown < 30.0 {
        -15
    } else {
        -25
    }
}

/// Map a total score to (action, conviction, rationale), first match wins.
pub fn band(total_score: i32) -> (Action, Conviction, &'static str) {
    match total_score {
        s if s >= 70 => (
            Action::Buy,
            Conviction::Strong,
            "Strong technical and fundamental signals with manageable risk",
        ),
        s if s >= 50 => (
            Action::Buy,
            Conviction::Moderate,
            "Favorable technical or fundamental signals with some risk concerns",
        ),
        s if s >= 30 => (
            Action::Hold,
            Conviction::Neutral,
            "Mixed signals with balanced risk-reward profile",
        ),
        s if s >= 10 => (
            Action::Hold,
            Conviction::Cautious,
            "Weak signals with elevated risk considerations",
        ),
        _ => (
            Action::Sell,
            Conviction::Moderate,
            "Poor technical and fundamental signals with high risk",
        ),
    }
}

/// Target and stop around `current_price`, both `None` without a positive price.
pub fn price_levels(action: Action, current_price: f64) -> (Option<f64>, Option<f64>) {
    if !(current_price > 0.0) {
        return (None, None);
    }
    let (target, stop) = action.price_multipliers();
    (
        Some(round_to(current_price * target, 2)),
        Some(round_to(current_price * stop, 2)),
    )
}
