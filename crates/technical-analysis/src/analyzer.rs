use analysis_core::stats::round_to;
use analysis_core::PriceSeries;
use serde::{Deserialize, Serialize};

use crate::indicators::*;

pub const RSI_PERIOD: usize = 14;
pub const BB_PERIOD: usize = 20;
pub const BB_STD_DEV: f64 = 2.0;
/// RSI assumed when the series is too short to compute one.
pub const NEUTRAL_RSI: f64 = 50.0;

const RSI_OVERBOUGHT: f64 = 70.0;
const RSI_OVERSOLD: f64 = 30.0;

/// Moving-average alignment on the latest bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaSignal {
    Bullish,
    Bearish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RsiSignal {
    Overbought,
    Oversold,
    Neutral,
}

/// Where the latest close sits relative to the Bollinger Bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BbPosition {
    #[serde(rename = "Upper Band")]
    UpperBand,
    #[serde(rename = "Lower Band")]
    LowerBand,
    #[serde(rename = "Middle Range")]
    MiddleRange,
}

/// Latest-bar indicator values. `None` means the series is shorter than the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalSnapshot {
    pub current_price: f64,
    pub ma_20: Option<f64>,
    pub ma_50: Option<f64>,
    pub ma_200: Option<f64>,
    pub rsi: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_lower: Option<f64>,
    pub ma_signal: MaSignal,
    pub rsi_signal: RsiSignal,
    pub bb_position: BbPosition,
}

impl TechnicalSnapshot {
    /// RSI with the neutral default applied.
    pub fn rsi_or_neutral(&self) -> f64 {
        self.rsi.unwrap_or(NEUTRAL_RSI)
    }
}

pub struct TechnicalAnalysisEngine;

impl TechnicalAnalysisEngine {
    pub fn new() -> Self {
        Self
    }

    /// Compute the indicator snapshot for the last bar. `None` for an empty series.
    pub fn analyze(&self, series: &PriceSeries) -> Option<TechnicalSnapshot> {
        let closes = series.closes();
        let current_price = *closes.last()?;

        let ma_20 = sma(&closes, 20).last().copied();
        let ma_50 = sma(&closes, 50).last().copied();
        let ma_200 = sma(&closes, 200).last().copied();
        let rsi_value = rsi(&closes, RSI_PERIOD).last().copied();
        let bb = bollinger_bands(&closes, BB_PERIOD, BB_STD_DEV);
        let bb_upper = bb.upper.last().copied();
        let bb_lower = bb.lower.last().copied();

        let ma_signal = ma_signal(current_price, ma_20, ma_50, ma_200);
        let rsi_signal = rsi_signal(rsi_value.unwrap_or(NEUTRAL_RSI));
        let bb_position = bb_position(current_price, bb_upper, bb_lower);

        Some(TechnicalSnapshot {
            current_price: round_to(current_price, 2),
            ma_20: ma_20.map(|v| round_to(v, 2)),
            ma_50: ma_50.map(|v| round_to(v, 2)),
            ma_200: ma_200.map(|v| round_to(v, 2)),
            rsi: rsi_value.map(|v| round_to(v, 1)),
            bb_upper: bb_upper.map(|v| round_to(v, 2)),
            bb_lower: bb_lower.map(|v| round_to(v, 2)),
            ma_signal,
            rsi_signal,
            bb_position,
        })
    }
}

impl Default for TechnicalAnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Bullish only for the strict chain close > MA20 > MA50 > MA200; any missing average
/// breaks the chain.
pub fn ma_signal(close: f64, ma_20: Option<f64>, ma_50: Option<f64>, ma_200: Option<f64>) -> MaSignal {
    match (ma_20, ma_50, ma_200) {
        (Some(m20), Some(m50), Some(m200)) if close > m20 && m20 > m50 && m50 > m200 => MaSignal::Bullish,
        _ => MaSignal::Bearish,
    }
}

pub fn rsi_signal(rsi: f64) -> RsiSignal {
    if rsi > RSI_OVERBOUGHT {
        RsiSignal::Overbought
    } else if rsi < RSI_OVERSOLD {
        RsiSignal::Oversold
    } else {
        RsiSignal::Neutral
    }
}

pub fn bb_position(close: f64, upper: Option<f64>, lower: Option<f64>) -> BbPosition {
    match (upper, lower) {
        (Some(u), _) if close > u => BbPosition::UpperBand,
        (_, Some(l)) if close < l => BbPosition::LowerBand,
        _ => BbPosition::MiddleRange,
    }
}
