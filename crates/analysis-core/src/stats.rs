/// Small numeric helpers shared by the indicator, return and scoring engines.
use statrs::statistics::Statistics;

/// Mean of a data slice; 0 when empty.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.mean()
}

/// Sample (n - 1) standard deviation; 0 below two points.
pub fn std_dev(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    data.std_dev()
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Annualisation factor for daily data.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
