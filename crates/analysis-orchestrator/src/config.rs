use analysis_core::{AnalysisError, Interval, Market, Period};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Run settings shared by every analysis in a process.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    pub market: Market,
    pub period: Period,
    pub interval: Interval,
    /// Budget for a single provider call; a timed-out call counts as one failed attempt.
    pub fetch_timeout: Duration,
    /// Symbols analysed at once by `compare`.
    pub concurrency: usize,
    /// Overrides the HTTP client's default User-Agent when set.
    pub user_agent: Option<String>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            market: Market::default(),
            period: Period::default(),
            interval: Interval::default(),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            concurrency: DEFAULT_CONCURRENCY,
            user_agent: None,
        }
    }
}

impl AnalyzerConfig {
    /// Load from environment variables. Unset or empty variables keep the default;
    /// a set but unparseable value is an error.
    pub fn from_env() -> Result<Self, AnalysisError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` over an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AnalysisError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let fetch_timeout = match var("STOCK_RESEARCH_FETCH_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_positive("STOCK_RESEARCH_FETCH_TIMEOUT_SECS", &raw)?),
            None => defaults.fetch_timeout,
        };

        let concurrency = match var("STOCK_RESEARCH_CONCURRENCY") {
            Some(raw) => parse_positive("STOCK_RESEARCH_CONCURRENCY", &raw)? as usize,
            None => defaults.concurrency,
        };

        Ok(Self {
            market: parse_or(var("STOCK_RESEARCH_MARKET"), defaults.market)?,
            period: parse_or(var("STOCK_RESEARCH_PERIOD"), defaults.period)?,
            interval: parse_or(var("STOCK_RESEARCH_INTERVAL"), defaults.interval)?,
            fetch_timeout,
            concurrency,
            user_agent: var("YAHOO_USER_AGENT"),
        })
    }
}

fn parse_or<T>(raw: Option<String>, default: T) -> Result<T, AnalysisError>
where
    T: FromStr<Err = AnalysisError>,
{
    raw.map_or(Ok(default), |v| v.parse())
}

fn parse_positive(key: &str, raw: &str) -> Result<u64, AnalysisError> {
    match raw.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(AnalysisError::InvalidInput(format!(
            "{} must be a positive integer, got '{}'",
            key, raw
        ))),
    }
}
