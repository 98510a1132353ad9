//! Command-line surface of `stock-research`.
//!
//! | Command | Output |
//! |---------|--------|
//! | `analyze` | Full JSON report for one symbol |
//! | `compare` | `{symbol: {basic_info, returns, recommendation}}` for several symbols |
//! | `summary` | Plain-text digest of one symbol's report |
//!
//! `--market`, `--period` and `--interval` override the `STOCK_RESEARCH_*` environment
//! settings for a single run.

use analysis_core::{Interval, Market, Period};
use analysis_orchestrator::AnalyzerConfig;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Score stocks into BUY/HOLD/SELL calls from Yahoo Finance price and fundamentals data.
#[derive(Debug, Parser)]
#[command(name = "stock-research", version, about)]
pub struct Cli {
    /// Pretty-print JSON output.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true, default_value_t = false)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Analyse one symbol and print the full report.
    Analyze {
        symbol: String,

        #[command(flatten)]
        data: DataArgs,

        /// Write the report to this file instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Analyse several symbols and print their calls side by side.
    Compare {
        #[arg(required = true, num_args = 1..)]
        symbols: Vec<String>,

        #[command(flatten)]
        data: DataArgs,
    },

    /// Print a short human-readable summary for one symbol.
    Summary {
        symbol: String,

        #[command(flatten)]
        data: DataArgs,
    },
}

impl Command {
    pub fn data(&self) -> &DataArgs {
        match self {
            Command::Analyze { data, .. } | Command::Compare { data, .. } | Command::Summary { data, .. } => data,
        }
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct DataArgs {
    /// Exchange: US, HK or CN.
    #[arg(long)]
    pub market: Option<Market>,

    /// History window: 1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y, 10y, ytd, max.
    #[arg(long)]
    pub period: Option<Period>,

    /// Bar size: 1m, 2m, 5m, 15m, 30m, 60m, 90m, 1h, 1d, 5d, 1wk, 1mo, 3mo.
    #[arg(long)]
    pub interval: Option<Interval>,
}

impl DataArgs {
    pub fn apply(&self, config: &mut AnalyzerConfig) {
        if let Some(market) = self.market {
            config.market = market;
        }
        if let Some(period) = self.period {
            config.period = period;
        }
        if let Some(interval) = self.interval {
            config.interval = interval;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_analyze_with_overrides() {
        let cli = Cli::try_parse_from([
            "stock-research", "analyze", "0700", "--market", "hk", "--period", "6mo", "--pretty", "-o",
            "report.json",
        ])
        .unwrap();
        assert!(cli.pretty);
        match &cli.command {
            Command::Analyze { symbol, output, .. } => {
                assert_eq!(symbol, "0700");
                assert_eq!(output.as_deref(), Some(std::path::Path::new("report.json")));
            }
            other => panic!("unexpected command {:?}", other),
        }

        let mut config = AnalyzerConfig::default();
        cli.command.data().apply(&mut config);
        assert_eq!(config.market, Market::Hk);
        assert_eq!(config.period, Period::SixMonths);
        assert_eq!(config.interval, Interval::Day1);
    }

    #[test]
    fn test_parse_compare_requires_symbols() {
        assert!(Cli::try_parse_from(["stock-research", "compare"]).is_err());
        let cli = Cli::try_parse_from(["stock-research", "compare", "AAPL", "MSFT", "GOOG"]).unwrap();
        match cli.command {
            Command::Compare { symbols, .. } => assert_eq!(symbols, ["AAPL", "MSFT", "GOOG"]),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_period() {
        assert!(Cli::try_parse_from(["stock-research", "summary", "AAPL", "--period", "3y"]).is_err());
    }
}
