//! stock-research: score stocks into BUY/HOLD/SELL calls.
//!
//! Usage:
//!   stock-research analyze AAPL --period 1y --pretty
//!   stock-research analyze 0700 --market HK --output tencent.json
//!   stock-research compare AAPL MSFT GOOGL
//!   stock-research summary AAPL

mod cli;

use analysis_orchestrator::{AnalysisOrchestrator, AnalyzerConfig};
use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use yahoo_client::{YahooClient, DEFAULT_USER_AGENT};

use crate::cli::{Cli, Command};

const DEFAULT_LOG_FILTER: &str = "stock_research=info,yahoo_client=warn,analysis_orchestrator=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = AnalyzerConfig::from_env().context("invalid STOCK_RESEARCH_* configuration")?;
    cli.command.data().apply(&mut config);

    let user_agent = config.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
    let provider = YahooClient::new(user_agent, config.fetch_timeout)?;
    let orchestrator = AnalysisOrchestrator::new(Arc::new(provider), config);

    match &cli.command {
        Command::Analyze { symbol, output, .. } => {
            let report = orchestrator
                .analyze(symbol)
                .await
                .with_context(|| format!("analysis of {} failed", symbol))?;
            let json = to_json(&report, cli.pretty)?;
            match output {
                Some(path) => {
                    std::fs::write(path, json)
                        .with_context(|| format!("failed to write report to {}", path.display()))?;
                    tracing::info!("Report saved to {}", path.display());
                }
                None => println!("{}", json),
            }
        }
        Command::Compare { symbols, .. } => {
            let comparison = orchestrator.compare(symbols).await.context("comparison failed")?;
            println!("{}", to_json(&comparison, cli.pretty)?);
        }
        Command::Summary { symbol, .. } => {
            let report = orchestrator
                .analyze(symbol)
                .await
                .with_context(|| format!("analysis of {} failed", symbol))?;
            print!("{}", report.summary());
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout carries only the report.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    json.context("failed to serialize output")
}
