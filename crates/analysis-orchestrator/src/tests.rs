use super::*;
use analysis_core::{Bar, FundamentalValue, Interval, Market, Period};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDateTime, TimeZone, Utc};
use recommendation_engine::{Action, Conviction};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// In-memory provider with scripted failures.
struct StubProvider {
    closes: Vec<f64>,
    info: FundamentalsSnapshot,
    history_error: Option<AnalysisError>,
    info_error: Option<AnalysisError>,
    /// History calls that fail with a provider error before the stub starts answering.
    flaky_history_calls: usize,
    delay: Option<Duration>,
    history_calls: AtomicUsize,
    info_calls: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl StubProvider {
    fn new(closes: Vec<f64>, info: FundamentalsSnapshot) -> Self {
        Self {
            closes,
            info,
            history_error: None,
            info_error: None,
            flaky_history_calls: 0,
            delay: None,
            history_calls: AtomicUsize::new(0),
            info_calls: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
        }
    }

    fn series(&self) -> PriceSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let bars = self
            .closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                timestamp: start + ChronoDuration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1_000_000.0,
            })
            .collect();
        PriceSeries::new(bars).unwrap()
    }
}

#[async_trait]
impl MarketDataProvider for StubProvider {
    async fn fetch_history(
        &self,
        symbol: &str,
        _period: Period,
        _interval: Interval,
    ) -> Result<PriceSeries, AnalysisError> {
        self.requested.lock().unwrap().push(symbol.to_string());
        let call = self.history_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(e) = &self.history_error {
            return Err(e.clone());
        }
        if call < self.flaky_history_calls {
            return Err(AnalysisError::ProviderError("connection reset".to_string()));
        }
        Ok(self.series())
    }

    async fn fetch_info(&self, _symbol: &str) -> Result<FundamentalsSnapshot, AnalysisError> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        match &self.info_error {
            Some(e) => Err(e.clone()),
            None => Ok(self.info.clone()),
        }
    }
}

fn ramp(n: usize, from: f64, to: f64) -> Vec<f64> {
    (0..n)
        .map(|i| from + (to - from) * i as f64 / (n - 1) as f64)
        .collect()
}

fn strong_fundamentals() -> FundamentalsSnapshot {
    vec![
        ("trailingPE", 12.0),
        ("profitMargins", 0.25),
        ("revenueGrowth", 0.15),
        ("debtToEquity", 0.3),
    ]
    .into_iter()
    .collect()
}

fn orchestrator(provider: StubProvider) -> (AnalysisOrchestrator, Arc<StubProvider>) {
    orchestrator_with(provider, AnalyzerConfig::default())
}

fn orchestrator_with(
    provider: StubProvider,
    config: AnalyzerConfig,
) -> (AnalysisOrchestrator, Arc<StubProvider>) {
    let provider = Arc::new(provider);
    (AnalysisOrchestrator::new(provider.clone(), config), provider)
}

#[tokio::test]
async fn test_rising_series_with_strong_fundamentals_is_strong_buy() {
    let (orch, _) = orchestrator(StubProvider::new(ramp(300, 100.0, 150.0), strong_fundamentals()));
    let report = orch.analyze("AAPL").await.unwrap();

    let technicals = report.technical_analysis.as_ref().unwrap();
    assert_eq!(technicals.ma_signal, technical_analysis::MaSignal::Bullish);
    assert_eq!(technicals.current_price, 150.0);

    let rec = &report.trading_recommendation;
    // MA 15 + RSI at 100 gives 4 + middle band 7 + trend 15
    assert_eq!(rec.technical_score, 41);
    assert_eq!(rec.fundamental_score, 47);
    assert_eq!(rec.risk_penalty, 0);
    assert_eq!(rec.total_score, 88);
    assert_eq!(rec.action, Action::Buy);
    assert_eq!(rec.conviction, Conviction::Strong);
    assert_eq!(rec.price_target, Some(165.0));
    assert_eq!(rec.stop_loss, Some(135.0));

    assert_eq!(report.data_points, 300);
    assert_eq!(report.data_period, "1y");
    assert!(report.warnings.is_empty());
}

#[tokio::test]
async fn test_summary_lists_price_levels_and_call() {
    let info: FundamentalsSnapshot = strong_fundamentals()
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .chain([("longName".to_string(), FundamentalValue::from("Apple Inc."))])
        .collect();
    let (orch, _) = orchestrator(StubProvider::new(ramp(300, 100.0, 150.0), info));
    let summary = orch.analyze("AAPL").await.unwrap().summary();

    let lines: Vec<&str> = summary.lines().collect();
    assert_eq!(lines[0], "=".repeat(60));
    assert_eq!(lines[1], "APPLE INC. (AAPL) ANALYSIS SUMMARY");
    assert_eq!(lines[2], "=".repeat(60));
    assert_eq!(lines[3], "Current Price: $150.00");
    assert_eq!(lines[4], "Price Target: $165.00");
    assert_eq!(lines[5], "Potential Return: +10.0%");
    assert_eq!(lines[6], "Final Recommendation: BUY (STRONG)");
    assert_eq!(lines[7], "Score: 88 (technical 41, fundamental 47, risk 0)");
    assert!(lines[8].starts_with("Rationale: "));
    assert_eq!(lines.len(), 9);
    assert!(summary.ends_with('\n'));
}

#[tokio::test]
async fn test_summary_without_prices_keeps_call_and_warnings() {
    let mut provider = StubProvider::new(Vec::new(), FundamentalsSnapshot::empty());
    provider.history_error = Some(AnalysisError::NoDataAvailable("ZZZZ".to_string()));
    let (orch, _) = orchestrator(provider);
    let summary = orch.analyze("ZZZZ").await.unwrap().summary();

    assert!(summary.contains("ZZZZ ANALYSIS SUMMARY\n"));
    assert!(!summary.contains("Current Price"));
    assert!(!summary.contains("Potential Return"));
    assert!(summary.contains("Final Recommendation: HOLD (NEUTRAL)\n"));
    assert!(summary.lines().last().unwrap().starts_with("Warning: "));
}

#[tokio::test]
async fn test_history_failure_degrades_to_empty_series() {
    let mut provider = StubProvider::new(ramp(50, 10.0, 20.0), strong_fundamentals());
    provider.history_error = Some(AnalysisError::ProviderError("HTTP 500".to_string()));
    let (orch, provider) = orchestrator(provider);

    let report = orch.analyze("MSFT").await.unwrap();
    assert_eq!(provider.history_calls.load(Ordering::SeqCst), 2);
    assert_eq!(report.data_points, 0);
    assert!(report.returns_analysis.is_none());
    assert!(report.technical_analysis.is_none());
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("HTTP 500"));
    assert_eq!(report.trading_recommendation.price_target, None);

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["returns_analysis"], json!({}));
    assert_eq!(value["technical_analysis"], json!({}));
    assert_eq!(value["fundamental_analysis"]["pe_ratio"], json!(12.0));
}

#[tokio::test]
async fn test_no_data_is_not_retried() {
    let mut provider = StubProvider::new(Vec::new(), FundamentalsSnapshot::empty());
    provider.history_error = Some(AnalysisError::NoDataAvailable("ZZZZ".to_string()));
    let (orch, provider) = orchestrator(provider);

    let report = orch.analyze("ZZZZ").await.unwrap();
    assert_eq!(provider.history_calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.warnings.len(), 1);
}

#[tokio::test]
async fn test_single_transient_failure_is_retried() {
    let mut provider = StubProvider::new(ramp(30, 10.0, 12.0), strong_fundamentals());
    provider.flaky_history_calls = 1;
    let (orch, provider) = orchestrator(provider);

    let report = orch.analyze("AAPL").await.unwrap();
    assert_eq!(provider.history_calls.load(Ordering::SeqCst), 2);
    assert_eq!(report.data_points, 30);
    assert!(report.warnings.is_empty());
}

#[tokio::test]
async fn test_slow_provider_times_out() {
    let mut provider = StubProvider::new(ramp(30, 10.0, 12.0), strong_fundamentals());
    provider.delay = Some(Duration::from_secs(5));
    let config = AnalyzerConfig {
        fetch_timeout: Duration::from_millis(20),
        ..AnalyzerConfig::default()
    };
    let (orch, provider) = orchestrator_with(provider, config);

    let report = orch.analyze("AAPL").await.unwrap();
    assert_eq!(provider.history_calls.load(Ordering::SeqCst), 2);
    assert_eq!(report.data_points, 0);
    assert!(report.warnings[0].contains("timed out"));
    // Company info was unaffected by the slow history call.
    assert_eq!(report.trading_recommendation.fundamental_score, 47);
}

#[tokio::test]
async fn test_everything_missing_scores_neutral_hold() {
    let mut provider = StubProvider::new(Vec::new(), FundamentalsSnapshot::empty());
    provider.history_error = Some(AnalysisError::ProviderError("offline".to_string()));
    provider.info_error = Some(AnalysisError::ProviderError("offline".to_string()));
    let (orch, provider) = orchestrator(provider);

    let report = orch.analyze("AAPL").await.unwrap();
    assert_eq!(provider.info_calls.load(Ordering::SeqCst), 2);
    let rec = &report.trading_recommendation;
    assert_eq!(rec.technical_score, 29);
    assert_eq!(rec.fundamental_score, 17);
    assert_eq!(rec.total_score, 46);
    assert_eq!(rec.action, Action::Hold);
    assert_eq!(rec.conviction, Conviction::Neutral);
    assert_eq!(report.warnings.len(), 2);

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["basic_info"]["symbol"], json!("AAPL"));
    assert_eq!(value["basic_info"]["name"], json!(null));
    assert_eq!(value["fundamental_analysis"], json!({}));
    assert_eq!(value["trading_recommendation"]["recommendation"], json!("HOLD"));
    assert_eq!(value["data_points"], json!(0));
}

#[tokio::test]
async fn test_symbol_is_normalized_and_suffixed_for_market() {
    let config = AnalyzerConfig {
        market: Market::Hk,
        ..AnalyzerConfig::default()
    };
    let (orch, provider) =
        orchestrator_with(StubProvider::new(ramp(5, 300.0, 310.0), FundamentalsSnapshot::empty()), config);

    let report = orch.analyze(" 0700 ").await.unwrap();
    assert_eq!(report.basic_info.symbol, "0700");
    assert_eq!(provider.requested.lock().unwrap().as_slice(), ["0700.HK"]);

    let (orch, _) = orchestrator(StubProvider::new(ramp(5, 1.0, 2.0), FundamentalsSnapshot::empty()));
    assert_eq!(orch.analyze("aapl").await.unwrap().basic_info.symbol, "AAPL");
}

#[tokio::test]
async fn test_invalid_symbol_is_rejected() {
    let (orch, provider) = orchestrator(StubProvider::new(Vec::new(), FundamentalsSnapshot::empty()));
    for bad in ["", "   ", "BRK B"] {
        let err = orch.analyze(bad).await.unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput(_)));
    }
    assert_eq!(provider.history_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_report_date_and_field_names() {
    let (orch, _) = orchestrator(StubProvider::new(ramp(60, 50.0, 55.0), strong_fundamentals()));
    let report = orch.analyze("AAPL").await.unwrap();
    assert!(NaiveDateTime::parse_from_str(&report.analysis_date, ANALYSIS_DATE_FORMAT).is_ok());

    let value = serde_json::to_value(&report).unwrap();
    let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
    for key in [
        "basic_info",
        "returns_analysis",
        "technical_analysis",
        "fundamental_analysis",
        "trading_recommendation",
        "analysis_date",
        "data_period",
        "data_points",
    ] {
        assert!(keys.contains(&key), "missing {}", key);
    }
    assert!(!keys.contains(&"warnings"));
    assert_eq!(value["technical_analysis"]["ma_200"], json!(null));
    assert_eq!(value["technical_analysis"]["bb_position"], json!("Middle Range"));
}

#[tokio::test]
async fn test_build_report_is_deterministic_apart_from_date() {
    let provider = StubProvider::new(ramp(120, 80.0, 70.0), strong_fundamentals());
    let series = provider.series();
    let (orch, _) = orchestrator(provider);
    let info = strong_fundamentals();

    let mut first = orch.build_report("AAPL", &series, &info, Vec::new());
    let mut second = orch.build_report("AAPL", &series, &info, Vec::new());
    first.analysis_date.clear();
    second.analysis_date.clear();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_compare_keeps_request_order_and_dedupes() {
    let config = AnalyzerConfig {
        concurrency: 2,
        ..AnalyzerConfig::default()
    };
    let (orch, provider) =
        orchestrator_with(StubProvider::new(ramp(40, 20.0, 25.0), strong_fundamentals()), config);

    let symbols: Vec<String> = ["msft", "AAPL", "goog", "MSFT"].iter().map(|s| s.to_string()).collect();
    let comparison = orch.compare(&symbols).await.unwrap();

    let order: Vec<&str> = comparison.entries.iter().map(|e| e.symbol.as_str()).collect();
    assert_eq!(order, ["MSFT", "AAPL", "GOOG"]);
    assert_eq!(provider.history_calls.load(Ordering::SeqCst), 3);

    let text = serde_json::to_string(&comparison).unwrap();
    let msft = text.find("\"MSFT\"").unwrap();
    let aapl = text.find("\"AAPL\"").unwrap();
    let goog = text.find("\"GOOG\"").unwrap();
    assert!(msft < aapl && aapl < goog);

    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    let entry = &value["AAPL"];
    assert!(entry.get("basic_info").is_some());
    assert!(entry.get("returns").is_some());
    assert_eq!(entry["recommendation"]["time_horizon"], json!("3-6 months"));
    assert!(entry.get("symbol").is_none());
}

#[tokio::test]
async fn test_compare_rejects_invalid_symbol_before_fetching() {
    let (orch, provider) = orchestrator(StubProvider::new(ramp(5, 1.0, 2.0), FundamentalsSnapshot::empty()));
    let symbols = vec!["AAPL".to_string(), " ".to_string()];
    assert!(orch.compare(&symbols).await.is_err());
    assert_eq!(provider.history_calls.load(Ordering::SeqCst), 0);
}
