use fundamental_analysis::{BasicInfo, FundamentalMetrics};
use quant_analysis::ReturnMetrics;
use recommendation_engine::Recommendation;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use technical_analysis::TechnicalSnapshot;

pub const ANALYSIS_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Full analysis of one symbol. Sections that could not be computed serialize as `{}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockReport {
    pub basic_info: BasicInfo,
    #[serde(serialize_with = "section_or_empty")]
    pub returns_analysis: Option<ReturnMetrics>,
    #[serde(serialize_with = "section_or_empty")]
    pub technical_analysis: Option<TechnicalSnapshot>,
    pub fundamental_analysis: FundamentalMetrics,
    pub trading_recommendation: Recommendation,
    pub analysis_date: String,
    pub data_period: String,
    pub data_points: usize,
    /// Fetch problems the analysis degraded around.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl StockReport {
    /// Short plain-text digest: price, target, potential return and the final call.
    pub fn summary(&self) -> String {
        let rec = &self.trading_recommendation;
        let title = match &self.basic_info.name {
            Some(name) => format!("{} ({})", name, self.basic_info.symbol),
            None => self.basic_info.symbol.clone(),
        };

        let rule = "=".repeat(60);
        let mut lines = vec![
            rule.clone(),
            format!("{} ANALYSIS SUMMARY", title.to_uppercase()),
            rule,
        ];

        let current_price = self.technical_analysis.as_ref().map(|t| t.current_price);
        if let (Some(price), Some(target)) = (current_price, rec.price_target) {
            let potential_return = (target - price) / price * 100.0;
            lines.push(format!("Current Price: ${:.2}", price));
            lines.push(format!("Price Target: ${:.2}", target));
            lines.push(format!("Potential Return: {:+.1}%", potential_return));
        }

        lines.push(format!(
            "Final Recommendation: {} ({})",
            rec.action.as_str(),
            rec.conviction.as_str()
        ));
        lines.push(format!(
            "Score: {} (technical {}, fundamental {}, risk {})",
            rec.total_score, rec.technical_score, rec.fundamental_score, rec.risk_penalty
        ));
        lines.push(format!("Rationale: {}", rec.rationale));
        lines.extend(self.warnings.iter().map(|w| format!("Warning: {}", w)));

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}

/// Per-symbol slice of a multi-symbol comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonEntry {
    #[serde(skip)]
    pub symbol: String,
    pub basic_info: BasicInfo,
    #[serde(serialize_with = "section_or_empty")]
    pub returns: Option<ReturnMetrics>,
    pub recommendation: Recommendation,
}

impl From<StockReport> for ComparisonEntry {
    fn from(report: StockReport) -> Self {
        Self {
            symbol: report.basic_info.symbol.clone(),
            basic_info: report.basic_info,
            returns: report.returns_analysis,
            recommendation: report.trading_recommendation,
        }
    }
}

/// Comparison results in request order, serialized as `{symbol: entry}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComparisonReport {
    pub entries: Vec<ComparisonEntry>,
}

impl Serialize for ComparisonReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.symbol, entry)?;
        }
        map.end()
    }
}

fn section_or_empty<T, S>(section: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Serialize,
    S: Serializer,
{
    match section {
        Some(value) => value.serialize(serializer),
        None => serializer.serialize_map(Some(0))?.end(),
    }
}
