use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// The provider answered but had nothing for the symbol.
    #[error("No data available: {0}")]
    NoDataAvailable(String),

    /// Transport, HTTP or payload failure talking to the market data provider.
    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AnalysisError {
    /// Both fetch failure kinds degrade the analysis the same way downstream.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, AnalysisError::NoDataAvailable(_) | AnalysisError::ProviderError(_))
    }
}
