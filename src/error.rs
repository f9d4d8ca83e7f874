use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScenarioEngineError {
    #[error("Valuation weights must sum to 1.0 (got {0})")]
    InvalidValuationWeights(f64),

    #[error("Invalid rate for {name}: {value}")]
    InvalidRate { name: String, value: f64 },

    #[error("Quarterly ratios are invalid: {0}")]
    InvalidQuarterlyRatios(String),

    #[error("Invalid day count for {field}: {value} (must be non-negative)")]
    InvalidDayCount { field: String, value: i32 },

    #[error("Invalid growth floor policy: {0}")]
    InvalidGrowthPolicy(String),

    #[error("Cash forecast continuity broken at week {week}: expected {expected}, found {found}")]
    ForecastContinuityViolation {
        week: u32,
        expected: f64,
        found: f64,
    },

    #[error("Quarterly split for '{category}' sums to {quarterly_total}, annual amount is {annual}")]
    QuarterlySplitMismatch {
        category: String,
        quarterly_total: f64,
        annual: f64,
    },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ScenarioEngineError>;
