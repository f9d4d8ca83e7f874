//! Planner configuration and the named business-rule constants behind it.
//!
//! The growth-floor constants are a product heuristic for implausibly low
//! upstream projections. Changing them changes every carried-forward scenario.

use crate::error::{Result, ScenarioEngineError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Day basis for converting annual flows into receivable/payable balances.
pub const DAYS_IN_YEAR: f64 = 365.0;

/// Runway reported when the series never burns cash.
pub const RUNWAY_UNBOUNDED_MONTHS: u32 = 999;

pub const DEFAULT_EBITDA_MULTIPLE: f64 = 8.0;
pub const DEFAULT_SECTOR_MULTIPLE: f64 = 2.0;
pub const DEFAULT_DISCOUNT_RATE: f64 = 0.25;
pub const DEFAULT_TERMINAL_GROWTH_RATE: f64 = 0.03;
/// Investor target money multiple used by the VC method.
pub const DEFAULT_EXPECTED_ROI: f64 = 10.0;

/// Revenue growth at or below this fraction is treated as an upstream data error.
pub const LOW_GROWTH_THRESHOLD: f64 = 0.05;
/// Revenue growth substituted when the threshold trips.
pub const REVENUE_GROWTH_FLOOR: f64 = 0.20;
/// Expense growth as a fraction of revenue growth (operating leverage).
pub const EXPENSE_GROWTH_LEVERAGE: f64 = 0.6;

const WEIGHT_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WorkingCapitalSettings {
    #[schemars(description = "Day basis for AR/AP/inventory balances (365 or 360)")]
    pub days_in_year: f64,
}

impl Default for WorkingCapitalSettings {
    fn default() -> Self {
        Self {
            days_in_year: DAYS_IN_YEAR,
        }
    }
}

/// Blend weights for the four valuation methods. Must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValuationWeights {
    pub revenue_multiple: f64,
    pub ebitda_multiple: f64,
    pub dcf: f64,
    pub vc_method: f64,
}

impl Default for ValuationWeights {
    fn default() -> Self {
        Self {
            revenue_multiple: 0.25,
            ebitda_multiple: 0.25,
            dcf: 0.25,
            vc_method: 0.25,
        }
    }
}

impl ValuationWeights {
    pub fn sum(&self) -> f64 {
        self.revenue_multiple + self.ebitda_multiple + self.dcf + self.vc_method
    }

    pub fn validate(&self) -> Result<()> {
        let weights = [
            self.revenue_multiple,
            self.ebitda_multiple,
            self.dcf,
            self.vc_method,
        ];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ScenarioEngineError::InvalidValuationWeights(self.sum()));
        }
        if (self.sum() - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ScenarioEngineError::InvalidValuationWeights(self.sum()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValuationConfig {
    #[schemars(description = "Revenue multiple for the company's sector")]
    pub sector_multiple: f64,
    #[schemars(description = "EBITDA multiple applied to terminal-year EBITDA")]
    pub ebitda_multiple: f64,
    #[schemars(description = "Annual discount rate for the DCF, as a fraction")]
    pub discount_rate: f64,
    #[schemars(description = "Perpetual growth rate after the projection horizon, as a fraction")]
    pub terminal_growth_rate: f64,
    #[schemars(description = "Investor target money multiple for the VC method")]
    pub expected_roi: f64,
    pub weights: ValuationWeights,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            sector_multiple: DEFAULT_SECTOR_MULTIPLE,
            ebitda_multiple: DEFAULT_EBITDA_MULTIPLE,
            discount_rate: DEFAULT_DISCOUNT_RATE,
            terminal_growth_rate: DEFAULT_TERMINAL_GROWTH_RATE,
            expected_roi: DEFAULT_EXPECTED_ROI,
            weights: ValuationWeights::default(),
        }
    }
}

impl ValuationConfig {
    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;

        let rates = [
            ("sector_multiple", self.sector_multiple),
            ("ebitda_multiple", self.ebitda_multiple),
            ("discount_rate", self.discount_rate),
            ("terminal_growth_rate", self.terminal_growth_rate),
            ("expected_roi", self.expected_roi),
        ];
        for (name, value) in rates {
            if !value.is_finite() {
                return Err(ScenarioEngineError::InvalidRate {
                    name: name.to_string(),
                    value,
                });
            }
        }

        if self.discount_rate <= -1.0 {
            return Err(ScenarioEngineError::InvalidRate {
                name: "discount_rate".to_string(),
                value: self.discount_rate,
            });
        }
        if self.terminal_growth_rate >= self.discount_rate {
            return Err(ScenarioEngineError::InvalidRate {
                name: "terminal_growth_rate".to_string(),
                value: self.terminal_growth_rate,
            });
        }
        Ok(())
    }
}

/// Low-growth fallback rule applied when carrying a scenario forward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GrowthFloorPolicy {
    #[schemars(description = "Whether implausibly low projected growth is replaced by the floor")]
    pub enabled: bool,
    pub low_growth_threshold: f64,
    pub revenue_growth_floor: f64,
    pub expense_growth_leverage: f64,
}

impl Default for GrowthFloorPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            low_growth_threshold: LOW_GROWTH_THRESHOLD,
            revenue_growth_floor: REVENUE_GROWTH_FLOOR,
            expense_growth_leverage: EXPENSE_GROWTH_LEVERAGE,
        }
    }
}

impl GrowthFloorPolicy {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Expense growth substituted alongside the revenue floor.
    pub fn expense_growth_floor(&self) -> f64 {
        self.revenue_growth_floor * self.expense_growth_leverage
    }

    pub fn validate(&self) -> Result<()> {
        if !self.revenue_growth_floor.is_finite() || self.revenue_growth_floor < 0.0 {
            return Err(ScenarioEngineError::InvalidGrowthPolicy(format!(
                "revenue growth floor {} must be non-negative",
                self.revenue_growth_floor
            )));
        }
        if !self.low_growth_threshold.is_finite() {
            return Err(ScenarioEngineError::InvalidGrowthPolicy(
                "low growth threshold must be finite".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.expense_growth_leverage) {
            return Err(ScenarioEngineError::InvalidGrowthPolicy(format!(
                "expense growth leverage {} must be between 0.0 and 1.0",
                self.expense_growth_leverage
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct PlannerConfig {
    #[serde(default)]
    pub working_capital: WorkingCapitalSettings,
    #[serde(default)]
    pub valuation: ValuationConfig,
    #[serde(default)]
    pub growth_floor: GrowthFloorPolicy,
}

impl PlannerConfig {
    pub fn validate(&self) -> Result<()> {
        let days = self.working_capital.days_in_year;
        if !days.is_finite() || days <= 0.0 {
            return Err(ScenarioEngineError::InvalidRate {
                name: "days_in_year".to_string(),
                value: self.working_capital.days_in_year,
            });
        }
        self.valuation.validate()?;
        self.growth_floor.validate()?;
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: PlannerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(PlannerConfig)
    }
}
