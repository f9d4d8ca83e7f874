use crate::error::{Result, ScenarioEngineError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QuarterlyAmounts {
    pub q1: f64,
    pub q2: f64,
    pub q3: f64,
    pub q4: f64,
}

impl QuarterlyAmounts {
    pub fn total(&self) -> f64 {
        self.q1 + self.q2 + self.q3 + self.q4
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.q1, self.q2, self.q3, self.q4]
    }

    /// Builds from a slice of four values; missing trailing values are zero.
    pub fn from_slice(values: &[f64]) -> Self {
        let get = |i: usize| values.get(i).copied().unwrap_or(0.0);
        Self {
            q1: get(0),
            q2: get(1),
            q3: get(2),
            q4: get(3),
        }
    }

    /// Amount for a 1-based quarter. Out-of-range quarters read as zero.
    pub fn get(&self, quarter: u32) -> f64 {
        match quarter {
            1 => self.q1,
            2 => self.q2,
            3 => self.q3,
            4 => self.q4,
            _ => 0.0,
        }
    }
}

/// Seasonal shape of a year as four relative weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QuarterlyRatios {
    pub q1: f64,
    pub q2: f64,
    pub q3: f64,
    pub q4: f64,
}

impl Default for QuarterlyRatios {
    fn default() -> Self {
        Self::even()
    }
}

impl QuarterlyRatios {
    pub fn even() -> Self {
        Self {
            q1: 0.25,
            q2: 0.25,
            q3: 0.25,
            q4: 0.25,
        }
    }

    /// Derives ratios from absolute quarterly amounts. All-zero amounts give an even shape.
    pub fn from_amounts(amounts: &QuarterlyAmounts) -> Self {
        let total = amounts.total();
        if total <= 0.0 || !total.is_finite() {
            return Self::even();
        }
        Self {
            q1: amounts.q1 / total,
            q2: amounts.q2 / total,
            q3: amounts.q3 / total,
            q4: amounts.q4 / total,
        }
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.q1, self.q2, self.q3, self.q4]
    }

    /// Zeroes the quarters that end before `start_month`, for lines that begin mid-year.
    pub fn masked_from(&self, start_month: Option<u32>) -> Self {
        let first_quarter = match start_month {
            Some(m) if (1..=12).contains(&m) => crate::utils::quarter_of_month(m),
            _ => return *self,
        };
        let mut ratios = self.as_array();
        for (idx, ratio) in ratios.iter_mut().enumerate() {
            if (idx as u32 + 1) < first_quarter {
                *ratio = 0.0;
            }
        }
        Self {
            q1: ratios[0],
            q2: ratios[1],
            q3: ratios[2],
            q4: ratios[3],
        }
    }

    pub fn validate(&self) -> Result<()> {
        let ratios = self.as_array();
        if ratios.iter().any(|r| !r.is_finite() || *r < 0.0) {
            return Err(ScenarioEngineError::InvalidQuarterlyRatios(
                "ratios must be finite and non-negative".to_string(),
            ));
        }
        if ratios.iter().sum::<f64>() <= 0.0 {
            return Err(ScenarioEngineError::InvalidQuarterlyRatios(
                "at least one quarter must carry weight".to_string(),
            ));
        }
        Ok(())
    }
}

/// One revenue or expense line of a scenario year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionItem {
    pub category: String,
    pub base_amount: f64,
    pub projected_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_quarterly: Option<QuarterlyAmounts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projected_quarterly: Option<QuarterlyAmounts>,
    /// First month (1..=12) the line is active in the target year.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_month: Option<u32>,
}

impl ProjectionItem {
    pub fn new(category: impl Into<String>, base_amount: f64, projected_amount: f64) -> Self {
        Self {
            category: category.into(),
            base_amount,
            projected_amount,
            base_quarterly: None,
            projected_quarterly: None,
            start_month: None,
        }
    }

    /// Projected amount for a quarter, falling back to an even split when no
    /// quarterly breakdown is stored.
    pub fn projected_in_quarter(&self, quarter: u32) -> f64 {
        match &self.projected_quarterly {
            Some(q) => q.get(quarter),
            None if (1..=4).contains(&quarter) => self.projected_amount / 4.0,
            None => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioType {
    Positive,
    Negative,
}

/// A capital outlay planned within the scenario year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentItem {
    pub category: String,
    pub amount: f64,
    /// Quarter (1..=4) the outlay lands in. `None` spreads it evenly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quarter: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationScenario {
    pub base_year: i32,
    pub target_year: i32,
    pub revenues: Vec<ProjectionItem>,
    pub expenses: Vec<ProjectionItem>,
    #[serde(default)]
    pub investments: Vec<InvestmentItem>,
    pub assumed_exchange_rate: f64,
    pub scenario_type: ScenarioType,
}

impl SimulationScenario {
    pub fn total_base_revenue(&self) -> f64 {
        self.revenues.iter().map(|i| i.base_amount).sum()
    }

    pub fn total_projected_revenue(&self) -> f64 {
        self.revenues.iter().map(|i| i.projected_amount).sum()
    }

    pub fn total_base_expenses(&self) -> f64 {
        self.expenses.iter().map(|i| i.base_amount).sum()
    }

    pub fn total_projected_expenses(&self) -> f64 {
        self.expenses.iter().map(|i| i.projected_amount).sum()
    }

    pub fn total_investments(&self) -> f64 {
        self.investments.iter().map(|i| i.amount).sum()
    }
}

/// Day-count assumptions behind the cash conversion cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WorkingCapitalConfig {
    /// Days sales outstanding.
    pub ar_days: i32,
    /// Days inventory outstanding. Absent when inventory is not modeled.
    #[serde(default)]
    pub inventory_days: Option<i32>,
    /// Days payable outstanding.
    pub ap_days: i32,
}

impl WorkingCapitalConfig {
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("ar_days", self.ar_days),
            ("inventory_days", self.inventory_days.unwrap_or(0)),
            ("ap_days", self.ap_days),
        ];
        for (field, value) in fields {
            if value < 0 {
                return Err(ScenarioEngineError::InvalidDayCount {
                    field: field.to_string(),
                    value,
                });
            }
        }
        Ok(())
    }
}

/// One week row of a 13-week cash forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThirteenWeekCashForecast {
    pub week: u32,
    pub week_label: String,
    pub opening_balance: f64,
    pub ar_collections: f64,
    pub ap_payments: f64,
    pub payroll: f64,
    pub debt_service: f64,
    pub net_cash_flow: f64,
    pub closing_balance: f64,
}

/// Revenue/expense totals a new scenario year should reach.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetTotals {
    pub revenue: f64,
    pub expenses: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProjectionSummary {
    #[schemars(
        description = "Projected total revenue for the next fiscal year, in the scenario currency"
    )]
    pub total_revenue: f64,

    #[serde(default)]
    #[schemars(
        description = "Projected total expenses for the next fiscal year. When omitted the quarterly expenses are summed."
    )]
    pub total_expenses: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema)]
pub struct QuarterProjection {
    #[schemars(description = "Revenue expected in this quarter")]
    pub revenue: f64,
    #[schemars(description = "Expenses expected in this quarter")]
    pub expenses: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ProjectionQuarterly {
    pub q1: QuarterProjection,
    pub q2: QuarterProjection,
    pub q3: QuarterProjection,
    pub q4: QuarterProjection,
}

/// Next-year projection as produced by the narrative/forecast service.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NextYearProjection {
    #[schemars(description = "Annual totals for the projected year")]
    pub summary: ProjectionSummary,

    #[serde(default)]
    #[schemars(
        description = "Seasonal breakdown of the projected year. Only the shape is used; totals come from the summary."
    )]
    pub quarterly: ProjectionQuarterly,
}

impl NextYearProjection {
    pub fn target_totals(&self) -> TargetTotals {
        let expenses = self
            .summary
            .total_expenses
            .unwrap_or_else(|| self.quarterly_expenses().total());
        TargetTotals {
            revenue: self.summary.total_revenue,
            expenses,
        }
    }

    pub fn quarterly_revenue(&self) -> QuarterlyAmounts {
        let q = &self.quarterly;
        QuarterlyAmounts {
            q1: q.q1.revenue,
            q2: q.q2.revenue,
            q3: q.q3.revenue,
            q4: q.q4.revenue,
        }
    }

    pub fn quarterly_expenses(&self) -> QuarterlyAmounts {
        let q = &self.quarterly;
        QuarterlyAmounts {
            q1: q.q1.expenses,
            q2: q.q2.expenses,
            q3: q.q3.expenses,
            q4: q.q4.expenses,
        }
    }

    pub fn revenue_ratios(&self) -> QuarterlyRatios {
        QuarterlyRatios::from_amounts(&self.quarterly_revenue())
    }

    pub fn expense_ratios(&self) -> QuarterlyRatios {
        QuarterlyRatios::from_amounts(&self.quarterly_expenses())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(NextYearProjection)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_generation() {
        let schema_json = NextYearProjection::schema_as_json().unwrap();
        assert!(schema_json.contains("total_revenue"));
        assert!(schema_json.contains("quarterly"));
    }

    #[test]
    fn test_projection_item_camel_case() {
        let item = ProjectionItem {
            start_month: Some(4),
            ..ProjectionItem::new("Consulting", 100_000.0, 120_000.0)
        };
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"baseAmount\""));
        assert!(json.contains("\"projectedAmount\""));
        assert!(json.contains("\"startMonth\":4"));
        assert!(!json.contains("baseQuarterly"));

        let back: ProjectionItem = serde_json::from_str(&json).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn test_scenario_type_lowercase() {
        let json = serde_json::to_string(&ScenarioType::Positive).unwrap();
        assert_eq!(json, "\"positive\"");
    }

    #[test]
    fn test_projection_from_json_without_expense_total() {
        let json = r#"{
            "summary": { "total_revenue": 1300000 },
            "quarterly": {
                "q1": { "revenue": 200000, "expenses": 150000 },
                "q2": { "revenue": 300000, "expenses": 200000 },
                "q3": { "revenue": 300000, "expenses": 200000 },
                "q4": { "revenue": 500000, "expenses": 250000 }
            }
        }"#;
        let projection = NextYearProjection::from_json(json).unwrap();
        let totals = projection.target_totals();
        assert_eq!(totals.revenue, 1_300_000.0);
        assert_eq!(totals.expenses, 800_000.0);

        let ratios = projection.revenue_ratios();
        assert!((ratios.q4 - 500_000.0 / 1_300_000.0).abs() < 1e-12);
    }

    #[test]
    fn test_ratios_from_zero_amounts_are_even() {
        let ratios = QuarterlyRatios::from_amounts(&QuarterlyAmounts::default());
        assert_eq!(ratios, QuarterlyRatios::even());
    }

    #[test]
    fn test_ratios_masked_from_start_month() {
        let masked = QuarterlyRatios::even().masked_from(Some(7));
        assert_eq!(masked.as_array(), [0.0, 0.0, 0.25, 0.25]);
        assert_eq!(QuarterlyRatios::even().masked_from(None), QuarterlyRatios::even());
    }

    #[test]
    fn test_ratio_validation() {
        assert!(QuarterlyRatios::even().validate().is_ok());
        let negative = QuarterlyRatios {
            q1: -0.1,
            ..QuarterlyRatios::even()
        };
        assert!(negative.validate().is_err());
        let empty = QuarterlyRatios {
            q1: 0.0,
            q2: 0.0,
            q3: 0.0,
            q4: 0.0,
        };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_working_capital_config_validation() {
        let config = WorkingCapitalConfig {
            ar_days: 30,
            inventory_days: Some(-5),
            ap_days: 20,
        };
        match config.validate() {
            Err(ScenarioEngineError::InvalidDayCount { field, value }) => {
                assert_eq!(field, "inventory_days");
                assert_eq!(value, -5);
            }
            other => panic!("expected InvalidDayCount, got {:?}", other),
        }
    }
}
