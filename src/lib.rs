//! # Financial Scenario Engine
//!
//! Deterministic calculations behind a small-business planning tool: working
//! capital, cash runway, company valuation and next-year scenario generation.
//!
//! ## Core Concepts
//!
//! - **Scenario**: a target year of revenue and expense lines, each carrying a base
//!   (prior year) and a projected amount with an optional quarterly breakdown
//! - **Working Capital**: cash conversion cycle and net working capital from DSO/DIO/DPO
//! - **Death Valley**: the lowest point of the cumulative cash curve, and the
//!   investment needed to keep it non-negative
//! - **Valuation Blend**: revenue multiple, EBITDA multiple, DCF and VC method,
//!   weighted into one company valuation
//! - **Carry-Forward**: last year's projection becomes next year's base
//!
//! Ratios never fail: a zero denominator yields the documented default (usually 0).
//!
//! ## Example
//!
//! ```rust,ignore
//! use financial_scenario_engine::*;
//!
//! let planner = FinancialPlanner::new(PlannerConfig::default())?;
//!
//! let scenario = SimulationScenario {
//!     base_year: 2025,
//!     target_year: 2026,
//!     revenues: vec![ProjectionItem::new("Subscriptions", 800_000.0, 1_000_000.0)],
//!     expenses: vec![ProjectionItem::new("Payroll", 700_000.0, 900_000.0)],
//!     investments: vec![],
//!     assumed_exchange_rate: 1.0,
//!     scenario_type: ScenarioType::Positive,
//! };
//!
//! let working_capital = WorkingCapitalConfig {
//!     ar_days: 45,
//!     inventory_days: None,
//!     ap_days: 30,
//! };
//! let analysis = planner.analyze(&scenario, 50_000.0, &working_capital);
//! println!("Bridge needed: {}", analysis.capital_need.required_investment);
//! ```

pub mod carry_forward;
pub mod cash_flow;
pub mod config;
pub mod error;
pub mod scenario;
pub mod schema;
pub mod utils;
pub mod valuation;
pub mod working_capital;

pub use carry_forward::{
    apply_growth_floor, build_next_year_scenario, carry_forward_scenario, rebalance_quarters,
    select_reference_scenario, split_quarterly, CarryForwardGenerator, CarryForwardResult,
    GrowthFloorOutcome, NextYearPlan, ScenarioRatios,
};
pub use cash_flow::{
    build_thirteen_week_forecast, compute_capital_need, cumulative_balances, forecast_periods,
    scenario_quarterly_periods, verify_forecast_continuity, CapitalNeedResult, CashPeriod,
    DeathValleyAnalyzer, PeriodGranularity, ThirteenWeekInputs, FORECAST_WEEKS,
};
pub use config::*;
pub use error::{Result, ScenarioEngineError};
pub use scenario::{verify_quarterly_splits, year_metrics, ScenarioSummary};
pub use schema::*;
pub use utils::*;
pub use valuation::{
    build_exit_plan, compute_exit_waterfall, compute_moic, compute_valuations, present_value,
    weighted_valuation, DealTerms, ExitPlan, ExitPlanYear, ExitWaterfall, ValuationBlender,
    ValuationBreakdown, YearMetrics,
};
pub use working_capital::{
    calculate_cash_conversion_cycle, calculate_net_working_capital, working_capital_delta,
    NetWorkingCapital, WorkingCapitalEngine,
};

use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Everything the dashboards show for one scenario year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioAnalysis {
    pub summary: ScenarioSummary,
    pub quarterly_cash_flow: Vec<CashPeriod>,
    pub capital_need: CapitalNeedResult,
    pub cash_conversion_cycle: i32,
    pub working_capital: NetWorkingCapital,
}

pub struct FinancialPlanner {
    config: PlannerConfig,
}

impl FinancialPlanner {
    pub fn new(config: PlannerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self {
            config: PlannerConfig::from_json(json)?,
        })
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn analyze(
        &self,
        scenario: &SimulationScenario,
        opening_cash: f64,
        working_capital: &WorkingCapitalConfig,
    ) -> ScenarioAnalysis {
        info!(
            "Analyzing {:?} scenario {} -> {}",
            scenario.scenario_type, scenario.base_year, scenario.target_year
        );
        debug!(
            "Scenario contains {} revenue lines, {} expense lines and {} investments",
            scenario.revenues.len(),
            scenario.expenses.len(),
            scenario.investments.len()
        );

        let summary = ScenarioSummary::from_scenario(scenario);
        let quarterly_cash_flow = scenario_quarterly_periods(scenario);
        let capital_need =
            compute_capital_need(&quarterly_cash_flow, opening_cash, PeriodGranularity::Quarter);

        let engine = WorkingCapitalEngine::new(self.config.working_capital);

        ScenarioAnalysis {
            summary,
            capital_need,
            cash_conversion_cycle: engine.cash_conversion_cycle(working_capital),
            working_capital: engine.net_working_capital(
                summary.total_projected_revenue,
                summary.total_projected_expenses,
                working_capital,
            ),
            quarterly_cash_flow,
        }
    }

    /// Like [`analyze`](Self::analyze), but first rejects scenarios whose stored
    /// quarterly breakdowns drift from their annual amounts by more than `tolerance`.
    pub fn analyze_with_verification(
        &self,
        scenario: &SimulationScenario,
        opening_cash: f64,
        working_capital: &WorkingCapitalConfig,
        tolerance: f64,
    ) -> Result<ScenarioAnalysis> {
        verify_quarterly_splits(scenario, tolerance)?;
        Ok(self.analyze(scenario, opening_cash, working_capital))
    }

    pub fn next_year(
        &self,
        reference: &SimulationScenario,
        projection: &NextYearProjection,
        focus_projects: &[String],
    ) -> NextYearPlan {
        CarryForwardGenerator::new(self.config.growth_floor).next_year(
            reference,
            projection,
            focus_projects,
        )
    }

    pub fn exit_plan(&self, projection: &[YearMetrics], deal: &DealTerms) -> ExitPlan {
        build_exit_plan(projection, deal, &self.config.valuation)
    }

    /// Builds the 13-week forecast, checks its continuity and runs the
    /// death-valley analysis over it.
    pub fn thirteen_week_outlook(
        &self,
        inputs: &ThirteenWeekInputs,
        tolerance: f64,
    ) -> Result<(Vec<ThirteenWeekCashForecast>, CapitalNeedResult)> {
        let rows = build_thirteen_week_forecast(inputs);
        verify_forecast_continuity(&rows, tolerance)?;
        let need = compute_capital_need(
            &forecast_periods(&rows),
            inputs.opening_balance,
            PeriodGranularity::Week,
        );
        Ok((rows, need))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> SimulationScenario {
        SimulationScenario {
            base_year: 2025,
            target_year: 2026,
            revenues: vec![ProjectionItem::new("Subscriptions", 800_000.0, 1_000_000.0)],
            expenses: vec![ProjectionItem::new("Payroll", 700_000.0, 1_100_000.0)],
            investments: vec![],
            assumed_exchange_rate: 1.0,
            scenario_type: ScenarioType::Negative,
        }
    }

    #[test]
    fn test_planner_rejects_invalid_config() {
        let mut config = PlannerConfig::default();
        config.valuation.weights.dcf = 0.9;
        assert!(FinancialPlanner::new(config).is_err());
    }

    #[test]
    fn test_analyze_loss_making_year() {
        let planner = FinancialPlanner::new(PlannerConfig::default()).unwrap();
        let wc = WorkingCapitalConfig {
            ar_days: 45,
            inventory_days: None,
            ap_days: 30,
        };
        let analysis = planner.analyze(&scenario(), 0.0, &wc);

        assert_eq!(analysis.quarterly_cash_flow.len(), 4);
        assert_eq!(analysis.capital_need.min_cumulative_cash, -100_000.0);
        assert_eq!(analysis.capital_need.required_investment, 100_000.0);
        assert_eq!(
            analysis.capital_need.critical_period.as_deref(),
            Some("Q4 2026")
        );
        assert_eq!(analysis.capital_need.runway_months, 0);
        assert_eq!(analysis.cash_conversion_cycle, 15);
        assert!(analysis.working_capital.net_working_capital > 0.0);
    }

    #[test]
    fn test_analyze_with_verification_flags_bad_split() {
        let planner = FinancialPlanner::new(PlannerConfig::default()).unwrap();
        let mut s = scenario();
        s.revenues[0].projected_quarterly = Some(QuarterlyAmounts {
            q1: 1.0,
            q2: 1.0,
            q3: 1.0,
            q4: 1.0,
        });
        let result =
            planner.analyze_with_verification(&s, 0.0, &WorkingCapitalConfig::default(), 0.01);
        assert!(result.is_err());
    }
}
