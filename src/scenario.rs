use crate::error::{Result, ScenarioEngineError};
use crate::schema::{ProjectionItem, SimulationScenario};
use crate::utils::{diff_percent, growth_rate, profit_margin};
use crate::valuation::YearMetrics;
use serde::{Deserialize, Serialize};

/// Headline figures of one scenario year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioSummary {
    pub total_base_revenue: f64,
    pub total_projected_revenue: f64,
    pub total_base_expenses: f64,
    pub total_projected_expenses: f64,
    pub total_investments: f64,
    pub base_net_profit: f64,
    pub projected_net_profit: f64,
    /// Projected profit margin, percent.
    pub profit_margin: f64,
    /// Revenue growth base -> projected, percent.
    pub revenue_growth: f64,
    /// Expense growth base -> projected, percent.
    pub expense_growth: f64,
    /// Change in net profit, percent of the base profit's magnitude.
    pub profit_diff: f64,
}

impl ScenarioSummary {
    pub fn from_scenario(scenario: &SimulationScenario) -> Self {
        let total_base_revenue = scenario.total_base_revenue();
        let total_projected_revenue = scenario.total_projected_revenue();
        let total_base_expenses = scenario.total_base_expenses();
        let total_projected_expenses = scenario.total_projected_expenses();

        let base_net_profit = total_base_revenue - total_base_expenses;
        let projected_net_profit = total_projected_revenue - total_projected_expenses;

        Self {
            total_base_revenue,
            total_projected_revenue,
            total_base_expenses,
            total_projected_expenses,
            total_investments: scenario.total_investments(),
            base_net_profit,
            projected_net_profit,
            profit_margin: profit_margin(total_projected_revenue, projected_net_profit),
            revenue_growth: growth_rate(total_base_revenue, total_projected_revenue) * 100.0,
            expense_growth: growth_rate(total_base_expenses, total_projected_expenses) * 100.0,
            profit_diff: diff_percent(base_net_profit, projected_net_profit),
        }
    }

    /// Amounts expressed in another currency at `exchange_rate` units per scenario unit.
    /// Percentages are unchanged.
    pub fn converted(&self, exchange_rate: f64) -> Self {
        Self {
            total_base_revenue: self.total_base_revenue * exchange_rate,
            total_projected_revenue: self.total_projected_revenue * exchange_rate,
            total_base_expenses: self.total_base_expenses * exchange_rate,
            total_projected_expenses: self.total_projected_expenses * exchange_rate,
            total_investments: self.total_investments * exchange_rate,
            base_net_profit: self.base_net_profit * exchange_rate,
            projected_net_profit: self.projected_net_profit * exchange_rate,
            ..*self
        }
    }
}

/// The scenario's target year as valuation input.
pub fn year_metrics(scenario: &SimulationScenario) -> YearMetrics {
    YearMetrics {
        year: scenario.target_year,
        revenue: scenario.total_projected_revenue(),
        expenses: scenario.total_projected_expenses(),
    }
}

/// Checks that every stored quarterly breakdown sums to its annual amount.
pub fn verify_quarterly_splits(scenario: &SimulationScenario, tolerance: f64) -> Result<()> {
    for item in scenario.revenues.iter().chain(scenario.expenses.iter()) {
        verify_item(item, tolerance)?;
    }
    Ok(())
}

fn verify_item(item: &ProjectionItem, tolerance: f64) -> Result<()> {
    let checks = [
        (item.base_quarterly, item.base_amount),
        (item.projected_quarterly, item.projected_amount),
    ];
    for (quarters, annual) in checks {
        if let Some(quarters) = quarters {
            let quarterly_total = quarters.total();
            if (quarterly_total - annual).abs() > tolerance {
                return Err(ScenarioEngineError::QuarterlySplitMismatch {
                    category: item.category.clone(),
                    quarterly_total,
                    annual,
                });
            }
        }
    }
    Ok(())
}
