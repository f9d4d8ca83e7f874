//! Cumulative cash analysis ("death valley") and the 13-week cash forecast.

use crate::config::RUNWAY_UNBOUNDED_MONTHS;
use crate::error::{Result, ScenarioEngineError};
use crate::schema::{SimulationScenario, ThirteenWeekCashForecast, WorkingCapitalConfig};
use crate::utils::{quarter_label, safe_divide, week_label, week_start};
use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};

pub const FORECAST_WEEKS: u32 = 13;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodGranularity {
    Week,
    Month,
    Quarter,
}

impl PeriodGranularity {
    pub fn months_per_period(&self) -> f64 {
        match self {
            PeriodGranularity::Week => 12.0 / 52.0,
            PeriodGranularity::Month => 1.0,
            PeriodGranularity::Quarter => 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashPeriod {
    pub label: String,
    pub net_cash_flow: f64,
}

impl CashPeriod {
    pub fn new(label: impl Into<String>, net_cash_flow: f64) -> Self {
        Self {
            label: label.into(),
            net_cash_flow,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapitalNeedResult {
    pub min_cumulative_cash: f64,
    /// Label of the period holding the lowest balance. `None` for an empty series.
    #[serde(rename = "criticalQuarter")]
    pub critical_period: Option<String>,
    pub runway_months: u32,
    pub required_investment: f64,
    pub self_sustaining: bool,
    pub year_end_balance: f64,
    pub burn_rate_monthly: f64,
}

impl CapitalNeedResult {
    fn neutral(starting_balance: f64) -> Self {
        Self {
            min_cumulative_cash: 0.0,
            critical_period: None,
            runway_months: RUNWAY_UNBOUNDED_MONTHS,
            required_investment: 0.0,
            self_sustaining: true,
            year_end_balance: starting_balance,
            burn_rate_monthly: 0.0,
        }
    }

    pub fn has_unbounded_runway(&self) -> bool {
        self.runway_months == RUNWAY_UNBOUNDED_MONTHS
    }
}

pub struct DeathValleyAnalyzer {
    granularity: PeriodGranularity,
}

impl DeathValleyAnalyzer {
    pub fn new(granularity: PeriodGranularity) -> Self {
        Self { granularity }
    }

    pub fn analyze(&self, periods: &[CashPeriod], starting_balance: f64) -> CapitalNeedResult {
        if periods.is_empty() {
            return CapitalNeedResult::neutral(starting_balance);
        }

        let cumulative = cumulative_balances(periods, starting_balance);

        // Strict comparison keeps the first index on ties.
        let mut min_idx = 0;
        for (idx, balance) in cumulative.iter().enumerate() {
            if *balance < cumulative[min_idx] {
                min_idx = idx;
            }
        }
        let min_cumulative_cash = cumulative[min_idx];
        let year_end_balance = cumulative[cumulative.len() - 1];

        let burns: Vec<f64> = periods
            .iter()
            .filter(|p| p.net_cash_flow < 0.0)
            .map(|p| -p.net_cash_flow)
            .collect();
        let average_burn = safe_divide(burns.iter().sum(), burns.len() as f64, 0.0);
        let burn_rate_monthly =
            safe_divide(average_burn, self.granularity.months_per_period(), 0.0);

        let runway_months = runway_months(year_end_balance, burn_rate_monthly);

        let result = CapitalNeedResult {
            min_cumulative_cash,
            critical_period: Some(periods[min_idx].label.clone()),
            runway_months,
            required_investment: (-min_cumulative_cash).max(0.0),
            self_sustaining: min_cumulative_cash >= 0.0,
            year_end_balance,
            burn_rate_monthly,
        };

        debug!(
            "Capital need over {} periods: min {:.2} at {:?}, runway {} months",
            periods.len(),
            result.min_cumulative_cash,
            result.critical_period,
            result.runway_months
        );

        result
    }
}

pub fn compute_capital_need(
    periods: &[CashPeriod],
    starting_balance: f64,
    granularity: PeriodGranularity,
) -> CapitalNeedResult {
    DeathValleyAnalyzer::new(granularity).analyze(periods, starting_balance)
}

/// Running balance after each period.
pub fn cumulative_balances(periods: &[CashPeriod], starting_balance: f64) -> Vec<f64> {
    periods
        .iter()
        .scan(starting_balance, |balance, period| {
            *balance += period.net_cash_flow;
            Some(*balance)
        })
        .collect()
}

fn runway_months(closing_balance: f64, burn_rate_monthly: f64) -> u32 {
    if burn_rate_monthly <= 0.0 {
        return RUNWAY_UNBOUNDED_MONTHS;
    }
    if closing_balance <= 0.0 {
        return 0;
    }
    let months = (closing_balance / burn_rate_monthly).floor();
    if months >= f64::from(RUNWAY_UNBOUNDED_MONTHS) {
        RUNWAY_UNBOUNDED_MONTHS
    } else {
        months as u32
    }
}

/// Inputs for a 13-week direct cash forecast.
///
/// Weekly revenue and expense vectors shorter than 13 weeks repeat their last
/// value. Activity before the horizon is assumed to run at the first week's level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThirteenWeekInputs {
    pub start_date: NaiveDate,
    pub opening_balance: f64,
    pub weekly_revenue: Vec<f64>,
    pub weekly_expenses: Vec<f64>,
    pub weekly_payroll: f64,
    pub weekly_debt_service: f64,
    pub working_capital: WorkingCapitalConfig,
}

pub fn build_thirteen_week_forecast(inputs: &ThirteenWeekInputs) -> Vec<ThirteenWeekCashForecast> {
    let first_monday = week_start(inputs.start_date);
    let collection_lag = lag_weeks(inputs.working_capital.ar_days);
    let payment_lag = lag_weeks(inputs.working_capital.ap_days);

    info!(
        "Building 13-week forecast from {} (collection lag {}w, payment lag {}w)",
        first_monday, collection_lag, payment_lag
    );

    let mut rows = Vec::with_capacity(FORECAST_WEEKS as usize);
    let mut opening_balance = inputs.opening_balance;

    for week in 1..=FORECAST_WEEKS {
        let idx = (week - 1) as i64;
        let ar_collections = lagged_value(&inputs.weekly_revenue, idx - collection_lag);
        let ap_payments = lagged_value(&inputs.weekly_expenses, idx - payment_lag);
        let payroll = inputs.weekly_payroll;
        let debt_service = inputs.weekly_debt_service;

        let net_cash_flow = ar_collections - ap_payments - payroll - debt_service;
        let closing_balance = opening_balance + net_cash_flow;

        rows.push(ThirteenWeekCashForecast {
            week,
            week_label: week_label(week, first_monday),
            opening_balance,
            ar_collections,
            ap_payments,
            payroll,
            debt_service,
            net_cash_flow,
            closing_balance,
        });

        opening_balance = closing_balance;
    }

    rows
}

/// Checks closing = opening + net within each week and opening = prior closing across weeks.
pub fn verify_forecast_continuity(rows: &[ThirteenWeekCashForecast], tolerance: f64) -> Result<()> {
    for (idx, row) in rows.iter().enumerate() {
        let expected_closing = row.opening_balance + row.net_cash_flow;
        if (expected_closing - row.closing_balance).abs() > tolerance {
            return Err(ScenarioEngineError::ForecastContinuityViolation {
                week: row.week,
                expected: expected_closing,
                found: row.closing_balance,
            });
        }

        if let Some(next) = rows.get(idx + 1) {
            if (next.opening_balance - row.closing_balance).abs() > tolerance {
                return Err(ScenarioEngineError::ForecastContinuityViolation {
                    week: next.week,
                    expected: row.closing_balance,
                    found: next.opening_balance,
                });
            }
        }
    }
    Ok(())
}

pub fn forecast_periods(rows: &[ThirteenWeekCashForecast]) -> Vec<CashPeriod> {
    rows.iter()
        .map(|row| CashPeriod::new(row.week_label.clone(), row.net_cash_flow))
        .collect()
}

/// Quarterly net cash of a scenario's target year: projected revenue less
/// projected expenses and investment outlays.
pub fn scenario_quarterly_periods(scenario: &SimulationScenario) -> Vec<CashPeriod> {
    (1..=4)
        .map(|quarter| {
            let revenue: f64 = scenario
                .revenues
                .iter()
                .map(|item| item.projected_in_quarter(quarter))
                .sum();
            let expenses: f64 = scenario
                .expenses
                .iter()
                .map(|item| item.projected_in_quarter(quarter))
                .sum();
            let investments: f64 = scenario
                .investments
                .iter()
                .map(|inv| match inv.quarter {
                    Some(q) if q == quarter => inv.amount,
                    Some(_) => 0.0,
                    None => inv.amount / 4.0,
                })
                .sum();

            CashPeriod::new(
                quarter_label(quarter, scenario.target_year),
                revenue - expenses - investments,
            )
        })
        .collect()
}

fn lag_weeks(days: i32) -> i64 {
    (i64::from(days.max(0)) + 6) / 7
}

fn lagged_value(values: &[f64], idx: i64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    if idx < 0 {
        return values[0];
    }
    let idx = idx as usize;
    values.get(idx).copied().unwrap_or(values[values.len() - 1])
}
