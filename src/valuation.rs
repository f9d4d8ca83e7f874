//! Company valuation by four independent methods and their weighted blend,
//! plus investor-side returns (MOIC, exit waterfall).

use crate::config::{ValuationConfig, ValuationWeights};
use crate::utils::safe_divide;
use log::debug;
use serde::{Deserialize, Serialize};

/// One projected year of the exit plan inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearMetrics {
    pub year: i32,
    pub revenue: f64,
    pub expenses: f64,
}

impl YearMetrics {
    pub fn new(year: i32, revenue: f64, expenses: f64) -> Self {
        Self {
            year,
            revenue,
            expenses,
        }
    }

    pub fn ebitda(&self) -> f64 {
        self.revenue - self.expenses
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationBreakdown {
    pub revenue_multiple: f64,
    pub ebitda_multiple: f64,
    pub dcf: f64,
    pub vc_method: f64,
    pub weighted: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealTerms {
    pub investment_amount: f64,
    /// Investor stake as a fraction (0.2 = 20%).
    pub equity_percentage: f64,
    /// Non-participating preference multiple on the investment.
    #[serde(default = "default_preference")]
    pub liquidation_preference: f64,
}

fn default_preference() -> f64 {
    1.0
}

impl DealTerms {
    pub fn new(investment_amount: f64, equity_percentage: f64) -> Self {
        Self {
            investment_amount,
            equity_percentage,
            liquidation_preference: default_preference(),
        }
    }

    pub fn post_money_valuation(&self) -> f64 {
        safe_divide(self.investment_amount, self.equity_percentage, 0.0)
    }

    pub fn pre_money_valuation(&self) -> f64 {
        (self.post_money_valuation() - self.investment_amount).max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitPlanYear {
    pub year: i32,
    pub revenue: f64,
    pub expenses: f64,
    pub net_profit: f64,
    pub company_valuation: f64,
    pub valuations: ValuationBreakdown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitPlan {
    pub years: Vec<ExitPlanYear>,
    #[serde(rename = "moic3Year")]
    pub moic_3_year: f64,
    #[serde(rename = "moic5Year")]
    pub moic_5_year: f64,
}

impl ExitPlan {
    /// Record for the given 1-based horizon year, if the plan reaches it.
    pub fn horizon_year(&self, horizon: usize) -> Option<&ExitPlanYear> {
        horizon.checked_sub(1).and_then(|idx| self.years.get(idx))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitWaterfall {
    pub exit_value: f64,
    pub investor_payout: f64,
    pub founder_payout: f64,
    pub investor_moic: f64,
    /// True when the preference, not the pro-rata stake, set the investor payout.
    pub preference_applied: bool,
}

pub struct ValuationBlender {
    config: ValuationConfig,
}

impl ValuationBlender {
    pub fn new(config: ValuationConfig) -> Self {
        Self { config }
    }

    /// Values the company at the last year of `projection`.
    ///
    /// Each method is floored at zero. The DCF treats each year's EBITDA as its
    /// free cash flow and discounts year `t` (1-based) by `(1 + r)^t`, adding a
    /// Gordon-growth terminal value on the final year.
    pub fn value(&self, projection: &[YearMetrics]) -> ValuationBreakdown {
        let terminal = match projection.last() {
            Some(t) => t,
            None => return ValuationBreakdown::default(),
        };
        let cfg = &self.config;

        let revenue_multiple = (terminal.revenue * cfg.sector_multiple).max(0.0);
        let ebitda_multiple = (terminal.ebitda() * cfg.ebitda_multiple).max(0.0);
        let dcf = self.discounted_cash_flow(projection).max(0.0);
        let vc_method = safe_divide(revenue_multiple, cfg.expected_roi, 0.0).max(0.0);

        let mut breakdown = ValuationBreakdown {
            revenue_multiple,
            ebitda_multiple,
            dcf,
            vc_method,
            weighted: 0.0,
        };
        breakdown.weighted = weighted_valuation(&breakdown, &cfg.weights);

        debug!(
            "Valuation for {}: revenue {:.0}, EBITDA {:.0}, DCF {:.0}, VC {:.0}, weighted {:.0}",
            terminal.year,
            breakdown.revenue_multiple,
            breakdown.ebitda_multiple,
            breakdown.dcf,
            breakdown.vc_method,
            breakdown.weighted
        );

        breakdown
    }

    fn discounted_cash_flow(&self, projection: &[YearMetrics]) -> f64 {
        let r = self.config.discount_rate;
        let g = self.config.terminal_growth_rate;

        let explicit: f64 = projection
            .iter()
            .enumerate()
            .map(|(idx, year)| present_value(year.ebitda(), r, idx as i32 + 1))
            .sum();

        let horizon = projection.len() as i32;
        let final_cash_flow = projection.last().map(|y| y.ebitda()).unwrap_or(0.0);
        let terminal_value = safe_divide(final_cash_flow * (1.0 + g), r - g, 0.0);

        explicit + present_value(terminal_value, r, horizon)
    }
}

/// `cash_flow / (1 + rate)^period`, zero when the factor degenerates.
pub fn present_value(cash_flow: f64, rate: f64, period: i32) -> f64 {
    safe_divide(cash_flow, (1.0 + rate).powi(period), 0.0)
}

pub fn weighted_valuation(values: &ValuationBreakdown, weights: &ValuationWeights) -> f64 {
    values.revenue_multiple * weights.revenue_multiple
        + values.ebitda_multiple * weights.ebitda_multiple
        + values.dcf * weights.dcf
        + values.vc_method * weights.vc_method
}

pub fn compute_valuations(
    projection: &[YearMetrics],
    config: &ValuationConfig,
) -> ValuationBreakdown {
    ValuationBlender::new(*config).value(projection)
}

/// Multiple on invested capital. Zero investment yields 0.
pub fn compute_moic(company_valuation: f64, equity_percentage: f64, investment_amount: f64) -> f64 {
    safe_divide(company_valuation * equity_percentage, investment_amount, 0.0)
}

pub fn build_exit_plan(
    projection: &[YearMetrics],
    deal: &DealTerms,
    config: &ValuationConfig,
) -> ExitPlan {
    let blender = ValuationBlender::new(*config);

    let years: Vec<ExitPlanYear> = projection
        .iter()
        .enumerate()
        .map(|(idx, metrics)| {
            let valuations = blender.value(&projection[..=idx]);
            ExitPlanYear {
                year: metrics.year,
                revenue: metrics.revenue,
                expenses: metrics.expenses,
                net_profit: metrics.ebitda(),
                company_valuation: valuations.weighted,
                valuations,
            }
        })
        .collect();

    let moic_at = |horizon: usize| {
        years
            .get(horizon - 1)
            .map(|y| {
                compute_moic(
                    y.company_valuation,
                    deal.equity_percentage,
                    deal.investment_amount,
                )
            })
            .unwrap_or(0.0)
    };

    let moic_3_year = moic_at(3);
    let moic_5_year = moic_at(5);

    ExitPlan {
        years,
        moic_3_year,
        moic_5_year,
    }
}

/// Splits an exit between investor and founders under a non-participating
/// liquidation preference: the investor takes the larger of the preference
/// and the pro-rata stake, never more than the exit itself.
pub fn compute_exit_waterfall(exit_value: f64, deal: &DealTerms) -> ExitWaterfall {
    let exit_value = exit_value.max(0.0);
    let preference = (deal.investment_amount * deal.liquidation_preference).max(0.0);
    let pro_rata = exit_value * deal.equity_percentage;

    let investor_payout = preference.max(pro_rata).min(exit_value);

    ExitWaterfall {
        exit_value,
        investor_payout,
        founder_payout: exit_value - investor_payout,
        investor_moic: safe_divide(investor_payout, deal.investment_amount, 0.0),
        preference_applied: preference > pro_rata && exit_value > 0.0,
    }
}
