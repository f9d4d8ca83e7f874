//! Next-year scenario generation from a reference scenario.
//!
//! Last year's projection becomes this year's base. The new projected totals are
//! spread over the line items (evenly by share, or concentrated on focus
//! projects) and each item is split into quarters from a seasonal shape.

use crate::config::GrowthFloorPolicy;
use crate::schema::{
    NextYearProjection, ProjectionItem, QuarterlyAmounts, QuarterlyRatios, ScenarioType,
    SimulationScenario, TargetTotals,
};
use crate::utils::{distribute_by_ratios, growth_rate, round_currency};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// Seasonal shapes for the new year's revenue and expense lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRatios {
    pub revenue: QuarterlyRatios,
    pub expenses: QuarterlyRatios,
}

impl ScenarioRatios {
    pub fn from_projection(projection: &NextYearProjection) -> Self {
        Self {
            revenue: projection.revenue_ratios(),
            expenses: projection.expense_ratios(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthFloorOutcome {
    /// Totals as received from upstream.
    pub supplied: TargetTotals,
    /// Totals actually used.
    pub targets: TargetTotals,
    /// Revenue growth implied by the supplied totals.
    pub supplied_revenue_growth: f64,
    pub fallback_applied: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarryForwardResult {
    pub revenues: Vec<ProjectionItem>,
    pub expenses: Vec<ProjectionItem>,
    pub growth: GrowthFloorOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextYearPlan {
    pub scenario: SimulationScenario,
    pub growth: GrowthFloorOutcome,
}

/// Replaces implausibly low projected growth with the policy floor.
///
/// A reference year without revenue gives nothing to measure growth against,
/// so the supplied totals are kept.
pub fn apply_growth_floor(
    reference_revenue: f64,
    reference_expenses: f64,
    supplied: TargetTotals,
    policy: &GrowthFloorPolicy,
) -> GrowthFloorOutcome {
    let supplied_revenue_growth = growth_rate(reference_revenue, supplied.revenue);

    let untouched = GrowthFloorOutcome {
        supplied,
        targets: supplied,
        supplied_revenue_growth,
        fallback_applied: false,
    };

    if !policy.enabled || reference_revenue <= 0.0 {
        return untouched;
    }
    if supplied_revenue_growth > policy.low_growth_threshold {
        return untouched;
    }

    let targets = TargetTotals {
        revenue: round_currency(reference_revenue * (1.0 + policy.revenue_growth_floor)),
        expenses: round_currency(reference_expenses * (1.0 + policy.expense_growth_floor())),
    };

    warn!(
        "Projected revenue growth {:.1}% is at or below {:.1}%; substituting floor: revenue {:.0} -> {:.0}, expenses {:.0} -> {:.0}",
        supplied_revenue_growth * 100.0,
        policy.low_growth_threshold * 100.0,
        supplied.revenue,
        targets.revenue,
        supplied.expenses,
        targets.expenses
    );

    GrowthFloorOutcome {
        supplied,
        targets,
        supplied_revenue_growth,
        fallback_applied: true,
    }
}

/// Splits an annual amount into whole-unit quarters that sum back to `annual`.
/// Quarters before `start_month` receive nothing.
pub fn split_quarterly(
    annual: f64,
    ratios: &QuarterlyRatios,
    start_month: Option<u32>,
) -> QuarterlyAmounts {
    let masked = ratios.masked_from(start_month);
    QuarterlyAmounts::from_slice(&distribute_by_ratios(annual, &masked.as_array()))
}

/// Re-derives an item's projected quarters from its annual projection.
pub fn rebalance_quarters(item: &mut ProjectionItem, ratios: &QuarterlyRatios) {
    item.projected_quarterly = Some(split_quarterly(
        item.projected_amount,
        ratios,
        item.start_month,
    ));
}

pub struct CarryForwardGenerator {
    policy: GrowthFloorPolicy,
}

impl CarryForwardGenerator {
    pub fn new(policy: GrowthFloorPolicy) -> Self {
        Self { policy }
    }

    pub fn carry_forward(
        &self,
        reference: &SimulationScenario,
        targets: TargetTotals,
        ratios: &ScenarioRatios,
        focus_projects: &[String],
    ) -> CarryForwardResult {
        let growth = apply_growth_floor(
            reference.total_projected_revenue(),
            reference.total_projected_expenses(),
            targets,
            &self.policy,
        );

        info!(
            "Carrying forward {} {:?} scenario: revenue target {:.0}, expense target {:.0}",
            reference.target_year,
            reference.scenario_type,
            growth.targets.revenue,
            growth.targets.expenses
        );

        let revenues = carry_forward_items(
            &reference.revenues,
            growth.targets.revenue,
            &ratios.revenue,
            focus_projects,
        );
        let expenses = carry_forward_items(
            &reference.expenses,
            growth.targets.expenses,
            &ratios.expenses,
            &[],
        );

        CarryForwardResult {
            revenues,
            expenses,
            growth,
        }
    }

    pub fn next_year(
        &self,
        reference: &SimulationScenario,
        projection: &NextYearProjection,
        focus_projects: &[String],
    ) -> NextYearPlan {
        let ratios = ScenarioRatios::from_projection(projection);
        let result = self.carry_forward(
            reference,
            projection.target_totals(),
            &ratios,
            focus_projects,
        );

        let scenario = SimulationScenario {
            base_year: reference.target_year,
            target_year: reference.target_year + 1,
            revenues: result.revenues,
            expenses: result.expenses,
            investments: Vec::new(),
            assumed_exchange_rate: reference.assumed_exchange_rate,
            scenario_type: reference.scenario_type,
        };

        NextYearPlan {
            scenario,
            growth: result.growth,
        }
    }
}

impl Default for CarryForwardGenerator {
    fn default() -> Self {
        Self::new(GrowthFloorPolicy::default())
    }
}

pub fn carry_forward_scenario(
    reference: &SimulationScenario,
    targets: TargetTotals,
    ratios: &ScenarioRatios,
    focus_projects: &[String],
    policy: &GrowthFloorPolicy,
) -> CarryForwardResult {
    CarryForwardGenerator::new(*policy).carry_forward(reference, targets, ratios, focus_projects)
}

pub fn build_next_year_scenario(
    reference: &SimulationScenario,
    projection: &NextYearProjection,
    focus_projects: &[String],
    policy: &GrowthFloorPolicy,
) -> NextYearPlan {
    CarryForwardGenerator::new(*policy).next_year(reference, projection, focus_projects)
}

/// Picks the scenario projecting `target_year`, preferring the positive variant.
pub fn select_reference_scenario(
    scenarios: &[SimulationScenario],
    target_year: i32,
) -> Option<&SimulationScenario> {
    let mut candidates = scenarios.iter().filter(|s| s.target_year == target_year);
    let first = candidates.next()?;
    if first.scenario_type == ScenarioType::Positive {
        return Some(first);
    }
    Some(
        candidates
            .find(|s| s.scenario_type == ScenarioType::Positive)
            .unwrap_or(first),
    )
}

fn carry_forward_items(
    reference_items: &[ProjectionItem],
    target_total: f64,
    ratios: &QuarterlyRatios,
    focus_projects: &[String],
) -> Vec<ProjectionItem> {
    if reference_items.is_empty() {
        return Vec::new();
    }

    let reference_amounts: Vec<f64> = reference_items.iter().map(|i| i.projected_amount).collect();
    let reference_total: f64 = reference_amounts.iter().sum();

    let focus_indices: Vec<usize> = reference_items
        .iter()
        .enumerate()
        .filter(|(_, item)| is_focus(&item.category, focus_projects))
        .map(|(idx, _)| idx)
        .collect();

    if !focus_projects.is_empty() && focus_indices.is_empty() {
        warn!(
            "None of the focus projects {:?} match a line item; allocating growth uniformly",
            focus_projects
        );
    }

    let new_amounts = if focus_indices.is_empty() {
        distribute_by_ratios(target_total, &reference_amounts)
    } else {
        let delta = target_total - reference_total;
        let focus_weights: Vec<f64> = focus_indices.iter().map(|&i| reference_amounts[i]).collect();
        let focus_growth = distribute_by_ratios(delta, &focus_weights);

        debug!(
            "Concentrating growth of {:.0} on {} focus item(s)",
            delta,
            focus_indices.len()
        );

        let mut amounts = reference_amounts;
        for (&idx, growth) in focus_indices.iter().zip(focus_growth) {
            amounts[idx] += growth;
        }
        amounts
    };

    reference_items
        .iter()
        .zip(new_amounts)
        .map(|(item, projected_amount)| ProjectionItem {
            category: item.category.clone(),
            base_amount: item.projected_amount,
            projected_amount,
            base_quarterly: item.projected_quarterly,
            projected_quarterly: Some(split_quarterly(projected_amount, ratios, None)),
            start_month: None,
        })
        .collect()
}

fn is_focus(category: &str, focus_projects: &[String]) -> bool {
    let category = category.trim();
    focus_projects
        .iter()
        .any(|f| f.trim().eq_ignore_ascii_case(category))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> SimulationScenario {
        SimulationScenario {
            base_year: 2024,
            target_year: 2025,
            revenues: vec![
                ProjectionItem::new("Product A", 500_000.0, 600_000.0),
                ProjectionItem::new("Product B", 350_000.0, 400_000.0),
            ],
            expenses: vec![
                ProjectionItem::new("Payroll", 450_000.0, 500_000.0),
                ProjectionItem::new("Rent", 100_000.0, 100_000.0),
            ],
            investments: vec![],
            assumed_exchange_rate: 1.0,
            scenario_type: ScenarioType::Positive,
        }
    }

    #[test]
    fn test_growth_floor_substitutes_low_growth() {
        let outcome = apply_growth_floor(
            1_000_000.0,
            600_000.0,
            TargetTotals {
                revenue: 1_020_000.0,
                expenses: 610_000.0,
            },
            &GrowthFloorPolicy::default(),
        );
        assert!(outcome.fallback_applied);
        assert_eq!(outcome.targets.revenue, 1_200_000.0);
        assert_eq!(outcome.targets.expenses, 672_000.0);
        assert_eq!(outcome.supplied.revenue, 1_020_000.0);
    }

    #[test]
    fn test_growth_floor_threshold_is_inclusive() {
        let outcome = apply_growth_floor(
            1_000_000.0,
            0.0,
            TargetTotals {
                revenue: 1_050_000.0,
                expenses: 0.0,
            },
            &GrowthFloorPolicy::default(),
        );
        assert!(outcome.fallback_applied);
    }

    #[test]
    fn test_growth_floor_keeps_plausible_growth() {
        let supplied = TargetTotals {
            revenue: 1_300_000.0,
            expenses: 700_000.0,
        };
        let outcome =
            apply_growth_floor(1_000_000.0, 600_000.0, supplied, &GrowthFloorPolicy::default());
        assert!(!outcome.fallback_applied);
        assert_eq!(outcome.targets, supplied);
    }

    #[test]
    fn test_growth_floor_disabled_or_no_reference() {
        let supplied = TargetTotals {
            revenue: 900_000.0,
            expenses: 700_000.0,
        };
        let disabled =
            apply_growth_floor(1_000_000.0, 600_000.0, supplied, &GrowthFloorPolicy::disabled());
        assert!(!disabled.fallback_applied);

        let no_reference = apply_growth_floor(0.0, 0.0, supplied, &GrowthFloorPolicy::default());
        assert!(!no_reference.fallback_applied);
        assert_eq!(no_reference.targets, supplied);
    }

    #[test]
    fn test_uniform_allocation_by_share() {
        let result = carry_forward_scenario(
            &reference(),
            TargetTotals {
                revenue: 1_200_000.0,
                expenses: 660_000.0,
            },
            &ScenarioRatios::default(),
            &[],
            &GrowthFloorPolicy::default(),
        );
        assert_eq!(result.revenues[0].base_amount, 600_000.0);
        assert_eq!(result.revenues[0].projected_amount, 720_000.0);
        assert_eq!(result.revenues[1].projected_amount, 480_000.0);
        assert_eq!(result.expenses[0].projected_amount, 550_000.0);
        assert_eq!(result.expenses[1].projected_amount, 110_000.0);
    }

    #[test]
    fn test_focus_project_absorbs_all_growth() {
        let result = carry_forward_scenario(
            &reference(),
            TargetTotals {
                revenue: 1_200_000.0,
                expenses: 600_000.0,
            },
            &ScenarioRatios::default(),
            &["product a".to_string()],
            &GrowthFloorPolicy::default(),
        );
        assert_eq!(result.revenues[0].projected_amount, 800_000.0);
        assert_eq!(result.revenues[1].projected_amount, 400_000.0);
    }

    #[test]
    fn test_unmatched_focus_falls_back_to_uniform() {
        let result = carry_forward_scenario(
            &reference(),
            TargetTotals {
                revenue: 1_200_000.0,
                expenses: 600_000.0,
            },
            &ScenarioRatios::default(),
            &["Product Z".to_string()],
            &GrowthFloorPolicy::default(),
        );
        assert_eq!(result.revenues[0].projected_amount, 720_000.0);
    }

    #[test]
    fn test_quarters_sum_to_annual() {
        let ratios = ScenarioRatios {
            revenue: QuarterlyRatios {
                q1: 0.13,
                q2: 0.29,
                q3: 0.31,
                q4: 0.27,
            },
            expenses: QuarterlyRatios {
                q1: 0.3,
                q2: 0.3,
                q3: 0.3,
                q4: 0.1,
            },
        };
        let result = carry_forward_scenario(
            &reference(),
            TargetTotals {
                revenue: 1_234_567.0,
                expenses: 777_777.0,
            },
            &ratios,
            &[],
            &GrowthFloorPolicy::default(),
        );
        for item in result.revenues.iter().chain(result.expenses.iter()) {
            let quarters = item.projected_quarterly.unwrap();
            assert_eq!(quarters.total(), item.projected_amount, "{}", item.category);
        }
        let revenue_total: f64 = result.revenues.iter().map(|i| i.projected_amount).sum();
        assert_eq!(revenue_total, 1_234_567.0);
    }

    #[test]
    fn test_split_quarterly_respects_start_month() {
        let split = split_quarterly(90_000.0, &QuarterlyRatios::even(), Some(5));
        assert_eq!(split.q1, 0.0);
        assert_eq!(split.total(), 90_000.0);
        assert_eq!(split.q2, 30_000.0);
    }

    #[test]
    fn test_rebalance_quarters() {
        let mut item = ProjectionItem::new("Consulting", 0.0, 100_001.0);
        rebalance_quarters(&mut item, &QuarterlyRatios::even());
        let quarters = item.projected_quarterly.unwrap();
        assert_eq!(quarters.as_array(), [25_000.0, 25_001.0, 25_000.0, 25_000.0]);
    }

    #[test]
    fn test_split_of_tiny_amount_has_no_negative_quarter() {
        let split = split_quarterly(2.0, &QuarterlyRatios::even(), None);
        assert!(split.as_array().iter().all(|q| *q >= 0.0), "{:?}", split);
        assert_eq!(split.total(), 2.0);

        let late = split_quarterly(1.0, &QuarterlyRatios::even(), Some(10));
        assert_eq!(late.as_array(), [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_discontinued_line_stays_at_zero() {
        let mut reference = reference();
        reference.revenues = vec![
            ProjectionItem::new("Product A", 400_000.0, 500_000.0),
            ProjectionItem::new("Product B", 400_000.0, 500_000.0),
            ProjectionItem::new("Discontinued", 80_000.0, 0.0),
        ];
        let result = carry_forward_scenario(
            &reference,
            TargetTotals {
                revenue: 1_200_005.0,
                expenses: 600_000.0,
            },
            &ScenarioRatios::default(),
            &[],
            &GrowthFloorPolicy::default(),
        );

        let discontinued = &result.revenues[2];
        assert_eq!(discontinued.projected_amount, 0.0);
        assert_eq!(
            discontinued.projected_quarterly,
            Some(QuarterlyAmounts::default())
        );

        assert_eq!(result.revenues[0].projected_amount, 600_003.0);
        assert_eq!(result.revenues[1].projected_amount, 600_002.0);
        let revenue_total: f64 = result.revenues.iter().map(|i| i.projected_amount).sum();
        assert_eq!(revenue_total, 1_200_005.0);
        for item in &result.revenues {
            let quarters = item.projected_quarterly.unwrap();
            assert!(quarters.as_array().iter().all(|q| *q >= 0.0));
            assert_eq!(quarters.total(), item.projected_amount);
        }
    }

    #[test]
    fn test_select_reference_prefers_positive() {
        let positive = reference();
        let negative = SimulationScenario {
            scenario_type: ScenarioType::Negative,
            ..reference()
        };
        let older = SimulationScenario {
            target_year: 2024,
            ..reference()
        };

        let scenarios = vec![older, negative.clone(), positive];
        let chosen = select_reference_scenario(&scenarios, 2025).unwrap();
        assert_eq!(chosen.scenario_type, ScenarioType::Positive);

        let only_negative = vec![negative];
        let chosen = select_reference_scenario(&only_negative, 2025).unwrap();
        assert_eq!(chosen.scenario_type, ScenarioType::Negative);

        assert!(select_reference_scenario(&scenarios, 2030).is_none());
    }

    #[test]
    fn test_next_year_shifts_years() {
        let projection = NextYearProjection::from_json(
            r#"{ "summary": { "total_revenue": 1300000, "total_expenses": 700000 } }"#,
        )
        .unwrap();
        let plan = build_next_year_scenario(
            &reference(),
            &projection,
            &[],
            &GrowthFloorPolicy::default(),
        );
        assert_eq!(plan.scenario.base_year, 2025);
        assert_eq!(plan.scenario.target_year, 2026);
        assert!(!plan.growth.fallback_applied);
        assert_eq!(plan.scenario.total_projected_revenue(), 1_300_000.0);
        assert_eq!(plan.scenario.total_base_revenue(), 1_000_000.0);
    }
}
