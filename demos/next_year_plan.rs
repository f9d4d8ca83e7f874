use financial_scenario_engine::*;

fn main() {
    println!("📈 Next-Year Planning Demo\n");

    let reference = SimulationScenario {
        base_year: 2024,
        target_year: 2025,
        revenues: vec![
            ProjectionItem::new("Managed Services", 420_000.0, 500_000.0),
            ProjectionItem::new("Project Work", 310_000.0, 350_000.0),
            ProjectionItem::new("Training", 120_000.0, 150_000.0),
        ],
        expenses: vec![
            ProjectionItem::new("Salaries", 520_000.0, 560_000.0),
            ProjectionItem::new("Office", 60_000.0, 60_000.0),
            ProjectionItem::new("Marketing", 40_000.0, 80_000.0),
        ],
        investments: vec![],
        assumed_exchange_rate: 1.0,
        scenario_type: ScenarioType::Positive,
    };

    // Upstream projection claiming only 1.5% growth.
    let projection_json = r#"{
        "summary": { "total_revenue": 1015000, "total_expenses": 720000 },
        "quarterly": {
            "q1": { "revenue": 220000, "expenses": 175000 },
            "q2": { "revenue": 250000, "expenses": 180000 },
            "q3": { "revenue": 245000, "expenses": 180000 },
            "q4": { "revenue": 300000, "expenses": 185000 }
        }
    }"#;

    let planner = match FinancialPlanner::new(PlannerConfig::default()) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("❌ Invalid configuration: {}", e);
            return;
        }
    };

    let projection = match NextYearProjection::from_json(projection_json) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("❌ Could not read projection: {}", e);
            return;
        }
    };

    let focus = vec!["Managed Services".to_string()];
    let plan = planner.next_year(&reference, &projection, &focus);

    println!("📋 Targets:");
    println!(
        "  Supplied revenue: ${:>12.0} ({:.1}% growth)",
        plan.growth.supplied.revenue,
        plan.growth.supplied_revenue_growth * 100.0
    );
    println!("  Used revenue:     ${:>12.0}", plan.growth.targets.revenue);
    println!("  Used expenses:    ${:>12.0}", plan.growth.targets.expenses);
    if plan.growth.fallback_applied {
        println!("  ⚠️  Growth floor applied");
    }

    println!("\n🧾 Revenue lines for {}:", plan.scenario.target_year);
    for item in &plan.scenario.revenues {
        let q = item.projected_quarterly.unwrap_or_default();
        println!(
            "  {:<18} base ${:>10.0} -> ${:>10.0}  [Q1 {:>9.0} | Q2 {:>9.0} | Q3 {:>9.0} | Q4 {:>9.0}]",
            item.category, item.base_amount, item.projected_amount, q.q1, q.q2, q.q3, q.q4
        );
    }

    let working_capital = WorkingCapitalConfig {
        ar_days: 40,
        inventory_days: None,
        ap_days: 20,
    };
    let analysis = planner.analyze(&plan.scenario, 25_000.0, &working_capital);

    println!("\n💧 Cash:");
    println!("  CCC:                 {} days", analysis.cash_conversion_cycle);
    println!(
        "  Net working capital: ${:>10.0}",
        analysis.working_capital.net_working_capital
    );
    println!(
        "  Lowest balance:      ${:>10.0} ({})",
        analysis.capital_need.min_cumulative_cash,
        analysis
            .capital_need
            .critical_period
            .as_deref()
            .unwrap_or("n/a")
    );
    println!(
        "  Bridge needed:       ${:>10.0}",
        analysis.capital_need.required_investment
    );

    let exit = planner.exit_plan(
        &[
            year_metrics(&reference),
            year_metrics(&plan.scenario),
            YearMetrics::new(2027, 1_500_000.0, 1_050_000.0),
            YearMetrics::new(2028, 1_850_000.0, 1_250_000.0),
            YearMetrics::new(2029, 2_200_000.0, 1_420_000.0),
        ],
        &DealTerms::new(300_000.0, 0.12),
    );

    println!("\n💰 Exit plan:");
    for year in &exit.years {
        println!(
            "  {}: valuation ${:>12.0}",
            year.year, year.company_valuation
        );
    }
    println!("  MOIC 3y: {:.2}x   MOIC 5y: {:.2}x", exit.moic_3_year, exit.moic_5_year);
}
