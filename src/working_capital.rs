use crate::config::WorkingCapitalSettings;
use crate::schema::WorkingCapitalConfig;
use crate::utils::safe_divide;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetWorkingCapital {
    pub accounts_receivable: f64,
    pub accounts_payable: f64,
    pub inventory: f64,
    pub net_working_capital: f64,
}

pub struct WorkingCapitalEngine {
    settings: WorkingCapitalSettings,
}

impl WorkingCapitalEngine {
    pub fn new(settings: WorkingCapitalSettings) -> Self {
        Self { settings }
    }

    /// Days between paying for inputs and collecting on sales. Negative is favorable.
    pub fn cash_conversion_cycle(&self, config: &WorkingCapitalConfig) -> i32 {
        let (ar_days, inventory_days, ap_days) = effective_days(config);
        ar_days.saturating_add(inventory_days).saturating_sub(ap_days)
    }

    pub fn net_working_capital(
        &self,
        annual_revenue: f64,
        annual_expenses: f64,
        config: &WorkingCapitalConfig,
    ) -> NetWorkingCapital {
        let (ar_days, inventory_days, ap_days) = effective_days(config);
        let days = self.settings.days_in_year;

        let accounts_receivable = safe_divide(annual_revenue * f64::from(ar_days), days, 0.0);
        let accounts_payable = safe_divide(annual_expenses * f64::from(ap_days), days, 0.0);
        let inventory = safe_divide(annual_expenses * f64::from(inventory_days), days, 0.0);

        let result = NetWorkingCapital {
            accounts_receivable,
            accounts_payable,
            inventory,
            net_working_capital: accounts_receivable + inventory - accounts_payable,
        };

        debug!(
            "Working capital: AR {:.2}, inventory {:.2}, AP {:.2}, NWC {:.2}",
            result.accounts_receivable,
            result.inventory,
            result.accounts_payable,
            result.net_working_capital
        );

        result
    }

    /// Average daily spend, i.e. what one extra day of CCC ties up.
    pub fn cash_tied_up_per_day(&self, annual_expenses: f64) -> f64 {
        safe_divide(annual_expenses, self.settings.days_in_year, 0.0)
    }
}

impl Default for WorkingCapitalEngine {
    fn default() -> Self {
        Self::new(WorkingCapitalSettings::default())
    }
}

/// Change in NWC between two years. Positive means cash absorbed.
pub fn working_capital_delta(previous: &NetWorkingCapital, next: &NetWorkingCapital) -> f64 {
    next.net_working_capital - previous.net_working_capital
}

pub fn calculate_cash_conversion_cycle(config: &WorkingCapitalConfig) -> i32 {
    WorkingCapitalEngine::default().cash_conversion_cycle(config)
}

pub fn calculate_net_working_capital(
    annual_revenue: f64,
    annual_expenses: f64,
    config: &WorkingCapitalConfig,
) -> NetWorkingCapital {
    WorkingCapitalEngine::default().net_working_capital(annual_revenue, annual_expenses, config)
}

fn effective_days(config: &WorkingCapitalConfig) -> (i32, i32, i32) {
    let clamp = |name: &str, value: i32| {
        if value < 0 {
            warn!("Negative {} ({}) clamped to 0", name, value);
            0
        } else {
            value
        }
    };

    (
        clamp("ar_days", config.ar_days),
        clamp("inventory_days", config.inventory_days.unwrap_or(0)),
        clamp("ap_days", config.ap_days),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(ar: i32, inv: Option<i32>, ap: i32) -> WorkingCapitalConfig {
        WorkingCapitalConfig {
            ar_days: ar,
            inventory_days: inv,
            ap_days: ap,
        }
    }

    #[test]
    fn test_ccc_formula() {
        assert_eq!(calculate_cash_conversion_cycle(&config(45, Some(30), 20)), 55);
        assert_eq!(calculate_cash_conversion_cycle(&config(45, None, 20)), 25);
    }

    #[test]
    fn test_ccc_can_be_negative() {
        assert_eq!(calculate_cash_conversion_cycle(&config(5, None, 60)), -55);
    }

    #[test]
    fn test_ccc_saturates_on_extreme_day_counts() {
        assert_eq!(calculate_cash_conversion_cycle(&config(i32::MAX, Some(10), 0)), i32::MAX);
        assert_eq!(calculate_cash_conversion_cycle(&config(i32::MAX, Some(10), 20)), i32::MAX - 20);
        assert_eq!(calculate_cash_conversion_cycle(&config(0, None, i32::MAX)), -i32::MAX);
    }

    #[test]
    fn test_negative_days_are_clamped() {
        assert_eq!(calculate_cash_conversion_cycle(&config(-10, Some(-5), 30)), -30);
        assert_eq!(calculate_cash_conversion_cycle(&config(30, None, -10)), 30);
    }

    #[test]
    fn test_nwc_components() {
        let nwc = calculate_net_working_capital(365_000.0, 730_000.0, &config(30, Some(10), 20));
        assert!((nwc.accounts_receivable - 30_000.0).abs() < 1e-9);
        assert!((nwc.inventory - 20_000.0).abs() < 1e-9);
        assert!((nwc.accounts_payable - 40_000.0).abs() < 1e-9);
        assert!((nwc.net_working_capital - 10_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_nwc_zero_flows_are_zero() {
        for cfg in [config(0, None, 0), config(90, Some(45), 30), config(10, None, 120)] {
            let nwc = calculate_net_working_capital(0.0, 0.0, &cfg);
            assert_eq!(nwc, NetWorkingCapital::default());
        }
    }

    #[test]
    fn test_nwc_without_inventory() {
        let nwc = calculate_net_working_capital(365_000.0, 365_000.0, &config(30, None, 30));
        assert_eq!(nwc.inventory, 0.0);
        assert!(nwc.net_working_capital.abs() < 1e-9);
    }

    #[test]
    fn test_360_day_basis() {
        let engine = WorkingCapitalEngine::new(WorkingCapitalSettings {
            days_in_year: 360.0,
        });
        let nwc = engine.net_working_capital(360_000.0, 0.0, &config(30, None, 0));
        assert!((nwc.accounts_receivable - 30_000.0).abs() < 1e-9);
        assert!((engine.cash_tied_up_per_day(720_000.0) - 2_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_working_capital_delta() {
        let previous = calculate_net_working_capital(365_000.0, 0.0, &config(30, None, 0));
        let next = calculate_net_working_capital(730_000.0, 0.0, &config(30, None, 0));
        assert!((working_capital_delta(&previous, &next) - 30_000.0).abs() < 1e-9);
    }
}
