use chrono::{Datelike, Days, NaiveDate};

/// Divides `numerator` by `denominator`, returning `default` when the denominator
/// is zero or the quotient is not finite.
pub fn safe_divide(numerator: f64, denominator: f64, default: f64) -> f64 {
    if denominator == 0.0 {
        return default;
    }
    let quotient = numerator / denominator;
    if quotient.is_finite() {
        quotient
    } else {
        default
    }
}

/// Year-over-year growth as a fraction (0.2 = 20%). Zero base yields 0.
pub fn growth_rate(base: f64, projected: f64) -> f64 {
    safe_divide(projected - base, base, 0.0)
}

/// Profit over revenue as a percentage.
pub fn profit_margin(revenue: f64, profit: f64) -> f64 {
    safe_divide(profit, revenue, 0.0) * 100.0
}

/// Percentage difference of `current` against `reference`.
pub fn diff_percent(reference: f64, current: f64) -> f64 {
    safe_divide(current - reference, reference.abs(), 0.0) * 100.0
}

pub fn round_currency(value: f64) -> f64 {
    value.round()
}

/// Splits `total` across buckets in proportion to `ratios`.
///
/// Rounds the running cumulative share to whole currency units and hands each
/// bucket the step between consecutive rounded marks. The last weighted bucket
/// takes the residual, so the buckets always sum back to `total`, a zero ratio
/// always gets exactly 0 and no bucket has the opposite sign of `total`.
/// Negative ratios count as zero; when no ratio is positive the split is even.
pub fn distribute_by_ratios(total: f64, ratios: &[f64]) -> Vec<f64> {
    let n = ratios.len();
    if n == 0 {
        return Vec::new();
    }

    let clean: Vec<f64> = ratios
        .iter()
        .map(|r| if r.is_finite() && *r > 0.0 { *r } else { 0.0 })
        .collect();
    let ratio_sum: f64 = clean.iter().sum();

    let weights: Vec<f64> = if ratio_sum > 0.0 {
        clean.iter().map(|r| r / ratio_sum).collect()
    } else {
        vec![1.0 / n as f64; n]
    };

    let last = weights.iter().rposition(|w| *w > 0.0).unwrap_or(n - 1);
    let (low, high) = (total.min(0.0), total.max(0.0));

    let mut buckets = vec![0.0; n];
    let mut cumulative = 0.0;
    let mut allocated = 0.0;
    for (bucket, weight) in buckets.iter_mut().zip(&weights[..last]) {
        cumulative += weight;
        let mark = round_currency(total * cumulative).clamp(low, high);
        *bucket = mark - allocated;
        allocated = mark;
    }
    buckets[last] = total - allocated;

    buckets
}

/// Calendar quarter (1..=4) containing `month` (1..=12).
pub fn quarter_of_month(month: u32) -> u32 {
    (month.clamp(1, 12) - 1) / 3 + 1
}

pub fn quarter_label(quarter: u32, year: i32) -> String {
    format!("Q{} {}", quarter, year)
}

/// Label for the 1-based `week` of a forecast whose first week starts on `start`.
pub fn week_label(week: u32, start: NaiveDate) -> String {
    let offset = u64::from(week.saturating_sub(1)) * 7;
    let week_start = start.checked_add_days(Days::new(offset)).unwrap_or(start);
    format!("W{} ({})", week, week_start.format("%b %d"))
}

/// Monday on or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let back = u64::from(date.weekday().num_days_from_monday());
    date.checked_sub_days(Days::new(back)).unwrap_or(date)
}
