use std::collections::HashMap;

use crate::financials::MonthlyFinancialRecord;
use crate::sampling::round4;
use crate::types::YearMonth;

/// Relative change from `prev` to `cur`, rounded to 4 places. A missing or
/// zero prior value yields 0.0.
fn relative_change(cur: i64, prev: Option<i64>) -> f64 {
    match prev {
        Some(p) if p != 0 => round4((cur - p) as f64 / p as f64),
        _ => 0.0,
    }
}

/// Fill the month-over-month and year-over-year revenue and EBITDA deltas.
///
/// Records are matched on `(location, year, month)` regardless of their order
/// in the slice; only the four `*_change` fields are written.
pub fn apply_period_deltas(records: &mut [MonthlyFinancialRecord]) {
    let index: HashMap<(String, YearMonth), (i64, i64)> = records
        .iter()
        .filter_map(|r| Some(((r.location_id.clone(), r.year_month()?), (r.total_revenue, r.ebitda))))
        .collect();

    let mut filled = 0usize;
    for record in records.iter_mut() {
        let Some(ym) = record.year_month() else {
            tracing::warn!(financial_id = %record.financial_id, "record has no valid period, deltas left unset");
            continue;
        };
        let lookup = |at: YearMonth| index.get(&(record.location_id.clone(), at)).copied();
        let prev_month = ym.prev().and_then(lookup);
        let prev_year = ym.year_ago().and_then(lookup);

        record.revenue_mom_change = relative_change(record.total_revenue, prev_month.map(|(r, _)| r));
        record.ebitda_mom_change = relative_change(record.ebitda, prev_month.map(|(_, e)| e));
        record.revenue_yoy_change = relative_change(record.total_revenue, prev_year.map(|(r, _)| r));
        record.ebitda_yoy_change = relative_change(record.ebitda, prev_year.map(|(_, e)| e));
        if prev_month.is_some() {
            filled += 1;
        }
    }
    tracing::debug!(records = records.len(), with_prior_month = filled, "period deltas applied");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(loc: &str, year: i32, month: u32, revenue: i64, ebitda: i64) -> MonthlyFinancialRecord {
        MonthlyFinancialRecord {
            location_id: loc.to_string(),
            year,
            month,
            total_revenue: revenue,
            ebitda,
            ..Default::default()
        }
    }

    #[test]
    fn month_over_month_on_consecutive_records() {
        let mut rs = vec![
            record("LOC001", 2021, 3, 200_000, 40_000),
            record("LOC001", 2021, 4, 210_000, 30_000),
        ];
        apply_period_deltas(&mut rs);
        assert_eq!(rs[0].revenue_mom_change, 0.0);
        assert!((rs[1].revenue_mom_change - 0.05).abs() < 1e-4);
        assert!((rs[1].ebitda_mom_change - (-0.25)).abs() < 1e-4);
        assert_eq!(rs[1].revenue_yoy_change, 0.0);
    }

    #[test]
    fn year_over_year_matches_same_month() {
        let mut rs = vec![
            record("LOC002", 2021, 6, 150_000, 20_000),
            record("LOC002", 2022, 6, 165_000, 25_000),
        ];
        apply_period_deltas(&mut rs);
        assert!((rs[1].revenue_yoy_change - 0.1).abs() < 1e-4);
        assert!((rs[1].ebitda_yoy_change - 0.25).abs() < 1e-4);
        // Not adjacent months.
        assert_eq!(rs[1].revenue_mom_change, 0.0);
    }

    #[test]
    fn january_looks_back_to_december() {
        let mut rs = vec![
            record("LOC001", 2023, 1, 180_000, 36_000),
            record("LOC001", 2022, 12, 200_000, 40_000),
        ];
        apply_period_deltas(&mut rs);
        assert!((rs[0].revenue_mom_change - (-0.1)).abs() < 1e-4);
        assert!((rs[0].ebitda_mom_change - (-0.1)).abs() < 1e-4);
    }

    #[test]
    fn zero_prior_value_leaves_delta_at_zero() {
        let mut rs = vec![
            record("LOC003", 2020, 1, 100_000, 0),
            record("LOC003", 2020, 2, 110_000, 5_000),
        ];
        apply_period_deltas(&mut rs);
        assert!((rs[1].revenue_mom_change - 0.1).abs() < 1e-4);
        assert_eq!(rs[1].ebitda_mom_change, 0.0);
    }

    #[test]
    fn locations_do_not_cross() {
        let mut rs = vec![
            record("LOC001", 2021, 1, 200_000, 40_000),
            record("LOC002", 2021, 2, 150_000, 30_000),
        ];
        apply_period_deltas(&mut rs);
        assert!(rs.iter().all(|r| r.revenue_mom_change == 0.0 && r.ebitda_mom_change == 0.0));
    }

    #[test]
    fn deltas_are_rounded_to_four_places() {
        let mut rs = vec![
            record("LOC001", 2021, 1, 300_000, 30_000),
            record("LOC001", 2021, 2, 400_000, 40_000),
        ];
        apply_period_deltas(&mut rs);
        assert_eq!(rs[1].revenue_mom_change, 0.3333);
    }

    #[test]
    fn invalid_period_is_skipped() {
        let mut rs = vec![
            record("LOC001", 2021, 1, 200_000, 40_000),
            record("LOC001", 2021, 13, 220_000, 44_000),
            record("LOC001", 2021, 2, 210_000, 42_000),
        ];
        apply_period_deltas(&mut rs);
        assert_eq!(rs[1].revenue_mom_change, 0.0);
        assert!((rs[2].revenue_mom_change - 0.05).abs() < 1e-4);
    }
}
