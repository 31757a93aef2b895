//! Console rendering of invariant checks and summary tables, shared by the
//! generator and `summarize` binaries.

use chrono::NaiveDate;

use crate::analysis::{self, AppointmentViolation, FinancialViolation};
use crate::appointments::AppointmentRow;
use crate::financials::MonthlyFinancialRecord;

/// Print PASS/FAIL per invariant, any violations, then the summary tables.
pub fn print_report(
    rows: &[AppointmentRow],
    records: &[MonthlyFinancialRecord],
    start: NaiveDate,
    end: NaiveDate,
) {
    // ── Appointment invariants ────────────────────────────────────────────────
    let violations = analysis::verify_appointments(rows, start, end);
    let inv = |variant: fn(&AppointmentViolation) -> bool| {
        if violations.iter().any(variant) { "FAIL" } else { "PASS" }
    };

    println!("\n=== Appointment invariants ===");
    println!("  [1] Covered + responsibility = charged:  {}", inv(|v| matches!(v, AppointmentViolation::CoverageSplit { .. })));
    println!("  [2] Discount + out-of-pocket = resp.:    {}", inv(|v| matches!(v, AppointmentViolation::DiscountSplit { .. })));
    println!("  [3] Service date inside horizon:         {}", inv(|v| matches!(v, AppointmentViolation::DateOutOfRange { .. })));
    println!("  [4] Insured coverage in [0.5, 0.95]:     {}", inv(|v| matches!(v, AppointmentViolation::CoverageOutOfBand { .. })));
    println!("  [5] Self-pay carries no insurer money:   {}", inv(|v| matches!(v, AppointmentViolation::SelfPayWithCoverage { .. })));
    println!("  [6] Non-completed rows blank:            {}", inv(|v| matches!(v, AppointmentViolation::NonCompletedHasFinancials { .. })));
    println!("  [7] Rows ascending by service date:      {}", inv(|v| matches!(v, AppointmentViolation::OutOfOrder { .. })));
    println!("  [8] One new-patient visit per patient:   {}", inv(|v| matches!(v, AppointmentViolation::RepeatedNewPatient { .. })));
    print_violations(&violations);

    // ── Financial invariants ──────────────────────────────────────────────────
    let fin_violations = analysis::verify_financials(records);
    let finv = |variant: fn(&FinancialViolation) -> bool| {
        if fin_violations.iter().any(variant) { "FAIL" } else { "PASS" }
    };

    println!("\n=== Financial invariants ===");
    println!("  [9]  Revenue categories = total:         {}", finv(|v| matches!(v, FinancialViolation::RevenueCategories { .. })));
    println!("  [10] Payor mix = total revenue:          {}", finv(|v| matches!(v, FinancialViolation::PayorMix { .. })));
    println!("  [11] Expense lines = total expenses:     {}", finv(|v| matches!(v, FinancialViolation::ExpenseTotal { .. })));
    println!("  [12] EBITDA = revenue − expenses:        {}", finv(|v| matches!(v, FinancialViolation::Ebitda { .. })));
    println!("  [13] Valid, unique location-months:      {}", finv(|v| matches!(v, FinancialViolation::DuplicateMonth { .. } | FinancialViolation::InvalidPeriod { .. })));
    println!("  [14] No missing location-months:         {}", finv(|v| matches!(v, FinancialViolation::MissingMonth { .. } | FinancialViolation::ShortSeries { .. })));
    print_violations(&fin_violations);

    print_summaries(rows, records);
}

fn print_violations<V: std::fmt::Display>(violations: &[V]) {
    if violations.is_empty() {
        println!("  All invariants: PASS");
    } else {
        println!("\n  {} violation(s):", violations.len());
        for v in violations.iter().take(20) {
            println!("    {v}");
        }
        if violations.len() > 20 {
            println!("    … {} more", violations.len() - 20);
        }
    }
}

pub fn print_summaries(
    rows: &[AppointmentRow],
    records: &[MonthlyFinancialRecord],
) {
    let years = analysis::summarize_appointments(rows);
    println!("\n=== Appointments by year ===");
    println!(
        "{:>4} | {:>6} | {:>6} | {:>6} | {:>5} | {:>11} | {:>11} | {:>11} | {:>6}",
        "Year", "Visits", "Rows", "Compl%", "New#", "Charged", "Insurer", "Paid", "Ins%"
    );
    println!("{}", "-".repeat(92));
    for y in &years {
        println!(
            "{:>4} | {:>6} | {:>6} | {:>5.1}% | {:>5} | {:>11} | {:>11} | {:>11} | {:>5.1}%",
            y.year,
            y.visits,
            y.procedure_rows,
            y.completion_rate() * 100.0,
            y.new_patient_visits,
            y.charged,
            y.insurance_covered,
            y.amount_paid,
            y.insurer_share() * 100.0,
        );
    }

    let locations = analysis::summarize_financials(records);
    println!("\n=== Financials by location ===");
    println!(
        "{:>6} | {:<24} | {:>6} | {:>7} | {:>13} | {:>13} | {:>12} | {:>7}",
        "Loc", "Name", "Months", "From", "Revenue", "Expenses", "EBITDA", "Margin%"
    );
    println!("{}", "-".repeat(108));
    for l in &locations {
        println!(
            "{:>6} | {:<24} | {:>6} | {:>7} | {:>13} | {:>13} | {:>12} | {:>6.1}%",
            l.location_id,
            l.location_name,
            l.months,
            l.first_period,
            l.revenue,
            l.expenses,
            l.ebitda,
            l.ebitda_margin() * 100.0,
        );
    }
}
