use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;

use crate::appointments::AppointmentRow;
use crate::financials::MonthlyFinancialRecord;
use crate::types::YearMonth;

/// Per-year tallies over the appointments file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct YearSummary {
    pub year: i32,
    /// Distinct Visit_IDs.
    pub visits: usize,
    pub procedure_rows: usize,
    pub completed_rows: usize,
    pub new_patient_visits: usize,
    pub charged: i64,
    pub insurance_covered: i64,
    pub discounts: i64,
    pub amount_paid: i64,
}

impl YearSummary {
    /// Share of charges paid by insurers. Zero if nothing was charged.
    pub fn insurer_share(&self) -> f64 {
        if self.charged == 0 { 0.0 } else { self.insurance_covered as f64 / self.charged as f64 }
    }

    pub fn completion_rate(&self) -> f64 {
        if self.procedure_rows == 0 { 0.0 } else { self.completed_rows as f64 / self.procedure_rows as f64 }
    }
}

/// Per-location totals over the monthly financials file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationSummary {
    pub location_id: String,
    pub location_name: String,
    pub months: usize,
    pub first_period: String,
    pub last_period: String,
    pub revenue: i64,
    pub expenses: i64,
    pub ebitda: i64,
}

impl LocationSummary {
    pub fn ebitda_margin(&self) -> f64 {
        if self.revenue == 0 { 0.0 } else { self.ebitda as f64 / self.revenue as f64 }
    }
}

pub fn summarize_appointments(rows: &[AppointmentRow]) -> Vec<YearSummary> {
    let mut by_year: BTreeMap<i32, YearSummary> = BTreeMap::new();
    let mut visits: HashMap<i32, HashSet<&str>> = HashMap::new();
    let mut new_visits: HashMap<i32, HashSet<&str>> = HashMap::new();

    for r in rows {
        let s = by_year.entry(r.year).or_insert_with(|| YearSummary { year: r.year, ..Default::default() });
        s.procedure_rows += 1;
        if r.is_completed() {
            s.completed_rows += 1;
        }
        s.charged += r.charged_amount;
        s.insurance_covered += r.insurance_covered_amount;
        s.discounts += r.discount_applied;
        s.amount_paid += r.amount_paid;
        visits.entry(r.year).or_default().insert(&r.visit_id);
        if r.is_new_patient {
            new_visits.entry(r.year).or_default().insert(&r.visit_id);
        }
    }
    for s in by_year.values_mut() {
        s.visits = visits.get(&s.year).map_or(0, HashSet::len);
        s.new_patient_visits = new_visits.get(&s.year).map_or(0, HashSet::len);
    }
    by_year.into_values().collect()
}

/// Totals per location, ordered by Location_ID.
pub fn summarize_financials(records: &[MonthlyFinancialRecord]) -> Vec<LocationSummary> {
    let mut by_loc: BTreeMap<&str, LocationSummary> = BTreeMap::new();
    for r in records {
        let s = by_loc.entry(&r.location_id).or_insert_with(|| LocationSummary {
            location_id: r.location_id.clone(),
            location_name: r.location_name.clone(),
            first_period: r.period.clone(),
            last_period: r.period.clone(),
            ..Default::default()
        });
        s.months += 1;
        s.revenue += r.total_revenue;
        s.expenses += r.total_expenses;
        s.ebitda += r.ebitda;
        if r.period < s.first_period {
            s.first_period = r.period.clone();
        }
        if r.period > s.last_period {
            s.last_period = r.period.clone();
        }
    }
    by_loc.into_values().collect()
}

// ── Appointment invariants ───────────────────────────────────────────────────

/// An invariant violation found in the appointments file.
#[derive(Debug, Clone, PartialEq)]
pub enum AppointmentViolation {
    /// covered + responsibility ≠ charged.
    CoverageSplit { procedure_id: String, charged: i64, covered: i64, responsibility: i64 },
    /// discount + out-of-pocket ≠ responsibility.
    DiscountSplit { procedure_id: String, responsibility: i64, discount: i64, out_of_pocket: i64 },
    /// Date_of_Service outside the generation horizon.
    DateOutOfRange { procedure_id: String, date: NaiveDate },
    /// Insured completed row whose coverage rate is outside [0.5, 0.95]
    /// beyond what whole-dollar rounding explains.
    CoverageOutOfBand { procedure_id: String, rate: f64 },
    /// Self-pay row with insurer money or a claim attached.
    SelfPayWithCoverage { procedure_id: String },
    /// Non-completed row carrying any financial, claim, or plan data.
    NonCompletedHasFinancials { procedure_id: String },
    /// Rows are not ascending by Date_of_Service.
    OutOfOrder { procedure_id: String },
    /// A patient flagged new on more than one visit.
    RepeatedNewPatient { patient_id: String, visits: usize },
}

impl std::fmt::Display for AppointmentViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CoverageSplit { procedure_id, charged, covered, responsibility } => {
                write!(f, "CoverageSplit proc={procedure_id}: charged={charged} covered={covered} responsibility={responsibility}")
            }
            Self::DiscountSplit { procedure_id, responsibility, discount, out_of_pocket } => {
                write!(f, "DiscountSplit proc={procedure_id}: responsibility={responsibility} discount={discount} oop={out_of_pocket}")
            }
            Self::DateOutOfRange { procedure_id, date } => {
                write!(f, "DateOutOfRange proc={procedure_id}: date={date}")
            }
            Self::CoverageOutOfBand { procedure_id, rate } => {
                write!(f, "CoverageOutOfBand proc={procedure_id}: rate={rate:.4}")
            }
            Self::SelfPayWithCoverage { procedure_id } => write!(f, "SelfPayWithCoverage proc={procedure_id}"),
            Self::NonCompletedHasFinancials { procedure_id } => {
                write!(f, "NonCompletedHasFinancials proc={procedure_id}")
            }
            Self::OutOfOrder { procedure_id } => write!(f, "OutOfOrder proc={procedure_id}"),
            Self::RepeatedNewPatient { patient_id, visits } => {
                write!(f, "RepeatedNewPatient patient={patient_id}: visits={visits}")
            }
        }
    }
}

fn has_any_financials(r: &AppointmentRow) -> bool {
    r.charged_amount != 0
        || r.insurance_covered_amount != 0
        || r.patient_responsibility != 0
        || r.discount_applied != 0
        || r.out_of_pocket != 0
        || r.amount_paid != 0
        || r.estimated_total_cost != 0
        || r.tooth_number.is_some()
        || r.payment_method.is_some()
        || r.payment_status.is_some()
        || r.insurance_claim_status.is_some()
        || r.insurance_claim_submission_date.is_some()
        || r.insurance_claim_payment_date.is_some()
        || r.treatment_plan_id.is_some()
        || r.treatment_plan_creation_date.is_some()
        || r.treatment_plan_completion_date.is_some()
        || r.treatment_plan_completion_rate.is_some()
}

/// Check every appointment-row invariant. Returns one item per violation.
pub fn verify_appointments(rows: &[AppointmentRow], start: NaiveDate, end: NaiveDate) -> Vec<AppointmentViolation> {
    let mut out = Vec::new();
    let mut prev_date: Option<NaiveDate> = None;
    let mut new_visits: HashMap<&str, HashSet<&str>> = HashMap::new();

    for r in rows {
        let pid = || r.procedure_id.clone();

        if r.date_of_service < start || r.date_of_service > end {
            out.push(AppointmentViolation::DateOutOfRange { procedure_id: pid(), date: r.date_of_service });
        }
        if prev_date.is_some_and(|d| r.date_of_service < d) {
            out.push(AppointmentViolation::OutOfOrder { procedure_id: pid() });
        }
        prev_date = Some(r.date_of_service);

        if r.is_new_patient {
            new_visits.entry(&r.patient_id).or_default().insert(&r.visit_id);
        }

        if !r.is_completed() {
            if has_any_financials(r) {
                out.push(AppointmentViolation::NonCompletedHasFinancials { procedure_id: pid() });
            }
            continue;
        }

        if r.insurance_covered_amount + r.patient_responsibility != r.charged_amount {
            out.push(AppointmentViolation::CoverageSplit {
                procedure_id: pid(),
                charged: r.charged_amount,
                covered: r.insurance_covered_amount,
                responsibility: r.patient_responsibility,
            });
        }
        if r.discount_applied + r.out_of_pocket != r.patient_responsibility {
            out.push(AppointmentViolation::DiscountSplit {
                procedure_id: pid(),
                responsibility: r.patient_responsibility,
                discount: r.discount_applied,
                out_of_pocket: r.out_of_pocket,
            });
        }

        if r.is_insured() {
            if r.charged_amount > 0 {
                let charged = r.charged_amount as f64;
                let rate = r.insurance_covered_amount as f64 / charged;
                let slack = 0.5 / charged;
                if rate < 0.5 - slack || rate > 0.95 + slack {
                    out.push(AppointmentViolation::CoverageOutOfBand { procedure_id: pid(), rate });
                }
            }
        } else if r.insurance_covered_amount != 0 || r.insurance_claim_status.is_some() {
            out.push(AppointmentViolation::SelfPayWithCoverage { procedure_id: pid() });
        }
    }

    let mut repeated: Vec<_> = new_visits
        .into_iter()
        .filter(|(_, v)| v.len() > 1)
        .map(|(p, v)| AppointmentViolation::RepeatedNewPatient { patient_id: p.to_string(), visits: v.len() })
        .collect();
    repeated.sort_by(|a, b| a.to_string().cmp(&b.to_string()));
    out.extend(repeated);
    out
}

// ── Financial invariants ─────────────────────────────────────────────────────

/// An invariant violation found in the monthly financials file.
#[derive(Debug, Clone, PartialEq)]
pub enum FinancialViolation {
    /// Revenue categories do not sum to Total_Revenue.
    RevenueCategories { financial_id: String, sum: i64, total: i64 },
    /// Payor mix does not sum to Total_Revenue.
    PayorMix { financial_id: String, sum: i64, total: i64 },
    /// Expense lines do not sum to Total_Expenses.
    ExpenseTotal { financial_id: String, sum: i64, total: i64 },
    /// EBITDA ≠ revenue − expenses.
    Ebitda { financial_id: String, ebitda: i64, expected: i64 },
    /// Year and month do not name a calendar month.
    InvalidPeriod { financial_id: String, year: i32, month: u32 },
    /// Same (location, month) appears twice.
    DuplicateMonth { location_id: String, period: String },
    /// A month is missing between a location's first and last record.
    MissingMonth { location_id: String, period: String },
    /// A location's series stops before the others.
    ShortSeries { location_id: String, last: String, expected: String },
}

impl std::fmt::Display for FinancialViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RevenueCategories { financial_id, sum, total } => {
                write!(f, "RevenueCategories {financial_id}: sum={sum} total={total}")
            }
            Self::PayorMix { financial_id, sum, total } => write!(f, "PayorMix {financial_id}: sum={sum} total={total}"),
            Self::ExpenseTotal { financial_id, sum, total } => {
                write!(f, "ExpenseTotal {financial_id}: sum={sum} total={total}")
            }
            Self::Ebitda { financial_id, ebitda, expected } => {
                write!(f, "Ebitda {financial_id}: ebitda={ebitda} expected={expected}")
            }
            Self::InvalidPeriod { financial_id, year, month } => {
                write!(f, "InvalidPeriod {financial_id}: year={year} month={month}")
            }
            Self::DuplicateMonth { location_id, period } => write!(f, "DuplicateMonth {location_id} {period}"),
            Self::MissingMonth { location_id, period } => write!(f, "MissingMonth {location_id} {period}"),
            Self::ShortSeries { location_id, last, expected } => {
                write!(f, "ShortSeries {location_id}: last={last} expected={expected}")
            }
        }
    }
}

/// Check reconciliation and per-location month completeness.
pub fn verify_financials(records: &[MonthlyFinancialRecord]) -> Vec<FinancialViolation> {
    let mut out = Vec::new();
    let mut months: BTreeMap<&str, Vec<YearMonth>> = BTreeMap::new();

    for r in records {
        let id = || r.financial_id.clone();
        let total = r.total_revenue;
        let sum: i64 = r.revenue_by_category().iter().sum();
        if sum != total {
            out.push(FinancialViolation::RevenueCategories { financial_id: id(), sum, total });
        }
        let sum: i64 = r.payor_mix().iter().sum();
        if sum != total {
            out.push(FinancialViolation::PayorMix { financial_id: id(), sum, total });
        }
        let sum: i64 = r.expenses_by_category().iter().sum();
        if sum != r.total_expenses {
            out.push(FinancialViolation::ExpenseTotal { financial_id: id(), sum, total: r.total_expenses });
        }
        let expected = r.total_revenue - r.total_expenses;
        if r.ebitda != expected {
            out.push(FinancialViolation::Ebitda { financial_id: id(), ebitda: r.ebitda, expected });
        }
        match r.year_month() {
            Some(ym) => months.entry(&r.location_id).or_default().push(ym),
            None => out.push(FinancialViolation::InvalidPeriod { financial_id: id(), year: r.year, month: r.month }),
        }
    }

    let horizon_end = months.values().filter_map(|ms| ms.iter().max()).max().copied();
    for (loc, ms) in &mut months {
        ms.sort();
        for w in ms.windows(2) {
            if w[0] == w[1] {
                out.push(FinancialViolation::DuplicateMonth { location_id: loc.to_string(), period: w[0].to_string() });
            } else {
                let mut gap = w[0].next();
                while let Some(missing) = gap.filter(|g| *g < w[1]) {
                    out.push(FinancialViolation::MissingMonth { location_id: loc.to_string(), period: missing.to_string() });
                    gap = missing.next();
                }
            }
        }
        if let (Some(last), Some(end)) = (ms.last(), horizon_end) {
            if *last < end {
                out.push(FinancialViolation::ShortSeries {
                    location_id: loc.to_string(),
                    last: last.to_string(),
                    expected: end.to_string(),
                });
            }
        }
    }
    out
}
