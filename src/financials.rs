use chrono::NaiveDate;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{GeneratorConfig, GrowthCurve};
use crate::registry::{ExpenseBasis, ExpenseCategory, Location, ProcedureCategory, Registry};
use crate::sampling::{per_unit, perturbed_split, ratio, round4, round_money, uniform, uniform_int};
use crate::types::YearMonth;

/// Working days per month used for chair capacity.
pub const WORKING_DAYS_PER_MONTH: i64 = 22;
/// Clinical hours per working day.
pub const HOURS_PER_DAY: i64 = 8;
/// Share of revenue attributed to marketing when computing ROI.
const MARKETING_ATTRIBUTED_SHARE: f64 = 0.15;

/// One location-month statement. Money in whole dollars, ratios as fractions.
///
/// Built once by [`generate_monthly_financials`]; only the four `*_change`
/// fields are written afterwards, by the comparative pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlyFinancialRecord {
    #[serde(rename = "Financial_ID")]
    pub financial_id: String,
    #[serde(rename = "Location_ID")]
    pub location_id: String,
    #[serde(rename = "Location_Name")]
    pub location_name: String,
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Month")]
    pub month: u32,
    #[serde(rename = "Period")]
    pub period: String,

    // ── Revenue ─────────────────────────────────────────────────────────────
    #[serde(rename = "Total_Revenue")]
    pub total_revenue: i64,
    #[serde(rename = "Revenue_Diagnostic")]
    pub revenue_diagnostic: i64,
    #[serde(rename = "Revenue_Preventive")]
    pub revenue_preventive: i64,
    #[serde(rename = "Revenue_Restorative")]
    pub revenue_restorative: i64,
    #[serde(rename = "Revenue_Endodontic")]
    pub revenue_endodontic: i64,
    #[serde(rename = "Revenue_Periodontic")]
    pub revenue_periodontic: i64,
    #[serde(rename = "Revenue_Prosthodontic")]
    pub revenue_prosthodontic: i64,
    #[serde(rename = "Revenue_Oral_Surgery")]
    pub revenue_oral_surgery: i64,
    #[serde(rename = "Revenue_Orthodontic")]
    pub revenue_orthodontic: i64,
    #[serde(rename = "Revenue_Implant")]
    pub revenue_implant: i64,
    #[serde(rename = "Revenue_Adjunctive")]
    pub revenue_adjunctive: i64,

    // ── Expenses ────────────────────────────────────────────────────────────
    #[serde(rename = "Labor_Clinical")]
    pub labor_clinical: i64,
    #[serde(rename = "Labor_Administrative")]
    pub labor_administrative: i64,
    #[serde(rename = "Supplies_Clinical")]
    pub supplies_clinical: i64,
    #[serde(rename = "Supplies_Office")]
    pub supplies_office: i64,
    #[serde(rename = "Rent_Lease")]
    pub rent_lease: i64,
    #[serde(rename = "Utilities")]
    pub utilities: i64,
    #[serde(rename = "Equipment_Costs")]
    pub equipment_costs: i64,
    #[serde(rename = "Marketing")]
    pub marketing: i64,
    #[serde(rename = "Insurance")]
    pub insurance: i64,
    #[serde(rename = "Professional_Fees")]
    pub professional_fees: i64,
    #[serde(rename = "Continuing_Education")]
    pub continuing_education: i64,
    #[serde(rename = "Lab_Fees")]
    pub lab_fees: i64,
    #[serde(rename = "Software_IT")]
    pub software_it: i64,
    #[serde(rename = "Travel")]
    pub travel: i64,
    #[serde(rename = "Miscellaneous")]
    pub miscellaneous: i64,
    #[serde(rename = "Total_Expenses")]
    pub total_expenses: i64,

    // ── Profitability ───────────────────────────────────────────────────────
    #[serde(rename = "EBITDA")]
    pub ebitda: i64,
    #[serde(rename = "EBITDA_Margin")]
    pub ebitda_margin: f64,
    #[serde(rename = "Labor_Cost_Percentage")]
    pub labor_cost_percentage: f64,
    #[serde(rename = "Supply_Cost_Percentage")]
    pub supply_cost_percentage: f64,

    // ── Accounts receivable ─────────────────────────────────────────────────
    #[serde(rename = "Total_AR")]
    pub total_ar: i64,
    #[serde(rename = "Days_In_AR")]
    pub days_in_ar: i64,
    #[serde(rename = "AR_Current")]
    pub ar_current: i64,
    #[serde(rename = "AR_31_60")]
    pub ar_31_60: i64,
    #[serde(rename = "AR_61_90")]
    pub ar_61_90: i64,
    #[serde(rename = "AR_91_Plus")]
    pub ar_91_plus: i64,
    #[serde(rename = "DSO")]
    pub dso: f64,

    // ── Claims ──────────────────────────────────────────────────────────────
    #[serde(rename = "Total_Claims_Submitted")]
    pub total_claims_submitted: i64,
    #[serde(rename = "Claims_Outstanding")]
    pub claims_outstanding: i64,
    #[serde(rename = "Claims_Denied")]
    pub claims_denied: i64,
    #[serde(rename = "Denial_Rate")]
    pub denial_rate: f64,
    #[serde(rename = "Avg_Days_To_Payment")]
    pub avg_days_to_payment: i64,

    // ── Collections ─────────────────────────────────────────────────────────
    #[serde(rename = "Collections_Expected")]
    pub collections_expected: i64,
    #[serde(rename = "Collections_Actual")]
    pub collections_actual: i64,
    #[serde(rename = "Collection_Rate")]
    pub collection_rate: f64,

    // ── Procedures and patients ─────────────────────────────────────────────
    #[serde(rename = "Total_Procedures")]
    pub total_procedures: i64,
    #[serde(rename = "Procedures_Completed")]
    pub procedures_completed: i64,
    #[serde(rename = "Procedures_Cancelled")]
    pub procedures_cancelled: i64,
    #[serde(rename = "Total_Patient_Visits")]
    pub total_patient_visits: i64,
    #[serde(rename = "New_Patient_Count")]
    pub new_patient_count: i64,
    #[serde(rename = "Returning_Patient_Count")]
    pub returning_patient_count: i64,
    #[serde(rename = "Patient_Retention_Rate")]
    pub patient_retention_rate: f64,

    // ── Capacity ────────────────────────────────────────────────────────────
    #[serde(rename = "Chair_Count")]
    pub chair_count: u32,
    #[serde(rename = "Total_Chair_Hours")]
    pub total_chair_hours: i64,
    #[serde(rename = "Used_Chair_Hours")]
    pub used_chair_hours: i64,
    #[serde(rename = "Chair_Utilization")]
    pub chair_utilization: f64,

    // ── Payor mix ───────────────────────────────────────────────────────────
    #[serde(rename = "Payor_Delta_Dental")]
    pub payor_delta_dental: i64,
    #[serde(rename = "Payor_Cigna")]
    pub payor_cigna: i64,
    #[serde(rename = "Payor_Aetna")]
    pub payor_aetna: i64,
    #[serde(rename = "Payor_MetLife")]
    pub payor_metlife: i64,
    #[serde(rename = "Payor_Guardian")]
    pub payor_guardian: i64,
    #[serde(rename = "Payor_United_Healthcare")]
    pub payor_united_healthcare: i64,
    #[serde(rename = "Payor_Self_Pay")]
    pub payor_self_pay: i64,

    // ── Treatment funnel ────────────────────────────────────────────────────
    #[serde(rename = "Treatment_Plans_Presented")]
    pub treatment_plans_presented: i64,
    #[serde(rename = "Treatment_Plans_Accepted")]
    pub treatment_plans_accepted: i64,
    #[serde(rename = "Treatment_Plans_Completed")]
    pub treatment_plans_completed: i64,
    #[serde(rename = "Case_Acceptance_Rate")]
    pub case_acceptance_rate: f64,
    #[serde(rename = "Treatment_Completion_Rate")]
    pub treatment_completion_rate: f64,

    // ── Per-unit and acquisition metrics ────────────────────────────────────
    #[serde(rename = "Revenue_Per_Square_Foot")]
    pub revenue_per_square_foot: f64,
    #[serde(rename = "Revenue_Per_Patient")]
    pub revenue_per_patient: f64,
    #[serde(rename = "Revenue_Per_Chair")]
    pub revenue_per_chair: f64,
    #[serde(rename = "Revenue_Per_Hour")]
    pub revenue_per_hour: f64,
    #[serde(rename = "Marketing_ROI")]
    pub marketing_roi: f64,
    #[serde(rename = "Months_Since_Acquisition")]
    pub months_since_acquisition: i32,
    #[serde(rename = "Is_Post_Acquisition")]
    pub is_post_acquisition: bool,
    #[serde(rename = "Annualized_EBITDA")]
    pub annualized_ebitda: i64,
    #[serde(rename = "Acquisition_Return")]
    pub acquisition_return: f64,

    // ── Comparative (filled by `comparative::apply_period_deltas`) ──────────
    #[serde(rename = "Revenue_MoM_Change")]
    pub revenue_mom_change: f64,
    #[serde(rename = "Revenue_YoY_Change")]
    pub revenue_yoy_change: f64,
    #[serde(rename = "EBITDA_MoM_Change")]
    pub ebitda_mom_change: f64,
    #[serde(rename = "EBITDA_YoY_Change")]
    pub ebitda_yoy_change: f64,
}

impl MonthlyFinancialRecord {
    /// `None` when the stored year and month do not name a calendar month.
    pub fn year_month(&self) -> Option<YearMonth> {
        YearMonth::new(self.year, self.month)
    }

    /// Revenue by service line, in `ProcedureCategory::ALL` order.
    pub fn revenue_by_category(&self) -> [i64; 10] {
        [
            self.revenue_diagnostic,
            self.revenue_preventive,
            self.revenue_restorative,
            self.revenue_endodontic,
            self.revenue_periodontic,
            self.revenue_prosthodontic,
            self.revenue_oral_surgery,
            self.revenue_orthodontic,
            self.revenue_implant,
            self.revenue_adjunctive,
        ]
    }

    /// Expenses in `ExpenseCategory::ALL` order.
    pub fn expenses_by_category(&self) -> [i64; 15] {
        [
            self.labor_clinical,
            self.labor_administrative,
            self.supplies_clinical,
            self.supplies_office,
            self.rent_lease,
            self.utilities,
            self.equipment_costs,
            self.marketing,
            self.insurance,
            self.professional_fees,
            self.continuing_education,
            self.lab_fees,
            self.software_it,
            self.travel,
            self.miscellaneous,
        ]
    }

    /// Payor mix in `Registry::payor_mix` order.
    pub fn payor_mix(&self) -> [i64; 7] {
        [
            self.payor_delta_dental,
            self.payor_cigna,
            self.payor_aetna,
            self.payor_metlife,
            self.payor_guardian,
            self.payor_united_healthcare,
            self.payor_self_pay,
        ]
    }
}

/// Month-of-year demand multiplier: a winter dip, a spring peak, and a
/// broad summer band.
pub fn seasonal_factor(rng: &mut impl Rng, month: u32) -> f64 {
    match month {
        12 | 1 | 2 => uniform(rng, 0.85, 0.95),
        3..=5 => uniform(rng, 1.05, 1.15),
        6..=8 => uniform(rng, 0.9, 1.1),
        _ => uniform(rng, 0.95, 1.05),
    }
}

/// Maturity multiplier for a practice `years` after opening.
pub fn growth_factor(rng: &mut impl Rng, curve: &GrowthCurve, years: f64) -> f64 {
    let noise = uniform(rng, curve.noise.0, curve.noise.1);
    if years < 2.0 {
        1.0 + years * curve.early_slope * noise
    } else if years < 4.0 {
        1.0 + curve.mid_base + (years - 2.0) * curve.mid_slope * noise
    } else {
        1.0 + curve.mature_base + (years - 4.0) * curve.mature_slope * noise
    }
}

/// Fractional years from `open` to `at`, floored at zero.
pub fn years_since(open: NaiveDate, at: NaiveDate) -> f64 {
    ((at - open).num_days().max(0)) as f64 / 365.25
}

/// First month a location reports: the month containing the later of its
/// opening date and the global start.
pub fn first_reporting_month(location: &Location, start: NaiveDate) -> YearMonth {
    YearMonth::of(location.open_date.max(start))
}

fn expense_amount(rng: &mut impl Rng, basis: ExpenseBasis, revenue: i64, location: &Location) -> i64 {
    match basis {
        ExpenseBasis::RevenueShare(lo, hi) => round_money(revenue as f64 * uniform(rng, lo, hi)),
        ExpenseBasis::Rent(lo, hi) => round_money(location.monthly_rent * uniform(rng, lo, hi)),
    }
}

/// Build one location-month statement. Comparative fields are left at 0.
pub fn build_month(
    rng: &mut impl Rng,
    registry: &Registry,
    curve: &GrowthCurve,
    location: &Location,
    ym: YearMonth,
) -> MonthlyFinancialRecord {
    let month_start = ym.first_day();

    // ── Revenue ─────────────────────────────────────────────────────────────
    let seasonal = seasonal_factor(rng, ym.month());
    let growth = growth_factor(rng, curve, years_since(location.open_date, month_start));
    let base = uniform(rng, location.base_revenue.0, location.base_revenue.1);
    let revenue = round_money(base * seasonal * growth);
    let revenue_f = revenue as f64;

    let category_targets: Vec<f64> = ProcedureCategory::ALL.iter().map(|c| c.revenue_weight()).collect();
    let by_category = perturbed_split(rng, revenue, &category_targets, (0.85, 1.15));
    let cat = |i: usize| by_category.get(i).copied().unwrap_or(0);

    // ── Expenses ────────────────────────────────────────────────────────────
    let expenses: Vec<i64> = ExpenseCategory::ALL
        .iter()
        .map(|c| expense_amount(rng, c.basis(), revenue, location))
        .collect();
    let exp = |i: usize| expenses.get(i).copied().unwrap_or(0);
    let total_expenses: i64 = expenses.iter().sum();
    let ebitda = revenue - total_expenses;

    // ── AR ──────────────────────────────────────────────────────────────────
    let days_in_ar = uniform_int(rng, 30, 45);
    let total_ar = round_money(revenue_f * days_in_ar as f64 / 30.0);
    let ar_f = total_ar as f64;
    let ar_current = round_money(ar_f * uniform(rng, 0.55, 0.65));
    let ar_31_60 = round_money(ar_f * uniform(rng, 0.20, 0.25));
    let ar_61_90 = round_money(ar_f * uniform(rng, 0.08, 0.12));
    let ar_91_plus = round_money(ar_f * uniform(rng, 0.05, 0.10));

    // ── Claims ──────────────────────────────────────────────────────────────
    let total_claims = round_money(revenue_f * 0.8 / 150.0);
    let claims_outstanding = round_money(total_claims as f64 * uniform(rng, 0.3, 0.4));
    let claims_denied = round_money(total_claims as f64 * uniform(rng, 0.02, 0.05));
    let avg_days_to_payment = uniform_int(rng, 25, 40);

    // ── Collections ─────────────────────────────────────────────────────────
    let collections_expected = round_money(revenue_f * 0.9);
    let collections_actual = round_money(collections_expected as f64 * uniform(rng, 0.88, 0.99));

    // ── Procedures and patients ─────────────────────────────────────────────
    let avg_ticket = uniform_int(rng, 200, 300);
    let total_procedures = round_money(revenue_f / avg_ticket as f64);
    let procedures_completed = round_money(total_procedures as f64 * uniform(rng, 0.92, 0.98));
    let procedures_cancelled = round_money(total_procedures as f64 * uniform(rng, 0.02, 0.08));
    let visits = round_money(total_procedures as f64 * 0.7);
    let new_patients = round_money(visits as f64 * uniform(rng, 0.15, 0.25));
    let retention = uniform(rng, 0.75, 0.9);

    // ── Capacity ────────────────────────────────────────────────────────────
    let chairs = location.chair_count();
    let total_chair_hours = chairs as i64 * WORKING_DAYS_PER_MONTH * HOURS_PER_DAY;
    let used_chair_hours = round_money(total_chair_hours as f64 * uniform(rng, 0.7, 0.9));

    // ── Payor mix ───────────────────────────────────────────────────────────
    let payor_targets: Vec<f64> = registry.payor_mix.iter().map(|(_, w)| *w).collect();
    let payors = perturbed_split(rng, revenue, &payor_targets, (0.85, 1.15));
    let payor = |i: usize| payors.get(i).copied().unwrap_or(0);

    // ── Treatment funnel ────────────────────────────────────────────────────
    let presented = round_money(visits as f64 * uniform(rng, 0.3, 0.5));
    let accepted = round_money(presented as f64 * uniform(rng, 0.6, 0.8));
    let plans_completed = round_money(accepted as f64 * uniform(rng, 0.7, 0.9));

    // ── Acquisition ─────────────────────────────────────────────────────────
    let acquired = YearMonth::of(location.acquisition_date);
    let annualized_ebitda = ebitda * 12;

    let labor = exp(0) + exp(1);
    let supplies = exp(2) + exp(3);
    let marketing = exp(7);

    MonthlyFinancialRecord {
        financial_id: format!("FIN-{}-{:04}{:02}", location.id, ym.year(), ym.month()),
        location_id: location.id.to_string(),
        location_name: location.name.to_string(),
        date: month_start,
        year: ym.year(),
        month: ym.month(),
        period: ym.to_string(),

        total_revenue: revenue,
        revenue_diagnostic: cat(0),
        revenue_preventive: cat(1),
        revenue_restorative: cat(2),
        revenue_endodontic: cat(3),
        revenue_periodontic: cat(4),
        revenue_prosthodontic: cat(5),
        revenue_oral_surgery: cat(6),
        revenue_orthodontic: cat(7),
        revenue_implant: cat(8),
        revenue_adjunctive: cat(9),

        labor_clinical: exp(0),
        labor_administrative: exp(1),
        supplies_clinical: exp(2),
        supplies_office: exp(3),
        rent_lease: exp(4),
        utilities: exp(5),
        equipment_costs: exp(6),
        marketing,
        insurance: exp(8),
        professional_fees: exp(9),
        continuing_education: exp(10),
        lab_fees: exp(11),
        software_it: exp(12),
        travel: exp(13),
        miscellaneous: exp(14),
        total_expenses,

        ebitda,
        ebitda_margin: ratio(ebitda as f64, revenue_f),
        labor_cost_percentage: ratio(labor as f64, revenue_f),
        supply_cost_percentage: ratio(supplies as f64, revenue_f),

        total_ar,
        days_in_ar,
        ar_current,
        ar_31_60,
        ar_61_90,
        ar_91_plus,
        dso: per_unit(ar_f, revenue_f / 30.0),

        total_claims_submitted: total_claims,
        claims_outstanding,
        claims_denied,
        denial_rate: ratio(claims_denied as f64, total_claims as f64),
        avg_days_to_payment,

        collections_expected,
        collections_actual,
        collection_rate: ratio(collections_actual as f64, revenue_f),

        total_procedures,
        procedures_completed,
        procedures_cancelled,
        total_patient_visits: visits,
        new_patient_count: new_patients,
        returning_patient_count: visits - new_patients,
        patient_retention_rate: round4(retention),

        chair_count: chairs,
        total_chair_hours,
        used_chair_hours,
        chair_utilization: ratio(used_chair_hours as f64, total_chair_hours as f64),

        payor_delta_dental: payor(0),
        payor_cigna: payor(1),
        payor_aetna: payor(2),
        payor_metlife: payor(3),
        payor_guardian: payor(4),
        payor_united_healthcare: payor(5),
        payor_self_pay: payor(6),

        treatment_plans_presented: presented,
        treatment_plans_accepted: accepted,
        treatment_plans_completed: plans_completed,
        case_acceptance_rate: ratio(accepted as f64, presented as f64),
        treatment_completion_rate: ratio(plans_completed as f64, accepted as f64),

        revenue_per_square_foot: per_unit(revenue_f, location.square_footage as f64),
        revenue_per_patient: per_unit(revenue_f, visits as f64),
        revenue_per_chair: per_unit(revenue_f, chairs as f64),
        revenue_per_hour: per_unit(revenue_f, used_chair_hours as f64),
        marketing_roi: per_unit(revenue_f * MARKETING_ATTRIBUTED_SHARE, marketing as f64),
        months_since_acquisition: ym.months_since(acquired).max(0),
        is_post_acquisition: ym >= acquired,
        annualized_ebitda,
        acquisition_return: ratio(annualized_ebitda as f64, location.acquisition_cost as f64),

        revenue_mom_change: 0.0,
        revenue_yoy_change: 0.0,
        ebitda_mom_change: 0.0,
        ebitda_yoy_change: 0.0,
    }
}

/// Every location-month from each location's first reporting month through
/// the month containing `config.end`, grouped by location in registry order.
pub fn generate_monthly_financials(
    config: &GeneratorConfig,
    registry: &Registry,
    rng: &mut impl Rng,
) -> Vec<MonthlyFinancialRecord> {
    let last = YearMonth::of(config.end);
    let mut records = Vec::new();
    for location in &registry.locations {
        let first = first_reporting_month(location, config.start);
        tracing::debug!(location = %location.id, %first, %last, "building monthly statements");
        for ym in first.through(last) {
            records.push(build_month(rng, registry, &config.growth, location, ym));
        }
    }
    records
}
