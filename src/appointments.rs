use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::config::VisitConfig;
use crate::patients::Patient;
use crate::registry::{ProcedureType, Registry, SELF_PAY};
use crate::sampling::{round_money, uniform, uniform_int, weighted_choice};
use crate::types::{LocationId, PatientId, ProviderId, VisitId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppointmentStatus {
    Completed,
    NoShow,
    Canceled,
    Rescheduled,
}

impl AppointmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::NoShow => "No-Show",
            AppointmentStatus::Canceled => "Canceled",
            AppointmentStatus::Rescheduled => "Rescheduled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClaimStatus {
    Paid,
    Pending,
    Denied,
}

impl ClaimStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ClaimStatus::Paid => "Paid",
            ClaimStatus::Pending => "Pending",
            ClaimStatus::Denied => "Denied",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Visit {
    pub id: VisitId,
    pub patient: PatientId,
    pub location: LocationId,
    pub provider: ProviderId,
    pub service_date: NaiveDate,
    pub status: AppointmentStatus,
    pub procedures: Vec<ProcedureRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsuranceClaim {
    pub status: ClaimStatus,
    pub submitted: NaiveDate,
    /// Only set once the payer has paid.
    pub paid: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreatmentPlan {
    pub id: String,
    pub created: NaiveDate,
    pub completed: Option<NaiveDate>,
    /// Percent complete, 100 when `completed` is set.
    pub completion_rate: u32,
    pub estimated_total_cost: i64,
}

/// Money and paperwork for one completed procedure. All amounts in whole dollars.
#[derive(Debug, Clone, PartialEq)]
pub struct Financials {
    pub charged: i64,
    pub insurance_covered: i64,
    pub patient_responsibility: i64,
    pub discount: i64,
    pub out_of_pocket: i64,
    pub paid: bool,
    pub amount_paid: i64,
    pub payment_method: Option<&'static str>,
    pub tooth: Option<String>,
    pub treatment_plan: Option<TreatmentPlan>,
    pub estimated_total_cost: i64,
    pub claim: Option<InsuranceClaim>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureRecord {
    /// 1-based line number within the visit.
    pub line: u32,
    /// Index into `Registry::procedures`.
    pub procedure: usize,
    /// `None` unless the visit was completed.
    pub financials: Option<Financials>,
}

/// Skewed patient pick: `floor(u^exponent × n)`. Exponents above 1 pile
/// selection mass onto the low indices, giving a core of frequent visitors.
pub fn frequent_visitor_index(rng: &mut impl Rng, n: usize, exponent: f64) -> usize {
    let u: f64 = rng.random();
    let idx = (u.powf(exponent) * n as f64).floor() as usize;
    idx.min(n.saturating_sub(1))
}

/// Uniform day in `[max(registration, start), end]`.
pub fn visit_date(
    rng: &mut impl Rng,
    registration: NaiveDate,
    start: NaiveDate,
    end: NaiveDate,
) -> NaiveDate {
    let lower = registration.max(start);
    let span = (end - lower).num_days().max(0);
    lower + Duration::days(uniform_int(rng, 0, span))
}

fn pick_procedure(rng: &mut impl Rng, config: &VisitConfig, catalog_len: usize) -> usize {
    let common = config.common_procedure_count.min(catalog_len);
    if common > 0 && rng.random_bool(config.common_procedure_probability) {
        rng.random_range(0..common)
    } else {
        rng.random_range(0..catalog_len)
    }
}

/// Run the full money chain for one completed procedure, in draw order:
/// fee, coverage, discount, payment, tooth, treatment plan, claim.
pub fn price_procedure(
    rng: &mut impl Rng,
    config: &VisitConfig,
    registry: &Registry,
    procedure: &ProcedureType,
    patient: &Patient,
    service_date: NaiveDate,
) -> Financials {
    let charged = round_money(procedure.avg_fee * uniform(rng, config.fee_noise.0, config.fee_noise.1));

    let insurance_covered = match patient.insurance {
        Some(plan) => {
            let base = registry.reimbursement_rate(plan);
            let (lo, hi) = config.coverage_clamp;
            let rate = (base * uniform(rng, config.coverage_noise.0, config.coverage_noise.1)).clamp(lo, hi);
            round_money(charged as f64 * rate)
        }
        None => 0,
    };
    let patient_responsibility = charged - insurance_covered;

    let discount = if rng.random_bool(config.discount_probability) {
        let rate = config.discount_rates.choose(rng).copied().unwrap_or(0.0);
        round_money(patient_responsibility as f64 * rate)
    } else {
        0
    };
    let out_of_pocket = patient_responsibility - discount;

    let paid = rng.random_bool(config.paid_probability);
    let amount_paid = if paid { out_of_pocket } else { 0 };
    let payment_method = if paid { registry.payment_methods.choose(rng).copied() } else { None };

    let tooth = if procedure.category.needs_tooth() {
        registry.teeth.choose(rng).cloned()
    } else {
        None
    };

    let treatment_plan = if rng.random_bool(config.treatment_plan_probability) {
        let id = format!("TP{}", uniform_int(rng, 1_000, 9_999));
        let created = service_date - Duration::days(uniform_int(rng, 0, 90));
        let (completed, completion_rate) = if rng.random_bool(config.treatment_plan_completed_probability) {
            (Some(service_date + Duration::days(uniform_int(rng, 0, 180))), 100)
        } else {
            (None, uniform_int(rng, 10, 90) as u32)
        };
        let estimated_total_cost = round_money(charged as f64 * (1.0 + uniform(rng, 0.0, 1.0)));
        Some(TreatmentPlan { id, created, completed, completion_rate, estimated_total_cost })
    } else {
        None
    };
    let estimated_total_cost = treatment_plan.as_ref().map_or(charged, |tp| tp.estimated_total_cost);

    let claim = patient.insurance.map(|_| {
        let status = if rng.random_bool(config.claim_paid_probability) {
            ClaimStatus::Paid
        } else if rng.random_bool(0.5) {
            ClaimStatus::Pending
        } else {
            ClaimStatus::Denied
        };
        let paid = (status == ClaimStatus::Paid)
            .then(|| service_date + Duration::days(uniform_int(rng, 15, 45)));
        InsuranceClaim { status, submitted: service_date, paid }
    });

    Financials {
        charged,
        insurance_covered,
        patient_responsibility,
        discount,
        out_of_pocket,
        paid,
        amount_paid,
        payment_method,
        tooth,
        treatment_plan,
        estimated_total_cost,
        claim,
    }
}

/// Generate `config.count` visits in generation order (not yet date-sorted).
///
/// Location and provider are drawn independently, so a provider can appear
/// at a location other than their primary one.
pub fn generate_visits(
    config: &VisitConfig,
    registry: &Registry,
    patients: &[Patient],
    start: NaiveDate,
    end: NaiveDate,
    rng: &mut impl Rng,
) -> Vec<Visit> {
    if patients.is_empty() || registry.locations.is_empty() || registry.providers.is_empty() {
        return Vec::new();
    }

    let mut visits = Vec::with_capacity(config.count);
    for i in 0..config.count {
        let patient = &patients[frequent_visitor_index(rng, patients.len(), config.frequent_visitor_exponent)];
        let service_date = visit_date(rng, patient.registration_date, start, end);
        let location = &registry.locations[rng.random_range(0..registry.locations.len())];
        let provider = &registry.providers[rng.random_range(0..registry.providers.len())];
        let status = weighted_choice(rng, &config.status_weights)
            .copied()
            .unwrap_or(AppointmentStatus::Completed);

        let n_procedures = uniform_int(rng, 1, 3) as u32;
        let procedures = (1..=n_procedures)
            .map(|line| {
                let procedure = pick_procedure(rng, config, registry.procedures.len());
                let financials = (status == AppointmentStatus::Completed).then(|| {
                    price_procedure(rng, config, registry, &registry.procedures[procedure], patient, service_date)
                });
                ProcedureRecord { line, procedure, financials }
            })
            .collect();

        visits.push(Visit {
            id: VisitId(i as u64 + 1),
            patient: patient.id,
            location: location.id,
            provider: provider.id,
            service_date,
            status,
            procedures,
        });
    }
    visits
}

/// One line of the appointments file: a procedure joined with its visit,
/// patient, location and provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentRow {
    #[serde(rename = "Visit_ID")]
    pub visit_id: String,
    #[serde(rename = "Procedure_ID")]
    pub procedure_id: String,
    #[serde(rename = "Patient_ID")]
    pub patient_id: String,
    #[serde(rename = "Patient_Name")]
    pub patient_name: String,
    #[serde(rename = "Patient_Gender")]
    pub patient_gender: String,
    #[serde(rename = "Patient_Age")]
    pub patient_age: u32,
    #[serde(rename = "Patient_Zip_Code")]
    pub patient_zip_code: String,
    #[serde(rename = "Location_ID")]
    pub location_id: String,
    #[serde(rename = "Location_Name")]
    pub location_name: String,
    #[serde(rename = "Provider_ID")]
    pub provider_id: String,
    #[serde(rename = "Provider_Name")]
    pub provider_name: String,
    #[serde(rename = "Provider_Role")]
    pub provider_role: String,
    #[serde(rename = "Provider_Specialty")]
    pub provider_specialty: String,
    #[serde(rename = "Date_of_Service")]
    pub date_of_service: NaiveDate,
    #[serde(rename = "Appointment_Status")]
    pub appointment_status: String,
    #[serde(rename = "Procedure_Code")]
    pub procedure_code: String,
    #[serde(rename = "Procedure_Description")]
    pub procedure_description: String,
    #[serde(rename = "Procedure_Category")]
    pub procedure_category: String,
    #[serde(rename = "Tooth_Number")]
    pub tooth_number: Option<String>,
    #[serde(rename = "Charged_Amount")]
    pub charged_amount: i64,
    #[serde(rename = "Insurance_Provider")]
    pub insurance_provider: String,
    #[serde(rename = "Insurance_Covered_Amount")]
    pub insurance_covered_amount: i64,
    #[serde(rename = "Patient_Responsibility")]
    pub patient_responsibility: i64,
    #[serde(rename = "Discount_Applied")]
    pub discount_applied: i64,
    #[serde(rename = "Out_of_Pocket")]
    pub out_of_pocket: i64,
    #[serde(rename = "Amount_Paid")]
    pub amount_paid: i64,
    #[serde(rename = "Payment_Method")]
    pub payment_method: Option<String>,
    #[serde(rename = "Payment_Status")]
    pub payment_status: Option<String>,
    #[serde(rename = "Is_New_Patient")]
    pub is_new_patient: bool,
    #[serde(rename = "Insurance_Claim_Status")]
    pub insurance_claim_status: Option<String>,
    #[serde(rename = "Insurance_Claim_Submission_Date")]
    pub insurance_claim_submission_date: Option<NaiveDate>,
    #[serde(rename = "Insurance_Claim_Payment_Date")]
    pub insurance_claim_payment_date: Option<NaiveDate>,
    #[serde(rename = "Google_Rating")]
    pub google_rating: f64,
    #[serde(rename = "Treatment_Plan_ID")]
    pub treatment_plan_id: Option<String>,
    #[serde(rename = "Treatment_Plan_Creation_Date")]
    pub treatment_plan_creation_date: Option<NaiveDate>,
    #[serde(rename = "Treatment_Plan_Completion_Date")]
    pub treatment_plan_completion_date: Option<NaiveDate>,
    #[serde(rename = "Treatment_Plan_Completion_Rate")]
    pub treatment_plan_completion_rate: Option<u32>,
    #[serde(rename = "Estimated_Total_Cost")]
    pub estimated_total_cost: i64,
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Month")]
    pub month: u32,
}

impl AppointmentRow {
    pub fn is_completed(&self) -> bool {
        self.appointment_status == AppointmentStatus::Completed.as_str()
    }

    pub fn is_insured(&self) -> bool {
        self.insurance_provider != SELF_PAY
    }
}

/// Flatten visits into file rows, sorted ascending by service date.
///
/// The sort is stable, so same-day rows keep generation order. A visit is
/// flagged `Is_New_Patient` when it is the patient's earliest visit after
/// sorting; every procedure line of that visit carries the flag.
pub fn flatten(visits: &[Visit], patients: &[Patient], registry: &Registry) -> Vec<AppointmentRow> {
    let by_patient: HashMap<PatientId, &Patient> = patients.iter().map(|p| (p.id, p)).collect();

    let mut ordered: Vec<&Visit> = visits.iter().collect();
    ordered.sort_by_key(|v| v.service_date);

    let mut first_visit: HashMap<PatientId, VisitId> = HashMap::new();
    for v in &ordered {
        first_visit.entry(v.patient).or_insert(v.id);
    }

    let mut rows = Vec::new();
    for visit in ordered {
        let Some(patient) = by_patient.get(&visit.patient) else { continue };
        let Some(location) = registry.location(visit.location) else { continue };
        let Some(provider) = registry.providers.iter().find(|p| p.id == visit.provider) else {
            continue;
        };
        let is_new_patient = first_visit.get(&visit.patient) == Some(&visit.id);

        for rec in &visit.procedures {
            let Some(procedure) = registry.procedures.get(rec.procedure) else { continue };
            let fin = rec.financials.as_ref();
            let plan = fin.and_then(|f| f.treatment_plan.as_ref());
            let claim = fin.and_then(|f| f.claim.as_ref());

            rows.push(AppointmentRow {
                visit_id: visit.id.to_string(),
                procedure_id: format!("{}-{}", visit.id, rec.line),
                patient_id: patient.id.to_string(),
                patient_name: patient.full_name(),
                patient_gender: patient.gender.as_str().to_string(),
                patient_age: patient.age,
                patient_zip_code: patient.zip_code.to_string(),
                location_id: location.id.to_string(),
                location_name: location.name.to_string(),
                provider_id: provider.id.to_string(),
                provider_name: provider.name.to_string(),
                provider_role: provider.role.as_str().to_string(),
                provider_specialty: provider.specialty.to_string(),
                date_of_service: visit.service_date,
                appointment_status: visit.status.as_str().to_string(),
                procedure_code: procedure.code.to_string(),
                procedure_description: procedure.description.to_string(),
                procedure_category: procedure.category.as_str().to_string(),
                tooth_number: fin.and_then(|f| f.tooth.clone()),
                charged_amount: fin.map_or(0, |f| f.charged),
                insurance_provider: patient.insurance.unwrap_or(SELF_PAY).to_string(),
                insurance_covered_amount: fin.map_or(0, |f| f.insurance_covered),
                patient_responsibility: fin.map_or(0, |f| f.patient_responsibility),
                discount_applied: fin.map_or(0, |f| f.discount),
                out_of_pocket: fin.map_or(0, |f| f.out_of_pocket),
                amount_paid: fin.map_or(0, |f| f.amount_paid),
                payment_method: fin.and_then(|f| f.payment_method).map(str::to_string),
                payment_status: fin.map(|f| if f.paid { "Paid" } else { "Unpaid" }.to_string()),
                is_new_patient,
                insurance_claim_status: claim.map(|c| c.status.as_str().to_string()),
                insurance_claim_submission_date: claim.map(|c| c.submitted),
                insurance_claim_payment_date: claim.and_then(|c| c.paid),
                google_rating: location.rating,
                treatment_plan_id: plan.map(|tp| tp.id.clone()),
                treatment_plan_creation_date: plan.map(|tp| tp.created),
                treatment_plan_completion_date: plan.and_then(|tp| tp.completed),
                treatment_plan_completion_rate: plan.map(|tp| tp.completion_rate),
                estimated_total_cost: fin.map_or(0, |f| f.estimated_total_cost),
                year: visit.service_date.year(),
                month: visit.service_date.month(),
            });
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::config::GeneratorConfig;
    use crate::patients::{Gender, generate_patients};
    use crate::registry::{FALLBACK_REIMBURSEMENT_RATE, InsurancePlan};

    fn rng(seed: u64) -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(seed)
    }

    fn fixture(seed: u64, n_patients: usize, n_visits: usize) -> (GeneratorConfig, Registry, Vec<Patient>, Vec<Visit>) {
        let mut cfg = GeneratorConfig::canonical();
        cfg.patients.count = n_patients;
        cfg.visits.count = n_visits;
        let registry = Registry::canonical();
        let mut rng = rng(seed);
        let patients = generate_patients(&cfg.patients, &registry, cfg.end, &mut rng);
        let visits = generate_visits(&cfg.visits, &registry, &patients, cfg.start, cfg.end, &mut rng);
        (cfg, registry, patients, visits)
    }

    fn patient(insurance: Option<&'static str>) -> Patient {
        Patient {
            id: PatientId(1),
            first_name: "Mary",
            last_name: "Smith",
            gender: Gender::Female,
            age: 40,
            zip_code: "62701",
            registration_date: NaiveDate::from_ymd_opt(2019, 4, 12).unwrap(),
            insurance,
            active: true,
        }
    }

    // ── Sampling shape ───────────────────────────────────────────────────────

    /// With exponent 1.5 the lowest decile of patients gets P(u^1.5 < 0.1) =
    /// 0.1^(2/3) ≈ 21.5 % of picks, roughly double a uniform pick.
    #[test]
    fn frequent_visitor_bias_favours_low_indices() {
        let mut rng = rng(1);
        let n = 1_000;
        let draws = 50_000;
        let low = (0..draws).filter(|_| frequent_visitor_index(&mut rng, n, 1.5) < n / 10).count();
        let share = low as f64 / draws as f64;
        assert!((0.20..0.23).contains(&share), "low-decile share {share:.3}");
    }

    #[test]
    fn frequent_visitor_index_in_bounds() {
        let mut rng = rng(2);
        for _ in 0..10_000 {
            assert!(frequent_visitor_index(&mut rng, 7, 1.5) < 7);
        }
        assert_eq!(frequent_visitor_index(&mut rng, 1, 1.5), 0);
    }

    #[test]
    fn visit_dates_respect_registration_and_horizon() {
        let (cfg, _, patients, visits) = fixture(3, 200, 3_000);
        for v in &visits {
            let p = patients.iter().find(|p| p.id == v.patient).unwrap();
            assert!(v.service_date >= p.registration_date, "{} before registration", v.id);
            assert!(v.service_date >= cfg.start, "{} before start", v.id);
            assert!(v.service_date <= cfg.end, "{} after end", v.id);
        }
    }

    #[test]
    fn one_to_three_procedures_per_visit() {
        let (_, _, _, visits) = fixture(4, 100, 2_000);
        assert_eq!(visits.len(), 2_000);
        for v in &visits {
            assert!((1..=3).contains(&v.procedures.len()));
            let lines: Vec<u32> = v.procedures.iter().map(|p| p.line).collect();
            assert_eq!(lines, (1..=v.procedures.len() as u32).collect::<Vec<_>>());
        }
    }

    #[test]
    fn completed_share_near_configured_weight() {
        let (_, _, _, visits) = fixture(5, 300, 10_000);
        let completed = visits.iter().filter(|v| v.status == AppointmentStatus::Completed).count();
        let share = completed as f64 / visits.len() as f64;
        assert!((0.83..0.87).contains(&share), "completed share {share:.3}");
    }

    // ── Financial chain ──────────────────────────────────────────────────────

    #[test]
    fn completed_rows_reconcile() {
        let (_, _, _, visits) = fixture(6, 300, 3_000);
        for fin in visits.iter().flat_map(|v| &v.procedures).filter_map(|r| r.financials.as_ref()) {
            assert_eq!(fin.insurance_covered + fin.patient_responsibility, fin.charged);
            assert_eq!(fin.discount + fin.out_of_pocket, fin.patient_responsibility);
            assert!(fin.discount >= 0 && fin.out_of_pocket >= 0);
        }
    }

    /// Rounding to whole dollars can move the effective rate by at most 0.5 / charged.
    #[test]
    fn coverage_rate_clamped() {
        let cfg = GeneratorConfig::canonical();
        let registry = Registry::canonical();
        let mut rng = rng(7);
        let insured = patient(Some("Delta Dental"));
        for procedure in &registry.procedures {
            for _ in 0..200 {
                let fin = price_procedure(&mut rng, &cfg.visits, &registry, procedure, &insured, insured.registration_date);
                let rate = fin.insurance_covered as f64 / fin.charged as f64;
                let slack = 0.5 / fin.charged as f64;
                assert!(
                    rate >= 0.5 - slack && rate <= 0.95 + slack,
                    "rate {rate:.4} outside clamp for {}",
                    procedure.code
                );
            }
        }
    }

    fn registry_with_plans(plans: &[(&'static str, f64)]) -> Registry {
        let mut registry = Registry::canonical();
        registry
            .insurance_plans
            .extend(plans.iter().map(|&(name, reimbursement_rate)| InsurancePlan { name, reimbursement_rate }));
        registry
    }

    #[test]
    fn coverage_rate_pinned_at_both_clamp_edges() {
        let cfg = GeneratorConfig::canonical();
        let (lo, hi) = cfg.visits.coverage_clamp;
        let registry = registry_with_plans(&[("Premier Full", 1.1), ("Basic Low", 0.4)]);
        let mut rng = rng(17);
        for (plan, edge) in [("Premier Full", hi), ("Basic Low", lo)] {
            let insured = patient(Some(plan));
            for procedure in &registry.procedures {
                for _ in 0..50 {
                    let fin = price_procedure(&mut rng, &cfg.visits, &registry, procedure, &insured, insured.registration_date);
                    assert_eq!(fin.insurance_covered, round_money(fin.charged as f64 * edge), "{plan} {}", procedure.code);
                    assert_eq!(fin.patient_responsibility, fin.charged - fin.insurance_covered);
                }
            }
        }
    }

    #[test]
    fn unregistered_plan_prices_at_fallback_rate() {
        let cfg = GeneratorConfig::canonical();
        let registry = Registry::canonical();
        let (n_lo, n_hi) = cfg.visits.coverage_noise;
        let (lo, hi) = (FALLBACK_REIMBURSEMENT_RATE * n_lo, FALLBACK_REIMBURSEMENT_RATE * n_hi);
        let mut rng = rng(18);
        let insured = patient(Some("Acme Dental Mutual"));
        let (mut below, mut above) = (0, 0);
        for _ in 0..1_000 {
            let fin = price_procedure(&mut rng, &cfg.visits, &registry, &registry.procedures[2], &insured, insured.registration_date);
            let rate = fin.insurance_covered as f64 / fin.charged as f64;
            let slack = 0.5 / fin.charged as f64;
            assert!(rate >= lo - slack && rate <= hi + slack, "rate {rate:.4} outside fallback band");
            if rate < FALLBACK_REIMBURSEMENT_RATE * 0.97 {
                below += 1;
            }
            if rate > FALLBACK_REIMBURSEMENT_RATE * 1.03 {
                above += 1;
            }
            assert!(fin.claim.is_some());
        }
        assert!(below > 0 && above > 0, "noise not applied: {below} below, {above} above");
    }

    /// A common pick lands in the first 10; a catalog-wide pick does so 10/23 of the time.
    #[test]
    fn common_procedures_picked_at_configured_share() {
        let cfg = GeneratorConfig::canonical();
        let catalog_len = Registry::canonical().procedures.len();
        let common = cfg.visits.common_procedure_count;
        let p = cfg.visits.common_procedure_probability;
        let expected = p + (1.0 - p) * common as f64 / catalog_len as f64;
        let mut rng = rng(19);
        let draws = 20_000;
        let mut hits = 0;
        for _ in 0..draws {
            let idx = pick_procedure(&mut rng, &cfg.visits, catalog_len);
            assert!(idx < catalog_len);
            if idx < common {
                hits += 1;
            }
        }
        let share = hits as f64 / draws as f64;
        assert!((share - expected).abs() < 0.015, "common share {share:.4}, expected {expected:.4}");
    }

    #[test]
    fn discounts_use_configured_rates() {
        let cfg = GeneratorConfig::canonical();
        let registry = Registry::canonical();
        let rates = &cfg.visits.discount_rates;
        let procedure = registry
            .procedures
            .iter()
            .max_by(|a, b| a.avg_fee.total_cmp(&b.avg_fee))
            .unwrap();
        let self_pay = patient(None);
        let mut rng = rng(20);
        let mut seen = vec![false; rates.len()];
        let draws = 4_000;
        let mut discounted = 0;
        for _ in 0..draws {
            let fin = price_procedure(&mut rng, &cfg.visits, &registry, procedure, &self_pay, self_pay.registration_date);
            assert_eq!(fin.out_of_pocket, fin.patient_responsibility - fin.discount);
            if fin.discount == 0 {
                continue;
            }
            discounted += 1;
            let mut matched = false;
            for (i, &r) in rates.iter().enumerate() {
                if fin.discount == round_money(fin.patient_responsibility as f64 * r) {
                    seen[i] = true;
                    matched = true;
                }
            }
            assert!(matched, "discount {} on {} matches no rate", fin.discount, fin.patient_responsibility);
        }
        assert!(seen.iter().all(|&s| s), "rates seen: {seen:?}");
        let share = discounted as f64 / draws as f64;
        assert!((share - cfg.visits.discount_probability).abs() < 0.03, "discount share {share:.3}");
    }

    #[test]
    fn uninsured_patient_pays_everything_and_has_no_claim() {
        let cfg = GeneratorConfig::canonical();
        let registry = Registry::canonical();
        let mut rng = rng(8);
        let self_pay = patient(None);
        for _ in 0..500 {
            let fin = price_procedure(&mut rng, &cfg.visits, &registry, &registry.procedures[4], &self_pay, self_pay.registration_date);
            assert_eq!(fin.insurance_covered, 0);
            assert_eq!(fin.patient_responsibility, fin.charged);
            assert!(fin.claim.is_none());
        }
    }

    #[test]
    fn tooth_only_for_tooth_level_categories() {
        let (_, registry, _, visits) = fixture(9, 200, 3_000);
        for rec in visits.iter().flat_map(|v| &v.procedures) {
            if let Some(fin) = &rec.financials {
                let cat = registry.procedures[rec.procedure].category;
                assert_eq!(fin.tooth.is_some(), cat.needs_tooth(), "{}", cat.as_str());
            }
        }
    }

    #[test]
    fn treatment_plan_dates_bracket_visit() {
        let (_, _, _, visits) = fixture(10, 200, 3_000);
        for v in &visits {
            for fin in v.procedures.iter().filter_map(|r| r.financials.as_ref()) {
                match &fin.treatment_plan {
                    Some(tp) => {
                        assert!(tp.created <= v.service_date);
                        assert!(v.service_date - tp.created <= Duration::days(90));
                        match tp.completed {
                            Some(done) => {
                                assert_eq!(tp.completion_rate, 100);
                                assert!(done >= v.service_date && done - v.service_date <= Duration::days(180));
                            }
                            None => assert!((10..=90).contains(&tp.completion_rate)),
                        }
                        assert!(tp.estimated_total_cost >= fin.charged);
                        assert!(tp.estimated_total_cost <= fin.charged * 2);
                        assert_eq!(tp.id.len(), 6);
                    }
                    None => assert_eq!(fin.estimated_total_cost, fin.charged),
                }
            }
        }
    }

    #[test]
    fn paid_claims_settle_fifteen_to_fortyfive_days_later() {
        let (_, _, _, visits) = fixture(11, 200, 3_000);
        for v in &visits {
            for claim in v.procedures.iter().filter_map(|r| r.financials.as_ref()?.claim.as_ref()) {
                assert_eq!(claim.submitted, v.service_date);
                match claim.status {
                    ClaimStatus::Paid => {
                        let lag = (claim.paid.unwrap() - v.service_date).num_days();
                        assert!((15..=45).contains(&lag), "lag {lag}");
                    }
                    _ => assert!(claim.paid.is_none()),
                }
            }
        }
    }

    #[test]
    fn unpaid_rows_have_no_method() {
        let (_, _, _, visits) = fixture(12, 200, 3_000);
        for fin in visits.iter().flat_map(|v| &v.procedures).filter_map(|r| r.financials.as_ref()) {
            if fin.paid {
                assert_eq!(fin.amount_paid, fin.out_of_pocket);
                assert!(fin.payment_method.is_some());
            } else {
                assert_eq!(fin.amount_paid, 0);
                assert!(fin.payment_method.is_none());
            }
        }
    }

    // ── Scenarios ────────────────────────────────────────────────────────────

    #[test]
    fn single_forced_completed_self_pay_visit() {
        let mut cfg = GeneratorConfig::canonical();
        cfg.patients.count = 1;
        cfg.patients.insured_probability = 0.0;
        cfg.visits.count = 1;
        cfg.visits.status_weights = vec![(AppointmentStatus::Completed, 1.0)];
        let registry = Registry::canonical();
        let mut rng = rng(13);
        let patients = generate_patients(&cfg.patients, &registry, cfg.end, &mut rng);
        let visits = generate_visits(&cfg.visits, &registry, &patients, cfg.start, cfg.end, &mut rng);
        let rows = flatten(&visits, &patients, &registry);

        assert_eq!(visits.len(), 1);
        assert!(!rows.is_empty());
        for row in &rows {
            assert_eq!(row.appointment_status, "Completed");
            assert_eq!(row.insurance_provider, SELF_PAY);
            assert_eq!(row.insurance_covered_amount, 0);
            assert_eq!(row.patient_responsibility, row.charged_amount);
            assert!(row.charged_amount > 0);
            assert!(row.insurance_claim_status.is_none());
            assert!(row.insurance_claim_submission_date.is_none());
            assert!(row.insurance_claim_payment_date.is_none());
            assert!(row.is_new_patient);
        }
    }

    #[test]
    fn non_completed_rows_are_blank() {
        let mut cfg = GeneratorConfig::canonical();
        cfg.patients.count = 50;
        cfg.visits.count = 300;
        cfg.visits.status_weights = vec![
            (AppointmentStatus::NoShow, 1.0),
            (AppointmentStatus::Canceled, 1.0),
            (AppointmentStatus::Rescheduled, 1.0),
        ];
        let registry = Registry::canonical();
        let mut rng = rng(14);
        let patients = generate_patients(&cfg.patients, &registry, cfg.end, &mut rng);
        let visits = generate_visits(&cfg.visits, &registry, &patients, cfg.start, cfg.end, &mut rng);
        let rows = flatten(&visits, &patients, &registry);

        assert!(!rows.is_empty());
        for row in &rows {
            assert!(!row.is_completed());
            assert_eq!(row.charged_amount, 0);
            assert_eq!(row.insurance_covered_amount, 0);
            assert_eq!(row.patient_responsibility, 0);
            assert_eq!(row.discount_applied, 0);
            assert_eq!(row.out_of_pocket, 0);
            assert_eq!(row.amount_paid, 0);
            assert_eq!(row.estimated_total_cost, 0);
            assert!(row.payment_method.is_none());
            assert!(row.payment_status.is_none());
            assert!(row.tooth_number.is_none());
            assert!(row.insurance_claim_status.is_none());
            assert!(row.treatment_plan_id.is_none());
            assert!(row.treatment_plan_completion_rate.is_none());
        }
    }

    // ── Flattening ───────────────────────────────────────────────────────────

    #[test]
    fn rows_sorted_by_service_date() {
        let (_, registry, patients, visits) = fixture(15, 200, 1_500);
        let rows = flatten(&visits, &patients, &registry);
        assert!(rows.windows(2).all(|w| w[0].date_of_service <= w[1].date_of_service));
        let expected: usize = visits.iter().map(|v| v.procedures.len()).sum();
        assert_eq!(rows.len(), expected);
    }

    #[test]
    fn exactly_one_new_patient_visit_per_patient() {
        let (_, registry, patients, visits) = fixture(16, 100, 1_000);
        let rows = flatten(&visits, &patients, &registry);
        let mut new_visits: HashMap<String, String> = HashMap::new();
        for row in rows.iter().filter(|r| r.is_new_patient) {
            let prev = new_visits.insert(row.patient_id.clone(), row.visit_id.clone());
            if let Some(prev) = prev {
                assert_eq!(prev, row.visit_id, "patient {} has two new-patient visits", row.patient_id);
            }
        }
        let distinct: std::collections::HashSet<&String> = rows.iter().map(|r| &r.patient_id).collect();
        assert_eq!(new_visits.len(), distinct.len());
    }

    #[test]
    fn year_and_month_follow_service_date() {
        let (_, registry, patients, visits) = fixture(17, 50, 200);
        for row in flatten(&visits, &patients, &registry) {
            assert_eq!(row.year, row.date_of_service.year());
            assert_eq!(row.month, row.date_of_service.month());
        }
    }

    #[test]
    fn no_patients_no_visits() {
        let cfg = GeneratorConfig::canonical();
        let registry = Registry::canonical();
        let visits = generate_visits(&cfg.visits, &registry, &[], cfg.start, cfg.end, &mut rng(18));
        assert!(visits.is_empty());
    }
}
