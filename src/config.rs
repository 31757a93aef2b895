use chrono::NaiveDate;

use crate::appointments::AppointmentStatus;

#[derive(Debug, Clone)]
pub struct PatientConfig {
    pub count: usize,
    /// Inclusive range of registration years.
    pub registration_years: (i32, i32),
    /// Probability a patient holds a (non self-pay) plan.
    pub insured_probability: f64,
    pub active_probability: f64,
}

#[derive(Debug, Clone)]
pub struct VisitConfig {
    pub count: usize,
    /// `u^exponent` skews patient selection toward low indices.
    pub frequent_visitor_exponent: f64,
    pub status_weights: Vec<(AppointmentStatus, f64)>,
    /// Leading catalog entries treated as everyday procedures.
    pub common_procedure_count: usize,
    pub common_procedure_probability: f64,
    pub fee_noise: (f64, f64),
    pub coverage_noise: (f64, f64),
    pub coverage_clamp: (f64, f64),
    pub discount_probability: f64,
    pub discount_rates: Vec<f64>,
    pub paid_probability: f64,
    pub treatment_plan_probability: f64,
    pub treatment_plan_completed_probability: f64,
    pub claim_paid_probability: f64,
}

/// Three-regime maturity curve: fast growth for the first two years after
/// opening, slower for the next two, then a long shallow tail.
/// Each slope is scaled by `U(noise)` per month.
#[derive(Debug, Clone)]
pub struct GrowthCurve {
    pub early_slope: f64,
    pub mid_base: f64,
    pub mid_slope: f64,
    pub mature_base: f64,
    pub mature_slope: f64,
    pub noise: (f64, f64),
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// `None` draws a fresh seed from the OS (and logs it).
    pub seed: Option<u64>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub patients: PatientConfig,
    pub visits: VisitConfig,
    pub growth: GrowthCurve,
}

impl GeneratorConfig {
    pub fn canonical() -> Self {
        GeneratorConfig {
            seed: None,
            start: NaiveDate::from_ymd_opt(2020, 1, 1).expect("valid start date"),
            end: NaiveDate::from_ymd_opt(2024, 12, 31).expect("valid end date"),
            patients: PatientConfig {
                count: 500,
                registration_years: (2018, 2024),
                insured_probability: 0.8,
                active_probability: 0.9,
            },
            visits: VisitConfig {
                count: 2_000,
                frequent_visitor_exponent: 1.5,
                status_weights: vec![
                    (AppointmentStatus::Completed, 0.85),
                    (AppointmentStatus::NoShow, 0.05),
                    (AppointmentStatus::Canceled, 0.07),
                    (AppointmentStatus::Rescheduled, 0.03),
                ],
                common_procedure_count: 10,
                common_procedure_probability: 0.6,
                fee_noise: (0.9, 1.1),
                coverage_noise: (0.9, 1.1),
                coverage_clamp: (0.5, 0.95),
                discount_probability: 0.15,
                discount_rates: vec![0.10, 0.20, 0.30],
                paid_probability: 0.95,
                treatment_plan_probability: 0.3,
                treatment_plan_completed_probability: 0.6,
                claim_paid_probability: 0.95,
            },
            growth: GrowthCurve {
                early_slope: 0.2,
                mid_base: 0.4,
                mid_slope: 0.12,
                mature_base: 0.64,
                mature_slope: 0.055,
                noise: (0.9, 1.1),
            },
        }
    }
}
