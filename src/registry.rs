//! Static reference data shared by both pipelines.
//!
//! Everything here is built once by [`Registry::canonical`] and only ever
//! borrowed by the generators.

use chrono::NaiveDate;
use serde::Serialize;

use crate::types::{LocationId, ProviderId};

/// Plan rate used when a plan name is missing from the registry.
pub const FALLBACK_REIMBURSEMENT_RATE: f64 = 0.75;

/// Name written to `Insurance_Provider` for uninsured patients.
pub const SELF_PAY: &str = "Self-Pay";

#[derive(Debug, Clone)]
pub struct Location {
    pub id: LocationId,
    pub name: &'static str,
    pub address: &'static str,
    pub open_date: NaiveDate,
    pub square_footage: u32,
    pub monthly_rent: f64,
    pub acquisition_cost: i64,
    pub acquisition_date: NaiveDate,
    pub rating: f64,
    /// Monthly base revenue band before seasonality and growth.
    pub base_revenue: (f64, f64),
}

impl Location {
    /// Operatory chairs: LOC001 runs five, LOC002 four, everything else three.
    pub fn chair_count(&self) -> u32 {
        match self.id.0 {
            1 => 5,
            2 => 4,
            _ => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProviderRole {
    Dentist,
    Hygienist,
}

impl ProviderRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderRole::Dentist => "Dentist",
            ProviderRole::Hygienist => "Hygienist",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Provider {
    pub id: ProviderId,
    pub name: &'static str,
    pub role: ProviderRole,
    pub primary_location: LocationId,
    pub specialty: &'static str,
}

#[derive(Debug, Clone)]
pub struct InsurancePlan {
    pub name: &'static str,
    /// Average share of the charged amount the payer reimburses, in (0, 1].
    pub reimbursement_rate: f64,
}

impl InsurancePlan {
    pub fn is_self_pay(&self) -> bool {
        self.name == SELF_PAY
    }
}

/// Service line of a procedure. Doubles as the revenue breakdown of the
/// monthly statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ProcedureCategory {
    Diagnostic,
    Preventive,
    Restorative,
    Endodontic,
    Periodontic,
    Prosthodontic,
    OralSurgery,
    Orthodontic,
    Implant,
    Adjunctive,
}

impl ProcedureCategory {
    pub const ALL: [ProcedureCategory; 10] = [
        ProcedureCategory::Diagnostic,
        ProcedureCategory::Preventive,
        ProcedureCategory::Restorative,
        ProcedureCategory::Endodontic,
        ProcedureCategory::Periodontic,
        ProcedureCategory::Prosthodontic,
        ProcedureCategory::OralSurgery,
        ProcedureCategory::Orthodontic,
        ProcedureCategory::Implant,
        ProcedureCategory::Adjunctive,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProcedureCategory::Diagnostic => "Diagnostic",
            ProcedureCategory::Preventive => "Preventive",
            ProcedureCategory::Restorative => "Restorative",
            ProcedureCategory::Endodontic => "Endodontic",
            ProcedureCategory::Periodontic => "Periodontic",
            ProcedureCategory::Prosthodontic => "Prosthodontic",
            ProcedureCategory::OralSurgery => "Oral Surgery",
            ProcedureCategory::Orthodontic => "Orthodontic",
            ProcedureCategory::Implant => "Implant",
            ProcedureCategory::Adjunctive => "Adjunctive",
        }
    }

    /// Whether a procedure in this category is charted against a single tooth.
    pub fn needs_tooth(self) -> bool {
        matches!(
            self,
            ProcedureCategory::Restorative
                | ProcedureCategory::Endodontic
                | ProcedureCategory::Periodontic
                | ProcedureCategory::Implant
        )
    }

    /// Target share of monthly revenue. Sums to 1.0 across `ALL`.
    pub fn revenue_weight(self) -> f64 {
        match self {
            ProcedureCategory::Diagnostic => 0.10,
            ProcedureCategory::Preventive => 0.18,
            ProcedureCategory::Restorative => 0.22,
            ProcedureCategory::Endodontic => 0.08,
            ProcedureCategory::Periodontic => 0.07,
            ProcedureCategory::Prosthodontic => 0.10,
            ProcedureCategory::OralSurgery => 0.06,
            ProcedureCategory::Orthodontic => 0.07,
            ProcedureCategory::Implant => 0.07,
            ProcedureCategory::Adjunctive => 0.05,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcedureType {
    pub code: &'static str,
    pub description: &'static str,
    pub category: ProcedureCategory,
    pub avg_fee: f64,
    /// Typical chair time in minutes.
    pub duration: u32,
}

/// How a monthly expense line is sized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExpenseBasis {
    /// `revenue × U(lo, hi)`.
    RevenueShare(f64, f64),
    /// `location.monthly_rent × U(lo, hi)`.
    Rent(f64, f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpenseCategory {
    LaborClinical,
    LaborAdministrative,
    SuppliesClinical,
    SuppliesOffice,
    RentLease,
    Utilities,
    EquipmentCosts,
    Marketing,
    Insurance,
    ProfessionalFees,
    ContinuingEducation,
    LabFees,
    SoftwareIt,
    Travel,
    Miscellaneous,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 15] = [
        ExpenseCategory::LaborClinical,
        ExpenseCategory::LaborAdministrative,
        ExpenseCategory::SuppliesClinical,
        ExpenseCategory::SuppliesOffice,
        ExpenseCategory::RentLease,
        ExpenseCategory::Utilities,
        ExpenseCategory::EquipmentCosts,
        ExpenseCategory::Marketing,
        ExpenseCategory::Insurance,
        ExpenseCategory::ProfessionalFees,
        ExpenseCategory::ContinuingEducation,
        ExpenseCategory::LabFees,
        ExpenseCategory::SoftwareIt,
        ExpenseCategory::Travel,
        ExpenseCategory::Miscellaneous,
    ];

    pub fn basis(self) -> ExpenseBasis {
        use ExpenseBasis::{RevenueShare, Rent};
        match self {
            ExpenseCategory::LaborClinical => RevenueShare(0.18, 0.22),
            ExpenseCategory::LaborAdministrative => RevenueShare(0.06, 0.10),
            ExpenseCategory::SuppliesClinical => RevenueShare(0.05, 0.08),
            ExpenseCategory::SuppliesOffice => RevenueShare(0.01, 0.02),
            ExpenseCategory::RentLease => Rent(0.98, 1.02),
            ExpenseCategory::Utilities => RevenueShare(0.01, 0.03),
            ExpenseCategory::EquipmentCosts => RevenueShare(0.03, 0.05),
            ExpenseCategory::Marketing => RevenueShare(0.03, 0.07),
            ExpenseCategory::Insurance => RevenueShare(0.02, 0.04),
            ExpenseCategory::ProfessionalFees => RevenueShare(0.02, 0.04),
            ExpenseCategory::ContinuingEducation => RevenueShare(0.005, 0.015),
            ExpenseCategory::LabFees => RevenueShare(0.06, 0.10),
            ExpenseCategory::SoftwareIt => RevenueShare(0.01, 0.03),
            ExpenseCategory::Travel => RevenueShare(0.005, 0.015),
            ExpenseCategory::Miscellaneous => RevenueShare(0.01, 0.03),
        }
    }
}

pub struct Registry {
    pub locations: Vec<Location>,
    pub providers: Vec<Provider>,
    /// All plans, including the self-pay sentinel.
    pub insurance_plans: Vec<InsurancePlan>,
    /// Ordered so the first entries are the everyday procedures.
    pub procedures: Vec<ProcedureType>,
    /// Payor-mix target weights, in `Payor_*` column order. Sums to 1.0.
    pub payor_mix: Vec<(&'static str, f64)>,
    pub teeth: Vec<String>,
    pub payment_methods: Vec<&'static str>,
    pub male_first_names: Vec<&'static str>,
    pub female_first_names: Vec<&'static str>,
    pub last_names: Vec<&'static str>,
    pub zip_codes: Vec<&'static str>,
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("registry dates are valid")
}

impl Registry {
    /// Reimbursement rate for `plan_name`, falling back to
    /// [`FALLBACK_REIMBURSEMENT_RATE`] when the plan is not registered.
    pub fn reimbursement_rate(&self, plan_name: &str) -> f64 {
        match self.insurance_plans.iter().find(|p| p.name == plan_name) {
            Some(plan) => plan.reimbursement_rate,
            None => {
                tracing::warn!(plan = plan_name, "unknown insurance plan, using fallback rate");
                FALLBACK_REIMBURSEMENT_RATE
            }
        }
    }

    /// Plans a patient can actually hold a policy with.
    pub fn insured_plans(&self) -> Vec<&InsurancePlan> {
        self.insurance_plans.iter().filter(|p| !p.is_self_pay()).collect()
    }

    pub fn location(&self, id: LocationId) -> Option<&Location> {
        self.locations.iter().find(|l| l.id == id)
    }

    pub fn canonical() -> Self {
        // ── Locations: three size tiers ─────────────────────────────────────
        let locations = vec![
            Location {
                id: LocationId(1),
                name: "Bright Smiles Downtown",
                address: "120 Main Street, Springfield, IL 62701",
                open_date: date(2015, 3, 15),
                square_footage: 4_500,
                monthly_rent: 18_000.0,
                acquisition_cost: 2_400_000,
                acquisition_date: date(2019, 6, 1),
                rating: 4.7,
                base_revenue: (180_000.0, 220_000.0),
            },
            Location {
                id: LocationId(2),
                name: "Bright Smiles Westside",
                address: "4875 West Wabash Avenue, Springfield, IL 62704",
                open_date: date(2017, 8, 1),
                square_footage: 3_600,
                monthly_rent: 14_000.0,
                acquisition_cost: 1_750_000,
                acquisition_date: date(2020, 2, 15),
                rating: 4.5,
                base_revenue: (140_000.0, 170_000.0),
            },
            Location {
                id: LocationId(3),
                name: "Bright Smiles Lakeside",
                address: "2301 Lake Shore Drive, Chatham, IL 62629",
                open_date: date(2019, 11, 10),
                square_footage: 2_800,
                monthly_rent: 10_500.0,
                acquisition_cost: 1_150_000,
                acquisition_date: date(2019, 11, 10),
                rating: 4.3,
                base_revenue: (100_000.0, 130_000.0),
            },
        ];

        let providers = vec![
            Provider { id: ProviderId(1), name: "Dr. Sarah Mitchell",     role: ProviderRole::Dentist,   primary_location: LocationId(1), specialty: "General Dentistry" },
            Provider { id: ProviderId(2), name: "Dr. James Chen",         role: ProviderRole::Dentist,   primary_location: LocationId(1), specialty: "Endodontics" },
            Provider { id: ProviderId(3), name: "Emily Rodriguez, RDH",   role: ProviderRole::Hygienist, primary_location: LocationId(1), specialty: "Preventive Care" },
            Provider { id: ProviderId(4), name: "Dr. Michael Patel",      role: ProviderRole::Dentist,   primary_location: LocationId(2), specialty: "Periodontics" },
            Provider { id: ProviderId(5), name: "Dr. Laura Nguyen",       role: ProviderRole::Dentist,   primary_location: LocationId(2), specialty: "Orthodontics" },
            Provider { id: ProviderId(6), name: "Jessica Thompson, RDH",  role: ProviderRole::Hygienist, primary_location: LocationId(2), specialty: "Preventive Care" },
            Provider { id: ProviderId(7), name: "Dr. Robert Kim",         role: ProviderRole::Dentist,   primary_location: LocationId(3), specialty: "Oral Surgery" },
            Provider { id: ProviderId(8), name: "Amanda Lopez, RDH",      role: ProviderRole::Hygienist, primary_location: LocationId(3), specialty: "Preventive Care" },
        ];

        let insurance_plans = vec![
            InsurancePlan { name: "Delta Dental",      reimbursement_rate: 0.80 },
            InsurancePlan { name: "Cigna",             reimbursement_rate: 0.75 },
            InsurancePlan { name: "Aetna",             reimbursement_rate: 0.78 },
            InsurancePlan { name: "MetLife",           reimbursement_rate: 0.72 },
            InsurancePlan { name: "Guardian",          reimbursement_rate: 0.70 },
            InsurancePlan { name: "United Healthcare", reimbursement_rate: 0.74 },
            InsurancePlan { name: SELF_PAY,            reimbursement_rate: 1.0 },
        ];

        use ProcedureCategory::*;
        let procedures = vec![
            // Common (first ten): weighted sampling favours these.
            ProcedureType { code: "D0120", description: "Periodic Oral Evaluation",            category: Diagnostic,    avg_fee: 65.0,    duration: 15 },
            ProcedureType { code: "D0150", description: "Comprehensive Oral Evaluation",       category: Diagnostic,    avg_fee: 110.0,   duration: 30 },
            ProcedureType { code: "D0210", description: "Full Mouth X-Rays",                   category: Diagnostic,    avg_fee: 150.0,   duration: 20 },
            ProcedureType { code: "D0274", description: "Bitewing X-Rays (Four Films)",        category: Diagnostic,    avg_fee: 75.0,    duration: 10 },
            ProcedureType { code: "D1110", description: "Adult Prophylaxis",                   category: Preventive,    avg_fee: 115.0,   duration: 45 },
            ProcedureType { code: "D1208", description: "Topical Fluoride",                    category: Preventive,    avg_fee: 40.0,    duration: 10 },
            ProcedureType { code: "D2140", description: "Amalgam Filling, One Surface",        category: Restorative,   avg_fee: 150.0,   duration: 30 },
            ProcedureType { code: "D2330", description: "Resin Composite, Anterior",           category: Restorative,   avg_fee: 180.0,   duration: 40 },
            ProcedureType { code: "D2391", description: "Resin Composite, Posterior",          category: Restorative,   avg_fee: 200.0,   duration: 45 },
            ProcedureType { code: "D4910", description: "Periodontal Maintenance",             category: Periodontic,   avg_fee: 160.0,   duration: 60 },
            // Less frequent, higher-value work.
            ProcedureType { code: "D2740", description: "Porcelain Crown",                     category: Prosthodontic, avg_fee: 1_200.0, duration: 90 },
            ProcedureType { code: "D2750", description: "Porcelain Fused to Metal Crown",      category: Prosthodontic, avg_fee: 1_100.0, duration: 90 },
            ProcedureType { code: "D5110", description: "Complete Upper Denture",              category: Prosthodontic, avg_fee: 1_800.0, duration: 120 },
            ProcedureType { code: "D3310", description: "Root Canal, Anterior",                category: Endodontic,    avg_fee: 850.0,   duration: 90 },
            ProcedureType { code: "D3330", description: "Root Canal, Molar",                   category: Endodontic,    avg_fee: 1_150.0, duration: 120 },
            ProcedureType { code: "D4341", description: "Scaling and Root Planing, Per Quadrant", category: Periodontic, avg_fee: 250.0,  duration: 60 },
            ProcedureType { code: "D6010", description: "Endosteal Implant Placement",         category: Implant,       avg_fee: 2_200.0, duration: 120 },
            ProcedureType { code: "D6065", description: "Implant Supported Crown",             category: Implant,       avg_fee: 1_600.0, duration: 90 },
            ProcedureType { code: "D7140", description: "Simple Extraction",                   category: OralSurgery,   avg_fee: 180.0,   duration: 30 },
            ProcedureType { code: "D7210", description: "Surgical Extraction",                 category: OralSurgery,   avg_fee: 320.0,   duration: 60 },
            ProcedureType { code: "D8080", description: "Comprehensive Orthodontic Treatment", category: Orthodontic,   avg_fee: 5_500.0, duration: 90 },
            ProcedureType { code: "D9972", description: "External Bleaching, Per Arch",        category: Adjunctive,    avg_fee: 400.0,   duration: 60 },
            ProcedureType { code: "D9110", description: "Palliative Treatment of Pain",        category: Adjunctive,    avg_fee: 120.0,   duration: 30 },
        ];

        let payor_mix = vec![
            ("Delta Dental", 0.25),
            ("Cigna", 0.18),
            ("Aetna", 0.15),
            ("MetLife", 0.12),
            ("Guardian", 0.10),
            ("United Healthcare", 0.08),
            (SELF_PAY, 0.12),
        ];

        Registry {
            locations,
            providers,
            insurance_plans,
            procedures,
            payor_mix,
            teeth: (1..=32).map(|t| t.to_string()).collect(),
            payment_methods: vec!["Credit Card", "Debit Card", "Cash", "Check", "HSA/FSA"],
            male_first_names: vec![
                "James", "John", "Robert", "Michael", "William", "David", "Richard", "Joseph",
                "Thomas", "Charles", "Daniel", "Matthew", "Anthony", "Mark", "Steven", "Paul",
                "Andrew", "Joshua", "Kevin", "Brian",
            ],
            female_first_names: vec![
                "Mary", "Patricia", "Jennifer", "Linda", "Elizabeth", "Barbara", "Susan",
                "Jessica", "Sarah", "Karen", "Nancy", "Lisa", "Margaret", "Betty", "Sandra",
                "Ashley", "Emily", "Donna", "Michelle", "Laura",
            ],
            last_names: vec![
                "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis",
                "Rodriguez", "Martinez", "Hernandez", "Lopez", "Gonzalez", "Wilson", "Anderson",
                "Thomas", "Taylor", "Moore", "Jackson", "Martin", "Lee", "Perez", "Thompson",
                "White", "Harris", "Sanchez", "Clark", "Ramirez", "Lewis", "Robinson",
            ],
            zip_codes: vec![
                "62701", "62702", "62703", "62704", "62707", "62711", "62712", "62629",
                "62661", "62670", "62677", "62684",
            ],
        }
    }
}
