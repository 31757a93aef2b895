use chrono::NaiveDate;
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Serialize;

use crate::config::PatientConfig;
use crate::registry::Registry;
use crate::sampling::uniform_int;
use crate::types::PatientId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Patient {
    pub id: PatientId,
    pub first_name: &'static str,
    pub last_name: &'static str,
    pub gender: Gender,
    pub age: u32,
    pub zip_code: &'static str,
    pub registration_date: NaiveDate,
    /// Plan name; `None` means self-pay.
    pub insurance: Option<&'static str>,
    pub active: bool,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_insured(&self) -> bool {
        self.insurance.is_some()
    }
}

/// Build the patient population.
///
/// Registration dates are drawn over `config.registration_years` (day 1–28 of
/// a uniform month) and clamped to `latest_registration`, so every patient
/// has a non-empty window in which a visit can fall.
pub fn generate_patients(
    config: &PatientConfig,
    registry: &Registry,
    latest_registration: NaiveDate,
    rng: &mut impl Rng,
) -> Vec<Patient> {
    let plans = registry.insured_plans();

    (0..config.count)
        .map(|i| {
            let gender = if rng.random_bool(0.5) { Gender::Male } else { Gender::Female };
            let pool = match gender {
                Gender::Male => &registry.male_first_names,
                Gender::Female => &registry.female_first_names,
            };
            let first_name = pool.choose(rng).copied().unwrap_or("Alex");
            let last_name = registry.last_names.choose(rng).copied().unwrap_or("Doe");
            let age = uniform_int(rng, 18, 85) as u32;
            let zip_code = registry.zip_codes.choose(rng).copied().unwrap_or("00000");

            let insurance = if rng.random_bool(config.insured_probability) {
                plans.choose(rng).map(|p| p.name)
            } else {
                None
            };

            let (first_year, last_year) = config.registration_years;
            let year = uniform_int(rng, first_year as i64, last_year as i64) as i32;
            let month = uniform_int(rng, 1, 12) as u32;
            let day = uniform_int(rng, 1, 28) as u32;
            let registration_date = NaiveDate::from_ymd_opt(year, month, day)
                .unwrap_or(latest_registration)
                .min(latest_registration);

            let active = rng.random_bool(config.active_probability);

            Patient {
                id: PatientId(i as u64 + 1),
                first_name,
                last_name,
                gender,
                age,
                zip_code,
                registration_date,
                insurance,
                active,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::config::GeneratorConfig;

    fn generate(count: usize, seed: u64) -> Vec<Patient> {
        let mut cfg = GeneratorConfig::canonical();
        cfg.patients.count = count;
        let registry = Registry::canonical();
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        generate_patients(&cfg.patients, &registry, cfg.end, &mut rng)
    }

    #[test]
    fn produces_exact_count_with_sequential_ids() {
        let patients = generate(250, 7);
        assert_eq!(patients.len(), 250);
        for (i, p) in patients.iter().enumerate() {
            assert_eq!(p.id, PatientId(i as u64 + 1));
        }
    }

    #[test]
    fn ages_within_adult_range() {
        for p in generate(1_000, 1) {
            assert!((18..=85).contains(&p.age), "age {} out of range", p.age);
        }
    }

    #[test]
    fn first_name_matches_gender_pool() {
        let registry = Registry::canonical();
        for p in generate(500, 3) {
            let pool = match p.gender {
                Gender::Male => &registry.male_first_names,
                Gender::Female => &registry.female_first_names,
            };
            assert!(pool.contains(&p.first_name), "{} not in {:?} pool", p.first_name, p.gender);
        }
    }

    #[test]
    fn registration_inside_window() {
        let lo = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap();
        let hi = NaiveDate::from_ymd_opt(2024, 12, 28).unwrap();
        for p in generate(1_000, 11) {
            assert!(p.registration_date >= lo && p.registration_date <= hi);
        }
    }

    #[test]
    fn registration_clamped_to_latest() {
        let cfg = GeneratorConfig::canonical();
        let registry = Registry::canonical();
        let cap = NaiveDate::from_ymd_opt(2019, 6, 30).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let patients = generate_patients(&cfg.patients, &registry, cap, &mut rng);
        assert!(patients.iter().all(|p| p.registration_date <= cap));
    }

    /// 80 % insured over 4k patients: share within [0.77, 0.83], never self-pay by name.
    #[test]
    fn insured_share_near_eighty_percent() {
        let patients = generate(4_000, 21);
        let insured = patients.iter().filter(|p| p.is_insured()).count();
        let share = insured as f64 / patients.len() as f64;
        assert!((0.77..=0.83).contains(&share), "insured share {share:.3}");
        assert!(patients.iter().all(|p| p.insurance != Some(crate::registry::SELF_PAY)));
    }

    #[test]
    fn zero_insured_probability_yields_self_pay_only() {
        let mut cfg = GeneratorConfig::canonical();
        cfg.patients.count = 100;
        cfg.patients.insured_probability = 0.0;
        let registry = Registry::canonical();
        let mut rng = ChaCha20Rng::seed_from_u64(9);
        let patients = generate_patients(&cfg.patients, &registry, cfg.end, &mut rng);
        assert!(patients.iter().all(|p| p.insurance.is_none()));
    }

    #[test]
    fn same_seed_same_population() {
        assert_eq!(generate(50, 99), generate(50, 99));
    }
}
