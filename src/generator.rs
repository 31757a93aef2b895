use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use thiserror::Error;

use crate::appointments::{AppointmentRow, Visit, flatten, generate_visits};
use crate::comparative::apply_period_deltas;
use crate::config::GeneratorConfig;
use crate::financials::{MonthlyFinancialRecord, generate_monthly_financials};
use crate::patients::{Patient, generate_patients};
use crate::registry::Registry;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("start date {start} is after end date {end}")]
    InvertedHorizon { start: chrono::NaiveDate, end: chrono::NaiveDate },
}

/// Output of the patient/visit pipeline.
pub struct AppointmentData {
    pub patients: Vec<Patient>,
    pub visits: Vec<Visit>,
    pub rows: Vec<AppointmentRow>,
}

/// Owns the configuration, the registries, and the single RNG every draw
/// comes from. Pipelines run in call order on the same stream, so a seed
/// reproduces a whole run only when the calls are made in the same order.
pub struct Generator {
    pub config: GeneratorConfig,
    pub registry: Registry,
    pub seed: u64,
    rng: ChaCha20Rng,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Result<Self, ConfigError> {
        Self::with_registry(config, Registry::canonical())
    }

    pub fn with_registry(config: GeneratorConfig, registry: Registry) -> Result<Self, ConfigError> {
        if config.start > config.end {
            return Err(ConfigError::InvertedHorizon { start: config.start, end: config.end });
        }
        let seed = match config.seed {
            Some(s) => s,
            None => {
                let s: u64 = rand::rng().random();
                tracing::info!(seed = s, "no seed given; drew one from the OS");
                s
            }
        };
        tracing::info!(seed, start = %config.start, end = %config.end, "generator ready");
        Ok(Generator { rng: ChaCha20Rng::seed_from_u64(seed), seed, config, registry })
    }

    /// Pipeline 1: patients, then visits, then flattened file rows.
    pub fn appointments(&mut self) -> AppointmentData {
        let cfg = &self.config;
        let patients = generate_patients(&cfg.patients, &self.registry, cfg.end, &mut self.rng);
        let visits = generate_visits(&cfg.visits, &self.registry, &patients, cfg.start, cfg.end, &mut self.rng);
        let rows = flatten(&visits, &patients, &self.registry);
        let completed = visits.iter().filter(|v| v.procedures.iter().any(|p| p.financials.is_some())).count();
        tracing::info!(
            patients = patients.len(),
            visits = visits.len(),
            completed,
            rows = rows.len(),
            "appointments generated"
        );
        AppointmentData { patients, visits, rows }
    }

    /// Pipeline 2: monthly statements per location, then the comparative pass.
    pub fn monthly_financials(&mut self) -> Vec<MonthlyFinancialRecord> {
        let mut records = generate_monthly_financials(&self.config, &self.registry, &mut self.rng);
        apply_period_deltas(&mut records);
        tracing::info!(records = records.len(), locations = self.registry.locations.len(), "monthly financials generated");
        records
    }
}
