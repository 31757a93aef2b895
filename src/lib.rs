pub mod analysis;
pub mod appointments;
pub mod comparative;
pub mod config;
pub mod financials;
pub mod generator;
pub mod output;
pub mod patients;
pub mod registry;
pub mod report;
pub mod sampling;
pub mod types;
