//! Reads a generated run back from disk and reports on it.
//!
//! Usage: `summarize [appointments.csv] [monthly_financials.csv] [--start YYYY-MM-DD] [--end YYYY-MM-DD]`
//!
//! Both files are deserialized through the same row types the generator
//! writes, then checked and tallied:
//!   Tier 1: PASS/FAIL per invariant (8 appointment, 6 financial)
//!   Tier 2: appointments by year, financials by location

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use tracing_subscriber::EnvFilter;

use dental_synth::appointments::AppointmentRow;
use dental_synth::config::GeneratorConfig;
use dental_synth::financials::MonthlyFinancialRecord;
use dental_synth::{output, report};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dental_synth=info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let canonical = GeneratorConfig::canonical();
    let (mut start, mut end) = (canonical.start, canonical.end);
    let mut positional: Vec<PathBuf> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            flag @ ("--start" | "--end") => {
                i += 1;
                let raw = args.get(i).with_context(|| format!("{flag} requires a value"))?;
                let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .with_context(|| format!("{flag} expects YYYY-MM-DD, got {raw:?}"))?;
                if flag == "--start" {
                    start = date;
                } else {
                    end = date;
                }
            }
            other if other.starts_with("--") => bail!("unknown argument {other:?}"),
            path => positional.push(PathBuf::from(path)),
        }
        i += 1;
    }

    let mut paths = positional.into_iter();
    let a_path = paths.next().unwrap_or_else(|| PathBuf::from("data/appointments.csv"));
    let b_path = paths.next().unwrap_or_else(|| PathBuf::from("data/monthly_financials.csv"));

    let rows: Vec<AppointmentRow> =
        output::read_rows(&a_path).with_context(|| format!("cannot read {}", a_path.display()))?;
    let records: Vec<MonthlyFinancialRecord> =
        output::read_rows(&b_path).with_context(|| format!("cannot read {}", b_path.display()))?;

    println!("Appointments: {} rows from {}", rows.len(), a_path.display());
    println!("Monthly financials: {} records from {}", records.len(), b_path.display());

    let total_revenue: i64 = records.iter().map(|r| r.total_revenue).sum();
    let total_ebitda: i64 = records.iter().map(|r| r.ebitda).sum();
    let total_charged: i64 = rows.iter().map(|r| r.charged_amount).sum();
    println!("Total charged (appointments): {total_charged}");
    println!("Total revenue (financials):   {total_revenue}");
    println!("Total EBITDA (financials):    {total_ebitda}");

    report::print_report(&rows, &records, start, end);
    Ok(())
}
