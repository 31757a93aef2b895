use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use tracing_subscriber::EnvFilter;

use dental_synth::config::GeneratorConfig;
use dental_synth::generator::Generator;
use dental_synth::output::{self, Format};
use dental_synth::report;

fn next_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str> {
    *i += 1;
    args.get(*i).map(String::as_str).with_context(|| format!("{flag} requires a value"))
}

fn parse_date(s: &str, flag: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("{flag} expects YYYY-MM-DD, got {s:?}"))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dental_synth=info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut config = GeneratorConfig::canonical();
    let mut output_dir = PathBuf::from("data");
    let mut format = Format::Csv;
    let mut quiet = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--seed" => {
                let v = next_value(&args, &mut i, "--seed")?;
                config.seed = Some(v.parse().with_context(|| format!("--seed requires a u64, got {v:?}"))?);
            }
            "--patients" => {
                let v = next_value(&args, &mut i, "--patients")?;
                config.patients.count = v.parse().with_context(|| format!("--patients requires a count, got {v:?}"))?;
            }
            "--visits" => {
                let v = next_value(&args, &mut i, "--visits")?;
                config.visits.count = v.parse().with_context(|| format!("--visits requires a count, got {v:?}"))?;
            }
            "--start" => config.start = parse_date(next_value(&args, &mut i, "--start")?, "--start")?,
            "--end" => config.end = parse_date(next_value(&args, &mut i, "--end")?, "--end")?,
            "--output-dir" => output_dir = PathBuf::from(next_value(&args, &mut i, "--output-dir")?),
            "--format" => {
                let v = next_value(&args, &mut i, "--format")?;
                format = Format::parse(v).with_context(|| format!("--format must be csv or ndjson, got {v:?}"))?;
            }
            "--quiet" => quiet = true,
            other => bail!("unknown argument {other:?}"),
        }
        i += 1;
    }

    let (start, end) = (config.start, config.end);
    let mut generator = Generator::new(config).context("invalid generator configuration")?;

    let appointments = generator.appointments();
    let financials = generator.monthly_financials();

    let a_path = output_dir.join(format!("appointments.{}", format.extension()));
    let b_path = output_dir.join(format!("monthly_financials.{}", format.extension()));
    output::write_rows(&a_path, &appointments.rows, format)
        .with_context(|| format!("failed to write {}", a_path.display()))?;
    output::write_rows(&b_path, &financials, format)
        .with_context(|| format!("failed to write {}", b_path.display()))?;

    if !quiet {
        println!("Seed: {}", generator.seed);
        println!(
            "Appointments: {} rows ({} patients, {} visits) → {}",
            appointments.rows.len(),
            appointments.patients.len(),
            appointments.visits.len(),
            a_path.display()
        );
        println!("Monthly financials: {} records → {}", financials.len(), b_path.display());
        report::print_report(&appointments.rows, &financials, start, end);
    }
    Ok(())
}
