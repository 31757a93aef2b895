use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use dental_synth::appointments::{flatten, generate_visits};
use dental_synth::comparative::apply_period_deltas;
use dental_synth::config::GeneratorConfig;
use dental_synth::financials::generate_monthly_financials;
use dental_synth::patients::generate_patients;
use dental_synth::registry::Registry;

// ── Group 1: visit count scaling ────────────────────────────────────────────

fn bench_visits(c: &mut Criterion) {
    let registry = Registry::canonical();
    let cfg = GeneratorConfig::canonical();
    let patients = generate_patients(&cfg.patients, &registry, cfg.end, &mut ChaCha20Rng::seed_from_u64(42));

    let mut group = c.benchmark_group("visits");
    for &count in &[500usize, 2_000, 10_000, 50_000] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &n| {
            let mut visit_cfg = cfg.visits.clone();
            visit_cfg.count = n;
            b.iter_batched(
                || ChaCha20Rng::seed_from_u64(7),
                |mut rng| {
                    let visits = generate_visits(&visit_cfg, &registry, &patients, cfg.start, cfg.end, &mut rng);
                    flatten(&visits, &patients, &registry)
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

// ── Group 2: horizon length scaling ────────────────────────────────────────

fn bench_monthly(c: &mut Criterion) {
    let registry = Registry::canonical();

    let mut group = c.benchmark_group("monthly");
    for &years in &[1i32, 5, 20] {
        let mut cfg = GeneratorConfig::canonical();
        cfg.end = chrono::NaiveDate::from_ymd_opt(2019 + years, 12, 31).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(years), &cfg, |b, cfg| {
            b.iter_batched(
                || ChaCha20Rng::seed_from_u64(11),
                |mut rng| {
                    let mut records = generate_monthly_financials(cfg, &registry, &mut rng);
                    apply_period_deltas(&mut records);
                    records
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_visits, bench_monthly);
criterion_main!(benches);
