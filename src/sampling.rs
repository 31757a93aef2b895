use rand::Rng;

/// Continuous uniform draw on `[lo, hi)`. A degenerate band (`lo == hi`)
/// returns `lo` instead of panicking like `random_range` would.
pub fn uniform(rng: &mut impl Rng, lo: f64, hi: f64) -> f64 {
    lo + (hi - lo) * rng.random::<f64>()
}

/// Integer uniform draw on the closed interval `[lo, hi]`.
pub fn uniform_int(rng: &mut impl Rng, lo: i64, hi: i64) -> i64 {
    if hi <= lo { lo } else { rng.random_range(lo..=hi) }
}

/// Cumulative-weight categorical draw.
///
/// Draws `u` uniform on `[0, Σw)` and walks the table accumulating weights,
/// returning the first entry whose cumulative weight exceeds `u`. Floating
/// point slack at the top of the range falls through to the last entry.
/// Returns `None` only for an empty table.
pub fn weighted_choice<'a, T>(rng: &mut impl Rng, choices: &'a [(T, f64)]) -> Option<&'a T> {
    let total: f64 = choices.iter().map(|(_, w)| w.max(0.0)).sum();
    let u = rng.random::<f64>() * total;
    let mut cumulative = 0.0;
    for (value, weight) in choices {
        cumulative += weight.max(0.0);
        if u < cumulative {
            return Some(value);
        }
    }
    choices.iter().rev().find(|(_, w)| *w > 0.0).or(choices.last()).map(|(v, _)| v)
}

/// Round half-to-even to whole currency units.
pub fn round_money(x: f64) -> i64 {
    x.round_ties_even() as i64
}

/// Round a ratio to 4 decimal places.
pub fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// Round to 2 decimal places (per-unit KPIs).
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// `num / den` rounded to 4 places, or 0.0 when the denominator is zero.
pub fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 { 0.0 } else { round4(num / den) }
}

/// Per-unit KPI (`num / den`) rounded to cents, or 0.0 for a zero denominator.
pub fn per_unit(num: f64, den: f64) -> f64 {
    if den == 0.0 { 0.0 } else { round2(num / den) }
}

/// Split `total` across `weights` so the parts sum to `total` exactly.
///
/// Weights are renormalised to sum to 1, each part is rounded, and the last
/// part absorbs whatever rounding remainder is left.
pub fn apportion(total: i64, weights: &[f64]) -> Vec<i64> {
    if weights.is_empty() {
        return Vec::new();
    }
    let sum: f64 = weights.iter().sum();
    let n = weights.len();
    let mut parts: Vec<i64> = weights
        .iter()
        .take(n - 1)
        .map(|w| {
            let share = if sum > 0.0 { w / sum } else { 1.0 / n as f64 };
            round_money(total as f64 * share)
        })
        .collect();
    let allocated: i64 = parts.iter().sum();
    parts.push(total - allocated);
    parts
}

/// Perturb each target weight by an independent `U(lo, hi)` factor, then
/// apportion `total` across the perturbed weights.
pub fn perturbed_split(rng: &mut impl Rng, total: i64, targets: &[f64], band: (f64, f64)) -> Vec<i64> {
    let weights: Vec<f64> = targets.iter().map(|t| t * uniform(rng, band.0, band.1)).collect();
    apportion(total, &weights)
}
