//! Spread → win probability → American moneyline.
//!
//! The home-minus-away margin is modeled as `Normal(spread, margin_sd)`, so
//! the home win probability is `P(margin > 0) = Φ(spread / margin_sd)`.
//! No draw is modeled; the away probability is the complement.

use std::f64::consts::{FRAC_2_SQRT_PI, PI, SQRT_2};

/// Probabilities are clamped into `[PROB_FLOOR, 1 - PROB_FLOOR]` before
/// conversion so odds stay finite.
pub const PROB_FLOOR: f64 = 1e-6;

const SERIES_CUTOFF: f64 = 2.5;
const CF_DEPTH: u32 = 60;

/// Error function, accurate to roughly 1e-14 over the real line.
///
/// Maclaurin series below `|x| = 2.5`, Laplace continued fraction for
/// `erfc` above. Computed on `|x|` and re-signed so `erf(-x) == -erf(x)`
/// holds exactly.
pub fn erf(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    let ax = x.abs();
    let value = if ax < SERIES_CUTOFF {
        erf_series(ax)
    } else {
        1.0 - erfc_continued_fraction(ax)
    };
    value.copysign(x)
}

fn erf_series(x: f64) -> f64 {
    let x2 = x * x;
    let mut term = x;
    let mut sum = x;
    for n in 1..200 {
        term *= -x2 / n as f64;
        let contribution = term / (2 * n + 1) as f64;
        sum += contribution;
        if contribution.abs() <= 1e-17 * sum.abs() {
            break;
        }
    }
    sum * FRAC_2_SQRT_PI
}

fn erfc_continued_fraction(x: f64) -> f64 {
    if x > 27.0 {
        return 0.0;
    }
    let mut t = x;
    for k in (1..=CF_DEPTH).rev() {
        t = x + (k as f64 / 2.0) / t;
    }
    (-x * x).exp() / (PI.sqrt() * t)
}

/// Probability the home side wins given its expected margin.
pub fn win_prob_from_spread(spread: f64, margin_sd: f64) -> f64 {
    let z = spread / (margin_sd * SQRT_2);
    0.5 * (1.0 + erf(z))
}

/// American odds for a win probability.
///
/// Favorites (`p >= 0.5`) get a negative price (risk that much to win 100),
/// underdogs a positive one (win that much per 100 risked). Rounds half away
/// from zero, so `p = 0.5` prices at exactly `-100`.
pub fn american_odds_from_prob(p: f64) -> i32 {
    let p = p.clamp(PROB_FLOOR, 1.0 - PROB_FLOOR);
    if p >= 0.5 {
        (-100.0 * p / (1.0 - p)).round() as i32
    } else {
        (100.0 * (1.0 - p) / p).round() as i32
    }
}
