//! Asymptotic Tests
//!
//! Closed-form large-sample tests over the same strata the exact combiner uses:
//! the Cochran-Mantel-Haenszel test of conditional independence and the
//! Breslow-Day test of homogeneity of the odds ratios.
use crate::constants::{CONTINUITY_CORRECTION, FITTED_COUNT_MAX_ITER, FITTED_COUNT_TOLERANCE};
use crate::errors::GasteError;
use crate::stratum::{Cell, StratumTable};
use log::debug;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Statistic, degrees of freedom and p-value of a chi-square test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsymptoticResult {
    pub statistic: f64,
    pub df: usize,
    pub pvalue: f64,
}

fn chi2_sf(statistic: f64, df: usize) -> Result<f64, GasteError> {
    let dist = ChiSquared::new(df as f64).map_err(|e| {
        GasteError::InvalidParameter("degrees of freedom".to_string(), "a positive value".to_string(), e.to_string())
    })?;
    Ok(dist.sf(statistic))
}

/// Cochran-Mantel-Haenszel test.
///
/// The statistic is `(sum(a - E[a]))^2 / sum(Var[a])` with hypergeometric moments,
/// compared to a chi-square law with one degree of freedom. With `correction`
/// the absolute deviation is reduced by one half before squaring.
pub fn cmh_test(strata: &[StratumTable], correction: bool) -> Result<AsymptoticResult, GasteError> {
    if strata.is_empty() {
        return Err(GasteError::NotEnoughStrata { found: 0, required: 1 });
    }
    let (deviation, variance) = strata.iter().fold((0.0, 0.0), |(d, v), s| {
        (d + s.observed() as f64 - s.null_mean(), v + s.null_variance())
    });
    let deviation = if correction {
        (deviation.abs() - CONTINUITY_CORRECTION).max(0.0)
    } else {
        deviation.abs()
    };
    let statistic = deviation * deviation / variance;
    Ok(AsymptoticResult {
        statistic,
        df: 1,
        pvalue: chi2_sf(statistic, 1)?,
    })
}

/// Mantel-Haenszel estimate of the common odds ratio, `sum(ad/n) / sum(bc/n)`.
pub fn mantel_haenszel_odds_ratio(strata: &[StratumTable]) -> Result<f64, GasteError> {
    let (r, s) = mantel_haenszel_sums(strata);
    if r == 0.0 || s == 0.0 {
        return Err(GasteError::UndefinedOddsRatio(format!(
            "sum(ad/n) = {} and sum(bc/n) = {}",
            r, s
        )));
    }
    Ok(r / s)
}

pub(crate) fn mantel_haenszel_sums(strata: &[StratumTable]) -> (f64, f64) {
    strata.iter().fold((0.0, 0.0), |(r, s), t| {
        let n = t.margins().total as f64;
        let [[a, b], [c, d]] = (*t.counts()).map(|row| row.map(|x| x as f64));
        (r + a * d / n, s + b * c / n)
    })
}

/// Outcome of the bracketed root search.
pub struct RootResult {
    pub x: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Root of an increasing function on `[lo, hi]` with `f(lo) <= 0 <= f(hi)`.
///
/// Newton steps are taken while they stay inside the current bracket, bisection
/// otherwise, so the iterate never leaves `[lo, hi]`.
pub fn find_root<F, D>(f: F, df: D, lo: f64, hi: f64, tol: f64, max_iter: usize) -> RootResult
where
    F: Fn(f64) -> f64,
    D: Fn(f64) -> f64,
{
    let (mut a, mut b) = (lo, hi);
    let (fa, fb) = (f(a), f(b));
    if fa == 0.0 {
        return RootResult { x: a, iterations: 0, converged: true };
    }
    if fb == 0.0 {
        return RootResult { x: b, iterations: 0, converged: true };
    }
    // Also catches NaN.
    if !(fa < 0.0 && fb > 0.0) {
        return RootResult { x: f64::NAN, iterations: 0, converged: false };
    }

    let mut x = 0.5 * (a + b);
    for iter in 0..max_iter {
        let fx = f(x);
        if fx == 0.0 {
            return RootResult { x, iterations: iter + 1, converged: true };
        }
        if fx < 0.0 {
            a = x;
        } else {
            b = x;
        }
        let d = df(x);
        let newton = x - fx / d;
        let next = if d > 0.0 && newton > a && newton < b {
            newton
        } else {
            0.5 * (a + b)
        };
        let tol1 = tol * (1.0 + x.abs());
        if (next - x).abs() <= tol1 || (b - a) <= tol1 {
            return RootResult { x: next, iterations: iter + 1, converged: true };
        }
        x = next;
    }
    RootResult { x, iterations: max_iter, converged: false }
}

/// Expected top-left count of `stratum` under a common odds ratio, given its margins.
pub fn fitted_count(stratum: &StratumTable, odds_ratio: f64) -> Result<f64, GasteError> {
    solve_fitted_count(stratum, odds_ratio, FITTED_COUNT_MAX_ITER)
}

pub(crate) fn solve_fitted_count(stratum: &StratumTable, odds_ratio: f64, max_iter: usize) -> Result<f64, GasteError> {
    let m = stratum.margins();
    let (r0, c0, n) = (m.rows[0] as f64, m.columns[0] as f64, m.total as f64);
    let support = stratum.support(Cell::TopLeft);
    let (lo, hi) = (*support.start() as f64, *support.end() as f64);

    // x d / (b c) = psi, rearranged so the function increases over the support.
    let f = |x: f64| x * (n - r0 - c0 + x) - odds_ratio * (r0 - x) * (c0 - x);
    let df = |x: f64| (n - r0 - c0 + 2.0 * x) + odds_ratio * ((r0 - x) + (c0 - x));

    let root = find_root(f, df, lo, hi, FITTED_COUNT_TOLERANCE, max_iter);
    if !root.converged || !(lo..=hi).contains(&root.x) {
        return Err(GasteError::NonConvergence {
            label: stratum.label().to_string(),
            iterations: root.iterations,
        });
    }
    Ok(root.x)
}

/// Breslow-Day test of homogeneity of the odds ratios.
///
/// Each stratum's top-left count is compared to its fitted value under the
/// Mantel-Haenszel common odds ratio, scaled by the variance of the fitted
/// table. With `tarone` the Tarone correction is subtracted. The statistic
/// has `strata - 1` degrees of freedom.
pub fn breslow_day_test(strata: &[StratumTable], tarone: bool) -> Result<AsymptoticResult, GasteError> {
    if strata.len() < 2 {
        return Err(GasteError::NotEnoughStrata {
            found: strata.len(),
            required: 2,
        });
    }
    let odds_ratio = mantel_haenszel_odds_ratio(strata)?;

    let mut statistic = 0.0;
    let mut sum_deviation = 0.0;
    let mut sum_variance = 0.0;
    for s in strata {
        let m = s.margins();
        let x = fitted_count(s, odds_ratio)?;
        let fitted = [
            x,
            m.rows[0] as f64 - x,
            m.columns[0] as f64 - x,
            m.total as f64 - m.rows[0] as f64 - m.columns[0] as f64 + x,
        ];
        let variance = 1.0 / fitted.iter().map(|v| 1.0 / v).sum::<f64>();
        let deviation = s.observed() as f64 - x;
        debug!(
            "Stratum '{}': observed {}, fitted {:.4}, variance {:.4}.",
            s.label(),
            s.observed(),
            x,
            variance
        );
        statistic += deviation * deviation / variance;
        sum_deviation += deviation;
        sum_variance += variance;
    }
    if tarone {
        statistic -= sum_deviation * sum_deviation / sum_variance;
    }

    let df = strata.len() - 1;
    Ok(AsymptoticResult {
        statistic,
        df,
        pvalue: chi2_sf(statistic, df)?,
    })
}
