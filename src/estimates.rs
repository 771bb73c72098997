//! Estimates
//!
//! Odds-ratio point estimates and confidence intervals, per stratum and pooled.
//! These are what a forest plot draws; rendering itself lives outside this crate.
use crate::asymptotic::mantel_haenszel_sums;
use crate::constants::HALDANE_CORRECTION;
use crate::errors::GasteError;
use crate::stratum::StratumTable;
use crate::utils::validate_probability_parameter;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

pub const POOLED_LABEL: &str = "Pooled (Mantel-Haenszel)";

/// Odds ratio with a symmetric confidence interval on the log scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsRatioEstimate {
    pub label: String,
    pub estimate: f64,
    pub lower: f64,
    pub upper: f64,
    /// Standard error of the log odds ratio.
    pub log_standard_error: f64,
}

impl OddsRatioEstimate {
    fn from_log_scale(label: String, log_estimate: f64, log_standard_error: f64, z: f64) -> Self {
        OddsRatioEstimate {
            label,
            estimate: log_estimate.exp(),
            lower: (log_estimate - z * log_standard_error).exp(),
            upper: (log_estimate + z * log_standard_error).exp(),
            log_standard_error,
        }
    }
}

/// Two-sided normal quantile for the given confidence level.
fn z_critical(confidence_level: f64) -> Result<f64, GasteError> {
    validate_probability_parameter(confidence_level, "confidence_level")?;
    let normal = Normal::new(0.0, 1.0).map_err(|e| {
        GasteError::InvalidParameter("normal distribution".to_string(), "unit normal".to_string(), e.to_string())
    })?;
    Ok(normal.inverse_cdf(1.0 - (1.0 - confidence_level) / 2.0))
}

/// Sample odds ratio `ad / bc` with a Woolf interval. A half is added to every
/// cell when any cell is zero.
pub fn stratum_odds_ratio(stratum: &StratumTable, confidence_level: f64) -> Result<OddsRatioEstimate, GasteError> {
    let z = z_critical(confidence_level)?;
    let counts = *stratum.counts();
    let shift = if counts.iter().flatten().any(|&x| x == 0) {
        HALDANE_CORRECTION
    } else {
        0.0
    };
    let [[a, b], [c, d]] = counts.map(|row| row.map(|x| x as f64 + shift));
    let log_estimate = (a * d / (b * c)).ln();
    let log_standard_error = (1.0 / a + 1.0 / b + 1.0 / c + 1.0 / d).sqrt();
    Ok(OddsRatioEstimate::from_log_scale(
        stratum.label().to_string(),
        log_estimate,
        log_standard_error,
        z,
    ))
}

/// Mantel-Haenszel common odds ratio with the Robins-Breslow-Greenland
/// variance of its logarithm.
pub fn pooled_odds_ratio(strata: &[StratumTable], confidence_level: f64) -> Result<OddsRatioEstimate, GasteError> {
    let z = z_critical(confidence_level)?;
    let (r, s) = mantel_haenszel_sums(strata);
    if r == 0.0 || s == 0.0 {
        return Err(GasteError::UndefinedOddsRatio(format!(
            "sum(ad/n) = {} and sum(bc/n) = {}",
            r, s
        )));
    }

    let (mut pr, mut ps_qr, mut qs) = (0.0, 0.0, 0.0);
    for t in strata {
        let n = t.margins().total as f64;
        let [[a, b], [c, d]] = (*t.counts()).map(|row| row.map(|x| x as f64));
        let (ri, si) = (a * d / n, b * c / n);
        let (pi, qi) = ((a + d) / n, (b + c) / n);
        pr += pi * ri;
        ps_qr += pi * si + qi * ri;
        qs += qi * si;
    }
    let variance = pr / (2.0 * r * r) + ps_qr / (2.0 * r * s) + qs / (2.0 * s * s);

    Ok(OddsRatioEstimate::from_log_scale(
        POOLED_LABEL.to_string(),
        (r / s).ln(),
        variance.sqrt(),
        z,
    ))
}

/// Everything a forest plot needs, ready to be serialized for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestPlotData {
    pub name_rows: [String; 2],
    pub name_columns: [String; 2],
    pub confidence_level: f64,
    pub strata: Vec<OddsRatioEstimate>,
    pub pooled: OddsRatioEstimate,
    /// One-sided exact p-value per stratum, odds ratio below one.
    pub pval_under: Vec<f64>,
    /// One-sided exact p-value per stratum, odds ratio above one.
    pub pval_over: Vec<f64>,
}

impl ForestPlotData {
    /// Dump as a json object.
    pub fn json_dump(&self) -> Result<String, GasteError> {
        serde_json::to_string(self).map_err(|e| GasteError::UnableToWrite(e.to_string()))
    }
}
