//! Analysis Configuration
//!
//! Defines the configuration used by `StratifiedTable2x2`: the exact enumeration
//! limit, the policy for degenerate strata and the optional corrections of the
//! asymptotic tests.
use crate::constants::{DEFAULT_CONFIDENCE_LEVEL, DEFAULT_LIMIT_COMPUTATION_EXACT};
use crate::errors::GasteError;
use crate::utils::{items_to_strings, validate_probability_parameter};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// What to do with a stratum whose row or column total is zero.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum DegeneratePolicy {
    /// Fail construction with `GasteError::DegenerateStratum`.
    #[default]
    Reject,
    /// Drop the stratum with a warning and remember its label.
    Exclude,
}

impl FromStr for DegeneratePolicy {
    type Err = GasteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Reject" | "reject" => Ok(DegeneratePolicy::Reject),
            "Exclude" | "exclude" => Ok(DegeneratePolicy::Exclude),
            _ => Err(GasteError::InvalidParameter(
                "degenerate_strata".to_string(),
                items_to_strings(vec!["Reject", "Exclude"]),
                s.to_string(),
            )),
        }
    }
}

fn default_limit_computation_exact() -> u64 {
    DEFAULT_LIMIT_COMPUTATION_EXACT
}
fn default_confidence_level() -> f64 {
    DEFAULT_CONFIDENCE_LEVEL
}

/// Configuration for `StratifiedTable2x2`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Largest enumeration cost for which the stratified test is computed exactly.
    #[serde(default = "default_limit_computation_exact")]
    pub limit_computation_exact: u64,
    /// Handling of strata with a zero margin.
    #[serde(default)]
    pub degenerate_strata: DegeneratePolicy,
    /// Continuity correction of the CMH statistic.
    #[serde(default)]
    pub cmh_correction: bool,
    /// Tarone adjustment of the Breslow-Day statistic.
    #[serde(default)]
    pub tarone_adjustment: bool,
    /// Confidence level of odds-ratio intervals.
    #[serde(default = "default_confidence_level")]
    pub confidence_level: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            limit_computation_exact: DEFAULT_LIMIT_COMPUTATION_EXACT,
            degenerate_strata: DegeneratePolicy::Reject,
            cmh_correction: false,
            tarone_adjustment: false,
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), GasteError> {
        validate_probability_parameter(self.confidence_level, "confidence_level")
    }
}

/// IO
pub trait ConfigIO: Serialize + DeserializeOwned + Sized {
    /// Save as a json object to a file.
    ///
    /// * `path` - Path to save the configuration.
    fn save_config<P: AsRef<Path>>(&self, path: P) -> Result<(), GasteError> {
        fs::write(path, self.json_dump()?).map_err(|e| GasteError::UnableToWrite(e.to_string()))
    }

    /// Dump as a json object.
    fn json_dump(&self) -> Result<String, GasteError> {
        serde_json::to_string(self).map_err(|e| GasteError::UnableToWrite(e.to_string()))
    }

    /// Load from a json string.
    fn from_json(json_str: &str) -> Result<Self, GasteError> {
        serde_json::from_str::<Self>(json_str).map_err(|e| GasteError::UnableToRead(e.to_string()))
    }

    /// Load from a path to a json object.
    ///
    /// * `path` - Path to load the configuration from.
    fn load_config<P: AsRef<Path>>(path: P) -> Result<Self, GasteError> {
        let json_str = fs::read_to_string(path).map_err(|e| GasteError::UnableToRead(e.to_string()))?;
        Self::from_json(&json_str)
    }
}

impl ConfigIO for AnalysisConfig {}
