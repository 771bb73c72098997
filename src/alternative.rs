//! Alternative
//!
//! Direction of the alternative hypothesis. Strings coming from callers are parsed
//! once at the boundary; everything downstream works on the closed enum.
use crate::errors::GasteError;
use crate::utils::{clamp_probability, items_to_strings};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Direction of the test with respect to the designated (top-left) cell,
/// or equivalently the odds ratio.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Alternative {
    /// Under-association: odds ratio below one.
    #[default]
    Less,
    /// Over-association: odds ratio above one.
    Greater,
    /// Twice the smaller one-sided tail, capped at one.
    TwoSided,
}

impl Alternative {
    /// Combine the two one-sided tails into the p-value for this direction.
    /// Both tails include the probability of the observed value.
    #[inline]
    pub fn pvalue_from_tails(&self, lower_tail: f64, upper_tail: f64) -> f64 {
        let p = match self {
            Alternative::Less => lower_tail,
            Alternative::Greater => upper_tail,
            Alternative::TwoSided => 2.0 * lower_tail.min(upper_tail),
        };
        clamp_probability(p)
    }
}

impl FromStr for Alternative {
    type Err = GasteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "less" => Ok(Alternative::Less),
            "greater" => Ok(Alternative::Greater),
            "two-sided" | "two_sided" => Ok(Alternative::TwoSided),
            _ => Err(GasteError::InvalidAlternative(
                s.to_string(),
                items_to_strings(vec!["less", "greater", "two-sided"]),
            )),
        }
    }
}

impl fmt::Display for Alternative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Alternative::Less => "less",
            Alternative::Greater => "greater",
            Alternative::TwoSided => "two-sided",
        };
        f.write_str(s)
    }
}
