//! Errors
//!
//! Custom error types used throughout the `gaste` crate.
use thiserror::Error;

/// Errors that can occur while building or analysing stratified 2x2 tables.
#[derive(Debug, Error, PartialEq)]
pub enum GasteError {
    /// Malformed input, wrong dimensions or mismatched label count.
    #[error("Malformed input: {0}")]
    Shape(String),
    /// A negative count was found in the input arrays.
    #[error("Stratum number {stratum} contains the negative count {value}.")]
    NegativeCount { stratum: usize, value: i64 },
    /// A stratum with a zero row or column total.
    #[error("Stratum '{label}' is degenerate: {reason}.")]
    DegenerateStratum { label: String, reason: String },
    /// The Breslow-Day fitted count could not be found within tolerance.
    #[error("Fitted count of stratum '{label}' did not converge after {iterations} iterations.")]
    NonConvergence { label: String, iterations: usize },
    /// Invalid value passed for the test direction.
    #[error("Invalid alternative {0} passed, expected one of {1}.")]
    InvalidAlternative(String, String),
    /// First value is the name of the parameter, second is expected, third is what was passed.
    #[error("Invalid parameter value passed for {0}, expected {1} but {2} provided.")]
    InvalidParameter(String, String, String),
    /// The test needs more strata than are available.
    #[error("The test requires at least {required} strata, but {found} were provided.")]
    NotEnoughStrata { found: usize, required: usize },
    /// The pooled odds ratio is zero or infinite.
    #[error("The pooled odds ratio is undefined: {0}")]
    UndefinedOddsRatio(String),
    /// Unable to write configuration or results to file.
    #[error("Unable to write to file: {0}")]
    UnableToWrite(String),
    /// Unable to read configuration from file.
    #[error("Unable to read from file: {0}")]
    UnableToRead(String),
}
