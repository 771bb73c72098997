// Modules
pub mod alternative;
pub mod asymptotic;
pub mod combiner;
pub mod config;
pub mod constants;
pub mod data;
pub mod distribution;
pub mod errors;
pub mod estimates;
pub mod stratum;
pub mod table;
pub mod utils;

// Individual classes, and functions
pub use alternative::Alternative;
pub use asymptotic::AsymptoticResult;
pub use combiner::{ExactCombiner, ExactResult, Method};
pub use config::{AnalysisConfig, ConfigIO, DegeneratePolicy};
pub use errors::GasteError;
pub use estimates::{ForestPlotData, OddsRatioEstimate};
pub use stratum::{Cell, Margins, StratumTable};
pub use table::StratifiedTable2x2;
