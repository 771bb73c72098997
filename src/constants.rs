pub const DEFAULT_LIMIT_COMPUTATION_EXACT: u64 = 10_000_000;
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;
pub const CONTINUITY_CORRECTION: f64 = 0.5;
pub const HALDANE_CORRECTION: f64 = 0.5;
pub const FITTED_COUNT_TOLERANCE: f64 = 1e-10;
pub const FITTED_COUNT_MAX_ITER: usize = 200;
