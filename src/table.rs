//! Stratified Table
//!
//! `StratifiedTable2x2` owns an ordered collection of strata together with the
//! axis names shared by all of them, and answers every query of the analysis:
//! pooled exact test, CMH, Breslow-Day, per-stratum Fisher tests, odds ratios
//! and a textual summary. The strata are never modified after construction.
use crate::alternative::Alternative;
use crate::asymptotic::{self, AsymptoticResult};
use crate::combiner::{ExactCombiner, ExactResult};
use crate::config::{AnalysisConfig, DegeneratePolicy};
use crate::data::{tables_from_flat, tables_from_nested, validate_labels, Counts2x2};
use crate::errors::GasteError;
use crate::estimates::{self, ForestPlotData, OddsRatioEstimate};
use crate::stratum::StratumTable;
use hashbrown::HashMap;
use log::{info, warn};
use rayon::prelude::*;
use std::fmt;
use std::sync::RwLock;

/// A stack of 2x2 tables sharing the same row and column categories.
#[derive(Debug)]
pub struct StratifiedTable2x2 {
    strata: Vec<StratumTable>,
    excluded: Vec<String>,
    name_rows: [String; 2],
    name_columns: [String; 2],
    config: AnalysisConfig,
    nb_combination: u64,
    // Stratified test results keyed on (alternative, limit).
    cache: RwLock<HashMap<(Alternative, u64), ExactResult>>,
}

impl StratifiedTable2x2 {
    /// Build from validated tables with the default configuration.
    ///
    /// * `tables` - One 2x2 table per stratum, in analysis order.
    /// * `labels` - One label per stratum.
    /// * `name_rows` - Names of the two rows, shared by all strata.
    /// * `name_columns` - Names of the two columns, shared by all strata.
    pub fn new<S: AsRef<str>>(
        tables: &[Counts2x2],
        labels: &[S],
        name_rows: [&str; 2],
        name_columns: [&str; 2],
    ) -> Result<Self, GasteError> {
        Self::with_config(tables, labels, name_rows, name_columns, AnalysisConfig::default())
    }

    /// Build from validated tables with an explicit configuration.
    pub fn with_config<S: AsRef<str>>(
        tables: &[Counts2x2],
        labels: &[S],
        name_rows: [&str; 2],
        name_columns: [&str; 2],
        config: AnalysisConfig,
    ) -> Result<Self, GasteError> {
        config.validate()?;
        if tables.is_empty() {
            return Err(GasteError::Shape("at least one stratum is required".to_string()));
        }
        validate_labels(tables.len(), labels)?;

        let mut strata = Vec::with_capacity(tables.len());
        let mut excluded = Vec::new();
        for (counts, label) in tables.iter().zip(labels) {
            match StratumTable::new(label.as_ref(), *counts) {
                Ok(stratum) => strata.push(stratum),
                Err(e @ GasteError::DegenerateStratum { .. }) => match config.degenerate_strata {
                    DegeneratePolicy::Reject => return Err(e),
                    DegeneratePolicy::Exclude => {
                        warn!("{} The stratum is excluded from the analysis.", e);
                        excluded.push(label.as_ref().to_string());
                    }
                },
                Err(e) => return Err(e),
            }
        }
        if strata.is_empty() {
            return Err(GasteError::NotEnoughStrata { found: 0, required: 1 });
        }

        let nb_combination = ExactCombiner::new(&strata).nb_combination();
        info!(
            "Stratified table with {} strata ({} excluded), {} combinations for the exact test.",
            strata.len(),
            excluded.len(),
            nb_combination
        );
        Ok(StratifiedTable2x2 {
            strata,
            excluded,
            name_rows: name_rows.map(String::from),
            name_columns: name_columns.map(String::from),
            config,
            nb_combination,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Build from a flat row-major `N x 2 x 2` array of counts.
    pub fn from_flat<S: AsRef<str>>(
        counts: &[i64],
        labels: &[S],
        name_rows: [&str; 2],
        name_columns: [&str; 2],
        config: AnalysisConfig,
    ) -> Result<Self, GasteError> {
        let tables = tables_from_flat(counts)?;
        Self::with_config(&tables, labels, name_rows, name_columns, config)
    }

    /// Build from nested per-stratum matrices.
    pub fn from_nested<S: AsRef<str>>(
        counts: &[Vec<Vec<i64>>],
        labels: &[S],
        name_rows: [&str; 2],
        name_columns: [&str; 2],
        config: AnalysisConfig,
    ) -> Result<Self, GasteError> {
        let tables = tables_from_nested(counts)?;
        Self::with_config(&tables, labels, name_rows, name_columns, config)
    }

    pub fn strata(&self) -> &[StratumTable] {
        &self.strata
    }

    pub fn labels(&self) -> Vec<&str> {
        self.strata.iter().map(|s| s.label()).collect()
    }

    /// Labels of the degenerate strata dropped under `DegeneratePolicy::Exclude`.
    pub fn excluded_labels(&self) -> &[String] {
        &self.excluded
    }

    pub fn name_rows(&self) -> &[String; 2] {
        &self.name_rows
    }

    pub fn name_columns(&self) -> &[String; 2] {
        &self.name_columns
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Number of analysed strata.
    pub fn len(&self) -> usize {
        self.strata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strata.is_empty()
    }

    /// Enumeration cost of the exact stratified test.
    pub fn nb_combination(&self) -> u64 {
        self.nb_combination
    }

    /// Number of joint tables compatible with the margins of every stratum.
    pub fn cartesian_combinations(&self) -> u128 {
        ExactCombiner::new(&self.strata).cartesian_combinations()
    }

    /// Cochran-Mantel-Haenszel test of conditional independence.
    pub fn cmh_test(&self) -> Result<AsymptoticResult, GasteError> {
        asymptotic::cmh_test(&self.strata, self.config.cmh_correction)
    }

    /// Breslow-Day test of homogeneity of the odds ratios.
    pub fn bd_test(&self) -> Result<AsymptoticResult, GasteError> {
        asymptotic::breslow_day_test(&self.strata, self.config.tarone_adjustment)
    }

    /// Stratified exact test with the configured enumeration limit.
    pub fn gaste(&self, alternative: Alternative) -> Result<ExactResult, GasteError> {
        self.gaste_with_limit(alternative, self.config.limit_computation_exact)
    }

    /// Stratified exact test, computed exactly when the enumeration cost does not
    /// exceed `limit_computation_exact` and by the gamma approximation otherwise.
    pub fn gaste_with_limit(
        &self,
        alternative: Alternative,
        limit_computation_exact: u64,
    ) -> Result<ExactResult, GasteError> {
        let key = (alternative, limit_computation_exact);
        if let Some(result) = self.cache.read().ok().and_then(|c| c.get(&key).cloned()) {
            return Ok(result);
        }
        let result = ExactCombiner::new(&self.strata).test(alternative, limit_computation_exact)?;
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(key, result.clone());
        }
        Ok(result)
    }

    /// Fisher exact p-value of each stratum, in stratum order.
    pub fn exact_tests(&self, alternative: Alternative) -> Vec<f64> {
        self.strata.par_iter().map(|s| s.exact_test(alternative)).collect()
    }

    /// One-sided exact p-values per stratum for an odds ratio below one.
    pub fn pval_under(&self) -> Vec<f64> {
        self.exact_tests(Alternative::Less)
    }

    /// One-sided exact p-values per stratum for an odds ratio above one.
    pub fn pval_over(&self) -> Vec<f64> {
        self.exact_tests(Alternative::Greater)
    }

    /// Mantel-Haenszel estimate of the common odds ratio.
    pub fn mantel_haenszel_odds_ratio(&self) -> Result<f64, GasteError> {
        asymptotic::mantel_haenszel_odds_ratio(&self.strata)
    }

    /// Odds ratio and confidence interval of each stratum.
    pub fn odds_ratios(&self) -> Result<Vec<OddsRatioEstimate>, GasteError> {
        self.strata
            .iter()
            .map(|s| estimates::stratum_odds_ratio(s, self.config.confidence_level))
            .collect()
    }

    /// Pooled odds ratio and confidence interval.
    pub fn pooled_odds_ratio(&self) -> Result<OddsRatioEstimate, GasteError> {
        estimates::pooled_odds_ratio(&self.strata, self.config.confidence_level)
    }

    /// Estimates and p-values for a forest plot.
    pub fn forest_plot_data(&self) -> Result<ForestPlotData, GasteError> {
        Ok(ForestPlotData {
            name_rows: self.name_rows.clone(),
            name_columns: self.name_columns.clone(),
            confidence_level: self.config.confidence_level,
            strata: self.odds_ratios()?,
            pooled: self.pooled_odds_ratio()?,
            pval_under: self.pval_under(),
            pval_over: self.pval_over(),
        })
    }

    /// Textual summary: the counts and margins of every stratum, in input order,
    /// with its odds ratio and one-sided exact p-values.
    pub fn resume(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Stratified 2x2 tables: {} strata\nRows: {}, {} | Columns: {}, {}\n",
            self.strata.len(),
            self.name_rows[0],
            self.name_rows[1],
            self.name_columns[0],
            self.name_columns[1]
        ));
        if !self.excluded.is_empty() {
            out.push_str(&format!("Excluded degenerate strata: {}\n", self.excluded.join(", ")));
        }

        let first_width = self.name_rows.iter().map(|n| n.len()).max().unwrap_or(0).max(5);
        let width = self
            .name_columns
            .iter()
            .map(|n| n.len())
            .chain(self.strata.iter().map(|s| s.margins().total.to_string().len()))
            .max()
            .unwrap_or(0)
            .max(5);
        let under = self.pval_under();
        let over = self.pval_over();

        for (i, s) in self.strata.iter().enumerate() {
            let c = s.counts();
            let m = s.margins();
            out.push_str(&format!("\nStratum {}: {}\n", i + 1, s.label()));
            out.push_str(&format!(
                "    {:<first_width$}  {:>width$}  {:>width$}  {:>width$}\n",
                "", self.name_columns[0], self.name_columns[1], "Total"
            ));
            for r in 0..2 {
                out.push_str(&format!(
                    "    {:<first_width$}  {:>width$}  {:>width$}  {:>width$}\n",
                    self.name_rows[r], c[r][0], c[r][1], m.rows[r]
                ));
            }
            out.push_str(&format!(
                "    {:<first_width$}  {:>width$}  {:>width$}  {:>width$}\n",
                "Total", m.columns[0], m.columns[1], m.total
            ));
            match estimates::stratum_odds_ratio(s, self.config.confidence_level) {
                Ok(or) => out.push_str(&format!(
                    "    Odds ratio {:.4} [{:.4}, {:.4}]\n",
                    or.estimate, or.lower, or.upper
                )),
                Err(e) => out.push_str(&format!("    Odds ratio unavailable: {}\n", e)),
            }
            out.push_str(&format!(
                "    Exact p-values: under {:.4e}, over {:.4e}\n",
                under[i], over[i]
            ));
        }
        out.push_str(&format!(
            "\nNumber of combinations in exact calculation of combined p-value: {}\n",
            self.nb_combination
        ));
        out
    }
}

impl fmt::Display for StratifiedTable2x2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.resume())
    }
}
