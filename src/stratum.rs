//! Stratum
//!
//! A single 2x2 table together with its fixed margins. Conditional on the
//! margins, any one cell determines the whole table and follows a
//! hypergeometric law; this module exposes that law's support and mass.
use crate::alternative::Alternative;
use crate::data::Counts2x2;
use crate::distribution::DiscreteDistribution;
use crate::errors::GasteError;
use serde::{Deserialize, Serialize};
use statrs::function::factorial::ln_binomial;
use std::ops::RangeInclusive;

/// A cell of the 2x2 table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Cell {
    /// Row 1, column 1. The designated cell for pooled tests.
    #[default]
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Cell {
    /// (row, column) index of the cell.
    pub fn position(self) -> (usize, usize) {
        match self {
            Cell::TopLeft => (0, 0),
            Cell::TopRight => (0, 1),
            Cell::BottomLeft => (1, 0),
            Cell::BottomRight => (1, 1),
        }
    }
}

/// Row totals, column totals and grand total of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Margins {
    pub rows: [u64; 2],
    pub columns: [u64; 2],
    pub total: u64,
}

impl Margins {
    pub fn from_counts(counts: &Counts2x2) -> Self {
        let rows = [counts[0][0] + counts[0][1], counts[1][0] + counts[1][1]];
        let columns = [counts[0][0] + counts[1][0], counts[0][1] + counts[1][1]];
        Margins {
            rows,
            columns,
            total: rows[0] + rows[1],
        }
    }
}

/// One stratum: a labelled 2x2 table with non-zero margins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StratumRecord")]
pub struct StratumTable {
    label: String,
    counts: Counts2x2,
    margins: Margins,
}

/// Serialized form of a stratum; margins are always recomputed from the counts.
#[derive(Deserialize)]
struct StratumRecord {
    label: String,
    counts: Counts2x2,
}

impl TryFrom<StratumRecord> for StratumTable {
    type Error = GasteError;

    fn try_from(record: StratumRecord) -> Result<Self, Self::Error> {
        StratumTable::new(record.label, record.counts)
    }
}

impl StratumTable {
    /// Build a stratum, rejecting tables with a zero row or column total.
    /// Such tables have a single feasible configuration and carry no
    /// information about association.
    pub fn new(label: impl Into<String>, counts: Counts2x2) -> Result<Self, GasteError> {
        let label = label.into();
        let margins = Margins::from_counts(&counts);
        for (i, total) in margins.rows.iter().enumerate() {
            if *total == 0 {
                return Err(GasteError::DegenerateStratum {
                    label,
                    reason: format!("row {} total is zero", i + 1),
                });
            }
        }
        for (j, total) in margins.columns.iter().enumerate() {
            if *total == 0 {
                return Err(GasteError::DegenerateStratum {
                    label,
                    reason: format!("column {} total is zero", j + 1),
                });
            }
        }
        Ok(StratumTable { label, counts, margins })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn counts(&self) -> &Counts2x2 {
        &self.counts
    }

    pub fn count(&self, cell: Cell) -> u64 {
        let (r, c) = cell.position();
        self.counts[r][c]
    }

    /// Count of the designated (top-left) cell.
    pub fn observed(&self) -> u64 {
        self.counts[0][0]
    }

    pub fn margins(&self) -> &Margins {
        &self.margins
    }

    /// Row total and column total crossing at `cell`, and the grand total.
    fn cell_margins(&self, cell: Cell) -> (u64, u64, u64) {
        let (r, c) = cell.position();
        (self.margins.rows[r], self.margins.columns[c], self.margins.total)
    }

    /// Feasible values of `cell` given the margins:
    /// `max(0, n1 + n2 - N) ..= min(n1, n2)`.
    pub fn support(&self, cell: Cell) -> RangeInclusive<u64> {
        let (n1, n2, n) = self.cell_margins(cell);
        (n1 + n2).saturating_sub(n)..=n1.min(n2)
    }

    /// Number of feasible values of the designated cell.
    pub fn support_size(&self) -> usize {
        let support = self.support(Cell::TopLeft);
        (support.end() - support.start() + 1) as usize
    }

    /// Log of the hypergeometric mass of `cell == value`, computed from log
    /// binomial coefficients so large counts do not overflow.
    pub fn ln_pmf(&self, cell: Cell, value: u64) -> f64 {
        if !self.support(cell).contains(&value) {
            return f64::NEG_INFINITY;
        }
        let (n1, n2, n) = self.cell_margins(cell);
        ln_binomial(n2, value) + ln_binomial(n - n2, n1 - value) - ln_binomial(n, n1)
    }

    /// Hypergeometric mass of `cell == value`, zero outside the support.
    pub fn pmf(&self, cell: Cell, value: u64) -> f64 {
        self.ln_pmf(cell, value).exp()
    }

    /// Conditional null distribution of the designated cell.
    pub fn null_distribution(&self) -> DiscreteDistribution {
        let support = self.support(Cell::TopLeft);
        let offset = *support.start();
        let probabilities = support.map(|x| self.pmf(Cell::TopLeft, x)).collect();
        DiscreteDistribution::from_parts(offset, probabilities)
    }

    /// Hypergeometric mean of the designated cell.
    pub fn null_mean(&self) -> f64 {
        let m = &self.margins;
        m.rows[0] as f64 * m.columns[0] as f64 / m.total as f64
    }

    /// Hypergeometric variance of the designated cell.
    pub fn null_variance(&self) -> f64 {
        let m = &self.margins;
        let n = m.total as f64;
        m.rows[0] as f64 * m.rows[1] as f64 * m.columns[0] as f64 * m.columns[1] as f64 / (n * n * (n - 1.0))
    }

    /// Fisher exact p-value of this stratum alone. Both one-sided tails
    /// include the mass of the observed table.
    pub fn exact_test(&self, alternative: Alternative) -> f64 {
        self.null_distribution().pvalue(self.observed(), alternative)
    }
}
