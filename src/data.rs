//! Data
//!
//! Input contract for stratified count arrays. Callers hand over signed integer
//! arrays (as they come out of a CSV reader or a reshaped buffer); they are
//! checked here and turned into `[[u64; 2]; 2]` tables, never coerced.
use crate::errors::GasteError;

/// One 2x2 table of counts, `[[a, b], [c, d]]`.
pub type Counts2x2 = [[u64; 2]; 2];

/// A borrowed, row-major `N x 2 x 2` array of counts.
pub struct CountArray<'a> {
    pub data: &'a [i64],
    pub n_strata: usize,
}

impl<'a> CountArray<'a> {
    /// Wrap a flat slice, checking that its length is a multiple of four.
    pub fn new(data: &'a [i64]) -> Result<Self, GasteError> {
        if data.is_empty() {
            return Err(GasteError::Shape("at least one stratum is required".to_string()));
        }
        if data.len() % 4 != 0 {
            return Err(GasteError::Shape(format!(
                "{} counts cannot be reshaped into 2x2 tables",
                data.len()
            )));
        }
        Ok(CountArray {
            data,
            n_strata: data.len() / 4,
        })
    }

    /// Get the count at stratum `i`, row `r`, column `c`.
    #[inline]
    pub fn get(&self, i: usize, r: usize, c: usize) -> i64 {
        self.data[i * 4 + r * 2 + c]
    }

    /// Convert every stratum to an unsigned table.
    pub fn to_tables(&self) -> Result<Vec<Counts2x2>, GasteError> {
        (0..self.n_strata)
            .map(|i| {
                let mut table = [[0u64; 2]; 2];
                for (r, row) in table.iter_mut().enumerate() {
                    for (c, cell) in row.iter_mut().enumerate() {
                        *cell = to_count(i, self.get(i, r, c))?;
                    }
                }
                Ok(table)
            })
            .collect()
    }
}

fn to_count(stratum: usize, value: i64) -> Result<u64, GasteError> {
    u64::try_from(value).map_err(|_| GasteError::NegativeCount { stratum, value })
}

/// Build tables from a flat row-major `N x 2 x 2` array.
pub fn tables_from_flat(data: &[i64]) -> Result<Vec<Counts2x2>, GasteError> {
    CountArray::new(data)?.to_tables()
}

/// Build tables from nested per-stratum matrices, rejecting anything that is not 2x2.
pub fn tables_from_nested(data: &[Vec<Vec<i64>>]) -> Result<Vec<Counts2x2>, GasteError> {
    if data.is_empty() {
        return Err(GasteError::Shape("at least one stratum is required".to_string()));
    }
    data.iter()
        .enumerate()
        .map(|(i, matrix)| {
            if matrix.len() != 2 || matrix.iter().any(|row| row.len() != 2) {
                let shape: Vec<String> = matrix.iter().map(|row| row.len().to_string()).collect();
                return Err(GasteError::Shape(format!(
                    "stratum {} has {} rows with lengths [{}], expected a 2x2 matrix",
                    i,
                    matrix.len(),
                    shape.join(", ")
                )));
            }
            Ok([
                [to_count(i, matrix[0][0])?, to_count(i, matrix[0][1])?],
                [to_count(i, matrix[1][0])?, to_count(i, matrix[1][1])?],
            ])
        })
        .collect()
}

/// Check that there is exactly one label per stratum.
pub fn validate_labels<S: AsRef<str>>(n_strata: usize, labels: &[S]) -> Result<(), GasteError> {
    if labels.len() != n_strata {
        return Err(GasteError::Shape(format!(
            "{} labels provided for {} strata",
            labels.len(),
            n_strata
        )));
    }
    Ok(())
}
