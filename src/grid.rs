//! Grid assembly for contour rendering
//!
//! Turns sparse (x, y, metric) observations into a rectangular table:
//! rows are the sorted distinct x values, columns the sorted distinct y values.
//! Missing interior cells stay empty; rows or columns without a single
//! observation are dropped.

use crate::cache::ResultRecord;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Bit-exact key for an (x, y) position (`-0.0` folds onto `0.0`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridKey(u64, u64);

impl GridKey {
    pub fn new(x: f64, y: f64) -> Self {
        GridKey(canonical_bits(x), canonical_bits(y))
    }

    pub fn of(record: &ResultRecord) -> Self {
        GridKey::new(record.x, record.y)
    }
}

fn canonical_bits(v: f64) -> u64 {
    if v == 0.0 {
        0.0f64.to_bits()
    } else {
        v.to_bits()
    }
}

/// Cutoff values that must never reach the grid, e.g. cutoffs that were
/// only measured under an incompatible sweep and would leave a ragged column
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Exclusions {
    cutoffs: Vec<f64>,
}

impl Exclusions {
    pub fn new(cutoffs: impl IntoIterator<Item = f64>) -> Self {
        Exclusions {
            cutoffs: cutoffs.into_iter().collect(),
        }
    }

    pub fn excludes_cutoff(&self, y: f64) -> bool {
        self.cutoffs.iter().any(|&c| c == y)
    }

    pub fn is_empty(&self) -> bool {
        self.cutoffs.is_empty()
    }
}

/// Rectangular metric table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    /// Sorted distinct x values (row index)
    rows: Vec<f64>,
    /// Sorted distinct y values (column index)
    columns: Vec<f64>,
    /// `cells[row][column]`
    cells: Vec<Vec<Option<f64>>>,
}

impl Grid {
    /// Assemble a grid from observations.
    ///
    /// Two records at the same (x, y) are an error, whatever their values.
    /// Non-finite metrics count as absent observations.
    pub fn assemble(records: &[ResultRecord]) -> Result<Self> {
        Self::assemble_with(records, &Exclusions::default())
    }

    /// Assemble, dropping records whose cutoff is excluded
    pub fn assemble_with(records: &[ResultRecord], exclusions: &Exclusions) -> Result<Self> {
        let mut seen: HashMap<GridKey, &ResultRecord> = HashMap::with_capacity(records.len());
        for record in records {
            if let Some(previous) = seen.insert(GridKey::of(record), record) {
                bail!(
                    "Duplicate grid position ({}, {}): values {} and {}",
                    record.x,
                    record.y,
                    previous.metric,
                    record.metric
                );
            }
        }

        let observed: Vec<&ResultRecord> = records
            .iter()
            .filter(|r| r.metric.is_finite() && !exclusions.excludes_cutoff(r.y))
            .collect();

        let rows = sorted_distinct(observed.iter().map(|r| r.x));
        let columns = sorted_distinct(observed.iter().map(|r| r.y));

        let mut cells = vec![vec![None; columns.len()]; rows.len()];
        for record in observed {
            if let (Some(i), Some(j)) = (position(&rows, record.x), position(&columns, record.y)) {
                cells[i][j] = Some(record.metric);
            }
        }

        Ok(Grid {
            rows,
            columns,
            cells,
        })
    }

    pub fn rows(&self) -> &[f64] {
        &self.rows
    }

    pub fn columns(&self) -> &[f64] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of occupied cells
    pub fn filled(&self) -> usize {
        self.cells.iter().flatten().filter(|c| c.is_some()).count()
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<f64> {
        self.cells.get(row)?.get(column).copied().flatten()
    }

    /// Value at (x, y), if observed
    pub fn get(&self, x: f64, y: f64) -> Option<f64> {
        let i = position(&self.rows, x)?;
        let j = position(&self.columns, y)?;
        self.cells[i][j]
    }

    /// Occupied cells as `(x, y, value)` in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.cells.iter().enumerate().flat_map(move |(i, row)| {
            row.iter()
                .enumerate()
                .filter_map(move |(j, cell)| cell.map(|v| (self.rows[i], self.columns[j], v)))
        })
    }

    /// Cell with the highest value (first in row-major order on ties)
    pub fn best(&self) -> Option<(f64, f64, f64)> {
        self.iter().fold(None, |best, cell| match best {
            Some((_, _, v)) if v >= cell.2 => best,
            _ => Some(cell),
        })
    }

    /// Minimum and maximum occupied values
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.iter().fold(None, |range, (_, _, v)| match range {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }
}

fn sorted_distinct(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut v: Vec<f64> = values.collect();
    v.sort_by(|a, b| a.total_cmp(b));
    v.dedup_by(|a, b| a == b);
    v
}

fn position(axis: &[f64], value: f64) -> Option<usize> {
    axis.iter().position(|&a| a == value)
}
