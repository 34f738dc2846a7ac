//! Compressed sparse row matrices.
//!
//! Transition matrices are stored as `T_a[s][s']` and observation matrices
//! as `O_a[s'][o]`, one matrix per action. Rows are the "from" side, so
//! belief propagation uses [`SparseMatrix::transpose_mul`] and value
//! iteration uses [`SparseMatrix::mul_dense`].

use crate::vector::SparseVector;

/// CSR matrix with `f64` entries. Stored entries are never exactly zero.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    rows: usize,
    cols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    vals: Vec<f64>,
}

impl SparseMatrix {
    /// Build from `(row, col, value)` triplets. Duplicates are summed and
    /// exact zeros dropped.
    ///
    /// # Panics
    ///
    /// Panics if a triplet lies outside `rows x cols`.
    #[must_use]
    pub fn from_triplets(rows: usize, cols: usize, triplets: &[(usize, usize, f64)]) -> Self {
        let mut sorted: Vec<(usize, usize, f64)> = triplets.to_vec();
        sorted.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut merged: Vec<(usize, usize, f64)> = Vec::with_capacity(sorted.len());
        for (r, c, v) in sorted {
            assert!(
                r < rows && c < cols,
                "triplet ({r}, {c}) outside {rows}x{cols} matrix"
            );
            match merged.last_mut() {
                Some(last) if last.0 == r && last.1 == c => last.2 += v,
                _ => merged.push((r, c, v)),
            }
        }
        merged.retain(|&(_, _, v)| v != 0.0);

        let mut row_ptr = vec![0usize; rows + 1];
        for &(r, _, _) in &merged {
            row_ptr[r + 1] += 1;
        }
        for r in 0..rows {
            row_ptr[r + 1] += row_ptr[r];
        }
        Self {
            rows,
            cols,
            row_ptr,
            col_idx: merged.iter().map(|&(_, c, _)| c).collect(),
            vals: merged.iter().map(|&(_, _, v)| v).collect(),
        }
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of stored entries.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.vals.len()
    }

    /// Nonzero `(col, value)` pairs of row `r`, in column order.
    pub fn row(&self, r: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let span = self.row_ptr[r]..self.row_ptr[r + 1];
        self.col_idx[span.clone()]
            .iter()
            .copied()
            .zip(self.vals[span].iter().copied())
    }

    /// Entry `(r, c)`, zero when not stored.
    #[must_use]
    pub fn get(&self, r: usize, c: usize) -> f64 {
        let span = self.row_ptr[r]..self.row_ptr[r + 1];
        self.col_idx[span.clone()]
            .binary_search(&c)
            .map_or(0.0, |pos| self.vals[span.start + pos])
    }

    #[must_use]
    pub fn row_sum(&self, r: usize) -> f64 {
        self.row(r).map(|(_, v)| v).sum()
    }

    /// Column `c` as a sparse vector over rows.
    #[must_use]
    pub fn column(&self, c: usize) -> SparseVector {
        let entries = (0..self.rows).filter_map(|r| {
            let v = self.get(r, c);
            (v != 0.0).then_some((r, v))
        });
        SparseVector::from_entries(self.rows, entries)
    }

    /// `A x` for a dense `x` of length `cols`.
    #[must_use]
    pub fn mul_dense(&self, x: &[f64]) -> Vec<f64> {
        debug_assert_eq!(x.len(), self.cols, "dimension mismatch in mul_dense");
        (0..self.rows)
            .map(|r| self.row(r).map(|(c, v)| v * x[c]).sum())
            .collect()
    }

    /// `A^T b` for a sparse `b` of length `rows`, returned dense.
    #[must_use]
    pub fn transpose_mul(&self, b: &SparseVector) -> Vec<f64> {
        debug_assert_eq!(b.dim(), self.rows, "dimension mismatch in transpose_mul");
        let mut out = vec![0.0; self.cols];
        for (r, weight) in b.iter() {
            for (c, v) in self.row(r) {
                out[c] += weight * v;
            }
        }
        out
    }
}
