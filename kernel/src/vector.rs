//! Sparse state vectors.
//!
//! A [`SparseVector`] is the carrier for both MDP states (one-hot vectors)
//! and POMDP beliefs. Entries are kept sorted by index with exact zeros
//! dropped, so two vectors with the same support and bit-identical weights
//! always produce the same [`SparseVector::identity_bytes`].

/// Sparse vector with sorted `(index, value)` entries and no stored zeros.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseVector {
    dim: usize,
    entries: Vec<(usize, f64)>,
}

impl SparseVector {
    /// The all-zero vector of dimension `dim`.
    #[must_use]
    pub fn zeros(dim: usize) -> Self {
        Self {
            dim,
            entries: Vec::new(),
        }
    }

    /// Basis vector `e_index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= dim`.
    #[must_use]
    pub fn unit(dim: usize, index: usize) -> Self {
        assert!(index < dim, "unit index {index} out of range for dim {dim}");
        Self {
            dim,
            entries: vec![(index, 1.0)],
        }
    }

    /// Build from unordered entries. Duplicate indices are summed and
    /// entries that end up exactly zero are dropped.
    ///
    /// # Panics
    ///
    /// Panics if any index is `>= dim`.
    #[must_use]
    pub fn from_entries(dim: usize, entries: impl IntoIterator<Item = (usize, f64)>) -> Self {
        let mut raw: Vec<(usize, f64)> = entries.into_iter().collect();
        raw.sort_by_key(|&(i, _)| i);
        let mut merged: Vec<(usize, f64)> = Vec::with_capacity(raw.len());
        for (i, v) in raw {
            assert!(i < dim, "entry index {i} out of range for dim {dim}");
            match merged.last_mut() {
                Some(last) if last.0 == i => last.1 += v,
                _ => merged.push((i, v)),
            }
        }
        merged.retain(|&(_, v)| v != 0.0);
        Self {
            dim,
            entries: merged,
        }
    }

    /// Build from a dense slice, dropping exact zeros.
    #[must_use]
    pub fn from_dense(values: &[f64]) -> Self {
        Self::from_dense_pruned(values, 0.0)
    }

    /// Build from a dense slice, dropping entries with `|v| <= eps`.
    #[must_use]
    pub fn from_dense_pruned(values: &[f64], eps: f64) -> Self {
        let entries = values
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v.abs() > eps)
            .map(|(i, &v)| (i, v))
            .collect();
        Self {
            dim: values.len(),
            entries,
        }
    }

    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of stored (nonzero) entries.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sorted nonzero entries.
    #[must_use]
    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    /// Iterate over nonzero `(index, value)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.entries.iter().copied()
    }

    /// Indices of the nonzero entries, ascending.
    pub fn support(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().map(|&(i, _)| i)
    }

    /// Value at `index` (zero when not stored).
    #[must_use]
    pub fn get(&self, index: usize) -> f64 {
        self.entries
            .binary_search_by_key(&index, |&(i, _)| i)
            .map_or(0.0, |pos| self.entries[pos].1)
    }

    /// Dot product with a dense vector of the same dimension.
    #[must_use]
    pub fn dot_dense(&self, dense: &[f64]) -> f64 {
        debug_assert_eq!(dense.len(), self.dim, "dimension mismatch in dot_dense");
        self.entries.iter().map(|&(i, v)| v * dense[i]).sum()
    }

    /// Dot product of two sparse vectors (merge over sorted supports).
    #[must_use]
    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut a, mut b) = (self.entries.iter().peekable(), other.entries.iter().peekable());
        let mut acc = 0.0;
        while let (Some(&&(i, x)), Some(&&(j, y))) = (a.peek(), b.peek()) {
            match i.cmp(&j) {
                std::cmp::Ordering::Less => {
                    a.next();
                }
                std::cmp::Ordering::Greater => {
                    b.next();
                }
                std::cmp::Ordering::Equal => {
                    acc += x * y;
                    a.next();
                    b.next();
                }
            }
        }
        acc
    }

    /// Sum of all entries.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.entries.iter().map(|&(_, v)| v).sum()
    }

    #[must_use]
    pub fn norm_1(&self) -> f64 {
        self.entries.iter().map(|&(_, v)| v.abs()).sum()
    }

    #[must_use]
    pub fn norm_inf(&self) -> f64 {
        self.entries.iter().fold(0.0, |m, &(_, v)| m.max(v.abs()))
    }

    /// Copy scaled by `factor`.
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        Self::from_entries(self.dim, self.entries.iter().map(|&(i, v)| (i, v * factor)))
    }

    /// Copy rescaled to sum to one, or `None` when the sum is not positive.
    #[must_use]
    pub fn normalized(&self) -> Option<Self> {
        let total = self.sum();
        if total > 0.0 {
            Some(self.scaled(1.0 / total))
        } else {
            None
        }
    }

    /// Elementwise product with a dense vector.
    #[must_use]
    pub fn elementwise_mul_dense(&self, dense: &[f64]) -> Self {
        debug_assert_eq!(dense.len(), self.dim, "dimension mismatch in elementwise multiply");
        Self::from_entries(self.dim, self.entries.iter().map(|&(i, v)| (i, v * dense[i])))
    }

    #[must_use]
    pub fn to_dense(&self) -> Vec<f64> {
        let mut out = vec![0.0; self.dim];
        for &(i, v) in &self.entries {
            out[i] = v;
        }
        out
    }

    /// The basis index when exactly one entry is stored.
    #[must_use]
    pub fn unit_index(&self) -> Option<usize> {
        match self.entries.as_slice() {
            [(i, _)] => Some(*i),
            _ => None,
        }
    }

    /// Canonical identity bytes: `dim` then each `(index, value bits)`,
    /// all little-endian.
    #[must_use]
    pub fn identity_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + self.entries.len() * 16);
        out.extend_from_slice(&(self.dim as u64).to_le_bytes());
        for &(i, v) in &self.entries {
            out.extend_from_slice(&(i as u64).to_le_bytes());
            out.extend_from_slice(&v.to_bits().to_le_bytes());
        }
        out
    }
}

/// Dot product of two dense vectors.
#[must_use]
pub fn dense_dot(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "dimension mismatch in dense_dot");
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Largest absolute componentwise difference.
#[must_use]
pub fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).fold(0.0, |m, (x, y)| m.max((x - y).abs()))
}
