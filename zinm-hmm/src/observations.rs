//! Block-segmented count matrix and its row-deduplication index.

use crate::error::{Error, Result};
use ndarray::{Array2, ArrayView1};
use rustc_hash::FxHashMap;

/// The block-segmented integer count matrix handed to every inference call.
///
/// Rows are time steps, columns are tracks; column 0 is the control track. A negative entry
/// marks the whole row as missing (NA). Blocks are independent Markov chains: [`Observations::new`]
/// validates that the block sizes sum to the row count, and the rest of the crate treats block
/// boundaries as forward-state resets.
pub struct Observations {
    data: Array2<i64>,
    block_sizes: Vec<usize>,
    idx: Vec<usize>,
    zero_row: Option<usize>,
}

impl Observations {
    /// Builds an [`Observations`] value from a row-major count matrix and its block partition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if `block_sizes` is empty, contains a zero, or does
    /// not sum to `data.nrows()`.
    pub fn new(data: Array2<i64>, block_sizes: Vec<usize>) -> Result<Self> {
        let n = data.nrows();

        if block_sizes.is_empty() || block_sizes.iter().any(|&size| size == 0) {
            return Err(Error::InvalidParameter(
                "block sizes must be non-empty and strictly positive".to_owned(),
            ));
        }

        let total: usize = block_sizes.iter().sum();
        if total != n {
            return Err(Error::InvalidParameter(format!(
                "block sizes sum to {total}, but the observation matrix has {n} rows"
            )));
        }

        let (idx, zero_row) = build_index(&data);

        Ok(Self {
            data,
            block_sizes,
            idx,
            zero_row,
        })
    }

    /// Number of rows (time steps).
    #[must_use]
    pub fn n(&self) -> usize {
        self.data.nrows()
    }

    /// Number of non-control tracks `r`; the matrix has `r + 1` columns.
    #[must_use]
    pub fn tracks(&self) -> usize {
        self.data.ncols() - 1
    }

    /// The underlying `n x (r + 1)` count matrix.
    #[must_use]
    pub fn data(&self) -> &Array2<i64> {
        &self.data
    }

    /// Returns row `k`.
    #[must_use]
    pub fn row(&self, k: usize) -> ArrayView1<i64> {
        self.data.row(k)
    }

    /// Block sizes, in order; sums to [`Observations::n`].
    #[must_use]
    pub fn block_sizes(&self) -> &[usize] {
        &self.block_sizes
    }

    /// Row-deduplication map: `idx[k]` is the smallest `k' <= k` with `Y[k'] == Y[k]`.
    #[must_use]
    pub fn idx(&self) -> &[usize] {
        &self.idx
    }

    /// Position of the first all-zero row, if any observation is all zeros.
    #[must_use]
    pub fn zero_row(&self) -> Option<usize> {
        self.zero_row
    }

    /// Returns `true` if row `k` is a canonical representative, i.e. `idx[k] == k`.
    #[must_use]
    pub fn is_canonical(&self, k: usize) -> bool {
        self.idx[k] == k
    }
}

/// Builds the row-deduplication index and locates the first all-zero row.
///
/// A row containing a negative (NA) entry is deduplicated like any other row: the indexer does
/// not interpret NA semantics, it only compares raw integer vectors.
fn build_index(data: &Array2<i64>) -> (Vec<usize>, Option<usize>) {
    let n = data.nrows();
    let mut idx = Vec::with_capacity(n);
    let mut seen: FxHashMap<Vec<i64>, usize> = FxHashMap::default();
    let mut zero_row = None;

    for k in 0..n {
        let row = data.row(k);

        if zero_row.is_none() && row.iter().all(|&value| value == 0) {
            zero_row = Some(k);
        }

        let key = row.to_vec();
        let representative = *seen.entry(key).or_insert(k);
        idx.push(representative);
    }

    (idx, zero_row)
}
