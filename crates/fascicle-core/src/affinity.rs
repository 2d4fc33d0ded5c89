//! Pairwise affinity structure over a streamline population
//!
//! The dominant cost center of a run: all N(N-1)/2 distances are computed
//! exactly once, in parallel across independent pairs. The finished matrix
//! is read-only and safe to share across workers.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::config::AffinityMode;
use crate::distance::direct_flip_unchecked;
use crate::error::{Error, Result};
use crate::types::ResampledStreamline;

/// Symmetric pairwise distance matrix, dense or thresholded-sparse.
#[derive(Debug, Clone)]
pub struct AffinityMatrix {
    n: usize,
    storage: Storage,
}

#[derive(Debug, Clone)]
enum Storage {
    /// Condensed upper triangle in (i, j) pair order, i < j
    Dense(Vec<f32>),
    /// Only entries at or below the sparse threshold, keyed by (i, j), i < j
    Sparse(HashMap<(usize, usize), f32>),
}

impl AffinityMatrix {
    /// Compute the pairwise matrix for a uniformly resampled population.
    /// All inputs must share one point count; a mismatch identifies the
    /// offending streamline.
    pub fn build(streamlines: &[ResampledStreamline], mode: AffinityMode) -> Result<Self> {
        let n = streamlines.len();
        if let Some(first) = streamlines.first() {
            let p = first.len();
            for (i, s) in streamlines.iter().enumerate() {
                if s.len() != p {
                    return Err(Error::mismatch(i, p, s.len()));
                }
            }
        }

        let pairs: Vec<(usize, usize)> = (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .collect();

        let distances: Vec<f32> = pairs
            .par_iter()
            .map(|&(i, j)| direct_flip_unchecked(streamlines[i].points(), streamlines[j].points()))
            .collect();

        let storage = match mode {
            AffinityMode::Dense => Storage::Dense(distances),
            AffinityMode::Sparse { threshold } => Storage::Sparse(
                pairs
                    .iter()
                    .zip(distances)
                    .filter(|(_, d)| *d <= threshold)
                    .map(|(&pair, d)| (pair, d))
                    .collect(),
            ),
        };

        tracing::debug!(
            "affinity matrix built: {} streamlines, {} stored entries",
            n,
            match &storage {
                Storage::Dense(v) => v.len(),
                Storage::Sparse(m) => m.len(),
            }
        );

        Ok(Self { n, storage })
    }

    /// Population size the matrix was built over
    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of materialized entries
    pub fn entry_count(&self) -> usize {
        match &self.storage {
            Storage::Dense(v) => v.len(),
            Storage::Sparse(m) => m.len(),
        }
    }

    /// Distance between streamlines `i` and `j`; symmetric. `None` means
    /// the pair was omitted in sparse mode (infinitely dissimilar).
    pub fn get(&self, i: usize, j: usize) -> Option<f32> {
        assert!(i < self.n && j < self.n, "index out of range");
        if i == j {
            return Some(0.0);
        }
        let (lo, hi) = if i < j { (i, j) } else { (j, i) };
        match &self.storage {
            Storage::Dense(v) => Some(v[condensed_index(self.n, lo, hi)]),
            Storage::Sparse(m) => m.get(&(lo, hi)).copied(),
        }
    }
}

/// Index of pair (i, j), i < j, in the condensed upper-triangle layout
fn condensed_index(n: usize, i: usize, j: usize) -> usize {
    i * (2 * n - i - 1) / 2 + (j - i - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resample::resample_all;
    use crate::types::Streamline;

    fn population() -> Vec<ResampledStreamline> {
        let streamlines = vec![
            Streamline::new(0, vec![[0.0, 0.0, 0.0], [10.0, 0.0, 0.0]]).unwrap(),
            Streamline::new(1, vec![[0.0, 1.0, 0.0], [10.0, 1.0, 0.0]]).unwrap(),
            Streamline::new(2, vec![[0.0, 50.0, 0.0], [10.0, 50.0, 0.0]]).unwrap(),
        ];
        resample_all(&streamlines, 10).unwrap()
    }

    #[test]
    fn test_condensed_index_covers_triangle() {
        let n = 5;
        let mut seen = vec![false; n * (n - 1) / 2];
        for i in 0..n {
            for j in (i + 1)..n {
                let idx = condensed_index(n, i, j);
                assert!(!seen[idx], "duplicate index for ({i}, {j})");
                seen[idx] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_dense_symmetric_lookup() {
        let m = AffinityMatrix::build(&population(), AffinityMode::Dense).unwrap();
        assert_eq!(m.entry_count(), 3);
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(m.get(i, j), m.get(j, i));
            }
        }
        assert!((m.get(0, 1).unwrap() - 1.0).abs() < 1e-5);
        assert_eq!(m.get(2, 2), Some(0.0));
    }

    #[test]
    fn test_sparse_omits_above_threshold() {
        let m =
            AffinityMatrix::build(&population(), AffinityMode::Sparse { threshold: 5.0 }).unwrap();
        assert_eq!(m.entry_count(), 1);
        assert!(m.get(0, 1).is_some());
        assert!(m.get(0, 2).is_none());
        assert!(m.get(1, 2).is_none());
    }

    #[test]
    fn test_empty_population() {
        let m = AffinityMatrix::build(&[], AffinityMode::Dense).unwrap();
        assert_eq!(m.n(), 0);
        assert_eq!(m.entry_count(), 0);
    }

    #[test]
    fn test_mixed_point_counts_rejected() {
        let a = Streamline::new(0, vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]).unwrap();
        let mixed = vec![
            crate::resample::resample(0, &a, 10).unwrap(),
            crate::resample::resample(1, &a, 12).unwrap(),
        ];
        let err = AffinityMatrix::build(&mixed, AffinityMode::Dense).unwrap_err();
        match err {
            Error::DimensionMismatch { index, .. } => assert_eq!(index, 1),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
