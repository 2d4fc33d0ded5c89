//! Along-bundle scalar profiles
//!
//! Aggregates per-point scalar samples (already mapped onto the shared
//! arc-length parameterization) into a per-cluster mean and population
//! standard deviation at each position. Purely descriptive output; never
//! fed back into clustering.

use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::types::{Cluster, ScalarProfile};

/// Profile one cluster. `scalars` is indexed by streamline index and each
/// member's row must have exactly `points` values; a wrong-length row is
/// reported with the offending streamline index.
pub fn scalar_profile(
    cluster: &Cluster,
    scalars: &[Vec<f32>],
    points: usize,
) -> Result<ScalarProfile> {
    for &i in &cluster.members {
        let row = scalars
            .get(i)
            .ok_or_else(|| Error::mismatch(i, points, 0))?;
        if row.len() != points {
            return Err(Error::mismatch(i, points, row.len()));
        }
    }

    let count = cluster.members.len() as f32;
    let mut mean = vec![0.0f32; points];
    for &i in &cluster.members {
        for (acc, v) in mean.iter_mut().zip(&scalars[i]) {
            *acc += v;
        }
    }
    for acc in &mut mean {
        *acc /= count;
    }

    let mut variance = vec![0.0f32; points];
    for &i in &cluster.members {
        for (k, v) in scalars[i].iter().enumerate() {
            let dev = v - mean[k];
            variance[k] += dev * dev;
        }
    }
    let std_dev = variance.into_iter().map(|v| (v / count).sqrt()).collect();

    Ok(ScalarProfile {
        cluster: cluster.id,
        mean,
        std_dev,
    })
}

/// Profile every cluster; parallel across clusters.
pub fn scalar_profiles(
    clusters: &[Cluster],
    scalars: &[Vec<f32>],
    points: usize,
) -> Result<Vec<ScalarProfile>> {
    clusters
        .par_iter()
        .map(|c| scalar_profile(c, scalars, points))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resample::resample;
    use crate::types::{ResampledStreamline, Streamline};

    fn dummy_prototype(points: usize) -> ResampledStreamline {
        let s = Streamline::new(0, vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]).unwrap();
        resample(0, &s, points).unwrap()
    }

    fn cluster(members: Vec<usize>, points: usize) -> Cluster {
        Cluster {
            id: 0,
            name: None,
            members,
            prototype: dummy_prototype(points),
        }
    }

    #[test]
    fn test_mean_and_std_across_members() {
        // Two members with mirrored ramps: mean flat, spread at the ends.
        let scalars = vec![vec![1.0, 2.0, 3.0], vec![3.0, 2.0, 1.0]];
        let profile = scalar_profile(&cluster(vec![0, 1], 3), &scalars, 3).unwrap();
        assert_eq!(profile.mean, vec![2.0, 2.0, 2.0]);
        assert_eq!(profile.std_dev, vec![1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_single_member_has_zero_spread() {
        let scalars = vec![vec![0.5, 0.7, 0.9, 1.1]];
        let profile = scalar_profile(&cluster(vec![0], 4), &scalars, 4).unwrap();
        assert_eq!(profile.mean, scalars[0]);
        assert!(profile.std_dev.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_wrong_row_length_identifies_member() {
        let scalars = vec![vec![1.0, 2.0, 3.0], vec![1.0, 2.0]];
        let err = scalar_profile(&cluster(vec![0, 1], 3), &scalars, 3).unwrap_err();
        match err {
            Error::DimensionMismatch {
                index,
                expected,
                found,
            } => {
                assert_eq!(index, 1);
                assert_eq!(expected, 3);
                assert_eq!(found, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_profiles_for_all_clusters() {
        let scalars = vec![vec![1.0, 1.0], vec![2.0, 4.0]];
        let clusters = vec![cluster(vec![0], 2), cluster(vec![1], 2)];
        let profiles = scalar_profiles(&clusters, &scalars, 2).unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[1].mean, vec![2.0, 4.0]);
    }
}
