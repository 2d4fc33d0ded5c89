//! Cluster prototype construction

use crate::config::PrototypeStrategy;
use crate::distance::direct_flip_unchecked;
use crate::error::{Error, Result};
use crate::types::ResampledStreamline;

/// Derive the representative geometry for a cluster from its member
/// streamlines. `cluster_index` identifies the cluster in any error.
///
/// Medoid returns a clone of the member minimizing summed distance to all
/// other members (lowest member position on ties); Mean builds a synthetic
/// curve from point-wise averages.
pub fn build_prototype(
    streamlines: &[ResampledStreamline],
    members: &[usize],
    strategy: PrototypeStrategy,
    cluster_index: usize,
) -> Result<ResampledStreamline> {
    if members.is_empty() {
        return Err(Error::degenerate(cluster_index, "empty cluster"));
    }
    match strategy {
        PrototypeStrategy::Medoid => Ok(medoid(streamlines, members)),
        PrototypeStrategy::Mean => Ok(mean(streamlines, members)),
    }
}

fn medoid(streamlines: &[ResampledStreamline], members: &[usize]) -> ResampledStreamline {
    let mut best_pos = 0usize;
    let mut best_total = f32::INFINITY;
    for (pos, &i) in members.iter().enumerate() {
        let total: f32 = members
            .iter()
            .filter(|&&j| j != i)
            .map(|&j| direct_flip_unchecked(streamlines[i].points(), streamlines[j].points()))
            .sum();
        if total < best_total {
            best_total = total;
            best_pos = pos;
        }
    }
    streamlines[members[best_pos]].clone()
}

fn mean(streamlines: &[ResampledStreamline], members: &[usize]) -> ResampledStreamline {
    let p = streamlines[members[0]].len();
    let count = members.len() as f32;

    let mut points = vec![[0.0f32; 3]; p];
    let mut native_length = 0.0f32;
    for &i in members {
        for (acc, src) in points.iter_mut().zip(streamlines[i].points()) {
            acc[0] += src[0];
            acc[1] += src[1];
            acc[2] += src[2];
        }
        native_length += streamlines[i].native_length();
    }
    for acc in &mut points {
        acc[0] /= count;
        acc[1] /= count;
        acc[2] /= count;
    }

    ResampledStreamline::from_parts(points, native_length / count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resample::resample_all;
    use crate::types::Streamline;

    fn parallel_lines(offsets: &[f32]) -> Vec<ResampledStreamline> {
        let streamlines: Vec<Streamline> = offsets
            .iter()
            .map(|&y| {
                Streamline::new(0, vec![[0.0, y, 0.0], [10.0, y, 0.0]]).unwrap()
            })
            .collect();
        resample_all(&streamlines, 8).unwrap()
    }

    #[test]
    fn test_medoid_is_central_member() {
        // y offsets 0, 1, 5: the middle line minimizes total distance.
        let set = parallel_lines(&[0.0, 1.0, 5.0]);
        let proto = build_prototype(&set, &[0, 1, 2], PrototypeStrategy::Medoid, 0).unwrap();
        assert_eq!(proto.points(), set[1].points());
    }

    #[test]
    fn test_mean_averages_positions() {
        let set = parallel_lines(&[0.0, 4.0]);
        let proto = build_prototype(&set, &[0, 1], PrototypeStrategy::Mean, 0).unwrap();
        for p in proto.points() {
            assert!((p[1] - 2.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_singleton_prototype_is_the_member() {
        let set = parallel_lines(&[3.0]);
        for strategy in [PrototypeStrategy::Medoid, PrototypeStrategy::Mean] {
            let proto = build_prototype(&set, &[0], strategy, 0).unwrap();
            for (a, b) in proto.points().iter().zip(set[0].points()) {
                assert!(crate::types::point_distance(a, b) < 1e-6);
            }
        }
    }

    #[test]
    fn test_empty_cluster_rejected() {
        let set = parallel_lines(&[0.0]);
        let err = build_prototype(&set, &[], PrototypeStrategy::Medoid, 9).unwrap_err();
        match err {
            Error::DegenerateInput { index, .. } => assert_eq!(index, 9),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
