//! Clustering engine: unsupervised threshold-merge, prior-guided
//! nearest-prototype assignment, and the U-fiber candidate restriction
//!
//! All modes share one `partition` contract and differ only in candidate
//! selection and acceptance rule. Candidate evaluation is parallel; cluster
//! membership mutation is single-writer sequential.

use std::cmp::Ordering;
use std::collections::HashMap;

use rayon::prelude::*;

use crate::affinity::AffinityMatrix;
use crate::config::PrototypeStrategy;
use crate::distance::direct_flip_unchecked;
use crate::error::{Error, Result, RunWarning};
use crate::prototype::build_prototype;
use crate::types::{Cluster, ClusterId, Point3, PriorBundle, ResampledStreamline, NOISE_CLUSTER};

/// Externally supplied capability classifying a streamline endpoint as
/// lying near the cortical surface. Only consulted in U-fiber runs.
pub trait CorticalClassifier: Sync {
    fn is_cortical(&self, point: &Point3) -> bool;
}

/// Candidate restriction for U-fiber runs: short native arc length and
/// both endpoints cortical. Excluded streamlines land in the noise cluster.
pub struct UFiberFilter<'a> {
    pub length_cutoff: f32,
    pub classifier: &'a dyn CorticalClassifier,
}

/// Which acceptance rule drives the partition
pub enum ClusterMode<'a> {
    /// Greedy threshold merge from singletons
    Unsupervised,
    /// One-pass nearest-prototype assignment against reference bundles
    PriorGuided(&'a [PriorBundle]),
}

/// Parameters for one partition run
pub struct PartitionParams<'a> {
    pub mode: ClusterMode<'a>,
    /// Largest prototype distance at which two clusters still merge
    pub merge_threshold: f32,
    /// Largest streamline-to-prior distance at which an assignment holds
    pub accept_threshold: f32,
    pub prototype_strategy: PrototypeStrategy,
    pub ufiber: Option<UFiberFilter<'a>>,
}

/// A finished hard partition: exhaustive and disjoint over the input index
/// set, with rejected streamlines in the noise cluster.
#[derive(Debug)]
pub struct Partition {
    /// Cluster id per input streamline index (`NOISE_CLUSTER` for rejects)
    pub labels: Vec<ClusterId>,
    pub clusters: Vec<Cluster>,
    pub warnings: Vec<RunWarning>,
}

/// Merge-loop control state; the loop converges when no cluster pair sits
/// below the merge threshold or a single cluster remains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MergeState {
    Active,
    Converged,
}

/// Partition a resampled streamline population given its affinity matrix.
///
/// An empty input yields an empty partition with an `EmptyInput` warning,
/// not an error. An all-singleton unsupervised result is valid and flagged
/// with `ThresholdExhaustion`.
pub fn partition(
    streamlines: &[ResampledStreamline],
    affinity: &AffinityMatrix,
    params: &PartitionParams<'_>,
) -> Result<Partition> {
    let n = streamlines.len();
    if n == 0 {
        tracing::warn!("empty streamline set; producing empty partition");
        return Ok(Partition {
            labels: Vec::new(),
            clusters: Vec::new(),
            warnings: vec![RunWarning::EmptyInput],
        });
    }

    let candidates = select_candidates(streamlines, params.ufiber.as_ref());
    let excluded = n - candidates.len();
    if excluded > 0 {
        tracing::info!(
            "{excluded} of {n} streamlines excluded by the U-fiber constraint"
        );
    }

    let mut labels = vec![NOISE_CLUSTER; n];
    let mut warnings = Vec::new();

    let clusters = match &params.mode {
        ClusterMode::Unsupervised => {
            let clusters = merge_loop(streamlines, affinity, &candidates, params)?;
            if clusters.len() > 1 && clusters.iter().all(|c| c.members.len() == 1) {
                tracing::warn!(
                    "no group structure below merge threshold {}; {} singletons",
                    params.merge_threshold,
                    clusters.len()
                );
                warnings.push(RunWarning::ThresholdExhaustion);
            }
            clusters
        }
        ClusterMode::PriorGuided(priors) => {
            assign_to_priors(streamlines, &candidates, priors, params)?
        }
    };

    for cluster in &clusters {
        for &i in &cluster.members {
            labels[i] = cluster.id;
        }
    }

    let noise = labels.iter().filter(|&&l| l == NOISE_CLUSTER).count();
    tracing::info!(
        "partition complete: {} cluster(s), {} noise streamline(s)",
        clusters.len(),
        noise
    );

    Ok(Partition {
        labels,
        clusters,
        warnings,
    })
}

/// Indices eligible for clustering; everything else is noise.
fn select_candidates(
    streamlines: &[ResampledStreamline],
    ufiber: Option<&UFiberFilter<'_>>,
) -> Vec<usize> {
    match ufiber {
        None => (0..streamlines.len()).collect(),
        Some(filter) => (0..streamlines.len())
            .filter(|&i| {
                let s = &streamlines[i];
                s.native_length() < filter.length_cutoff
                    && filter.classifier.is_cortical(s.start())
                    && filter.classifier.is_cortical(s.end())
            })
            .collect(),
    }
}

/// Greedy threshold merge. Starts from singletons seeded with affinity
/// distances, repeatedly merges the closest cluster pair below the merge
/// threshold (ties: lowest slot pair), and recomputes the merged cluster's
/// prototype and its distances eagerly. Sparse-omitted pairs are treated as
/// infinitely dissimilar and never merge directly; they become reachable
/// once a merge produces a prototype within range.
fn merge_loop(
    streamlines: &[ResampledStreamline],
    affinity: &AffinityMatrix,
    candidates: &[usize],
    params: &PartitionParams<'_>,
) -> Result<Vec<Cluster>> {
    // Slot = position into `candidates`; merged slots keep the lower index.
    let mut slots: Vec<Option<Working>> = candidates
        .iter()
        .map(|&i| {
            Some(Working {
                members: vec![i],
                prototype: streamlines[i].clone(),
            })
        })
        .collect();

    let mut distances: HashMap<(usize, usize), f32> = HashMap::new();
    for (a, &i) in candidates.iter().enumerate() {
        for (b, &j) in candidates.iter().enumerate().skip(a + 1) {
            if let Some(d) = affinity.get(i, j) {
                distances.insert((a, b), d);
            }
        }
    }

    let mut state = MergeState::Active;
    while state == MergeState::Active {
        match next_merge(&distances, params.merge_threshold) {
            None => state = MergeState::Converged,
            Some((lo, hi, d)) => {
                tracing::debug!("merging slots {lo} and {hi} at distance {d:.4}");
                let absorbed = slots[hi].take().unwrap();
                let target = slots[lo].as_mut().unwrap();
                target.members.extend(absorbed.members);
                target.members.sort_unstable();
                target.prototype = build_prototype(
                    streamlines,
                    &target.members,
                    params.prototype_strategy,
                    lo,
                )?;

                distances.retain(|&(a, b), _| a != hi && b != hi && a != lo && b != lo);

                // Refresh the merged slot's distances against every other
                // active slot; search is parallel, insertion single-writer.
                let proto = &slots[lo].as_ref().unwrap().prototype;
                let refreshed: Vec<((usize, usize), f32)> = slots
                    .par_iter()
                    .enumerate()
                    .filter_map(|(other, slot)| {
                        if other == lo {
                            return None;
                        }
                        slot.as_ref().map(|w| {
                            let key = if other < lo { (other, lo) } else { (lo, other) };
                            let d = direct_flip_unchecked(
                                proto.points(),
                                w.prototype.points(),
                            );
                            (key, d)
                        })
                    })
                    .collect();
                distances.extend(refreshed);
            }
        }
    }

    // Deterministic cluster ids: ascending smallest member index.
    let mut finished: Vec<Working> = slots.into_iter().flatten().collect();
    finished.sort_by_key(|w| w.members[0]);
    Ok(finished
        .into_iter()
        .enumerate()
        .map(|(id, w)| Cluster {
            id: id as ClusterId,
            name: None,
            members: w.members,
            prototype: w.prototype,
        })
        .collect())
}

struct Working {
    members: Vec<usize>,
    prototype: ResampledStreamline,
}

/// Best merge candidate: smallest distance strictly below the threshold,
/// ties broken by lowest slot pair. Deterministic regardless of map
/// iteration order.
fn next_merge(
    distances: &HashMap<(usize, usize), f32>,
    threshold: f32,
) -> Option<(usize, usize, f32)> {
    distances
        .par_iter()
        .min_by(|(ka, da), (kb, db)| {
            da.partial_cmp(db)
                .unwrap_or(Ordering::Equal)
                .then_with(|| ka.cmp(kb))
        })
        .filter(|&(_, &d)| d < threshold)
        .map(|(&(a, b), &d)| (a, b, d))
}

/// One-pass nearest-prototype classification against the prior bundles.
/// Never updates the priors; ties go to the lowest bundle index, so the
/// pass is deterministic and rerunning it reproduces the assignments.
fn assign_to_priors(
    streamlines: &[ResampledStreamline],
    candidates: &[usize],
    priors: &[PriorBundle],
    params: &PartitionParams<'_>,
) -> Result<Vec<Cluster>> {
    if candidates.is_empty() || priors.is_empty() {
        return Ok(Vec::new());
    }

    let p = streamlines[candidates[0]].len();
    for (b, prior) in priors.iter().enumerate() {
        if prior.prototype.len() != p {
            return Err(Error::mismatch(b, p, prior.prototype.len()));
        }
    }

    let assignments: Vec<Option<usize>> = candidates
        .par_iter()
        .map(|&i| {
            let mut best: Option<(f32, usize)> = None;
            for (b, prior) in priors.iter().enumerate() {
                let d = direct_flip_unchecked(
                    streamlines[i].points(),
                    prior.prototype.points(),
                );
                let better = match best {
                    None => true,
                    Some((bd, _)) => d < bd,
                };
                if better {
                    best = Some((d, b));
                }
            }
            best.filter(|&(d, _)| d < params.accept_threshold)
                .map(|(_, b)| b)
        })
        .collect();

    let mut members_by_bundle: HashMap<usize, Vec<usize>> = HashMap::new();
    for (&i, assigned) in candidates.iter().zip(&assignments) {
        if let Some(b) = *assigned {
            members_by_bundle.entry(b).or_default().push(i);
        }
    }

    let mut bundles: Vec<usize> = members_by_bundle.keys().copied().collect();
    bundles.sort_unstable();

    bundles
        .into_iter()
        .map(|b| {
            let mut members = members_by_bundle.remove(&b).unwrap();
            members.sort_unstable();
            let prototype =
                build_prototype(streamlines, &members, params.prototype_strategy, b)?;
            Ok(Cluster {
                id: b as ClusterId,
                name: Some(priors[b].label.clone()),
                members,
                prototype,
            })
        })
        .collect()
}
