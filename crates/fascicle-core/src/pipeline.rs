//! End-to-end run facade: resample, affinity, partition, profiles
//!
//! Wires the stages together the way the command-line tools drive them.
//! All inputs are fully materialized before the run starts; nothing here
//! blocks on I/O.

use std::collections::HashMap;
use std::time::Instant;

use rayon::prelude::*;

use crate::affinity::AffinityMatrix;
use crate::cluster::{partition, ClusterMode, CorticalClassifier, PartitionParams, UFiberFilter};
use crate::config::PipelineConfig;
use crate::error::{Error, Result, RunWarning};
use crate::profile::scalar_profiles;
use crate::resample::{resample_all, resample_scalars};
use crate::types::{Cluster, ClusterId, PriorBundle, ResampledStreamline, ScalarProfile, Streamline};

/// Everything a finished run hands to the output writers: per-streamline
/// labels, the clusters themselves, and per-cluster prototype geometry and
/// scalar profiles keyed by cluster id.
#[derive(Debug)]
pub struct RunOutput {
    pub labels: Vec<ClusterId>,
    pub clusters: Vec<Cluster>,
    pub prototypes: HashMap<ClusterId, ResampledStreamline>,
    pub profiles: HashMap<ClusterId, ScalarProfile>,
    pub warnings: Vec<RunWarning>,
}

/// Configured clustering pipeline
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the full pipeline.
    ///
    /// `priors` switches the engine into prior-guided mode. `scalars`
    /// supplies one value per native point of each streamline (an external
    /// sampler's output); when present, per-cluster profiles are produced.
    /// `classifier` must be supplied whenever the U-fiber constraint is
    /// configured.
    pub fn run(
        &self,
        streamlines: &[Streamline],
        priors: Option<&[PriorBundle]>,
        scalars: Option<&[Vec<f32>]>,
        classifier: Option<&dyn CorticalClassifier>,
    ) -> Result<RunOutput> {
        let p = self.config.points_per_streamline;

        if let Some(rows) = scalars {
            if rows.len() != streamlines.len() {
                return Err(Error::config(format!(
                    "scalar rows ({}) do not match streamline count ({})",
                    rows.len(),
                    streamlines.len()
                )));
            }
        }
        let ufiber = match (&self.config.ufiber, classifier) {
            (None, _) => None,
            (Some(cfg), Some(classifier)) => Some(UFiberFilter {
                length_cutoff: cfg.length_cutoff,
                classifier,
            }),
            (Some(_), None) => {
                return Err(Error::config(
                    "U-fiber mode configured without a cortical classifier",
                ))
            }
        };

        let start = Instant::now();
        let resampled = resample_all(streamlines, p)?;
        tracing::info!(
            "resampled {} streamline(s) to {p} points in {:.1?}",
            resampled.len(),
            start.elapsed()
        );

        let start = Instant::now();
        let affinity = AffinityMatrix::build(&resampled, self.config.affinity_mode)?;
        tracing::info!(
            "affinity: {} entries in {:.1?}",
            affinity.entry_count(),
            start.elapsed()
        );

        let params = PartitionParams {
            mode: match priors {
                Some(priors) => ClusterMode::PriorGuided(priors),
                None => ClusterMode::Unsupervised,
            },
            merge_threshold: self.config.merge_threshold,
            accept_threshold: self.config.accept_threshold,
            prototype_strategy: self.config.prototype_strategy,
            ufiber,
        };

        let start = Instant::now();
        let result = partition(&resampled, &affinity, &params)?;
        tracing::info!(
            "clustering: {} cluster(s) in {:.1?}",
            result.clusters.len(),
            start.elapsed()
        );

        let profiles = match scalars {
            None => HashMap::new(),
            Some(rows) => {
                let start = Instant::now();
                // Map each streamline's native-resolution samples onto the
                // shared arc-length parameterization.
                let aligned: Vec<Vec<f32>> = streamlines
                    .par_iter()
                    .zip(rows)
                    .enumerate()
                    .map(|(i, (s, row))| resample_scalars(i, s, row, p))
                    .collect::<Result<_>>()?;
                let profiles = scalar_profiles(&result.clusters, &aligned, p)?;
                tracing::info!(
                    "profiled {} cluster(s) in {:.1?}",
                    profiles.len(),
                    start.elapsed()
                );
                profiles.into_iter().map(|pr| (pr.cluster, pr)).collect()
            }
        };

        let prototypes = result
            .clusters
            .iter()
            .map(|c| (c.id, c.prototype.clone()))
            .collect();

        Ok(RunOutput {
            labels: result.labels,
            clusters: result.clusters,
            prototypes,
            profiles,
            warnings: result.warnings,
        })
    }
}
