//! fascicle-core: clustering of white-matter fiber-tract streamlines into
//! anatomically coherent bundles
//!
//! The engine resamples each streamline to a fixed arc-length
//! parameterization, computes an orientation-invariant pairwise distance
//! structure, partitions the population (unsupervised threshold merging or
//! prior-guided atlas matching, optionally restricted to short
//! cortico-cortical U-fibers), derives per-cluster prototype geometry, and
//! aggregates along-bundle scalar profiles. Geometry and scalar-field I/O
//! live outside this crate; the core only consumes fully materialized
//! in-memory inputs.

pub mod affinity;
pub mod cluster;
pub mod config;
pub mod distance;
pub mod error;
pub mod pipeline;
pub mod profile;
pub mod prototype;
pub mod resample;
pub mod types;

pub use affinity::AffinityMatrix;
pub use cluster::{
    partition, ClusterMode, CorticalClassifier, Partition, PartitionParams, UFiberFilter,
};
pub use config::{AffinityMode, PipelineConfig, PrototypeStrategy, UFiberConfig};
pub use error::{Error, Result, RunWarning};
pub use pipeline::{Pipeline, RunOutput};
pub use types::{
    point_distance, Cluster, ClusterId, Point3, PriorBundle, ResampledStreamline, ScalarProfile,
    Streamline, NOISE_CLUSTER,
};
