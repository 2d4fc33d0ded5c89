//! Pipeline configuration

use serde::{Deserialize, Serialize};

/// How the pairwise affinity structure is materialized
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum AffinityMode {
    /// Store every pairwise distance
    Dense,
    /// Store only distances at or below `threshold`; omitted pairs are
    /// treated as infinitely dissimilar downstream
    Sparse { threshold: f32 },
}

/// How a cluster's representative geometry is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PrototypeStrategy {
    /// The member minimizing total distance to all other members; the
    /// prototype stays a real observed streamline
    #[default]
    Medoid,
    /// Point-wise average position at each arc-length position; synthetic
    /// geometry
    Mean,
}

/// Constraints for the short cortico-cortical U-fiber mode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UFiberConfig {
    /// Maximum native arc length for a streamline to count as a U-fiber
    pub length_cutoff: f32,
}

impl Default for UFiberConfig {
    fn default() -> Self {
        Self {
            length_cutoff: 80.0, // mm; short association fibers only
        }
    }
}

/// Full configuration for a clustering run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Fixed point count `P` every streamline is resampled to
    pub points_per_streamline: usize,
    /// Largest prototype-to-prototype distance at which two clusters are
    /// still merged (unsupervised mode)
    pub merge_threshold: f32,
    /// Largest streamline-to-prior distance at which an assignment is
    /// accepted (prior-guided mode)
    pub accept_threshold: f32,
    /// Pairwise affinity materialization
    pub affinity_mode: AffinityMode,
    /// Prototype derivation strategy
    pub prototype_strategy: PrototypeStrategy,
    /// When set, restrict clustering to short cortico-cortical candidates
    pub ufiber: Option<UFiberConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            points_per_streamline: 20,
            merge_threshold: 5.0,  // mm; typical inter-bundle separation
            accept_threshold: 8.0, // mm; looser for atlas matching
            affinity_mode: AffinityMode::Dense,
            prototype_strategy: PrototypeStrategy::default(),
            ufiber: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.points_per_streamline, 20);
        assert_eq!(config.prototype_strategy, PrototypeStrategy::Medoid);
        assert!(config.ufiber.is_none());
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = PipelineConfig {
            affinity_mode: AffinityMode::Sparse { threshold: 12.5 },
            ufiber: Some(UFiberConfig { length_cutoff: 60.0 }),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.affinity_mode, AffinityMode::Sparse { threshold: 12.5 });
        assert_eq!(back.ufiber, Some(UFiberConfig { length_cutoff: 60.0 }));
    }
}
