//! Core data model: streamlines, clusters, priors, and profiles

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single 3-D coordinate
pub type Point3 = [f32; 3];

/// Cluster identifier; non-negative for real clusters
pub type ClusterId = i32;

/// Sentinel cluster for rejected / unassigned streamlines
pub const NOISE_CLUSTER: ClusterId = -1;

/// Euclidean distance between two points
pub fn point_distance(a: &Point3, b: &Point3) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// An input fiber-tract streamline: an ordered 3-D polyline at its native
/// resolution. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Streamline {
    points: Vec<Point3>,
}

impl Streamline {
    /// Create a streamline, validating the basic geometry invariants
    /// (at least two points, all coordinates finite). `index` identifies
    /// the streamline in any error.
    pub fn new(index: usize, points: Vec<Point3>) -> Result<Self> {
        if points.len() < 2 {
            return Err(Error::degenerate(
                index,
                format!("{} point(s), need at least 2", points.len()),
            ));
        }
        if points.iter().flatten().any(|c| !c.is_finite()) {
            return Err(Error::degenerate(index, "non-finite coordinate"));
        }
        Ok(Self { points })
    }

    /// Ordered points of the polyline
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    /// Number of native vertices
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Total arc length (sum of segment lengths)
    pub fn arc_length(&self) -> f32 {
        self.points
            .windows(2)
            .map(|w| point_distance(&w[0], &w[1]))
            .sum()
    }
}

/// A streamline normalized to a fixed point count with equal arc-length
/// spacing, the unit all pairwise comparison operates on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResampledStreamline {
    points: Vec<Point3>,
    /// Arc length of the source streamline at native resolution,
    /// kept for the short-fiber length cutoff
    native_length: f32,
}

impl ResampledStreamline {
    pub(crate) fn from_parts(points: Vec<Point3>, native_length: f32) -> Self {
        Self {
            points,
            native_length,
        }
    }

    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    /// Fixed point count `P`
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Arc length of the originating streamline
    pub fn native_length(&self) -> f32 {
        self.native_length
    }

    /// First point of the curve
    pub fn start(&self) -> &Point3 {
        &self.points[0]
    }

    /// Last point of the curve
    pub fn end(&self) -> &Point3 {
        &self.points[self.points.len() - 1]
    }
}

/// A reference bundle used in prior-guided mode: a labeled prototype in the
/// same coordinate space as the input streamlines. Never mutated.
#[derive(Debug, Clone)]
pub struct PriorBundle {
    /// Anatomical bundle label (e.g. "CST_left")
    pub label: String,
    /// Reference prototype geometry, resampled to the run's point count
    pub prototype: ResampledStreamline,
}

impl PriorBundle {
    /// Build a prior bundle from native-resolution geometry, resampling it
    /// to `points` so it is comparable with the run's streamlines.
    pub fn from_streamline(
        label: impl Into<String>,
        geometry: &Streamline,
        points: usize,
    ) -> Result<Self> {
        let prototype = crate::resample::resample(0, geometry, points)?;
        Ok(Self {
            label: label.into(),
            prototype,
        })
    }
}

/// A discovered (or prior-assigned) bundle: member streamline indices and
/// a derived prototype.
#[derive(Debug, Clone)]
pub struct Cluster {
    /// Cluster identifier (never the noise sentinel)
    pub id: ClusterId,
    /// Bundle label, present in prior-guided runs
    pub name: Option<String>,
    /// Member streamline indices into the run's input set; non-empty
    pub members: Vec<usize>,
    /// Representative geometry, recomputed whenever membership changes
    pub prototype: ResampledStreamline,
}

/// Along-bundle summary of a scalar measurement: mean and population
/// standard deviation at each of the `P` arc-length positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalarProfile {
    pub cluster: ClusterId,
    pub mean: Vec<f32>,
    pub std_dev: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streamline_rejects_single_point() {
        let err = Streamline::new(3, vec![[0.0, 0.0, 0.0]]).unwrap_err();
        match err {
            Error::DegenerateInput { index, .. } => assert_eq!(index, 3),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_streamline_rejects_non_finite() {
        let err = Streamline::new(0, vec![[0.0, 0.0, 0.0], [f32::NAN, 0.0, 0.0]]).unwrap_err();
        assert!(matches!(err, Error::DegenerateInput { .. }));
    }

    #[test]
    fn test_arc_length() {
        let s = Streamline::new(0, vec![[0.0, 0.0, 0.0], [3.0, 0.0, 0.0], [3.0, 4.0, 0.0]])
            .unwrap();
        assert!((s.arc_length() - 7.0).abs() < 1e-6);
    }
}
