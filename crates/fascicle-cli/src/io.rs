//! File formats for the command-line front end
//!
//! The core defines no on-disk format; this layer reads polyline geometry
//! and prior bundles from plain JSON documents, per-point scalar samples
//! from CSV (one row per streamline, native resolution), and writes run
//! results as JSON. Malformed streamlines are rejected here, before they
//! reach the core.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use fascicle_core::{
    point_distance, ClusterId, CorticalClassifier, Point3, PriorBundle, RunOutput, RunWarning,
    Streamline,
};

/// Geometry input: `{"streamlines": [[[x,y,z], ...], ...]}`
#[derive(Debug, Deserialize)]
struct StreamlineDoc {
    streamlines: Vec<Vec<Point3>>,
}

pub fn load_streamlines(path: &Path) -> Result<Vec<Streamline>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let doc: StreamlineDoc = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing {}", path.display()))?;
    let streamlines = doc
        .streamlines
        .into_iter()
        .enumerate()
        .map(|(i, points)| Streamline::new(i, points))
        .collect::<fascicle_core::Result<Vec<_>>>()
        .with_context(|| format!("validating {}", path.display()))?;
    tracing::info!("loaded {} streamline(s) from {}", streamlines.len(), path.display());
    Ok(streamlines)
}

/// Prior atlas input: `{"bundles": [{"label": ..., "points": [[x,y,z], ...]}]}`
#[derive(Debug, Deserialize)]
struct PriorDoc {
    bundles: Vec<PriorEntry>,
}

#[derive(Debug, Deserialize)]
struct PriorEntry {
    label: String,
    points: Vec<Point3>,
}

pub fn load_priors(path: &Path, points_per_streamline: usize) -> Result<Vec<PriorBundle>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let doc: PriorDoc = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing {}", path.display()))?;
    let priors = doc
        .bundles
        .into_iter()
        .enumerate()
        .map(|(i, entry)| {
            let geometry = Streamline::new(i, entry.points)?;
            PriorBundle::from_streamline(entry.label, &geometry, points_per_streamline)
        })
        .collect::<fascicle_core::Result<Vec<_>>>()
        .with_context(|| format!("validating {}", path.display()))?;
    tracing::info!("loaded {} prior bundle(s) from {}", priors.len(), path.display());
    Ok(priors)
}

/// Scalar samples: CSV, one row per streamline, one value per native point.
/// Rows may differ in length since native resolutions differ.
pub fn load_scalars(path: &Path) -> Result<Vec<Vec<f32>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("reading row {i} of {}", path.display()))?;
        let row = record
            .iter()
            .map(|field| {
                field
                    .trim()
                    .parse::<f32>()
                    .with_context(|| format!("row {i}: bad scalar {field:?}"))
            })
            .collect::<Result<Vec<f32>>>()?;
        rows.push(row);
    }
    tracing::info!("loaded scalar rows for {} streamline(s) from {}", rows.len(), path.display());
    Ok(rows)
}

/// Cortical surface sample for the U-fiber endpoint test:
/// `{"radius": r, "points": [[x,y,z], ...]}`. An endpoint is cortical when
/// it lies within `radius` of any surface point.
#[derive(Debug, Deserialize)]
pub struct SurfaceMask {
    radius: f32,
    points: Vec<Point3>,
}

impl SurfaceMask {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let mask: SurfaceMask = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing {}", path.display()))?;
        tracing::info!(
            "loaded cortical surface mask: {} point(s), radius {}",
            mask.points.len(),
            mask.radius
        );
        Ok(mask)
    }
}

impl CorticalClassifier for SurfaceMask {
    fn is_cortical(&self, point: &Point3) -> bool {
        self.points
            .iter()
            .any(|q| point_distance(point, q) <= self.radius)
    }
}

/// Serialized run result
#[derive(Debug, Serialize, Deserialize)]
pub struct RunReport {
    pub labels: Vec<ClusterId>,
    pub clusters: Vec<ClusterReport>,
    /// Prototype geometry keyed by cluster id
    pub prototypes: BTreeMap<ClusterId, Vec<Point3>>,
    /// Along-bundle profiles keyed by cluster id
    pub profiles: BTreeMap<ClusterId, ProfileReport>,
    pub warnings: Vec<RunWarning>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClusterReport {
    pub id: ClusterId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub members: Vec<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileReport {
    pub mean: Vec<f32>,
    pub std_dev: Vec<f32>,
}

impl From<&RunOutput> for RunReport {
    fn from(out: &RunOutput) -> Self {
        Self {
            labels: out.labels.clone(),
            clusters: out
                .clusters
                .iter()
                .map(|c| ClusterReport {
                    id: c.id,
                    name: c.name.clone(),
                    members: c.members.clone(),
                })
                .collect(),
            prototypes: out
                .prototypes
                .iter()
                .map(|(&id, proto)| (id, proto.points().to_vec()))
                .collect(),
            profiles: out
                .profiles
                .iter()
                .map(|(&id, p)| {
                    (
                        id,
                        ProfileReport {
                            mean: p.mean.clone(),
                            std_dev: p.std_dev.clone(),
                        },
                    )
                })
                .collect(),
            warnings: out.warnings.clone(),
        }
    }
}

pub fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)
        .with_context(|| format!("writing {}", path.display()))?;
    tracing::info!("wrote results to {}", path.display());
    Ok(())
}

pub fn load_report(path: &Path) -> Result<RunReport> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file)).with_context(|| format!("parsing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str, suffix: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_streamlines() {
        let file = write_temp(
            r#"{"streamlines": [[[0,0,0],[1,0,0]], [[0,1,0],[1,1,0],[2,1,0]]]}"#,
            ".json",
        );
        let streamlines = load_streamlines(file.path()).unwrap();
        assert_eq!(streamlines.len(), 2);
        assert_eq!(streamlines[1].len(), 3);
    }

    #[test]
    fn test_load_streamlines_rejects_degenerate() {
        let file = write_temp(r#"{"streamlines": [[[0,0,0]]]}"#, ".json");
        assert!(load_streamlines(file.path()).is_err());
    }

    #[test]
    fn test_load_scalars_flexible_rows() {
        let file = write_temp("1.0,2.0,3.0\n0.5,0.25\n", ".csv");
        let rows = load_scalars(file.path()).unwrap();
        assert_eq!(rows[0], vec![1.0, 2.0, 3.0]);
        assert_eq!(rows[1], vec![0.5, 0.25]);
    }

    #[test]
    fn test_surface_mask_classifies_by_radius() {
        let file = write_temp(r#"{"radius": 2.0, "points": [[0,0,0]]}"#, ".json");
        let mask = SurfaceMask::load(file.path()).unwrap();
        assert!(mask.is_cortical(&[1.0, 0.0, 0.0]));
        assert!(!mask.is_cortical(&[5.0, 0.0, 0.0]));
    }

    #[test]
    fn test_report_round_trip() {
        let report = RunReport {
            labels: vec![0, 0, -1],
            clusters: vec![ClusterReport {
                id: 0,
                name: None,
                members: vec![0, 1],
            }],
            prototypes: [(0, vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]])].into(),
            profiles: BTreeMap::new(),
            warnings: vec![],
        };
        let file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write_report(file.path(), &report).unwrap();
        let back = load_report(file.path()).unwrap();
        assert_eq!(back.labels, report.labels);
        assert_eq!(back.clusters[0].members, vec![0, 1]);
    }
}
