//! fascicle: cluster white-matter streamlines into bundles
//!
//! Subcommands mirror the classic tool surface: `single` (unsupervised),
//! `prior` (atlas-guided), `ufiber` / `ufiber-prior` (short
//! cortico-cortical fibers), and `scalar` (profile a measurement along
//! previously clustered bundles).

mod io;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fascicle_core::{
    prototype::build_prototype, resample::resample_all, resample::resample_scalars, AffinityMode,
    Cluster, Pipeline, PipelineConfig, PrototypeStrategy, UFiberConfig, NOISE_CLUSTER,
};

use io::{RunReport, SurfaceMask};

#[derive(Parser)]
#[command(name = "fascicle", version, about = "Streamline bundle clustering")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Unsupervised clustering of a whole-brain streamline set
    Single(SingleArgs),
    /// Assign streamlines to prior atlas bundles
    Prior(PriorArgs),
    /// Unsupervised clustering restricted to short cortico-cortical U-fibers
    Ufiber(UfiberArgs),
    /// Prior-guided clustering restricted to U-fibers
    UfiberPrior(UfiberPriorArgs),
    /// Profile a scalar measurement along bundles from a previous run
    Scalar(ScalarArgs),
}

#[derive(Args)]
struct CommonArgs {
    /// Streamline geometry JSON
    #[arg(long)]
    streamlines: PathBuf,
    /// Output JSON path
    #[arg(short, long)]
    output: PathBuf,
    /// Points per resampled streamline
    #[arg(long, default_value_t = 20)]
    points: usize,
    /// Per-point scalar CSV (one row per streamline, native resolution)
    #[arg(long)]
    scalars: Option<PathBuf>,
    /// Store only pairwise distances at or below this threshold
    #[arg(long)]
    sparse: Option<f32>,
    /// Prototype strategy
    #[arg(long, value_enum, default_value = "medoid")]
    prototype: PrototypeArg,
}

#[derive(Args)]
struct UfiberConstraintArgs {
    /// Cortical surface mask JSON for the endpoint test
    #[arg(long)]
    cortex: PathBuf,
    /// Maximum native arc length of a U-fiber
    #[arg(long, default_value_t = 80.0)]
    length_cutoff: f32,
}

#[derive(Args)]
struct SingleArgs {
    #[command(flatten)]
    common: CommonArgs,
    /// Merge clusters while their prototypes are closer than this
    #[arg(long, default_value_t = 5.0)]
    merge_threshold: f32,
}

#[derive(Args)]
struct PriorArgs {
    #[command(flatten)]
    common: CommonArgs,
    /// Prior atlas bundles JSON
    #[arg(long)]
    priors: PathBuf,
    /// Reject assignments farther than this from the nearest prior
    #[arg(long, default_value_t = 8.0)]
    accept_threshold: f32,
}

#[derive(Args)]
struct UfiberArgs {
    #[command(flatten)]
    common: CommonArgs,
    #[command(flatten)]
    constraint: UfiberConstraintArgs,
    /// Merge threshold; U-fibers are geometrically similar, keep it tight
    #[arg(long, default_value_t = 3.0)]
    merge_threshold: f32,
}

#[derive(Args)]
struct UfiberPriorArgs {
    #[command(flatten)]
    common: CommonArgs,
    #[command(flatten)]
    constraint: UfiberConstraintArgs,
    /// Prior atlas bundles JSON
    #[arg(long)]
    priors: PathBuf,
    /// Acceptance threshold; tighter than whole-brain matching
    #[arg(long, default_value_t = 4.0)]
    accept_threshold: f32,
}

#[derive(Args)]
struct ScalarArgs {
    /// Streamline geometry JSON (same set the labels were produced from)
    #[arg(long)]
    streamlines: PathBuf,
    /// Per-point scalar CSV
    #[arg(long)]
    scalars: PathBuf,
    /// Result JSON of a previous clustering run
    #[arg(long)]
    labels: PathBuf,
    /// Output JSON path
    #[arg(short, long)]
    output: PathBuf,
    /// Points per resampled streamline (must match the clustering run)
    #[arg(long, default_value_t = 20)]
    points: usize,
    /// Prototype strategy for the rebuilt cluster geometry
    #[arg(long, value_enum, default_value = "medoid")]
    prototype: PrototypeArg,
}

#[derive(Clone, Copy, ValueEnum)]
enum PrototypeArg {
    Medoid,
    Mean,
}

impl From<PrototypeArg> for PrototypeStrategy {
    fn from(arg: PrototypeArg) -> Self {
        match arg {
            PrototypeArg::Medoid => PrototypeStrategy::Medoid,
            PrototypeArg::Mean => PrototypeStrategy::Mean,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fascicle=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match Cli::parse().command {
        Commands::Single(args) => {
            let config = base_config(&args.common, PipelineConfig {
                merge_threshold: args.merge_threshold,
                ..Default::default()
            });
            cluster_run(&args.common, config, None, None)
        }
        Commands::Prior(args) => {
            let config = base_config(&args.common, PipelineConfig {
                accept_threshold: args.accept_threshold,
                ..Default::default()
            });
            cluster_run(&args.common, config, Some(&args.priors), None)
        }
        Commands::Ufiber(args) => {
            let config = base_config(&args.common, PipelineConfig {
                merge_threshold: args.merge_threshold,
                ufiber: Some(UFiberConfig {
                    length_cutoff: args.constraint.length_cutoff,
                }),
                ..Default::default()
            });
            cluster_run(&args.common, config, None, Some(&args.constraint.cortex))
        }
        Commands::UfiberPrior(args) => {
            let config = base_config(&args.common, PipelineConfig {
                accept_threshold: args.accept_threshold,
                ufiber: Some(UFiberConfig {
                    length_cutoff: args.constraint.length_cutoff,
                }),
                ..Default::default()
            });
            cluster_run(
                &args.common,
                config,
                Some(&args.priors),
                Some(&args.constraint.cortex),
            )
        }
        Commands::Scalar(args) => scalar_run(&args),
    }
}

fn base_config(common: &CommonArgs, mut config: PipelineConfig) -> PipelineConfig {
    config.points_per_streamline = common.points;
    config.prototype_strategy = common.prototype.into();
    config.affinity_mode = match common.sparse {
        Some(threshold) => AffinityMode::Sparse { threshold },
        None => AffinityMode::Dense,
    };
    config
}

fn cluster_run(
    common: &CommonArgs,
    config: PipelineConfig,
    priors_path: Option<&PathBuf>,
    cortex_path: Option<&PathBuf>,
) -> anyhow::Result<()> {
    let streamlines = io::load_streamlines(&common.streamlines)?;
    let priors = priors_path
        .map(|path| io::load_priors(path, config.points_per_streamline))
        .transpose()?;
    let scalars = common.scalars.as_deref().map(io::load_scalars).transpose()?;
    let mask = cortex_path.map(|path| SurfaceMask::load(path)).transpose()?;

    let spinner = ProgressBar::new_spinner().with_style(
        ProgressStyle::with_template("{spinner} {msg} [{elapsed}]").unwrap(),
    );
    spinner.set_message(format!("clustering {} streamline(s)", streamlines.len()));
    spinner.enable_steady_tick(std::time::Duration::from_millis(120));

    let pipeline = Pipeline::new(config);
    let out = pipeline.run(
        &streamlines,
        priors.as_deref(),
        scalars.as_deref(),
        mask.as_ref().map(|m| m as &dyn fascicle_core::CorticalClassifier),
    )?;
    spinner.finish_and_clear();

    let noise = out.labels.iter().filter(|&&l| l == NOISE_CLUSTER).count();
    println!(
        "{} cluster(s), {} noise streamline(s) out of {}",
        out.clusters.len(),
        noise,
        out.labels.len()
    );
    for warning in &out.warnings {
        println!("warning: {warning:?}");
    }

    io::write_report(&common.output, &RunReport::from(&out))
}

/// Attach a scalar measurement to the bundles of a previous run: rebuild
/// clusters from the saved labels, align the samples to the shared
/// parameterization, and emit per-cluster profiles.
fn scalar_run(args: &ScalarArgs) -> anyhow::Result<()> {
    let streamlines = io::load_streamlines(&args.streamlines)?;
    let scalar_rows = io::load_scalars(&args.scalars)?;
    let previous = io::load_report(&args.labels)?;
    anyhow::ensure!(
        previous.labels.len() == streamlines.len(),
        "label count ({}) does not match streamline count ({})",
        previous.labels.len(),
        streamlines.len()
    );
    anyhow::ensure!(
        scalar_rows.len() == streamlines.len(),
        "scalar row count ({}) does not match streamline count ({})",
        scalar_rows.len(),
        streamlines.len()
    );

    let resampled = resample_all(&streamlines, args.points)?;
    let aligned: Vec<Vec<f32>> = streamlines
        .iter()
        .zip(&scalar_rows)
        .enumerate()
        .map(|(i, (s, row))| resample_scalars(i, s, row, args.points))
        .collect::<fascicle_core::Result<_>>()?;

    let mut ids: Vec<i32> = previous
        .labels
        .iter()
        .copied()
        .filter(|&l| l != NOISE_CLUSTER)
        .collect();
    ids.sort_unstable();
    ids.dedup();

    let clusters: Vec<Cluster> = ids
        .into_iter()
        .map(|id| {
            let members: Vec<usize> = previous
                .labels
                .iter()
                .enumerate()
                .filter(|(_, &l)| l == id)
                .map(|(i, _)| i)
                .collect();
            let prototype =
                build_prototype(&resampled, &members, args.prototype.into(), id as usize)?;
            Ok(Cluster {
                id,
                name: previous
                    .clusters
                    .iter()
                    .find(|c| c.id == id)
                    .and_then(|c| c.name.clone()),
                members,
                prototype,
            })
        })
        .collect::<fascicle_core::Result<_>>()?;

    let profiles = fascicle_core::profile::scalar_profiles(&clusters, &aligned, args.points)?;
    println!("profiled {} cluster(s)", profiles.len());

    let report = RunReport {
        labels: previous.labels,
        clusters: clusters
            .iter()
            .map(|c| io::ClusterReport {
                id: c.id,
                name: c.name.clone(),
                members: c.members.clone(),
            })
            .collect(),
        prototypes: clusters
            .iter()
            .map(|c| (c.id, c.prototype.points().to_vec()))
            .collect(),
        profiles: profiles
            .into_iter()
            .map(|p| {
                (
                    p.cluster,
                    io::ProfileReport {
                        mean: p.mean,
                        std_dev: p.std_dev,
                    },
                )
            })
            .collect(),
        warnings: Vec::new(),
    };
    io::write_report(&args.output, &report)
}
