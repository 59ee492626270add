mod input;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use dsm_core::optimize::{cluster_seeded, ClusterOptions, ClusteredCostResult};
use dsm_core::value::Dependency;
use dsm_core::{change_ratio, propagation_cost};
use dsm_report::{svg, text, AnalysisSummary};

#[derive(Parser)]
#[command(name = "dsm")]
#[command(about = "Cluster dependency structure matrices and score system modularity")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ClusterArgs {
    /// Fan-in ratio above which an element counts as a vertical bus
    #[arg(long, default_value_t = 0.1)]
    threshold: f64,
    /// Cluster size exponent of the cost model
    #[arg(long, default_value_t = dsm_core::DEFAULT_LAMBDA)]
    lambda: u32,
    /// Seed for the stochastic optimizer (random when omitted)
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Cluster a dependency graph and report every metric
    Analyze {
        /// Path to the graph JSON file
        path: PathBuf,
        #[command(flatten)]
        cluster: ClusterArgs,
        /// Emit the summary as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Cluster a dependency graph
    Cluster {
        /// Path to the graph JSON file
        path: PathBuf,
        #[command(flatten)]
        cluster: ClusterArgs,
        /// Write the clustered matrix as SVG to this path
        #[arg(long)]
        svg: Option<PathBuf>,
        /// Emit the summary as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Compute the propagation cost of a dependency graph
    Propagation {
        /// Path to the graph JSON file
        path: PathBuf,
    },
    /// Compute the change ratio between two versions of a graph
    Diff {
        /// Graph JSON of the earlier version
        before: PathBuf,
        /// Graph JSON of the later version
        after: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Analyze {
            path,
            cluster,
            json,
        } => cmd_analyze(&path, &cluster, json),
        Commands::Cluster {
            path,
            cluster,
            svg,
            json,
        } => cmd_cluster(&path, &cluster, svg.as_deref(), json),
        Commands::Propagation { path } => cmd_propagation(&path),
        Commands::Diff { before, after } => cmd_diff(&before, &after),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(2);
    }
}

fn cmd_analyze(path: &Path, args: &ClusterArgs, json: bool) -> Result<()> {
    let dsm = input::load_graph(path)?;
    let result = run_clustering(&dsm, args)?;
    let propagation = propagation_cost(&dsm);
    let summary = AnalysisSummary::from_result(&result).with_propagation_cost(propagation);
    print_summary(&summary, json)
}

fn cmd_cluster(path: &Path, args: &ClusterArgs, svg_path: Option<&Path>, json: bool) -> Result<()> {
    let dsm = input::load_graph(path)?;
    let result = run_clustering(&dsm, args)?;
    if let Some(target) = svg_path {
        std::fs::write(target, svg::render(&result.dsm))
            .with_context(|| format!("failed to write {}", target.display()))?;
        eprintln!("Wrote {}", target.display());
    }
    let summary = AnalysisSummary::from_result(&result);
    print_summary(&summary, json)
}

fn cmd_propagation(path: &Path) -> Result<()> {
    let dsm = input::load_graph(path)?;
    println!("{}", propagation_cost(&dsm));
    Ok(())
}

fn cmd_diff(before: &Path, after: &Path) -> Result<()> {
    let before_dsm = input::load_graph(before)?;
    let after_dsm = input::load_graph(after)?;
    println!("{}", change_ratio(before_dsm.names(), after_dsm.names()));
    Ok(())
}

fn run_clustering(
    dsm: &dsm_core::Dsm<Dependency>,
    args: &ClusterArgs,
) -> Result<ClusteredCostResult<Dependency>> {
    let options = ClusterOptions {
        vertical_bus_threshold: args.threshold,
        lambda: args.lambda,
    };
    let seed = args.seed.unwrap_or_else(rand::random);
    let result = cluster_seeded(dsm, &options, seed)
        .with_context(|| format!("clustering failed (seed {seed})"))?;
    Ok(result)
}

fn print_summary(summary: &AnalysisSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", summary.to_json()?);
    } else {
        print!("{}", text::format_report(summary));
    }
    Ok(())
}
