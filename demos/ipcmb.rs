//! Markov blanket discovery from the command line.
//!
//! Either a causal graph (answered by d-separation) or a CSV of categorical
//! codes (answered by a G-test):
//!
//! ```bash
//! cargo run --example ipcmb -- --graph 0-1,4-1,1-2,1-3,2-5,3-5 --target 3
//! cargo run --example ipcmb -- --data data.csv --target 0 --ci-test entropy-cache
//! ```

use std::path::PathBuf;
use std::rc::Rc;

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{bail, eyre, WrapErr};

use mbtk_rs::ci::CiTestKind;
use mbtk_rs::dataset::DatasetMatrix;
use mbtk_rs::dof::DofCalculatorKind;
use mbtk_rs::graph::DirectedGraph;
use mbtk_rs::ipcmb::AlgorithmIpcmb;
use mbtk_rs::params::Parameters;
use mbtk_rs::types::{Value, VarId};

#[derive(Debug, Copy, Clone, ValueEnum)]
enum Backend {
    Unoptimized,
    CountIndex,
    EntropyCache,
}

impl From<Backend> for CiTestKind {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Unoptimized => CiTestKind::GTestUnoptimized,
            Backend::CountIndex => CiTestKind::GTestCountIndex,
            Backend::EntropyCache => CiTestKind::GTestEntropyCache,
        }
    }
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum Dof {
    Unadjusted,
    Structural,
    CachedStructural,
}

impl From<Dof> for DofCalculatorKind {
    fn from(dof: Dof) -> Self {
        match dof {
            Dof::Unadjusted => DofCalculatorKind::UnadjustedDof,
            Dof::Structural => DofCalculatorKind::StructuralDof,
            Dof::CachedStructural => DofCalculatorKind::CachedStructuralDof,
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Causal graph as comma-separated `parent-child` edges.
    #[arg(long, value_name = "EDGES", conflicts_with = "data")]
    graph: Option<String>,

    /// CSV of non-negative integer codes, one column per variable.
    #[arg(long, value_name = "FILE", required_unless_present = "graph")]
    data: Option<PathBuf>,

    /// Target variable.
    #[arg(long, value_name = "INT")]
    target: VarId,

    /// G-test backend (ignored with --graph).
    #[arg(long, value_enum, default_value = "entropy-cache")]
    ci_test: Backend,

    /// DoF calculator (ignored with --graph).
    #[arg(long, value_enum, default_value = "cached-structural")]
    dof: Dof,

    /// Significance compared against the chi-squared CDF.
    #[arg(long, value_name = "FLOAT", default_value = "0.95")]
    significance: f64,

    /// Report only parents and children.
    #[arg(long)]
    pc_only: bool,

    /// Search log verbosity (0, 1 or 2).
    #[arg(long, value_name = "INT", default_value = "0")]
    debug: u8,

    /// Write the CI test log here as JSON.
    #[arg(long, value_name = "FILE")]
    results: Option<PathBuf>,
}

fn parse_edges(edges: &str) -> color_eyre::Result<DirectedGraph> {
    let mut graph = DirectedGraph::new();
    for edge in edges.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (parent, child) = edge
            .split_once('-')
            .ok_or_else(|| eyre!("edge '{}' is not of the form parent-child", edge))?;
        graph.add_edge(parent.trim().parse()?, child.trim().parse()?);
    }
    Ok(graph)
}

fn read_csv(path: &PathBuf) -> color_eyre::Result<DatasetMatrix> {
    let text = std::fs::read_to_string(path).wrap_err_with(|| format!("reading {}", path.display()))?;
    let mut rows: Vec<Vec<Value>> = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let parsed: Result<Vec<Value>, _> = line.split(',').map(|cell| cell.trim().parse::<Value>()).collect();
        match parsed {
            Ok(row) => rows.push(row),
            // A header line.
            Err(_) if i == 0 => continue,
            Err(e) => bail!("line {}: {}", i + 1, e),
        }
    }
    let label = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    Ok(DatasetMatrix::from_rows(label, &rows)?)
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);

    let (mut params, dataset) = match (&args.graph, &args.data) {
        (Some(edges), _) => {
            let graph = parse_edges(edges)?;
            println!("graph: {} nodes", graph.len());
            let params = Parameters::new(args.target, CiTestKind::DSeparation).with_source_bayesian_network(Rc::new(graph));
            (params, None)
        }
        (None, Some(path)) => {
            let dataset = read_csv(path)?;
            println!("dataset '{}': {} rows, {} columns", dataset.label(), dataset.n_rows(), dataset.n_cols());
            let params = Parameters::new(args.target, args.ci_test.into())
                .with_dof_calculator(args.dof.into())
                .with_significance(args.significance);
            (params, Some(Rc::new(dataset)))
        }
        (None, None) => bail!("either --graph or --data is required"),
    };
    params = params.with_pc_only(args.pc_only).with_algorithm_debug(args.debug);
    params.ci_test_results_path_save = args.results.clone();

    let mut ipcmb = AlgorithmIpcmb::new(&params, dataset)?;
    let blanket = ipcmb.discover_mb()?;

    let kind = if args.pc_only { "PC" } else { "MB" };
    println!("{}({}) = {:?}", kind, args.target, blanket);
    println!("CI tests: {}", ipcmb.ci_test().ci_test_counter());

    let time_total = time_total.elapsed();
    println!("\nAll done in {:.3} s", time_total.as_secs_f64());

    Ok(())
}
