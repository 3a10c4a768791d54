//! RAC - Rydberg Atom Compiler command line interface.
//!
//! Two entry points:
//! - `run`: compile a preset random 3-regular interaction graph
//! - `run_qasm`: compile the CZ content of an OpenQASM 2.0 circuit
//!
//! Results land under `./results/`: the instruction stream in `code/`,
//! stage timings in `time/`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use rac_cli::graphs;
use rac_cli::pipeline::{RacPipeline, SolveResult};
use rac_core::{CompilerConfig, RoutingStrategy};
use rac_qasm::{parse_program, resolve_includes};

/// RAC - Rydberg Atom Compiler
///
/// Compiles two-qubit gate lists onto a neutral-atom reconfigurable
/// array, emitting the AOD instruction stream that realizes them.
#[derive(Parser)]
#[command(name = "rac")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StrategyArg {
    /// External redumis subprocess
    #[value(name = "mis")]
    Mis,
    /// Seeded library maximal independent set
    #[value(name = "maximalis")]
    Maximalis,
    /// Greedy over distance-sorted motions
    #[value(name = "maximalis_sorted")]
    MaximalisSorted,
}

impl From<StrategyArg> for RoutingStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Mis => RoutingStrategy::Mis,
            StrategyArg::Maximalis => RoutingStrategy::MaximalIs,
            StrategyArg::MaximalisSorted => RoutingStrategy::MaximalIsSorted,
        }
    }
}

/// Flags shared by both entry points.
#[derive(Args)]
struct CompileFlags {
    /// Architecture dimension: sites and AOD tracks per axis
    #[arg(long, default_value_t = 16)]
    arch: usize,

    /// Routing strategy
    #[arg(long = "routing_strategy", value_enum, default_value_t = StrategyArg::MaximalisSorted)]
    routing_strategy: StrategyArg,

    /// Row-major identity placement instead of simulated annealing
    #[arg(long = "trivial_layout")]
    trivial_layout: bool,

    /// Reverse to the initial mapping after each Rydberg stage
    #[arg(long)]
    r2i: bool,

    /// Restrict the motion candidate list entering MIS to 1000 vertices
    #[arg(long)]
    window: bool,

    /// Emit per-instruction state snapshots for animation (large files)
    #[arg(long = "full_code")]
    full_code: bool,

    /// Squared-Euclidean wirelength in the placers
    #[arg(long)]
    l2: bool,

    /// Run the diagnostic verifiers on intermediate results
    #[arg(long)]
    verify: bool,
}

impl CompileFlags {
    fn to_config(&self, dependency: bool) -> CompilerConfig {
        CompilerConfig {
            routing_strategy: self.routing_strategy.into(),
            trivial_layout: self.trivial_layout,
            reverse_to_initial: self.r2i,
            use_window: self.window,
            full_code: self.full_code,
            l2: self.l2,
            dependency,
            verify: self.verify,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a preset random 3-regular interaction graph
    Run {
        /// Number of qubits in the graph
        #[arg(value_name = "S")]
        size: usize,

        /// Index of the graph, 0-9
        #[arg(value_name = "I")]
        id: usize,

        /// Suffix appended to the output file names
        #[arg(long)]
        suffix: Option<String>,

        #[command(flatten)]
        flags: CompileFlags,
    },

    /// Compile the CZ interactions of an OpenQASM 2.0 circuit
    #[command(name = "run_qasm")]
    RunQasm {
        /// Path to the QASM file
        #[arg(value_name = "FILE")]
        qasm: PathBuf,

        #[command(flatten)]
        flags: CompileFlags,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let _ = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .try_init();

    match cli.command {
        Commands::Run {
            size,
            id,
            suffix,
            flags,
        } => cmd_run(size, id, suffix.as_deref(), &flags),
        Commands::RunQasm { qasm, flags } => cmd_run_qasm(&qasm, &flags),
    }
}

/// Compile a preset graph; commuting gates, edge-coloring scheduler.
fn cmd_run(size: usize, id: usize, suffix: Option<&str>, flags: &CompileFlags) -> Result<()> {
    let mut graph_sets = graphs::load(Path::new("./graphs.json"))
        .with_context(|| "failed to load ./graphs.json")?;
    let (edges, generated) = graphs::fetch(&mut graph_sets, size, id)?;
    if generated {
        graphs::save(Path::new("./graphs_new.json"), &graph_sets)
            .with_context(|| "failed to write ./graphs_new.json")?;
        info!("generated graphs for size {size} into ./graphs_new.json");
    }

    let mut name = format!("rand3reg_{size}_{id}");
    if let Some(suffix) = suffix {
        name.push('_');
        name.push_str(suffix);
    }

    let mut pipeline = RacPipeline::new(flags.to_config(false));
    pipeline.set_architecture(flags.arch, flags.arch, flags.arch, flags.arch);
    pipeline.set_program(edges, None)?;
    let result = pipeline.solve()?;

    write_outputs(&name, &result, flags.full_code)
}

/// Compile a QASM circuit; gate order is preserved, ASAP scheduler.
fn cmd_run_qasm(path: &Path, flags: &CompileFlags) -> Result<()> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read QASM file {}", path.display()))?;
    let base = path.parent().unwrap_or(Path::new("."));
    let resolved = resolve_includes(&source, base).with_context(|| "failed to resolve includes")?;
    let program = parse_program(&resolved).with_context(|| "failed to parse QASM")?;
    info!(
        "parsed circuit: {} qubits, {} CZ interactions",
        program.num_qubits,
        program.len()
    );

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("circuit")
        .to_string();

    let mut pipeline = RacPipeline::new(flags.to_config(true));
    pipeline.set_architecture(flags.arch, flags.arch, flags.arch, flags.arch);
    pipeline.set_program(
        program.gates.iter().map(|g| (g.q0, g.q1)),
        Some(program.num_qubits),
    )?;
    let result = pipeline.solve()?;

    write_outputs(&name, &result, flags.full_code)
}

fn write_outputs(name: &str, result: &SolveResult, full_code: bool) -> Result<()> {
    let code_dir = Path::new("./results/code");
    let time_dir = Path::new("./results/time");
    fs::create_dir_all(code_dir)?;
    fs::create_dir_all(time_dir)?;

    if full_code {
        let full_path = code_dir.join(format!("{name}_code_full.json"));
        fs::write(&full_path, serde_json::to_string(&result.records)?)?;
        info!("wrote {}", full_path.display());
    }

    let code_path = code_dir.join(format!("{name}_code.json"));
    fs::write(&code_path, serde_json::to_string(&result.compact_records())?)?;
    info!("wrote {}", code_path.display());

    let time_path = time_dir.join(format!("{name}_time.json"));
    fs::write(&time_path, serde_json::to_string_pretty(&result.timing)?)?;
    info!("wrote {}", time_path.display());

    info!(
        "compiled {} layers into {} instructions",
        result.num_layers,
        result.records.len()
    );
    Ok(())
}
