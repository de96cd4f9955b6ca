/// Command-line driver for the flood simulation core.
///
/// `prepare` fuses a ground-level height grid and sealing observations into
/// tile records; `run` simulates rainfall on those records and writes one
/// JSON snapshot per iteration plus a run report.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{info, LevelFilter};
use serde::Serialize;

use pluvia_core::params::TileSize;
use pluvia_core::simulation::{Simulation, Snapshot, SnapshotSink};
use pluvia_core::terrain::build_records;
use pluvia_core::{AnomalyPolicy, PluviaError, SimulationParams, TileRecord};

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "pluvia", version, about = "Urban heavy-rain flood simulation on a square tile grid")]
struct Cli {
    /// Log level (error, warn, info, debug, trace); RUST_LOG overrides.
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build tile records from heights and sealing.
    Prepare(PrepareArgs),
    /// Run a simulation and write snapshots.
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct PrepareArgs {
    /// JSON array of ground-level heights (m), row-major, N×N entries.
    #[arg(long)]
    heights: PathBuf,

    /// JSON array of sealing percentages aligned with heights; null = unobserved.
    #[arg(long)]
    sealing: PathBuf,

    /// Tile edge length in metres, used as gradient spacing.
    #[arg(long, default_value = "5")]
    tile_edge: f64,

    /// Output tile-record JSON file.
    #[arg(short, long, default_value = "data/preprocessed/tiles.json")]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Tile-record JSON file (see `prepare`).
    #[arg(long)]
    tiles: PathBuf,

    /// Simulation parameter JSON file; missing fields use defaults.
    #[arg(long)]
    params: Option<PathBuf>,

    /// Rainfall in mm per 10 minutes.
    #[arg(long)]
    rainfall: Option<f64>,

    /// Minutes per iteration.
    #[arg(long)]
    timestep: Option<f64>,

    #[arg(long)]
    iterations: Option<usize>,

    /// Tile edge length in metres.
    #[arg(long, conflicts_with = "tile_area")]
    tile_edge: Option<f64>,

    /// Tile area in square metres.
    #[arg(long)]
    tile_area: Option<f64>,

    /// Manning–Strickler roughness k_st.
    #[arg(long)]
    roughness: Option<f64>,

    /// Clamp out-of-range sealing and outflow instead of only reporting them.
    #[arg(long)]
    clamp: bool,

    /// Simulation name; snapshots go to `<output>/<name>/<name>-step-<i>.json`.
    #[arg(long, default_value = "simulation")]
    name: String,

    /// Output root directory (created if absent).
    #[arg(short, long, default_value = "data/interim/simulation")]
    output: PathBuf,
}

// ── JSON helpers ─────────────────────────────────────────────────────────────

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}

// ── Snapshot output ──────────────────────────────────────────────────────────

#[derive(Serialize)]
struct SnapshotFile<'a> {
    name: &'a str,
    iteration: Option<usize>,
    tiles: Vec<TileRecord>,
}

/// Writes each snapshot to its own file as it arrives.
struct JsonDirSink {
    dir: PathBuf,
    name: String,
    written: usize,
}

impl SnapshotSink for JsonDirSink {
    type Error = anyhow::Error;

    fn emit(&mut self, snapshot: &Snapshot) -> Result<()> {
        let step = snapshot.iteration().unwrap_or(0);
        let path = self.dir.join(format!("{}-step-{step}.json", self.name));
        let file = SnapshotFile { name: &self.name, iteration: snapshot.iteration(), tiles: snapshot.to_records() };
        write_json(&path, &file)?;
        self.written += 1;
        Ok(())
    }
}

// ── Commands ─────────────────────────────────────────────────────────────────

fn prepare(args: PrepareArgs) -> Result<()> {
    let heights: Vec<f64> = read_json(&args.heights)?;
    let sealing: Vec<Option<f64>> = read_json(&args.sealing)?;
    let missing = sealing.iter().filter(|s| s.is_none()).count();

    let records = build_records(heights, &sealing, args.tile_edge).map_err(PluviaError::from)?;
    if missing > 0 {
        info!("{missing} tile(s) without sealing observation set to 100 %");
    }
    write_json(&args.output, &records)?;
    info!("{} tile records -> {}", records.len(), args.output.display());
    Ok(())
}

fn resolve_params(args: &RunArgs) -> Result<SimulationParams> {
    let mut p = match &args.params {
        Some(path) => read_json(path)?,
        None => SimulationParams::default(),
    };
    if let Some(v) = args.rainfall {
        p.rainfall_mm_per_10min = v;
    }
    if let Some(v) = args.timestep {
        p.timestep_min = v;
    }
    if let Some(v) = args.iterations {
        p.iterations = v;
    }
    if let Some(v) = args.tile_edge {
        p.tile = TileSize::from_edge(v);
    }
    if let Some(v) = args.tile_area {
        if v <= 0.0 {
            bail!("--tile-area must be positive, got {v}");
        }
        p.tile = TileSize::from_area(v);
    }
    if let Some(v) = args.roughness {
        p.roughness = v;
    }
    if args.clamp {
        p.anomaly_policy = AnomalyPolicy::Clamp;
    }
    Ok(p)
}

fn run(args: RunArgs) -> Result<()> {
    let params = resolve_params(&args)?;
    let records: Vec<TileRecord> = read_json(&args.tiles)?;
    let sim = Simulation::new(records, params).context("setting up simulation")?;

    let dir = args.output.join(&args.name);
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    let mut sink = JsonDirSink { dir: dir.clone(), name: args.name.clone(), written: 0 };

    let report = sim.run_with_sink(&mut sink)?;
    write_json(&dir.join(format!("{}-report.json", args.name)), &report)?;

    if report.anomaly_count() > 0 {
        log::warn!("{} numeric anomalies recorded, see the run report", report.anomaly_count());
    }
    info!("{} snapshots -> {}", sink.written, dir.display());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = cli.log_level.parse::<LevelFilter>().unwrap_or(LevelFilter::Info);
    env_logger::Builder::new().filter_level(level).parse_default_env().init();

    match cli.command {
        Command::Prepare(args) => prepare(args),
        Command::Run(args) => run(args),
    }
}
