//! Timestep driver: runs rainfall → infiltration → velocity → routing →
//! redistribution once per iteration and emits a snapshot after each.
//!
//! Every step reads the previous snapshot and builds a new one; snapshots
//! handed out are never touched again by the driver.
use log::{debug, info, warn};
use ndarray::Array3;
use serde::Serialize;

use crate::anomaly::{check_outflow, check_sealing, clamp_outflow, clamp_sealing, AnomalyPolicy, NumericAnomaly};
use crate::diagnostics::{summarize, WaterSummary};
use crate::error::{PluviaError, Result};
use crate::grid::TileGrid;
use crate::infiltration::apply_infiltration;
use crate::layout::{tiles_to_records, to_grid};
use crate::params::{RainClass, SimulationParams};
use crate::redistribution::{boundary_loss, redistribute};
use crate::routing::route;
use crate::tile::{Tile, TileRecord};
use crate::velocity::flow_velocity;

// ── Snapshots ─────────────────────────────────────────────────────────────────

/// Full tile state at one point of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// `None` for the state before the first iteration.
    iteration: Option<usize>,
    tiles: TileGrid<Tile>,
}

impl Snapshot {
    pub fn iteration(&self) -> Option<usize> {
        self.iteration
    }

    pub fn tiles(&self) -> &TileGrid<Tile> {
        &self.tiles
    }

    /// Water per tile, aligned with the input records.
    pub fn water_levels(&self) -> Vec<f64> {
        self.tiles.iter().map(|t| t.water_l).collect()
    }

    pub fn total_water_l(&self) -> f64 {
        self.tiles.iter().map(|t| t.water_l).sum()
    }

    pub fn to_records(&self) -> Vec<TileRecord> {
        self.tiles
            .iter()
            .map(|t| TileRecord {
                water_l: t.water_l,
                gradient_x: t.gradient_x,
                gradient_y: t.gradient_y,
                sealing_pct: t.sealing_pct,
            })
            .collect()
    }

    /// `N × N × 4` array of `[water_l, gradient_x, gradient_y, sealing_pct]`.
    pub fn to_array(&self) -> Result<Array3<f64>> {
        let records = tiles_to_records(self.tiles.as_slice());
        Ok(to_grid(records.view().into_dyn())?)
    }
}

/// Receives each snapshot as it is produced, e.g. to persist it.
pub trait SnapshotSink {
    type Error: From<PluviaError>;

    fn emit(&mut self, snapshot: &Snapshot) -> std::result::Result<(), Self::Error>;
}

// ── Step bookkeeping ──────────────────────────────────────────────────────────

/// Water budget and anomalies of one iteration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepSummary {
    pub iteration: usize,
    pub rain_l: f64,
    pub infiltrated_l: f64,
    pub boundary_loss_l: f64,
    pub water: WaterSummary,
    pub anomalies: Vec<NumericAnomaly>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub snapshot: Snapshot,
    pub summary: StepSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub rain_class: RainClass,
    /// Found once on the input tiles, before the first step.
    pub setup_anomalies: Vec<NumericAnomaly>,
    pub steps: Vec<StepSummary>,
}

impl RunReport {
    pub fn anomaly_count(&self) -> usize {
        self.setup_anomalies.len() + self.steps.iter().map(|s| s.anomalies.len()).sum::<usize>()
    }
}

/// Everything a completed run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationRun {
    pub snapshots: Vec<Snapshot>,
    pub report: RunReport,
}

// ── Driver ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Initializing,
    /// Iteration `i` has been emitted.
    Running(usize),
    Completed,
}

pub struct Simulation {
    params: SimulationParams,
    state: RunState,
    current: Snapshot,
    setup_anomalies: Vec<NumericAnomaly>,
}

impl Simulation {
    /// Validate parameters and tiles and set up the initial state.
    pub fn new(records: Vec<TileRecord>, params: SimulationParams) -> Result<Self> {
        params.validate()?;
        let wet = records.iter().filter(|r| r.water_l != 0.0).count();
        if wet > 0 {
            warn!("{wet} tile record(s) carry a water level; runs start dry, resetting to 0");
        }
        let tiles = TileGrid::from_flat(records.into_iter().map(|r| Tile::from(r).with_water(0.0)).collect())?;

        let setup_anomalies = check_sealing(&tiles);
        if let Some(first) = setup_anomalies.first() {
            warn!("{} tile(s) with sealing outside [0, 100], first: {first}", setup_anomalies.len());
        }
        let tiles = match params.anomaly_policy {
            AnomalyPolicy::Clamp if !setup_anomalies.is_empty() => clamp_sealing(&tiles),
            _ => tiles,
        };

        info!(
            "simulation set up: {side}x{side} tiles, {} iterations of {} min, {:?} rain ({} l/tile/step)",
            params.iterations,
            params.timestep_min,
            params.rain_class(),
            params.rainfall_per_tile_l(),
            side = tiles.side(),
        );

        Ok(Self {
            params,
            state: RunState::Initializing,
            current: Snapshot { iteration: None, tiles },
            setup_anomalies,
        })
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Latest state: the initial tiles until the first step has run.
    pub fn current(&self) -> &Snapshot {
        &self.current
    }

    pub fn setup_anomalies(&self) -> &[NumericAnomaly] {
        &self.setup_anomalies
    }

    /// Compute the iteration following `prev` without touching driver state.
    pub fn step(&self, prev: &Snapshot) -> Result<StepOutcome> {
        let p = &self.params;
        let iteration = prev.iteration.map_or(0, |i| i + 1);

        // ── 1. Rainfall ─────────────────────────────────────────────────────
        let rain = p.rainfall_per_tile_l();
        let wet = prev.tiles.map(|t| t.with_water(t.water_l + rain));
        let wet_total: f64 = wet.iter().map(|t| t.water_l).sum();

        // ── 2. Infiltration ─────────────────────────────────────────────────
        let soaked = apply_infiltration(&wet);
        let water = soaked.map(|t| t.water_l);
        let infiltrated_l = wet_total - water.sum();

        // ── 3. Velocity + routing ───────────────────────────────────────────
        let velocities = flow_velocity(&soaked, p.tile.area_m2(), p.roughness);
        let outflow = route(&velocities, p.timestep_s(), p.tile.edge_m);

        let anomalies = check_outflow(&outflow);
        if let Some(first) = anomalies.first() {
            warn!("iteration {iteration}: {} tile(s) over-draining, first: {first}", anomalies.len());
        }
        let outflow = match p.anomaly_policy {
            AnomalyPolicy::Clamp if !anomalies.is_empty() => clamp_outflow(&outflow),
            _ => outflow,
        };

        // ── 4. Redistribution ───────────────────────────────────────────────
        let boundary_loss_l = boundary_loss(&water, &outflow)?;
        let next_water = redistribute(&water, &outflow)?;
        let tiles = soaked.zip_map(&next_water, |t, &w| t.with_water(w))?;

        let summary = StepSummary {
            iteration,
            rain_l: rain * tiles.len() as f64,
            infiltrated_l,
            boundary_loss_l,
            water: summarize(&tiles, p),
            anomalies,
        };
        debug!(
            "iteration {iteration}: total {:.1} l, infiltrated {:.1} l, lost at edge {:.1} l, max depth {:.3} m",
            summary.water.total_l, infiltrated_l, boundary_loss_l, summary.water.max_depth_m
        );

        Ok(StepOutcome { snapshot: Snapshot { iteration: Some(iteration), tiles }, summary })
    }

    /// Run the next iteration, or `None` once the run is complete.
    ///
    /// The state is `Running(i)` right after iteration `i` is emitted,
    /// including the last one; the call that returns `None` moves it to
    /// `Completed`. A failed step completes the run.
    pub fn advance(&mut self) -> Option<Result<StepOutcome>> {
        let iteration = match self.state {
            RunState::Initializing => 0,
            RunState::Running(i) if i + 1 < self.params.iterations => i + 1,
            RunState::Running(_) => {
                self.state = RunState::Completed;
                return None;
            }
            RunState::Completed => return None,
        };

        let outcome = match self.step(&self.current) {
            Ok(o) => o,
            Err(e) => {
                self.state = RunState::Completed;
                return Some(Err(e));
            }
        };
        self.current = outcome.snapshot.clone();
        self.state = RunState::Running(iteration);
        Some(Ok(outcome))
    }

    /// Run every iteration and collect all snapshots in order.
    pub fn run(mut self) -> Result<SimulationRun> {
        let mut snapshots = Vec::with_capacity(self.params.iterations);
        let mut steps = Vec::with_capacity(self.params.iterations);
        while let Some(outcome) = self.advance() {
            let StepOutcome { snapshot, summary } = outcome?;
            snapshots.push(snapshot);
            steps.push(summary);
        }
        let report = self.finish(steps);
        Ok(SimulationRun { snapshots, report })
    }

    /// Run every iteration, handing each snapshot to `sink` instead of
    /// keeping it.
    pub fn run_with_sink<S: SnapshotSink>(mut self, sink: &mut S) -> std::result::Result<RunReport, S::Error> {
        let mut steps = Vec::with_capacity(self.params.iterations);
        while let Some(outcome) = self.advance() {
            let outcome = outcome?;
            sink.emit(&outcome.snapshot)?;
            steps.push(outcome.summary);
        }
        Ok(self.finish(steps))
    }

    fn finish(self, steps: Vec<StepSummary>) -> RunReport {
        let report = RunReport {
            rain_class: self.params.rain_class(),
            setup_anomalies: self.setup_anomalies,
            steps,
        };
        if let Some(last) = report.steps.last() {
            info!(
                "simulation complete: {} iterations, {:.1} l on the grid, {} flooded tile(s), {} anomalies",
                report.steps.len(),
                last.water.total_l,
                last.water.flooded_tiles,
                report.anomaly_count()
            );
        }
        report
    }
}

impl Iterator for Simulation {
    type Item = Result<StepOutcome>;

    fn next(&mut self) -> Option<Self::Item> {
        self.advance()
    }
}

// ── Unit tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::params::TileSize;
    use approx::assert_abs_diff_eq;

    fn record(gx: f64, gy: f64, sealing: f64) -> TileRecord {
        TileRecord { water_l: 0.0, gradient_x: gx, gradient_y: gy, sealing_pct: sealing }
    }

    fn one_step() -> SimulationParams {
        SimulationParams {
            rainfall_mm_per_10min: 5.0,
            timestep_min: 10.0,
            iterations: 1,
            tile: TileSize::from_area(25.0),
            ..Default::default()
        }
    }

    #[test]
    fn two_by_two_scenario() {
        // Sealing [0, 0, 96, 96]; only tile 0 slopes, toward tile 1.
        let records = vec![
            record(1.0, 0.0, 0.0),
            record(0.0, 0.0, 0.0),
            record(0.0, 0.0, 96.0),
            record(0.0, 0.0, 96.0),
        ];
        let run = Simulation::new(records, one_step()).unwrap().run().unwrap();
        assert_eq!(run.snapshots.len(), 1);
        let w = run.snapshots[0].water_levels();

        // 125 l of rain each; unsealed keeps 66 %, 96 % sealed keeps 92 %.
        let low = 125.0 * 0.66;
        let high = 125.0 * 0.92;
        assert_abs_diff_eq!(w[2], high, epsilon = 1e-9);
        assert_abs_diff_eq!(w[3], high, epsilon = 1e-9);
        // Tile 0 moves more than a tile length in 10 min: all of it reaches tile 1.
        assert_abs_diff_eq!(w[0], 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(w[1], 2.0 * low, epsilon = 1e-9);

        let step = &run.report.steps[0];
        assert_abs_diff_eq!(step.rain_l, 500.0);
        assert_abs_diff_eq!(step.infiltrated_l, 2.0 * 125.0 * 0.34 + 2.0 * 125.0 * 0.08, epsilon = 1e-9);
        assert_abs_diff_eq!(step.boundary_loss_l, 0.0);
        assert!(run.report.setup_anomalies.is_empty());
    }

    #[test]
    fn flat_grid_only_rains_and_soaks() {
        let records = vec![record(0.0, 0.0, 0.0), record(0.0, 0.0, 48.0), record(0.0, 0.0, 96.0), record(0.0, 0.0, 20.0)];
        let sim = Simulation::new(records, one_step()).unwrap();
        let initial = sim.current().clone();
        let outcome = sim.step(&initial).unwrap();

        let wet = initial.tiles().map(|t| t.with_water(t.water_l + 125.0));
        let expected = apply_infiltration(&wet);
        assert_eq!(outcome.snapshot.tiles(), &expected);
        assert_eq!(outcome.summary.boundary_loss_l, 0.0);
    }

    #[test]
    fn uniform_slope_leaks_at_the_edge() {
        let records = vec![record(0.5, 0.0, 50.0); 4];
        let run = Simulation::new(records, one_step()).unwrap().run().unwrap();
        let step = &run.report.steps[0];
        let conservative = step.rain_l - step.infiltrated_l;
        let total = run.snapshots[0].total_water_l();
        assert!(total < conservative, "expected edge loss: {total} vs {conservative}");
        assert_abs_diff_eq!(total, conservative - step.boundary_loss_l, epsilon = 1e-9);
    }

    #[test]
    fn water_budget_closes_over_many_steps() {
        let mut records = Vec::new();
        for r in 0..5 {
            for c in 0..5 {
                let gx = 0.02 * (c as f64 - 2.0);
                let gy = -0.01 * (r as f64 - 2.0);
                records.push(record(gx, gy, (r * 20 + c * 3) as f64));
            }
        }
        let params = SimulationParams { iterations: 6, timestep_min: 1.0, ..Default::default() };
        let run = Simulation::new(records, params).unwrap().run().unwrap();
        let mut expected = 0.0;
        for (snap, step) in run.snapshots.iter().zip(&run.report.steps) {
            expected += step.rain_l - step.infiltrated_l - step.boundary_loss_l;
            assert_abs_diff_eq!(snap.total_water_l(), expected, epsilon = 1e-6);
            assert!(snap.water_levels().iter().all(|&w| w >= 0.0));
        }
        assert_eq!(run.report.anomaly_count(), 0);
    }

    #[test]
    fn state_machine_walks_every_iteration_once() {
        let params = SimulationParams { iterations: 3, ..Default::default() };
        let mut sim = Simulation::new(vec![record(0.0, 0.0, 0.0); 9], params).unwrap();
        assert_eq!(sim.state(), RunState::Initializing);

        let first = sim.advance().unwrap().unwrap();
        assert_eq!(first.snapshot.iteration(), Some(0));
        assert_eq!(sim.state(), RunState::Running(0));
        sim.advance().unwrap().unwrap();
        assert_eq!(sim.state(), RunState::Running(1));
        let last = sim.advance().unwrap().unwrap();
        assert_eq!(last.snapshot.iteration(), Some(2));
        assert_eq!(sim.state(), RunState::Running(2));
        assert!(sim.advance().is_none());
        assert_eq!(sim.state(), RunState::Completed);
        assert!(sim.advance().is_none());

        // Earlier snapshots are independent of later steps.
        assert!(first.snapshot.total_water_l() < last.snapshot.total_water_l());
    }

    #[test]
    fn single_iteration_still_enters_running() {
        let mut sim = Simulation::new(vec![record(0.0, 0.0, 0.0); 4], one_step()).unwrap();
        let mut states = vec![sim.state()];
        while sim.advance().is_some() {
            states.push(sim.state());
        }
        states.push(sim.state());
        assert_eq!(states, vec![RunState::Initializing, RunState::Running(0), RunState::Completed]);
    }

    #[test]
    fn records_with_water_start_dry() {
        let dry = vec![record(0.3, 0.0, 10.0); 4];
        let mut wet = dry.clone();
        wet[1].water_l = 50.0;
        wet[2].water_l = 7.5;

        let sim = Simulation::new(wet, one_step()).unwrap();
        assert_eq!(sim.current().total_water_l(), 0.0);
        let from_wet = sim.run().unwrap();
        let from_dry = Simulation::new(dry, one_step()).unwrap().run().unwrap();
        assert_eq!(from_wet.snapshots, from_dry.snapshots);
    }

    #[test]
    fn clamp_contains_non_finite_gradients() {
        let mut records = vec![record(0.0, 0.0, 0.0); 4];
        records[0].gradient_x = f64::INFINITY;

        let reported = Simulation::new(records.clone(), one_step()).unwrap().run().unwrap();
        assert!(reported.snapshots[0].water_levels()[0].is_nan());
        assert_eq!(reported.report.steps[0].anomalies.len(), 1);

        let params = SimulationParams { anomaly_policy: AnomalyPolicy::Clamp, ..one_step() };
        let clamped = Simulation::new(records, params).unwrap().run().unwrap();
        assert_eq!(clamped.report.steps[0].anomalies.len(), 1);
        for w in clamped.snapshots[0].water_levels() {
            assert_abs_diff_eq!(w, 125.0 * 0.66, epsilon = 1e-9);
        }
    }

    #[test]
    fn snapshot_array_is_spatial() {
        let mut records = vec![record(0.0, 0.0, 0.0); 9];
        records[5].sealing_pct = 42.0;
        let sim = Simulation::new(records, one_step()).unwrap();
        let arr = sim.current().to_array().unwrap();
        assert_eq!(arr.dim(), (3, 3, 4));
        // Tile 5 is row 1, col 2; sealing is the last field.
        assert_eq!(arr[[1, 2, 3]], 42.0);
    }

    #[test]
    fn iterator_yields_one_snapshot_per_iteration() {
        let params = SimulationParams { iterations: 4, ..Default::default() };
        let sim = Simulation::new(vec![record(0.1, -0.1, 30.0); 16], params).unwrap();
        let iterations: Vec<usize> = sim.map(|o| o.unwrap().snapshot.iteration().unwrap()).collect();
        assert_eq!(iterations, vec![0, 1, 2, 3]);
    }

    #[test]
    fn bad_inputs_fail_before_running() {
        let err = Simulation::new(vec![record(0.0, 0.0, 0.0); 3], one_step()).err().unwrap();
        assert!(matches!(err, PluviaError::Shape(_)));

        let params = SimulationParams { timestep_min: 0.0, ..one_step() };
        let err = Simulation::new(vec![record(0.0, 0.0, 0.0); 4], params).err().unwrap();
        assert!(matches!(err, PluviaError::Config(ConfigError::Timestep(_))));
    }

    #[test]
    fn out_of_range_sealing_reported_or_clamped() {
        let records = vec![record(0.0, 0.0, 250.0), record(0.0, 0.0, 0.0), record(0.0, 0.0, 0.0), record(0.0, 0.0, 0.0)];

        let reported = Simulation::new(records.clone(), one_step()).unwrap().run().unwrap();
        assert_eq!(reported.report.setup_anomalies.len(), 1);
        // Extrapolated infiltration is negative at 250 %: the tile gains water.
        assert!(reported.snapshots[0].water_levels()[0] > 125.0);

        let params = SimulationParams { anomaly_policy: AnomalyPolicy::Clamp, ..one_step() };
        let clamped = Simulation::new(records, params).unwrap().run().unwrap();
        assert_eq!(clamped.report.setup_anomalies.len(), 1);
        assert_eq!(clamped.snapshots[0].tiles().get(0, 0).sealing_pct, 100.0);
        assert!(clamped.snapshots[0].water_levels()[0] < 125.0);
    }

    #[derive(Debug)]
    struct SinkError;

    impl From<PluviaError> for SinkError {
        fn from(_: PluviaError) -> Self {
            SinkError
        }
    }

    #[derive(Default)]
    struct Collect(Vec<Snapshot>);

    impl SnapshotSink for Collect {
        type Error = SinkError;

        fn emit(&mut self, snapshot: &Snapshot) -> std::result::Result<(), SinkError> {
            self.0.push(snapshot.clone());
            Ok(())
        }
    }

    #[test]
    fn sink_receives_the_same_snapshots_as_run() {
        let params = SimulationParams { iterations: 3, ..Default::default() };
        let records = vec![record(0.2, 0.1, 10.0); 4];

        let mut sink = Collect::default();
        let report = Simulation::new(records.clone(), params.clone())
            .unwrap()
            .run_with_sink(&mut sink)
            .unwrap();
        let run = Simulation::new(records, params).unwrap().run().unwrap();

        assert_eq!(sink.0, run.snapshots);
        assert_eq!(report, run.report);
    }
}
