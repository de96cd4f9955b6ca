//! Grid-based pluvial flood simulation for urban surfaces.
//!
//! Rain falls uniformly on an N×N tile grid, part of it infiltrates
//! depending on surface sealing, and the rest flows to axis-aligned
//! neighbours with a Manning–Strickler velocity. See [`simulation`] for
//! the per-iteration pipeline.
pub mod anomaly;
pub mod diagnostics;
pub mod error;
pub mod grid;
pub mod infiltration;
pub mod layout;
pub mod params;
pub mod redistribution;
pub mod routing;
pub mod simulation;
pub mod terrain;
pub mod tile;
pub mod velocity;

pub use anomaly::{AnomalyPolicy, NumericAnomaly};
pub use error::{ConfigError, PluviaError, Result, ShapeError};
pub use grid::{Direction, TileGrid};
pub use params::{SimulationParams, TileSize};
pub use simulation::{RunReport, Simulation, SimulationRun, Snapshot, SnapshotSink};
pub use tile::{Tile, TileRecord};
