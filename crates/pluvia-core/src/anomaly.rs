//! Numeric-domain anomalies: inputs that push the model outside its
//! physical range without being structurally invalid.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::grid::TileGrid;
use crate::infiltration::infiltration_fraction;
use crate::routing::Outflow;
use crate::tile::Tile;

/// Tolerance on the summed outflow before it is considered > 1.
const OUTFLOW_EPS: f64 = 1e-9;

/// What to do when an anomaly is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyPolicy {
    /// Keep the raw numbers, log a warning and record the anomaly.
    #[default]
    Report,
    /// Clamp sealing to [0, 100] and scale outflow so |fx| + |fy| ≤ 1;
    /// non-finite outflow is dropped. Clamped values are still recorded.
    Clamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NumericAnomaly {
    /// Sealing outside [0, 100]; the infiltration fraction is extrapolated.
    SealingOutOfRange {
        tile: usize,
        sealing_pct: f64,
        infiltration: f64,
    },
    /// |fx| + |fy| above 1 (or not finite): retained mass would go negative.
    OutflowExceedsUnity { tile: usize, total: f64 },
}

impl fmt::Display for NumericAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericAnomaly::SealingOutOfRange { tile, sealing_pct, infiltration } => write!(
                f,
                "tile {tile}: sealing {sealing_pct}% outside [0, 100] (infiltration fraction {infiltration:.3})"
            ),
            NumericAnomaly::OutflowExceedsUnity { tile, total } => {
                write!(f, "tile {tile}: summed outflow fraction {total:.3} exceeds 1")
            }
        }
    }
}

/// Tiles whose sealing leaves the modelled range.
pub fn check_sealing(tiles: &TileGrid<Tile>) -> Vec<NumericAnomaly> {
    tiles
        .iter()
        .enumerate()
        .filter(|(_, t)| !(0.0..=100.0).contains(&t.sealing_pct))
        .map(|(i, t)| NumericAnomaly::SealingOutOfRange {
            tile: i,
            sealing_pct: t.sealing_pct,
            infiltration: infiltration_fraction(t.sealing_pct),
        })
        .collect()
}

/// Tiles that would send out more than all of their water.
pub fn check_outflow(outflow: &TileGrid<Outflow>) -> Vec<NumericAnomaly> {
    outflow
        .iter()
        .enumerate()
        .filter_map(|(i, o)| {
            let total = o.total();
            (total > 1.0 + OUTFLOW_EPS || !total.is_finite())
                .then_some(NumericAnomaly::OutflowExceedsUnity { tile: i, total })
        })
        .collect()
}

/// Clamp sealing into [0, 100]. NaN sealing is left alone.
pub fn clamp_sealing(tiles: &TileGrid<Tile>) -> TileGrid<Tile> {
    tiles.map(|t| Tile { sealing_pct: t.sealing_pct.clamp(0.0, 100.0), ..*t })
}

pub fn clamp_outflow(outflow: &TileGrid<Outflow>) -> TileGrid<Outflow> {
    outflow.map(|o| o.clamped())
}
