//! Velocity → travel distance → fractional outflow per axis.
use crate::grid::TileGrid;
use crate::velocity::FlowVelocity;

/// Signed distance water travels along each axis in one step, metres.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FlowDistance {
    pub x: f64,
    pub y: f64,
}

/// Signed share of a tile's water leaving along each axis in one step.
///
/// Positive `x` goes to the next column, positive `y` to the next row.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Outflow {
    pub x: f64,
    pub y: f64,
}

impl Outflow {
    pub const NONE: Outflow = Outflow { x: 0.0, y: 0.0 };

    /// Share of the tile's water leaving in any direction.
    #[inline]
    pub fn total(&self) -> f64 {
        self.x.abs() + self.y.abs()
    }

    /// Share that stays put.
    #[inline]
    pub fn retained(&self) -> f64 {
        1.0 - self.total()
    }

    /// Scale both axes down so at most the whole tile leaves.
    /// Non-finite outflow becomes [`Outflow::NONE`].
    pub fn clamped(self) -> Self {
        let total = self.total();
        if !total.is_finite() {
            Self::NONE
        } else if total > 1.0 {
            Self { x: self.x / total, y: self.y / total }
        } else {
            self
        }
    }
}

#[inline]
pub fn flow_distance(v: FlowVelocity, timestep_s: f64) -> FlowDistance {
    FlowDistance { x: v.x * timestep_s, y: v.y * timestep_s }
}

/// Fraction of the tile crossed along each axis.
///
/// The denominator never drops below one tile edge, so short distances
/// move only part of the water.
pub fn outflow_fraction(d: FlowDistance, tile_edge_m: f64) -> Outflow {
    let travelled = d.x.abs() + d.y.abs();
    let denom = travelled.max(tile_edge_m);
    Outflow {
        x: d.x.signum() * d.x.abs() / denom,
        y: d.y.signum() * d.y.abs() / denom,
    }
}

/// Velocities for a whole grid to outflow fractions.
pub fn route(velocities: &TileGrid<FlowVelocity>, timestep_s: f64, tile_edge_m: f64) -> TileGrid<Outflow> {
    velocities.map(|&v| outflow_fraction(flow_distance(v, timestep_s), tile_edge_m))
}
