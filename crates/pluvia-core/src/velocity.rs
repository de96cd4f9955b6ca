//! Gauckler–Manning–Strickler flow velocity.
//!
//!   v = k_st · R^(2/3) · I^(1/2)
//!
//! R is approximated by the water depth on the tile (wide, shallow flow),
//! I by the ground-level gradient along each axis. The square root only
//! takes |I|; the sign of the gradient is reapplied to keep the direction.
use crate::grid::TileGrid;
use crate::tile::Tile;

/// Signed flow velocity along each axis, m/s.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FlowVelocity {
    pub x: f64,
    pub y: f64,
}

/// Water depth in metres for `water_l` liters spread over `tile_area_m2`.
#[inline]
pub fn hydraulic_radius(water_l: f64, tile_area_m2: f64) -> f64 {
    water_l / (tile_area_m2 * 1000.0)
}

/// Signed Manning–Strickler velocity for one axis.
#[inline]
pub fn manning_strickler(roughness: f64, radius_m: f64, gradient: f64) -> f64 {
    // signum() is ±1 for ±0.0, so zero gradients need an explicit branch.
    if gradient == 0.0 {
        return 0.0;
    }
    gradient.signum() * roughness * radius_m.powi(2).cbrt() * gradient.abs().sqrt()
}

pub fn tile_velocity(tile: &Tile, tile_area_m2: f64, roughness: f64) -> FlowVelocity {
    let r = hydraulic_radius(tile.water_l, tile_area_m2);
    FlowVelocity {
        x: manning_strickler(roughness, r, tile.gradient_x),
        y: manning_strickler(roughness, r, tile.gradient_y),
    }
}

pub fn flow_velocity(tiles: &TileGrid<Tile>, tile_area_m2: f64, roughness: f64) -> TileGrid<FlowVelocity> {
    tiles.map(|t| tile_velocity(t, tile_area_m2, roughness))
}
