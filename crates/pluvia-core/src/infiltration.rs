//! Sealing-dependent infiltration.
//!
//! Linear model through two reference points: unsealed ground soaks up 34 %
//! of the standing water per step, 96 % sealed ground only 8 %. Values
//! outside [0, 96] are extrapolated along the same line.
use crate::grid::TileGrid;
use crate::tile::Tile;

const SEALING_LOW: f64 = 0.0;
const INFILTRATION_LOW: f64 = 0.34;
const SEALING_HIGH: f64 = 96.0;
const INFILTRATION_HIGH: f64 = 0.08;

/// Share of a tile's water lost to the ground in one step.
#[inline]
pub fn infiltration_fraction(sealing_pct: f64) -> f64 {
    let slope = (INFILTRATION_HIGH - INFILTRATION_LOW) / (SEALING_HIGH - SEALING_LOW);
    INFILTRATION_LOW + slope * (sealing_pct - SEALING_LOW)
}

/// Share of a tile's water that stays on the surface.
#[inline]
pub fn retained_fraction(sealing_pct: f64) -> f64 {
    1.0 - infiltration_fraction(sealing_pct)
}

/// Remove infiltrated water from every tile.
pub fn apply_infiltration(tiles: &TileGrid<Tile>) -> TileGrid<Tile> {
    tiles.map(|t| t.with_water(t.water_l * retained_fraction(t.sealing_pct)))
}
