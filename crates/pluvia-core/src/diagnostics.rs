//! Per-snapshot water statistics.
use serde::Serialize;

use crate::grid::TileGrid;
use crate::params::SimulationParams;
use crate::tile::Tile;
use crate::velocity::hydraulic_radius;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct WaterSummary {
    pub total_l: f64,
    pub max_l: f64,
    /// Deepest standing water on any tile, metres.
    pub max_depth_m: f64,
    /// Tiles at or above the critical water level.
    pub flooded_tiles: usize,
}

pub fn summarize(tiles: &TileGrid<Tile>, params: &SimulationParams) -> WaterSummary {
    let critical = params.critical_water_l();
    let mut s = WaterSummary::default();
    for t in tiles.iter() {
        s.total_l += t.water_l;
        s.max_l = s.max_l.max(t.water_l);
        if t.water_l >= critical {
            s.flooded_tiles += 1;
        }
    }
    s.max_depth_m = hydraulic_radius(s.max_l, params.tile.area_m2());
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn counts_tiles_over_critical_depth() {
        // 25 m² tiles, 30 cm critical → 7500 l.
        let params = SimulationParams::default();
        let tiles = TileGrid::from_flat(vec![
            Tile::new(0.0, 0.0, 0.0, 0.0),
            Tile::new(7499.0, 0.0, 0.0, 0.0),
            Tile::new(7500.0, 0.0, 0.0, 0.0),
            Tile::new(10_000.0, 0.0, 0.0, 0.0),
        ])
        .unwrap();
        let s = summarize(&tiles, &params);
        assert_eq!(s.flooded_tiles, 2);
        assert_abs_diff_eq!(s.total_l, 24_999.0);
        assert_abs_diff_eq!(s.max_l, 10_000.0);
        assert_abs_diff_eq!(s.max_depth_m, 0.4);
    }
}
