//! Mass redistribution between axis-aligned neighbours.
//!
//! Each tile's next level is the water it keeps plus whatever its four
//! neighbours send toward it:
//!
//! ```text
//!            Up (fy > 0 comes down)
//!   Left (fx > 0) →  [tile]  ← Right (fx < 0)
//!            Down (fy < 0 comes up)
//! ```
//!
//! All contributions are read from the previous grid; the result is a new
//! grid. Water sent toward a neighbour that does not exist leaves the
//! simulation. Interior transfers conserve mass exactly.
use crate::error::ShapeError;
use crate::grid::{Direction, TileGrid};
use crate::routing::Outflow;

/// Share of a tile's water that leaves toward `dir`.
#[inline]
pub fn share_toward(o: &Outflow, dir: Direction) -> f64 {
    match dir {
        Direction::Right => o.x.max(0.0),
        Direction::Left => (-o.x).max(0.0),
        Direction::Down => o.y.max(0.0),
        Direction::Up => (-o.y).max(0.0),
    }
}

/// Water arriving at `(row, col)` from its neighbours.
fn inflow(water: &TileGrid<f64>, outflow: &TileGrid<Outflow>, row: usize, col: usize) -> f64 {
    Direction::ALL
        .iter()
        .filter_map(|&dir| {
            let w = water.neighbor(row, col, dir)?;
            let o = outflow.neighbor(row, col, dir)?;
            Some(w * share_toward(o, dir.opposite()))
        })
        .sum()
}

/// One redistribution pass. Returns the next water level per tile.
pub fn redistribute(water: &TileGrid<f64>, outflow: &TileGrid<Outflow>) -> Result<TileGrid<f64>, ShapeError> {
    if water.len() != outflow.len() {
        return Err(ShapeError::Length { expected: water.len(), actual: outflow.len() });
    }
    Ok(water.map_cells(|row, col, &w| {
        let kept = w * outflow.get(row, col).retained();
        kept + inflow(water, outflow, row, col)
    }))
}

/// Water that a pass would push across the grid edge.
pub fn boundary_loss(water: &TileGrid<f64>, outflow: &TileGrid<Outflow>) -> Result<f64, ShapeError> {
    if water.len() != outflow.len() {
        return Err(ShapeError::Length { expected: water.len(), actual: outflow.len() });
    }
    let lost = water.map_cells(|row, col, &w| {
        let o = outflow.get(row, col);
        Direction::ALL
            .iter()
            .filter(|&&dir| water.neighbor(row, col, dir).is_none())
            .map(|&dir| w * share_toward(o, dir))
            .sum::<f64>()
    });
    Ok(lost.sum())
}
