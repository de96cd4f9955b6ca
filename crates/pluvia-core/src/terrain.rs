//! Tile records from a ground-level height grid and sealing observations.
//!
//! Gradients use second-order central differences in the interior and
//! first-order one-sided differences on the edges.
use crate::error::ShapeError;
use crate::grid::TileGrid;
use crate::tile::TileRecord;

/// Sealing assumed for tiles without an observation (streets).
pub const MISSING_SEALING_PCT: f64 = 100.0;

/// Rate of rise of `heights` along one axis of a row-major N×N grid.
fn rise_along(heights: &TileGrid<f64>, spacing_m: f64, along_cols: bool) -> Vec<f64> {
    let n = heights.side();
    let at = |r: usize, c: usize, k: usize| {
        if along_cols { *heights.get(r, k) } else { *heights.get(k, c) }
    };
    let mut out = Vec::with_capacity(heights.len());
    for r in 0..n {
        for c in 0..n {
            let k = if along_cols { c } else { r };
            let d = if n < 2 {
                0.0
            } else if k == 0 {
                at(r, c, 1) - at(r, c, 0)
            } else if k == n - 1 {
                at(r, c, n - 1) - at(r, c, n - 2)
            } else {
                (at(r, c, k + 1) - at(r, c, k - 1)) / 2.0
            };
            out.push(d / spacing_m);
        }
    }
    out
}

/// Downhill flow gradients `(gradient_x, gradient_y)` per tile.
///
/// Positive values mean the ground falls toward the next column (x) or the
/// next row (y), which is the direction the flow model moves water in.
pub fn flow_gradients(heights: Vec<f64>, spacing_m: f64) -> Result<(Vec<f64>, Vec<f64>), ShapeError> {
    let grid = TileGrid::from_flat(heights)?;
    let gx = rise_along(&grid, spacing_m, true).into_iter().map(|g| -g).collect();
    let gy = rise_along(&grid, spacing_m, false).into_iter().map(|g| -g).collect();
    Ok((gx, gy))
}

/// Fuse heights and sealing into dry tile records.
///
/// `sealing` is aligned with `heights`; `None` entries get
/// [`MISSING_SEALING_PCT`].
pub fn build_records(
    heights: Vec<f64>,
    sealing: &[Option<f64>],
    spacing_m: f64,
) -> Result<Vec<TileRecord>, ShapeError> {
    if sealing.len() != heights.len() {
        return Err(ShapeError::Length { expected: heights.len(), actual: sealing.len() });
    }
    let (gx, gy) = flow_gradients(heights, spacing_m)?;
    Ok(gx
        .into_iter()
        .zip(gy)
        .zip(sealing)
        .map(|((gradient_x, gradient_y), s)| TileRecord {
            water_l: 0.0,
            gradient_x,
            gradient_y,
            sealing_pct: s.unwrap_or(MISSING_SEALING_PCT),
        })
        .collect())
}
