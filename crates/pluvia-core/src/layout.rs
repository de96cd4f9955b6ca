//! Flat ↔ spatial layout conversion for numeric tile records.
//!
//! Flat layout: `tiles × fields`, rows in row-major grid order.
//! Grid layout: `rows × cols × fields`.
use ndarray::{Array2, Array3, ArrayView2, ArrayViewD, Ix2, Ix3};

use crate::error::ShapeError;
use crate::grid::exact_sqrt;
use crate::tile::Tile;

/// Reshape `tiles × fields` into `N × N × fields`.
pub fn to_grid(flat: ArrayViewD<'_, f64>) -> Result<Array3<f64>, ShapeError> {
    let ndim = flat.ndim();
    let flat = flat
        .into_dimensionality::<Ix2>()
        .map_err(|_| ShapeError::Rank { expected: 2, actual: ndim })?;
    let (count, fields) = flat.dim();
    let side = exact_sqrt(count).ok_or(ShapeError::NotSquare { count })?;

    // iter() walks in logical row-major order regardless of memory layout.
    let values: Vec<f64> = flat.iter().copied().collect();
    Array3::from_shape_vec((side, side, fields), values)
        .map_err(|_| ShapeError::Length { expected: count * fields, actual: flat.len() })
}

/// Reshape `N × N × fields` back into `tiles × fields`.
pub fn to_flat(grid: ArrayViewD<'_, f64>) -> Result<Array2<f64>, ShapeError> {
    let ndim = grid.ndim();
    let grid = grid
        .into_dimensionality::<Ix3>()
        .map_err(|_| ShapeError::Rank { expected: 3, actual: ndim })?;
    let (rows, cols, fields) = grid.dim();
    if rows != cols {
        return Err(ShapeError::NonSquareGrid { rows, cols });
    }

    let values: Vec<f64> = grid.iter().copied().collect();
    Array2::from_shape_vec((rows * cols, fields), values)
        .map_err(|_| ShapeError::Length { expected: rows * cols * fields, actual: grid.len() })
}

/// Typed tiles → `tiles × 4` records (`water_l, gradient_x, gradient_y, sealing_pct`).
pub fn tiles_to_records(tiles: &[Tile]) -> Array2<f64> {
    let mut out = Array2::zeros((tiles.len(), Tile::FIELDS));
    for (mut row, tile) in out.rows_mut().into_iter().zip(tiles) {
        for (dst, v) in row.iter_mut().zip(tile.to_fields()) {
            *dst = v;
        }
    }
    out
}

/// `tiles × 4` records → typed tiles.
pub fn records_to_tiles(records: ArrayView2<'_, f64>) -> Result<Vec<Tile>, ShapeError> {
    let fields = records.ncols();
    if fields != Tile::FIELDS {
        return Err(ShapeError::FieldCount { expected: Tile::FIELDS, actual: fields });
    }
    Ok(records
        .rows()
        .into_iter()
        .map(|r| Tile::new(r[0], r[1], r[2], r[3]))
        .collect())
}
