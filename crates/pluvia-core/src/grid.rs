//! Square, row-major tile grid with explicit neighbour lookup.
#[cfg(feature = "threading")]
use rayon::prelude::*;

use crate::error::ShapeError;

/// Axis-aligned neighbour direction.
///
/// `x` runs along columns (Right = column + 1), `y` along rows
/// (Down = row + 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Left, Direction::Right, Direction::Up, Direction::Down];

    /// `(d_row, d_col)` offset of the neighbour in this direction.
    #[inline]
    pub fn offset(self) -> (isize, isize) {
        match self {
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

/// Returns `n` if `count == n * n`.
pub fn exact_sqrt(count: usize) -> Option<usize> {
    let guess = (count as f64).sqrt().round() as usize;
    // Float rounding can land one off for very large counts.
    [guess.saturating_sub(1), guess, guess + 1]
        .into_iter()
        .find(|&n| n.checked_mul(n) == Some(count))
}

/// An N×N grid stored row-major: index = row * N + col.
#[derive(Debug, Clone, PartialEq)]
pub struct TileGrid<T> {
    data: Vec<T>,
    side: usize,
}

impl<T> TileGrid<T> {
    /// Reshape a flat, row-major sequence into a square grid.
    pub fn from_flat(data: Vec<T>) -> Result<Self, ShapeError> {
        let side = exact_sqrt(data.len()).ok_or(ShapeError::NotSquare { count: data.len() })?;
        Ok(Self { data, side })
    }

    /// Back to the flat sequence, same order as it went in.
    pub fn into_flat(self) -> Vec<T> {
        self.data
    }

    #[inline]
    pub fn side(&self) -> usize {
        self.side
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    #[inline]
    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.side + col
    }

    #[inline]
    pub fn coords(&self, index: usize) -> (usize, usize) {
        (index / self.side, index % self.side)
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> &T {
        &self.data[row * self.side + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, val: T) {
        let i = self.index(row, col);
        self.data[i] = val;
    }

    /// Neighbour of `(row, col)` in `dir`, or `None` past the grid edge.
    pub fn neighbor(&self, row: usize, col: usize, dir: Direction) -> Option<&T> {
        let (dr, dc) = dir.offset();
        let r = row.checked_add_signed(dr)?;
        let c = col.checked_add_signed(dc)?;
        if r >= self.side || c >= self.side {
            return None;
        }
        Some(self.get(r, c))
    }

    /// Element-wise map into a new grid of the same shape.
    pub fn map<U, F>(&self, f: F) -> TileGrid<U>
    where
        T: Sync,
        U: Send,
        F: Fn(&T) -> U + Sync + Send,
    {
        #[cfg(feature = "threading")]
        let data = self.data.par_iter().map(f).collect();
        #[cfg(not(feature = "threading"))]
        let data = self.data.iter().map(f).collect();
        TileGrid { data, side: self.side }
    }

    /// Map with `(row, col)` available, for stages that read neighbours.
    pub fn map_cells<U, F>(&self, f: F) -> TileGrid<U>
    where
        T: Sync,
        U: Send,
        F: Fn(usize, usize, &T) -> U + Sync + Send,
    {
        let side = self.side;
        let cell = |(i, v): (usize, &T)| f(i / side, i % side, v);
        #[cfg(feature = "threading")]
        let data = self.data.par_iter().enumerate().map(cell).collect();
        #[cfg(not(feature = "threading"))]
        let data = self.data.iter().enumerate().map(cell).collect();
        TileGrid { data, side }
    }

    /// Pairwise map over two grids of identical shape.
    pub fn zip_map<U, V, F>(&self, other: &TileGrid<U>, f: F) -> Result<TileGrid<V>, ShapeError>
    where
        T: Sync,
        U: Sync,
        V: Send,
        F: Fn(&T, &U) -> V + Sync + Send,
    {
        if other.len() != self.len() {
            return Err(ShapeError::Length { expected: self.len(), actual: other.len() });
        }
        let pair = |(a, b): (&T, &U)| f(a, b);
        #[cfg(feature = "threading")]
        let data = self.data.par_iter().zip(other.data.par_iter()).map(pair).collect();
        #[cfg(not(feature = "threading"))]
        let data = self.data.iter().zip(other.data.iter()).map(pair).collect();
        Ok(TileGrid { data, side: self.side })
    }
}

impl TileGrid<f64> {
    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_sqrt_accepts_only_squares() {
        assert_eq!(exact_sqrt(0), Some(0));
        assert_eq!(exact_sqrt(1), Some(1));
        assert_eq!(exact_sqrt(16), Some(4));
        assert_eq!(exact_sqrt(1_000_000), Some(1000));
        assert_eq!(exact_sqrt(15), None);
        assert_eq!(exact_sqrt(2), None);
    }

    #[test]
    fn non_square_count_is_rejected() {
        let err = TileGrid::from_flat(vec![0.0; 6]).unwrap_err();
        assert_eq!(err, ShapeError::NotSquare { count: 6 });
    }

    #[test]
    fn flat_round_trip_preserves_order() {
        let flat: Vec<u32> = (0..9).collect();
        let grid = TileGrid::from_flat(flat.clone()).unwrap();
        assert_eq!(grid.side(), 3);
        assert_eq!(*grid.get(1, 2), 5);
        assert_eq!(grid.coords(5), (1, 2));
        assert_eq!(grid.into_flat(), flat);
    }

    #[test]
    fn neighbours_are_absent_past_edges() {
        let grid = TileGrid::from_flat((0..9).collect::<Vec<u32>>()).unwrap();
        // Corner (0, 0): only Right and Down exist.
        assert_eq!(grid.neighbor(0, 0, Direction::Left), None);
        assert_eq!(grid.neighbor(0, 0, Direction::Up), None);
        assert_eq!(grid.neighbor(0, 0, Direction::Right), Some(&1));
        assert_eq!(grid.neighbor(0, 0, Direction::Down), Some(&3));
        // Opposite corner.
        assert_eq!(grid.neighbor(2, 2, Direction::Right), None);
        assert_eq!(grid.neighbor(2, 2, Direction::Down), None);
        // Centre has all four.
        for dir in Direction::ALL {
            assert!(grid.neighbor(1, 1, dir).is_some(), "{dir:?} missing at centre");
        }
    }

    #[test]
    fn zip_map_rejects_mismatched_grids() {
        let a = TileGrid::from_flat(vec![1.0; 4]).unwrap();
        let b = TileGrid::from_flat(vec![1.0; 9]).unwrap();
        assert!(a.zip_map(&b, |x, y| x + y).is_err());
        let c = a.zip_map(&a, |x, y| x + y).unwrap();
        assert_eq!(c.sum(), 8.0);
    }
}
