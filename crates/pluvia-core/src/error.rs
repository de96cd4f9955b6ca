//! Error taxonomy for the simulation core.
//!
//! Shape and configuration problems are fatal and surface as `Err` values.
//! Numeric-domain problems are not errors; see [`crate::anomaly`].
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PluviaError>;

/// Input layout does not match what an operation expects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("tile count {count} is not a perfect square")]
    NotSquare { count: usize },

    #[error("expected an array of rank {expected}, got rank {actual}")]
    Rank { expected: usize, actual: usize },

    #[error("expected {expected} values, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("expected {expected} fields per tile record, got {actual}")]
    FieldCount { expected: usize, actual: usize },

    #[error("grid is {rows}x{cols}, not square")]
    NonSquareGrid { rows: usize, cols: usize },
}

/// Simulation parameters that cannot produce a meaningful run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("tile edge length must be positive and finite, got {0} m")]
    TileEdge(f64),

    #[error("tile area must be positive and finite, got {0} m²")]
    TileArea(f64),

    #[error("iteration count must be positive")]
    Iterations,

    #[error("timestep must be positive and finite, got {0} min")]
    Timestep(f64),

    #[error("rainfall intensity must be non-negative and finite, got {0}")]
    Rainfall(f64),

    #[error("roughness coefficient must be positive and finite, got {0}")]
    Roughness(f64),

    #[error("critical water level must be non-negative and finite, got {0} cm")]
    CriticalLevel(f64),
}

#[derive(Debug, Error)]
pub enum PluviaError {
    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
