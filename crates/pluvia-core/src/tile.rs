use serde::{Deserialize, Serialize};

/// Input record for one tile, as produced by the terrain/sealing fusion step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileRecord {
    /// Water in liters. Ignored as input: runs always start dry.
    #[serde(default)]
    pub water_l: f64,
    /// Ground-level slope along the column axis (m/m).
    pub gradient_x: f64,
    /// Ground-level slope along the row axis (m/m).
    pub gradient_y: f64,
    /// Impervious share of the surface, 0–100.
    pub sealing_pct: f64,
}

/// Live state of one tile during a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub water_l: f64,
    pub gradient_x: f64,
    pub gradient_y: f64,
    pub sealing_pct: f64,
}

impl Tile {
    /// Number of numeric fields in the flat record layout.
    pub const FIELDS: usize = 4;

    pub fn new(water_l: f64, gradient_x: f64, gradient_y: f64, sealing_pct: f64) -> Self {
        Self { water_l, gradient_x, gradient_y, sealing_pct }
    }

    /// Same terrain, different water level.
    #[inline]
    pub fn with_water(self, water_l: f64) -> Self {
        Self { water_l, ..self }
    }

    /// `[water_l, gradient_x, gradient_y, sealing_pct]`
    pub fn to_fields(self) -> [f64; Self::FIELDS] {
        [self.water_l, self.gradient_x, self.gradient_y, self.sealing_pct]
    }

    pub fn from_fields(f: [f64; Self::FIELDS]) -> Self {
        Self::new(f[0], f[1], f[2], f[3])
    }
}

impl From<TileRecord> for Tile {
    fn from(r: TileRecord) -> Self {
        Self::new(r.water_l, r.gradient_x, r.gradient_y, r.sealing_pct)
    }
}
