use serde::{Deserialize, Serialize};

use crate::anomaly::AnomalyPolicy;
use crate::error::ConfigError;

/// Rainfall intensities are quoted per this many minutes.
pub const RAIN_REFERENCE_MIN: f64 = 10.0;

/// Roughness coefficient k_st for smooth concrete (m^(1/3)/s).
pub const KST_SMOOTH_CONCRETE: f64 = 100.0;

/// Physical size of one square tile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileSize {
    pub edge_m: f64,
}

impl TileSize {
    pub fn from_edge(edge_m: f64) -> Self {
        Self { edge_m }
    }

    /// Tiles are square, so the edge follows from the area.
    pub fn from_area(area_m2: f64) -> Self {
        Self { edge_m: area_m2.sqrt() }
    }

    #[inline]
    pub fn area_m2(&self) -> f64 {
        self.edge_m * self.edge_m
    }
}

impl Default for TileSize {
    fn default() -> Self {
        Self::from_edge(5.0)
    }
}

/// Everything a run needs besides the tiles themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    /// Rainfall in mm (= l/m²) per 10 minutes, uniform in space and time.
    pub rainfall_mm_per_10min: f64,
    /// Length of one iteration in minutes.
    pub timestep_min: f64,
    pub iterations: usize,
    pub tile: TileSize,
    /// Manning-Strickler roughness k_st.
    pub roughness: f64,
    pub anomaly_policy: AnomalyPolicy,
    /// Depth treated as flooding in run diagnostics.
    pub critical_level_cm: f64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            rainfall_mm_per_10min: 5.0,
            timestep_min: 10.0,
            iterations: 10,
            tile: TileSize::default(),
            roughness: KST_SMOOTH_CONCRETE,
            anomaly_policy: AnomalyPolicy::Report,
            critical_level_cm: 30.0,
        }
    }
}

impl SimulationParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let edge = self.tile.edge_m;
        if !(edge.is_finite() && edge > 0.0) {
            return Err(ConfigError::TileEdge(edge));
        }
        let area = self.tile.area_m2();
        if !(area.is_finite() && area > 0.0) {
            return Err(ConfigError::TileArea(area));
        }
        if self.iterations == 0 {
            return Err(ConfigError::Iterations);
        }
        if !(self.timestep_min.is_finite() && self.timestep_min > 0.0) {
            return Err(ConfigError::Timestep(self.timestep_min));
        }
        if !(self.rainfall_mm_per_10min.is_finite() && self.rainfall_mm_per_10min >= 0.0) {
            return Err(ConfigError::Rainfall(self.rainfall_mm_per_10min));
        }
        if !(self.roughness.is_finite() && self.roughness > 0.0) {
            return Err(ConfigError::Roughness(self.roughness));
        }
        if !(self.critical_level_cm.is_finite() && self.critical_level_cm >= 0.0) {
            return Err(ConfigError::CriticalLevel(self.critical_level_cm));
        }
        Ok(())
    }

    #[inline]
    pub fn timestep_s(&self) -> f64 {
        self.timestep_min * 60.0
    }

    /// Liters of rain landing on one tile per iteration.
    pub fn rainfall_per_tile_l(&self) -> f64 {
        self.rainfall_mm_per_10min * (self.timestep_min / RAIN_REFERENCE_MIN) * self.tile.area_m2()
    }

    /// Water volume on one tile at the critical depth.
    /// 1 cm of water over 1 m² is 10 l.
    pub fn critical_water_l(&self) -> f64 {
        self.critical_level_cm * 10.0 * self.tile.area_m2()
    }

    pub fn rain_class(&self) -> RainClass {
        RainClass::classify(self.rainfall_mm_per_10min)
    }
}

/// DWD rainfall classes, by mm per 10 minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RainClass {
    Light,
    Moderate,
    Strong,
    VeryStrong,
}

impl RainClass {
    pub fn classify(mm_per_10min: f64) -> Self {
        if mm_per_10min < 0.5 {
            RainClass::Light
        } else if mm_per_10min < 1.7 {
            RainClass::Moderate
        } else if mm_per_10min < 8.3 {
            RainClass::Strong
        } else {
            RainClass::VeryStrong
        }
    }
}
