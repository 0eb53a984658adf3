//! Tunables for planning and geolocation.

use serde::{Deserialize, Serialize};

/// Configuration for approach-leg planning and coverage generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Obstacle grid cell size in degrees
    pub grid_resolution_deg: f64,
    /// Padding around the planning bounds in degrees
    pub grid_margin_deg: f64,
    /// Distance between coverage lanes in degrees
    pub lane_spacing_deg: f64,
    /// Shrink applied to the survey rectangle before laying lanes
    pub inner_margin_deg: f64,
    /// Retry budget for random interior point sampling
    pub sample_max_attempts: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            grid_resolution_deg: 0.0001,
            grid_margin_deg: 0.001,
            lane_spacing_deg: 0.00009,
            inner_margin_deg: 0.000001,
            sample_max_attempts: 1000,
        }
    }
}

/// Visible ground extent of one camera frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundFootprint {
    pub width_m: f64,
    pub length_m: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FootprintEntry {
    pub altitude_m: f64,
    pub footprint: GroundFootprint,
}

/// Ground footprint per flight altitude, measured for the survey camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FootprintTable {
    entries: Vec<FootprintEntry>,
}

impl FootprintTable {
    pub fn new(mut entries: Vec<FootprintEntry>) -> Self {
        entries.sort_by(|a, b| a.altitude_m.total_cmp(&b.altitude_m));
        Self { entries }
    }

    pub fn entries(&self) -> &[FootprintEntry] {
        &self.entries
    }

    /// Footprint for the configured altitude nearest to `altitude_m`.
    pub fn lookup(&self, altitude_m: f64) -> Option<GroundFootprint> {
        self.entries
            .iter()
            .min_by(|a, b| {
                (a.altitude_m - altitude_m)
                    .abs()
                    .total_cmp(&(b.altitude_m - altitude_m).abs())
            })
            .map(|entry| entry.footprint)
    }
}

impl Default for FootprintTable {
    fn default() -> Self {
        let entry = |altitude_m, width_m, length_m| FootprintEntry {
            altitude_m,
            footprint: GroundFootprint { width_m, length_m },
        };
        Self::new(vec![
            entry(25.0, 21.832760, 16.680318),
            entry(30.0, 26.199312, 20.016382),
            entry(35.0, 30.565865, 23.352445),
            entry(50.0, 43.665521, 33.360636),
        ])
    }
}

/// Configuration for turning detections into unique ground positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeolocationConfig {
    /// Detections closer than this are the same object
    pub duplicate_threshold_m: f64,
    pub footprints: FootprintTable,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            duplicate_threshold_m: 0.5,
            footprints: FootprintTable::default(),
        }
    }
}
