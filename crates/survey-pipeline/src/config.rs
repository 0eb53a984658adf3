//! Pipeline configuration from environment.

use std::env;
use std::time::Duration;

use survey_core::{FootprintTable, GeolocationConfig};

#[derive(Debug, Clone)]
pub struct Config {
    /// Flight altitude used for the footprint lookup
    pub altitude_m: f64,
    /// Bound on images waiting for a worker
    pub queue_capacity: usize,
    pub workers: usize,
    pub dedup_interval_secs: u64,
    pub duplicate_threshold_m: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            altitude_m: 30.0,
            queue_capacity: 16,
            workers: 2,
            dedup_interval_secs: 5,
            duplicate_threshold_m: 0.5,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            altitude_m: env::var("SURVEY_ALTITUDE_M")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.altitude_m),
            queue_capacity: env::var("SURVEY_QUEUE_CAPACITY")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.queue_capacity),
            workers: env::var("SURVEY_WORKERS")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.workers),
            dedup_interval_secs: env::var("SURVEY_DEDUP_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.dedup_interval_secs),
            duplicate_threshold_m: env::var("SURVEY_DUPLICATE_THRESHOLD_M")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.duplicate_threshold_m),
        }
    }

    pub fn dedup_interval(&self) -> Duration {
        Duration::from_secs(self.dedup_interval_secs)
    }

    pub fn geolocation(&self) -> GeolocationConfig {
        GeolocationConfig {
            duplicate_threshold_m: self.duplicate_threshold_m,
            footprints: FootprintTable::default(),
        }
    }
}
