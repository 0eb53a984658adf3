//! Survey CLI - shared helpers for the command line tools.
//!
//! Binaries:
//! - plan_mission: approach leg, coverage sweep and optional return leg
//! - dedup_detections: collapse repeated sightings in a detection log

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use survey_core::{AreaConfig, GeoPoint};

/// Stderr logging with `RUST_LOG` overrides; `directive` sets the default
/// level for the calling binary.
pub fn init_tracing(directive: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive.parse()?))
        .init();
    Ok(())
}

/// Load a JSON config file, or the defaults when no path is given. Missing
/// fields fall back to their defaults.
pub fn load_config<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T> {
    let Some(path) = path else {
        return Ok(T::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

pub fn load_area(path: &Path) -> Result<AreaConfig> {
    let kml = fs::read_to_string(path)
        .with_context(|| format!("reading area file {}", path.display()))?;
    AreaConfig::from_kml(&kml).with_context(|| format!("loading regions from {}", path.display()))
}

/// Parse `"lat,lon"`.
pub fn parse_latlon(text: &str) -> Result<GeoPoint> {
    let Some((lat, lon)) = text.split_once(',') else {
        bail!("expected 'lat,lon', got '{}'", text);
    };
    let lat: f64 = lat.trim().parse().with_context(|| format!("bad latitude in '{text}'"))?;
    let lon: f64 = lon.trim().parse().with_context(|| format!("bad longitude in '{text}'"))?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        bail!("coordinate out of range: {}", text);
    }
    Ok(GeoPoint::new(lat, lon))
}

#[cfg(test)]
mod tests {
    use super::*;
    use survey_core::PlannerConfig;

    #[test]
    fn parses_lat_lon_pair() {
        assert_eq!(parse_latlon("51.42, -2.67").unwrap(), GeoPoint::new(51.42, -2.67));
    }

    #[test]
    fn rejects_bad_pairs() {
        assert!(parse_latlon("51.42").is_err());
        assert!(parse_latlon("abc,1").is_err());
        assert!(parse_latlon("91,0").is_err());
    }

    #[test]
    fn missing_config_path_gives_defaults() {
        let cfg: PlannerConfig = load_config(None).unwrap();
        assert_eq!(cfg.grid_resolution_deg, PlannerConfig::default().grid_resolution_deg);
    }
}
