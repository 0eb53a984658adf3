//! Full mission assembly: approach leg, coverage sweep, return leg.

use serde::{Deserialize, Serialize};

use crate::config::PlannerConfig;
use crate::coverage::try_generate_coverage;
use crate::error::{CoverageError, MissionError, PlanningError, SampleError};
use crate::models::{AreaConfig, GeoPoint};
use crate::route_engine::{plan_path, PlannedPath};
use crate::sampling::random_point_in_polygon;

/// Waypoints handed to the flight-command dispatcher. Altitude is attached
/// by the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionPlan {
    /// Bottom-left corner of the survey area's bounding box
    pub approach_corner: GeoPoint,
    pub approach: Vec<GeoPoint>,
    pub coverage: Vec<GeoPoint>,
    /// Approach followed by coverage, corner not repeated
    pub route: Vec<GeoPoint>,
    /// Lane turn points where imagery is processed
    pub processing_spots: Vec<GeoPoint>,
    pub nodes_expanded: usize,
}

/// South-west corner of the survey bounding box.
pub fn approach_corner(area: &AreaConfig) -> Option<GeoPoint> {
    area.survey
        .bounds()
        .map(|b| GeoPoint::new(b.min_lat, b.min_lon))
}

/// Orient the sweep to start near `corner`, pin its first point there, and
/// drop the trailing lane end.
pub fn align_coverage(mut coverage: Vec<GeoPoint>, corner: GeoPoint) -> Vec<GeoPoint> {
    let (Some(first), Some(last)) = (coverage.first(), coverage.last()) else {
        return coverage;
    };
    if corner.planar_distance(first) > corner.planar_distance(last) {
        coverage.reverse();
    }
    coverage[0] = corner;
    if coverage.len() >= 2 {
        coverage.truncate(coverage.len() - 2);
    }
    coverage
}

/// Every second coverage point from index 3 on.
pub fn processing_spots(coverage: &[GeoPoint]) -> Vec<GeoPoint> {
    coverage.iter().skip(3).step_by(2).copied().collect()
}

/// Take-off -> survey corner -> zigzag over the survey area.
pub fn plan_mission(area: &AreaConfig, config: &PlannerConfig) -> Result<MissionPlan, MissionError> {
    let corner = approach_corner(area).ok_or(CoverageError::Degenerate)?;
    let approach: PlannedPath = plan_path(area, area.takeoff, corner, config)?;

    let sweep = try_generate_coverage(
        &area.survey,
        config.lane_spacing_deg,
        config.inner_margin_deg,
    )?;
    let coverage = align_coverage(sweep.waypoints, corner);

    let mut route = approach.waypoints.clone();
    let skip = usize::from(route.last() == Some(&corner));
    route.extend(coverage.iter().skip(skip).copied());

    Ok(MissionPlan {
        approach_corner: corner,
        approach: approach.waypoints,
        processing_spots: processing_spots(&coverage),
        coverage,
        route,
        nodes_expanded: approach.nodes_expanded,
    })
}

/// Leg from an arbitrary point (e.g. a sighting) back to take-off.
pub fn plan_return(
    area: &AreaConfig,
    from: GeoPoint,
    config: &PlannerConfig,
) -> Result<PlannedPath, PlanningError> {
    plan_path(area, from, area.takeoff, config)
}

/// Return-leg rehearsal target: a random interior point of the survey area.
pub fn random_survey_target<R: rand::Rng + ?Sized>(
    area: &AreaConfig,
    config: &PlannerConfig,
    rng: &mut R,
) -> Result<GeoPoint, SampleError> {
    random_point_in_polygon(&area.survey, config.sample_max_attempts, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::tests::SAMPLE_KML;
    use crate::grid::Corridor;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn approach_corner_is_survey_south_west() {
        let area = AreaConfig::from_kml(SAMPLE_KML).unwrap();
        assert_eq!(approach_corner(&area), Some(GeoPoint::new(51.4230, -2.6680)));
    }

    #[test]
    fn align_reverses_when_end_is_nearer() {
        let corner = GeoPoint::new(0.0, 0.0);
        let coverage = vec![
            GeoPoint::new(1.0, 1.0),
            GeoPoint::new(0.0, 1.0),
            GeoPoint::new(0.0, 0.5),
            GeoPoint::new(1.0, 0.5),
            GeoPoint::new(1.0, 0.1),
            GeoPoint::new(0.1, 0.1),
        ];
        let aligned = align_coverage(coverage, corner);
        assert_eq!(
            aligned,
            vec![
                corner,
                GeoPoint::new(1.0, 0.1),
                GeoPoint::new(1.0, 0.5),
                GeoPoint::new(0.0, 0.5),
            ]
        );
    }

    #[test]
    fn processing_spots_skip_first_turn() {
        let coverage: Vec<GeoPoint> = (0..8).map(|i| GeoPoint::new(i as f64, 0.0)).collect();
        let spots = processing_spots(&coverage);
        assert_eq!(spots, vec![GeoPoint::new(3.0, 0.0), GeoPoint::new(5.0, 0.0), GeoPoint::new(7.0, 0.0)]);
    }

    #[test]
    fn mission_route_starts_near_takeoff_and_sweeps_survey() {
        let area = AreaConfig::from_kml(SAMPLE_KML).unwrap();
        let config = PlannerConfig::default();
        let plan = plan_mission(&area, &config).unwrap();

        assert!(plan.route[0].planar_distance(&area.takeoff) < 2.0 * config.grid_resolution_deg);
        assert_eq!(plan.coverage[0], plan.approach_corner);
        assert!(plan.route.len() >= plan.approach.len() + plan.coverage.len() - 1);
        assert!(!plan.processing_spots.is_empty());

        let corridor = Corridor::new(&area.flight_region, &area.sensitive);
        for point in &plan.approach {
            assert!(corridor.permits_point(point));
        }
    }

    #[test]
    fn return_leg_ends_near_takeoff() {
        let area = AreaConfig::from_kml(SAMPLE_KML).unwrap();
        let config = PlannerConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        let target = random_survey_target(&area, &config, &mut rng).unwrap();
        assert!(area.survey.contains(&target));

        let leg = plan_return(&area, target, &config).unwrap();
        let last = leg.waypoints[leg.waypoints.len() - 1];
        assert!(last.planar_distance(&area.takeoff) < 2.0 * config.grid_resolution_deg);
    }
}
