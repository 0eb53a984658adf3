//! Boustrophedon coverage over a survey polygon.
//!
//! Lanes are laid in the frame of the polygon's minimum rotated bounding
//! rectangle: origin at its first corner, x along its first edge. Each lane
//! runs parallel to local y and alternates direction.

use serde::{Deserialize, Serialize};

use crate::error::CoverageError;
use crate::models::{GeoPoint, Polygon};
use crate::spatial::rotate;

/// Extents below this (degrees) are treated as zero.
const DEGENERATE_EXTENT: f64 = 1e-9;
/// Relative slack when comparing candidate rectangle areas.
const AREA_TOLERANCE: f64 = 1e-9;
const MAX_LANES: usize = 100_000;

/// Smallest-area enclosing rectangle at any orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotatedRect {
    /// Corners in order; `corners[0] -> corners[1]` is the first edge.
    pub corners: [GeoPoint; 4],
    /// Direction of the first edge, radians counter-clockwise from +lon.
    pub angle_rad: f64,
    pub width: f64,
    pub height: f64,
}

fn cross(o: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
}

/// Counter-clockwise convex hull (monotone chain), collinear points dropped.
fn convex_hull(points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    let mut lower: Vec<(f64, f64)> = Vec::new();
    for p in &pts {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], *p) <= 0.0 {
            lower.pop();
        }
        lower.push(*p);
    }
    let mut upper: Vec<(f64, f64)> = Vec::new();
    for p in pts.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], *p) <= 0.0 {
            upper.pop();
        }
        upper.push(*p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

fn extent(points: &[(f64, f64)]) -> (f64, f64, f64, f64) {
    points.iter().fold(
        (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        |(min_x, min_y, max_x, max_y), p| {
            (min_x.min(p.0), min_y.min(p.1), max_x.max(p.0), max_y.max(p.1))
        },
    )
}

/// Rotating-calipers search over hull edge directions.
pub fn minimum_rotated_rectangle(polygon: &Polygon) -> Option<RotatedRect> {
    let points: Vec<(f64, f64)> = polygon.vertices().iter().map(GeoPoint::xy).collect();
    let hull = convex_hull(&points);
    if hull.len() < 3 {
        return None;
    }

    let mut best: Option<(f64, f64, (f64, f64, f64, f64))> = None;
    for i in 0..hull.len() {
        let a = hull[i];
        let b = hull[(i + 1) % hull.len()];
        let angle = (b.1 - a.1).atan2(b.0 - a.0);
        let local: Vec<(f64, f64)> = hull.iter().map(|p| rotate(*p, -angle)).collect();
        let ext = extent(&local);
        let area = (ext.2 - ext.0) * (ext.3 - ext.1);
        let better = match best {
            None => true,
            Some((best_area, _, _)) => area < best_area * (1.0 - AREA_TOLERANCE),
        };
        if better {
            best = Some((area, angle, ext));
        }
    }

    let (_, angle, (min_x, min_y, max_x, max_y)) = best?;
    let corners = [(min_x, min_y), (max_x, min_y), (max_x, max_y), (min_x, max_y)]
        .map(|c| GeoPoint::from_xy(rotate(c, angle)));

    Some(RotatedRect {
        corners,
        angle_rad: angle,
        width: max_x - min_x,
        height: max_y - min_y,
    })
}

/// Coverage waypoints with lane bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoveragePlan {
    pub waypoints: Vec<GeoPoint>,
    pub lanes: usize,
    pub angle_rad: f64,
}

/// Generate the zigzag, reporting why when nothing can be generated.
pub fn try_generate_coverage(
    survey: &Polygon,
    spacing: f64,
    inner_margin: f64,
) -> Result<CoveragePlan, CoverageError> {
    if !(spacing > 0.0 && spacing.is_finite()) {
        return Err(CoverageError::InvalidSpacing(spacing));
    }
    if survey.is_empty() {
        return Err(CoverageError::Degenerate);
    }
    let rect = minimum_rotated_rectangle(survey).ok_or(CoverageError::Degenerate)?;
    let origin = rect.corners[0].xy();
    let angle = rect.angle_rad;

    let to_local = |p: (f64, f64)| rotate((p.0 - origin.0, p.1 - origin.1), -angle);
    let to_global = |p: (f64, f64)| {
        let r = rotate(p, angle);
        GeoPoint::from_xy((r.0 + origin.0, r.1 + origin.1))
    };

    let local: Vec<(f64, f64)> = survey.vertices().iter().map(|p| to_local(p.xy())).collect();
    let (mut min_x, mut min_y, mut max_x, mut max_y) = extent(&local);
    if (max_x - min_x) < DEGENERATE_EXTENT || (max_y - min_y) < DEGENERATE_EXTENT {
        return Err(CoverageError::Degenerate);
    }

    min_x += inner_margin;
    max_x -= inner_margin;
    min_y += inner_margin;
    max_y -= inner_margin;
    if min_x > max_x || min_y > max_y {
        return Err(CoverageError::MarginTooLarge(inner_margin));
    }

    let gaps = ((max_x - min_x) / spacing + 1e-9).floor();
    if !gaps.is_finite() || gaps >= MAX_LANES as f64 {
        return Err(CoverageError::InvalidSpacing(spacing));
    }
    let lanes = gaps as usize + 1;

    let mut waypoints: Vec<GeoPoint> = Vec::with_capacity(lanes * 2);
    for lane in 0..lanes {
        let x = min_x + lane as f64 * spacing;
        let (from, to) = if lane % 2 == 0 {
            ((x, min_y), (x, max_y))
        } else {
            ((x, max_y), (x, min_y))
        };
        let start = to_global(from);
        let end = to_global(to);
        let joins_previous = waypoints
            .last()
            .is_some_and(|last| last.planar_distance(&start) <= DEGENERATE_EXTENT);
        if !joins_previous {
            waypoints.push(start);
        }
        waypoints.push(end);
    }

    Ok(CoveragePlan {
        waypoints,
        lanes,
        angle_rad: angle,
    })
}

/// Zigzag waypoints `(lat, lon)` over `survey`; empty when the polygon is
/// degenerate or the parameters leave nothing to cover.
pub fn generate_coverage(survey: &Polygon, spacing: f64, inner_margin: f64) -> Vec<GeoPoint> {
    try_generate_coverage(survey, spacing, inner_margin)
        .map(|plan| plan.waypoints)
        .unwrap_or_default()
}
