//! Spatial math shared by planning and geolocation.

/// Tolerance for planar tests on degree coordinates.
pub const EPS_DEG: f64 = 1e-12;

/// Mean Earth radius used by the great-circle distance.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Meters per degree of latitude on the mean-radius sphere.
///
/// Downstream mapping consumes geolocated output produced with exactly this
/// value, so it must not be swapped for a latitude-dependent series.
pub const METERS_PER_DEG_LAT: f64 = 111_194.926_644_558_73;

/// Calculate distance between two points in meters (Haversine formula).
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Convert a north/south offset in meters to degrees latitude.
pub fn meters_to_lat(meters: f64) -> f64 {
    meters / METERS_PER_DEG_LAT
}

/// Convert an east/west offset in meters to degrees longitude at `ref_lat_deg`.
pub fn meters_to_lon(meters: f64, ref_lat_deg: f64) -> f64 {
    meters / (METERS_PER_DEG_LAT * ref_lat_deg.to_radians().cos())
}

fn orient(p: (f64, f64), q: (f64, f64), r: (f64, f64)) -> f64 {
    (q.0 - p.0) * (r.1 - p.1) - (q.1 - p.1) * (r.0 - p.0)
}

fn within(a: f64, b: f64, value: f64) -> bool {
    value >= a.min(b) - EPS_DEG && value <= a.max(b) + EPS_DEG
}

/// True when `p` lies on the closed segment `a -> b`.
pub fn point_on_segment(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> bool {
    let len = (b.0 - a.0).hypot(b.1 - a.1);
    let dist = if len <= EPS_DEG {
        (p.0 - a.0).hypot(p.1 - a.1)
    } else {
        orient(a, b, p).abs() / len
    };
    dist <= EPS_DEG && within(a.0, b.0, p.0) && within(a.1, b.1, p.1)
}

/// Closed-segment intersection test, touches and overlaps included.
pub fn segments_intersect_2d(
    a1: (f64, f64),
    a2: (f64, f64),
    b1: (f64, f64),
    b2: (f64, f64),
) -> bool {
    if point_on_segment(a1, a2, b1)
        || point_on_segment(a1, a2, b2)
        || point_on_segment(b1, b2, a1)
        || point_on_segment(b1, b2, a2)
    {
        return true;
    }

    let o1 = orient(a1, a2, b1);
    let o2 = orient(a1, a2, b2);
    let o3 = orient(b1, b2, a1);
    let o4 = orient(b1, b2, a2);

    let a_crosses = (o1 > 0.0 && o2 < 0.0) || (o1 < 0.0 && o2 > 0.0);
    let b_crosses = (o3 > 0.0 && o4 < 0.0) || (o3 < 0.0 && o4 > 0.0);
    a_crosses && b_crosses
}

/// Parameters `t` in [0, 1] along `a -> b` where it meets segment `e1 -> e2`.
///
/// A collinear overlap yields both ends of the shared stretch.
pub fn segment_intersections(
    a: (f64, f64),
    b: (f64, f64),
    e1: (f64, f64),
    e2: (f64, f64),
) -> Vec<f64> {
    let d = (b.0 - a.0, b.1 - a.1);
    let len_sq = d.0 * d.0 + d.1 * d.1;
    if len_sq <= EPS_DEG * EPS_DEG {
        return Vec::new();
    }
    let param = |p: (f64, f64)| ((p.0 - a.0) * d.0 + (p.1 - a.1) * d.1) / len_sq;

    let e = (e2.0 - e1.0, e2.1 - e1.1);
    let denom = d.0 * e.1 - d.1 * e.0;

    if denom.abs() <= EPS_DEG * len_sq.sqrt() {
        // Parallel: only collinear overlaps matter.
        let mut ts = Vec::new();
        for p in [e1, e2] {
            if point_on_segment(a, b, p) {
                ts.push(param(p).clamp(0.0, 1.0));
            }
        }
        for (p, t) in [(a, 0.0), (b, 1.0)] {
            if point_on_segment(e1, e2, p) {
                ts.push(t);
            }
        }
        return ts;
    }

    let w = (e1.0 - a.0, e1.1 - a.1);
    let t = (w.0 * e.1 - w.1 * e.0) / denom;
    let u = (w.0 * d.1 - w.1 * d.0) / denom;
    let tol = EPS_DEG / len_sq.sqrt().max(EPS_DEG);
    if (-tol..=1.0 + tol).contains(&t) && (-tol..=1.0 + tol).contains(&u) {
        vec![t.clamp(0.0, 1.0)]
    } else {
        Vec::new()
    }
}

/// Rotate `p` about the origin by `angle_rad` (counter-clockwise).
pub fn rotate(p: (f64, f64), angle_rad: f64) -> (f64, f64) {
    let (sin, cos) = angle_rad.sin_cos();
    (p.0 * cos - p.1 * sin, p.0 * sin + p.1 * cos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_known_distance() {
        // ~111km between these points (1 degree latitude)
        let dist = haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert!((dist - METERS_PER_DEG_LAT).abs() < 1e-6);
    }

    #[test]
    fn test_haversine_same_point() {
        let dist = haversine_distance(51.4234, -2.6715, 51.4234, -2.6715);
        assert!(dist < 0.001);
    }

    #[test]
    fn meters_to_lon_scales_with_latitude() {
        let at_equator = meters_to_lon(100.0, 0.0);
        let at_sixty = meters_to_lon(100.0, 60.0);
        assert!((at_sixty - 2.0 * at_equator).abs() < 1e-12);
        assert!((meters_to_lat(METERS_PER_DEG_LAT) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn crossing_segments_intersect() {
        assert!(segments_intersect_2d((0.0, 0.0), (1.0, 1.0), (0.0, 1.0), (1.0, 0.0)));
        assert!(!segments_intersect_2d((0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)));
    }

    #[test]
    fn touching_segments_intersect() {
        assert!(segments_intersect_2d((0.0, 0.0), (1.0, 0.0), (1.0, 0.0), (1.0, 1.0)));
    }

    #[test]
    fn intersection_parameters_cover_collinear_overlap() {
        let mut ts = segment_intersections((0.0, 0.0), (4.0, 0.0), (1.0, 0.0), (3.0, 0.0));
        ts.sort_by(f64::total_cmp);
        assert_eq!(ts, vec![0.25, 0.75]);

        let ts = segment_intersections((0.0, 0.0), (2.0, 2.0), (0.0, 2.0), (2.0, 0.0));
        assert_eq!(ts.len(), 1);
        assert!((ts[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn rotate_quarter_turn() {
        let (x, y) = rotate((1.0, 0.0), std::f64::consts::FRAC_PI_2);
        assert!(x.abs() < 1e-12);
        assert!((y - 1.0).abs() < 1e-12);
    }
}
