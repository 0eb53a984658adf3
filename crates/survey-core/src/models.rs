//! Core data models for survey planning and detection geolocation.

use serde::{Deserialize, Serialize};

use crate::spatial::{point_on_segment, segment_intersections, segments_intersect_2d, EPS_DEG};

/// A geographic position in degrees.
///
/// Treated as a planar point (x = lon, y = lat) by every polygon test in
/// this crate; no ellipsoid correction is applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub(crate) fn xy(&self) -> (f64, f64) {
        (self.lon, self.lat)
    }

    pub(crate) fn from_xy(xy: (f64, f64)) -> Self {
        Self { lat: xy.1, lon: xy.0 }
    }

    /// Straight-line distance in degree space. Only meaningful for comparing
    /// nearby points; use `spatial::haversine_distance` for meters.
    pub fn planar_distance(&self, other: &GeoPoint) -> f64 {
        (self.lat - other.lat).hypot(self.lon - other.lon)
    }
}

/// Axis-aligned extent of a set of points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl Bounds {
    /// Bounds of the given points, or `None` when the iterator is empty.
    pub fn of<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a GeoPoint>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Bounds {
            min_lat: first.lat,
            min_lon: first.lon,
            max_lat: first.lat,
            max_lon: first.lon,
        };
        for point in iter {
            bounds.include(point);
        }
        Some(bounds)
    }

    pub fn include(&mut self, point: &GeoPoint) {
        self.min_lat = self.min_lat.min(point.lat);
        self.min_lon = self.min_lon.min(point.lon);
        self.max_lat = self.max_lat.max(point.lat);
        self.max_lon = self.max_lon.max(point.lon);
    }

    pub fn expand(&self, margin: f64) -> Self {
        Self {
            min_lat: self.min_lat - margin,
            min_lon: self.min_lon - margin,
            max_lat: self.max_lat + margin,
            max_lon: self.max_lon + margin,
        }
    }

    pub fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn lon_span(&self) -> f64 {
        self.max_lon - self.min_lon
    }
}

/// Closed ring of vertices (first == last).
///
/// Simplicity (no self-intersection) is the caller's responsibility.
/// Boundary points count as inside for every containment test.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    ring: Vec<GeoPoint>,
}

impl Polygon {
    /// Build a polygon from its vertices, closing the ring if needed.
    pub fn new(mut vertices: Vec<GeoPoint>) -> Self {
        if let (Some(first), Some(last)) = (vertices.first().copied(), vertices.last().copied()) {
            if vertices.len() > 1 && first != last {
                vertices.push(first);
            }
        }
        Self { ring: vertices }
    }

    /// A polygon with no vertices; contains nothing and intersects nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The closed ring, first vertex repeated at the end.
    pub fn ring(&self) -> &[GeoPoint] {
        &self.ring
    }

    /// Vertices without the closing duplicate.
    pub fn vertices(&self) -> &[GeoPoint] {
        match self.ring.len() {
            0 | 1 => &self.ring,
            n => &self.ring[..n - 1],
        }
    }

    /// True when the ring cannot enclose anything.
    pub fn is_empty(&self) -> bool {
        self.vertices().len() < 3
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::of(self.vertices())
    }

    /// Unsigned shoelace area in square degrees.
    pub fn area(&self) -> f64 {
        let ring = &self.ring;
        if self.is_empty() {
            return 0.0;
        }
        let mut twice = 0.0;
        for window in ring.windows(2) {
            twice += window[0].lon * window[1].lat - window[1].lon * window[0].lat;
        }
        (twice / 2.0).abs()
    }

    fn edges(&self) -> impl Iterator<Item = ((f64, f64), (f64, f64))> + '_ {
        self.ring.windows(2).map(|w| (w[0].xy(), w[1].xy()))
    }

    pub fn on_boundary(&self, point: &GeoPoint) -> bool {
        let p = point.xy();
        self.edges().any(|(a, b)| point_on_segment(a, b, p))
    }

    /// Even-odd ray cast; boundary handling is up to the caller.
    fn ray_cast(&self, point: &GeoPoint) -> bool {
        let (x, y) = point.xy();
        let mut inside = false;
        for ((xi, yi), (xj, yj)) in self.edges() {
            if ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi) {
                inside = !inside;
            }
        }
        inside
    }

    /// Inclusive membership: interior or boundary.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        if self.is_empty() {
            return false;
        }
        self.on_boundary(point) || self.ray_cast(point)
    }

    /// Strict membership: interior only.
    pub fn contains_strict(&self, point: &GeoPoint) -> bool {
        if self.is_empty() || self.on_boundary(point) {
            return false;
        }
        self.ray_cast(point)
    }

    /// True when the whole segment `a -> b` lies inside or on the polygon.
    ///
    /// The segment is split at every crossing with the ring; each piece is
    /// then inside iff its midpoint is.
    pub fn covers_segment(&self, a: &GeoPoint, b: &GeoPoint) -> bool {
        if !self.contains(a) || !self.contains(b) {
            return false;
        }
        let (pa, pb) = (a.xy(), b.xy());
        let mut cuts = vec![0.0, 1.0];
        for (e1, e2) in self.edges() {
            cuts.extend(segment_intersections(pa, pb, e1, e2));
        }
        cuts.sort_by(f64::total_cmp);
        cuts.dedup_by(|x, y| (*x - *y).abs() <= EPS_DEG);

        cuts.windows(2).all(|w| {
            let t = (w[0] + w[1]) / 2.0;
            let mid = GeoPoint::new(a.lat + t * (b.lat - a.lat), a.lon + t * (b.lon - a.lon));
            self.contains(&mid)
        })
    }

    /// True when segment `a -> b` touches the polygon anywhere, boundary included.
    pub fn intersects_segment(&self, a: &GeoPoint, b: &GeoPoint) -> bool {
        if self.is_empty() {
            return false;
        }
        if self.contains(a) || self.contains(b) {
            return true;
        }
        let (pa, pb) = (a.xy(), b.xy());
        self.edges().any(|(e1, e2)| segments_intersect_2d(pa, pb, e1, e2))
    }
}

/// Named regions of one mission. Built once, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaConfig {
    pub takeoff: GeoPoint,
    pub sensitive: Polygon,
    pub survey: Polygon,
    pub flight_region: Polygon,
}

/// Image-relative bounding box, each edge in [-1, 1] with the image center
/// at the origin and up/right positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub up: f64,
    pub down: f64,
    pub left: f64,
    pub right: f64,
}

impl BoundingBox {
    /// Normalize a pixel-space box (`x1,y1` top-left, `x2,y2` bottom-right,
    /// y growing downwards) against the image size.
    pub fn from_pixels(x1: f64, y1: f64, x2: f64, y2: f64, width: f64, height: f64) -> Self {
        let mid_x = width / 2.0;
        let mid_y = height / 2.0;
        Self {
            up: 2.0 * ((height - y1) - mid_y) / height,
            down: 2.0 * ((height - y2) - mid_y) / height,
            left: 2.0 * (x1 - mid_x) / width,
            right: 2.0 * (x2 - mid_x) / width,
        }
    }

    /// Object center as `(vertical, horizontal)` offsets.
    pub fn center(&self) -> (f64, f64) {
        ((self.up + self.down) / 2.0, (self.left + self.right) / 2.0)
    }
}

/// One object reported by the external detector for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_label: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// Raw heading value meaning "no valid reading" (centidegrees).
pub const HEADING_UNKNOWN_CENTIDEG: u16 = u16::MAX;

/// Vehicle pose at image capture time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub lat: f64,
    pub lon: f64,
    /// Heading in degrees, `None` when the autopilot had no valid reading.
    pub yaw_deg: Option<f64>,
}

impl Pose {
    pub fn new(lat: f64, lon: f64, yaw_deg: Option<f64>) -> Self {
        Self { lat, lon, yaw_deg }
    }

    /// Build from an autopilot heading in centidegrees.
    pub fn from_raw_heading(lat: f64, lon: f64, heading_centideg: u16) -> Self {
        let yaw_deg = if heading_centideg == HEADING_UNKNOWN_CENTIDEG {
            None
        } else {
            Some(f64::from(heading_centideg) / 100.0)
        };
        Self { lat, lon, yaw_deg }
    }

    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

/// A detection resolved to absolute coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeolocatedDetection {
    pub lat: f64,
    pub lon: f64,
    pub class_label: String,
    pub source_image_id: String,
}
