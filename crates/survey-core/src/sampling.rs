//! Bounded rejection sampling inside polygons.

use rand::Rng;

use crate::error::SampleError;
use crate::models::{GeoPoint, Polygon};

/// Draw uniform points in the polygon's bounding box until one falls strictly
/// inside, giving up after `max_attempts` draws.
pub fn random_point_in_polygon<R: Rng + ?Sized>(
    polygon: &Polygon,
    max_attempts: usize,
    rng: &mut R,
) -> Result<GeoPoint, SampleError> {
    let exhausted = SampleError::Exhausted {
        attempts: max_attempts,
    };
    let Some(bounds) = polygon.bounds() else {
        return Err(exhausted);
    };

    for _ in 0..max_attempts {
        let candidate = GeoPoint::new(
            rng.random_range(bounds.min_lat..=bounds.max_lat),
            rng.random_range(bounds.min_lon..=bounds.max_lon),
        );
        if polygon.contains_strict(&candidate) {
            return Ok(candidate);
        }
    }
    Err(exhausted)
}
