//! Projection of image detections onto the ground.

use crate::config::GroundFootprint;
use crate::error::GeolocationError;
use crate::models::{Detection, GeolocatedDetection, Pose};
use crate::spatial::METERS_PER_DEG_LAT;

/// Camera faces opposite the vehicle heading.
const CAMERA_YAW_OFFSET_DEG: f64 = 180.0;

/// Resolve one detection to absolute coordinates.
///
/// The bbox center `(u, l)` is scaled by half the ground footprint, rotated
/// by the camera yaw into a north/east displacement in meters, then turned
/// into a degree delta with a cos(lat) correction on longitude.
pub fn geolocate(
    detection: &Detection,
    pose: &Pose,
    footprint: GroundFootprint,
    image_id: &str,
) -> Result<GeolocatedDetection, GeolocationError> {
    let yaw_deg = pose
        .yaw_deg
        .filter(|yaw| yaw.is_finite())
        .ok_or_else(|| GeolocationError::UndefinedHeading(image_id.to_string()))?;

    let camera_yaw = (yaw_deg - CAMERA_YAW_OFFSET_DEG).to_radians();
    let (sin, cos) = camera_yaw.sin_cos();

    let (u_center, l_center) = detection.bbox.center();
    let v0 = footprint.length_m / 2.0 * u_center;
    let v1 = footprint.width_m / 2.0 * l_center;

    let north_m = cos * v0 - sin * v1;
    let east_m = sin * v0 + cos * v1;

    let dlat = north_m / METERS_PER_DEG_LAT;
    let dlon = east_m / (METERS_PER_DEG_LAT * pose.lat.to_radians().cos());

    Ok(GeolocatedDetection {
        lat: pose.lat + dlat,
        lon: pose.lon + dlon,
        class_label: detection.class_label.clone(),
        source_image_id: image_id.to_string(),
    })
}

/// Outcome of geolocating every detection from one image.
#[derive(Debug, Default)]
pub struct ImageGeolocation {
    pub located: Vec<GeolocatedDetection>,
    pub skipped: Vec<GeolocationError>,
}

/// Geolocate a batch; a failing detection is recorded and skipped.
pub fn geolocate_image(
    detections: &[Detection],
    pose: &Pose,
    footprint: GroundFootprint,
    image_id: &str,
) -> ImageGeolocation {
    let mut result = ImageGeolocation::default();
    for detection in detections {
        match geolocate(detection, pose, footprint, image_id) {
            Ok(located) => result.located.push(located),
            Err(err) => result.skipped.push(err),
        }
    }
    result
}
