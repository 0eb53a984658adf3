pub mod area;
pub mod config;
pub mod coverage;
pub mod dedup;
pub mod error;
pub mod geolocate;
pub mod grid;
pub mod mission;
pub mod models;
pub mod route_engine;
pub mod sampling;
pub mod spatial;

pub use area::{extract_regions, parse_coordinates, REQUIRED_REGIONS};
pub use config::{FootprintTable, GeolocationConfig, GroundFootprint, PlannerConfig};
pub use coverage::{
    generate_coverage, minimum_rotated_rectangle, try_generate_coverage, CoveragePlan,
    RotatedRect,
};
pub use dedup::{remove_duplicates, Deduplicator};
pub use error::{
    AreaError, CoverageError, GeolocationError, MissionError, PlanningError, SampleError,
};
pub use geolocate::{geolocate, geolocate_image, ImageGeolocation};
pub use grid::{Cell, Corridor, OccupancyGrid};
pub use mission::{plan_mission, plan_return, MissionPlan};
pub use models::{
    AreaConfig, BoundingBox, Bounds, Detection, GeoPoint, GeolocatedDetection, Polygon, Pose,
};
pub use route_engine::{plan_path, search, smooth_path, GridPath, PlannedPath};
pub use sampling::random_point_in_polygon;
pub use spatial::haversine_distance;
