//! Error taxonomy for planning and geolocation.

use thiserror::Error;

/// Failures while turning an area definition into an `AreaConfig`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AreaError {
    #[error("required region '{0}' is missing")]
    MissingRegion(String),
    #[error("region '{0}' has no coordinates")]
    EmptyRegion(String),
    #[error("region '{region}' has malformed coordinates: {detail}")]
    MalformedCoordinates { region: String, detail: String },
    #[error("invalid placemark document: {0}")]
    Xml(String),
}

impl From<roxmltree::Error> for AreaError {
    fn from(err: roxmltree::Error) -> Self {
        AreaError::Xml(err.to_string())
    }
}

/// Reasons a point-to-point plan could not be produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanningError {
    #[error("grid resolution must be positive, got {0}")]
    InvalidResolution(f64),
    #[error("obstacle grid too large ({0} cells)")]
    GridTooLarge(usize),
    #[error("{0} lies outside the obstacle grid")]
    EndpointOutsideGrid(&'static str),
    #[error("{0} lies in a blocked cell")]
    EndpointBlocked(&'static str),
    #[error("A* exhausted the frontier after expanding {expanded} cells")]
    NoPath { expanded: usize },
}

/// Why a survey polygon cannot be covered.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoverageError {
    #[error("survey polygon has no usable rotated bounding rectangle")]
    Degenerate,
    #[error("lane spacing must be positive, got {0}")]
    InvalidSpacing(f64),
    #[error("inner margin {0} leaves no area to cover")]
    MarginTooLarge(f64),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeolocationError {
    #[error("pose for image '{0}' has no valid heading")]
    UndefinedHeading(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SampleError {
    #[error("no interior point found after {attempts} attempts")]
    Exhausted { attempts: usize },
}

/// Failures while assembling a full mission.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MissionError {
    #[error("approach leg failed: {0}")]
    Approach(#[from] PlanningError),
    #[error("coverage failed: {0}")]
    Coverage(#[from] CoverageError),
}
