//! Object detector seam.

use anyhow::{Context, Result};
use survey_core::Detection;

use crate::capture::CapturedImage;

/// Black-box detector: one image in, labelled normalized boxes out.
pub trait Detector: Send + Sync {
    fn detect(&self, image: &CapturedImage) -> Result<Vec<Detection>>;
}

/// Reads detections that were serialized into the frame bytes as JSON.
/// Used to replay recorded flights.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReplayDetector;

impl Detector for ReplayDetector {
    fn detect(&self, image: &CapturedImage) -> Result<Vec<Detection>> {
        if image.frame.is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&image.frame)
            .with_context(|| format!("image {} carries no readable detections", image.image_id))
    }
}
