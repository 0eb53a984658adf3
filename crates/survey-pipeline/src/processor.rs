//! Per-image processing: detect, geolocate, store.

use anyhow::{anyhow, Result};
use survey_core::{geolocate_image, GeolocationConfig};

use crate::capture::CapturedImage;
use crate::detector::Detector;
use crate::state::PipelineState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Another worker already handled this image.
    AlreadyClaimed,
    Processed { located: usize, skipped: usize },
}

/// Process `image` at most once across all workers.
///
/// A failing detector or a missing footprint loses the image: it stays
/// claimed, is counted as lost and its capture sequence is closed empty.
pub fn process_image(
    state: &PipelineState,
    detector: &dyn Detector,
    image: &CapturedImage,
    config: &GeolocationConfig,
) -> Result<ProcessOutcome> {
    if !state.images().try_claim(&image.image_id) {
        return Ok(ProcessOutcome::AlreadyClaimed);
    }

    let result = locate(state, detector, image, config);
    if let Err(err) = &result {
        let lost = state.record_lost_image(image.sequence);
        tracing::warn!(
            "Image {} (seq {}) lost: {} ({} lost so far)",
            image.image_id,
            image.sequence,
            err,
            lost
        );
    }
    result
}

fn locate(
    state: &PipelineState,
    detector: &dyn Detector,
    image: &CapturedImage,
    config: &GeolocationConfig,
) -> Result<ProcessOutcome> {
    let footprint = config
        .footprints
        .lookup(image.altitude_m)
        .ok_or_else(|| anyhow!("no ground footprint configured for {} m", image.altitude_m))?;
    let detections = detector.detect(image)?;

    let outcome = geolocate_image(&detections, &image.pose, footprint, &image.image_id);
    for err in &outcome.skipped {
        tracing::warn!("Skipping detection: {}", err);
    }
    state.record_skipped_detections(outcome.skipped.len());

    let located = outcome.located.len();
    tracing::debug!(
        "Image {} (seq {}): {} located, {} skipped",
        image.image_id,
        image.sequence,
        located,
        outcome.skipped.len()
    );
    state.detections().append(image.sequence, outcome.located);

    Ok(ProcessOutcome::Processed {
        located,
        skipped: outcome.skipped.len(),
    })
}
