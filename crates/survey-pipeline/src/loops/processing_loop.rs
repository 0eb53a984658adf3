//! Image processing worker loop.
//!
//! Several workers share one queue receiver; each image is geolocated by
//! whichever worker pulls it.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, Mutex};

use survey_core::GeolocationConfig;

use crate::capture::CapturedImage;
use crate::detector::Detector;
use crate::processor::{process_image, ProcessOutcome};
use crate::state::PipelineState;

pub type SharedQueue = Arc<Mutex<mpsc::Receiver<CapturedImage>>>;

pub fn shared_queue(rx: mpsc::Receiver<CapturedImage>) -> SharedQueue {
    Arc::new(Mutex::new(rx))
}

async fn next_image(queue: &SharedQueue) -> Option<CapturedImage> {
    queue.lock().await.recv().await
}

/// Run one worker until the queue closes or shutdown fires.
pub async fn run_processing_loop(
    worker_id: usize,
    state: Arc<PipelineState>,
    detector: Arc<dyn Detector>,
    config: GeolocationConfig,
    queue: SharedQueue,
    mut shutdown: broadcast::Receiver<()>,
) {
    tracing::debug!("Processing worker {} started", worker_id);

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Processing worker {} shutting down", worker_id);
                break;
            }
            maybe_image = next_image(&queue) => {
                let Some(image) = maybe_image else {
                    tracing::debug!("Processing worker {}: queue closed", worker_id);
                    break;
                };
                match process_image(&state, detector.as_ref(), &image, &config) {
                    Ok(ProcessOutcome::AlreadyClaimed) => {
                        tracing::debug!("Image {} already processed", image.image_id);
                    }
                    Ok(ProcessOutcome::Processed { .. }) => {}
                    Err(err) => {
                        tracing::warn!("Processing image {} failed: {:#}", image.image_id, err);
                    }
                }
            }
        }
    }
}
