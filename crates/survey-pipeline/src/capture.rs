//! Image capture: pairs each frame with the latest pose and queues it for
//! processing.
//!
//! The queue is bounded. When workers fall behind, the newest frame is
//! dropped and counted instead of blocking the camera.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use survey_core::Pose;

use crate::state::PipelineState;

/// One frame plus everything needed to geolocate its detections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedImage {
    pub image_id: String,
    /// Monotonic capture order; fixes dedup order across workers
    pub sequence: u64,
    pub captured_at: DateTime<Utc>,
    pub pose: Pose,
    pub altitude_m: f64,
    pub frame: Vec<u8>,
}

#[derive(Debug, Error, PartialEq)]
pub enum CaptureError {
    #[error("no pose has been published yet")]
    NoPose,
    #[error("processing queue full, dropped image {0}")]
    QueueFull(String),
    #[error("processing queue closed")]
    Closed,
}

/// Latest-value pose feed. Publishers overwrite, readers take a snapshot.
pub fn pose_feed() -> (watch::Sender<Option<Pose>>, watch::Receiver<Option<Pose>>) {
    watch::channel(None)
}

pub fn image_queue(capacity: usize) -> (mpsc::Sender<CapturedImage>, mpsc::Receiver<CapturedImage>) {
    mpsc::channel(capacity.max(1))
}

pub struct ImageCapture {
    state: Arc<PipelineState>,
    pose: watch::Receiver<Option<Pose>>,
    queue: mpsc::Sender<CapturedImage>,
    altitude_m: f64,
    sequence: AtomicU64,
}

impl ImageCapture {
    pub fn new(
        state: Arc<PipelineState>,
        pose: watch::Receiver<Option<Pose>>,
        queue: mpsc::Sender<CapturedImage>,
        altitude_m: f64,
    ) -> Self {
        Self {
            state,
            pose,
            queue,
            altitude_m,
            sequence: AtomicU64::new(0),
        }
    }

    /// Stamp `frame` with the current pose and offer it to the workers.
    pub fn capture(&self, frame: Vec<u8>) -> Result<String, CaptureError> {
        let pose = (*self.pose.borrow()).ok_or(CaptureError::NoPose)?;
        let image = CapturedImage {
            image_id: Uuid::new_v4().to_string(),
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
            captured_at: Utc::now(),
            pose,
            altitude_m: self.altitude_m,
            frame,
        };
        self.offer(image)
    }

    /// Queue an already-built image without blocking.
    pub fn offer(&self, image: CapturedImage) -> Result<String, CaptureError> {
        let image_id = image.image_id.clone();
        match self.queue.try_send(image) {
            Ok(()) => {
                self.state.images().register(&image_id);
                Ok(image_id)
            }
            Err(mpsc::error::TrySendError::Full(image)) => {
                let dropped = self.state.record_dropped_image(image.sequence);
                tracing::warn!(
                    "Processing queue full, dropping image {} (seq {}, {} dropped so far)",
                    image.image_id,
                    image.sequence,
                    dropped
                );
                Err(CaptureError::QueueFull(image.image_id))
            }
            Err(mpsc::error::TrySendError::Closed(image)) => {
                self.state.detections().close_sequence(image.sequence);
                Err(CaptureError::Closed)
            }
        }
    }
}
