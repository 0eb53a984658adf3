//! Survey pipeline - replays recorded frames through capture, geolocation and
//! deduplication.
//!
//! Reads one JSON record per line from stdin:
//!   {"lat": 51.4234, "lon": -2.6715, "heading_centideg": 9000, "detections": [...]}
//! and prints the unique detections as a JSON array on stdout.

use std::sync::Arc;

use anyhow::Result;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use survey_core::{Detection, Pose};
use survey_pipeline::capture::{image_queue, pose_feed, CaptureError, ImageCapture};
use survey_pipeline::config::Config;
use survey_pipeline::detector::{Detector, ReplayDetector};
use survey_pipeline::loops::{dedup_loop, processing_loop};
use survey_pipeline::state::PipelineState;

#[derive(Debug, Deserialize)]
struct ReplayRecord {
    lat: f64,
    lon: f64,
    heading_centideg: u16,
    #[serde(default)]
    detections: Vec<Detection>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays clean JSON
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("survey_pipeline=info".parse()?))
        .init();

    let config = Config::from_env();
    tracing::info!("Starting survey pipeline: {:?}", config);

    let state = Arc::new(PipelineState::with_duplicate_threshold(
        config.duplicate_threshold_m,
    ));
    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let (pose_tx, pose_rx) = pose_feed();
    let (queue_tx, queue_rx) = image_queue(config.queue_capacity);
    let queue = processing_loop::shared_queue(queue_rx);
    let detector: Arc<dyn Detector> = Arc::new(ReplayDetector);

    let mut workers = Vec::with_capacity(config.workers);
    for worker_id in 0..config.workers {
        workers.push(tokio::spawn(processing_loop::run_processing_loop(
            worker_id,
            state.clone(),
            detector.clone(),
            config.geolocation(),
            queue.clone(),
            shutdown_tx.subscribe(),
        )));
    }
    let dedup = tokio::spawn(dedup_loop::run_dedup_loop(
        state.clone(),
        config.dedup_interval(),
        shutdown_tx.subscribe(),
    ));

    let capture = ImageCapture::new(state.clone(), pose_rx, queue_tx, config.altitude_m);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_no = 0usize;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        let record: ReplayRecord = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!("Line {}: skipping unreadable record: {}", line_no, err);
                continue;
            }
        };

        pose_tx.send_replace(Some(Pose::from_raw_heading(
            record.lat,
            record.lon,
            record.heading_centideg,
        )));
        match capture.capture(serde_json::to_vec(&record.detections)?) {
            Ok(_) | Err(CaptureError::QueueFull(_)) => {}
            Err(err) => {
                tracing::error!("Line {}: capture failed: {}", line_no, err);
                break;
            }
        }
        // Give workers a turn between frames.
        tokio::task::yield_now().await;
    }

    // Closing the queue ends the workers once it drains.
    drop(capture);
    for worker in workers {
        worker.await?;
    }
    // Dedup loop does its final pass on shutdown.
    shutdown_tx.send(()).ok();
    dedup.await?;

    tracing::info!(
        "Done: {} images, {} dropped, {} lost, {} detections skipped",
        state.images().len(),
        state.dropped_images(),
        state.lost_images(),
        state.skipped_detections()
    );
    println!("{}", serde_json::to_string_pretty(&state.unique_detections())?);

    Ok(())
}
