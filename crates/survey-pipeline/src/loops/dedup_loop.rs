//! Periodic deduplication of accumulated detections.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::interval;

use crate::state::PipelineState;

/// Feed newly finished captures to the deduplicator on every tick, and once
/// more on shutdown.
pub async fn run_dedup_loop(
    state: Arc<PipelineState>,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = interval(period);

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Dedup loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                refresh(&state);
            }
        }
    }

    refresh(&state);
}

fn refresh(state: &PipelineState) {
    let pass = state.refresh_unique();
    if pass.fed == 0 {
        return;
    }
    tracing::info!(
        "Dedup pass: {} new detections, {} unique, {} duplicates (through seq {})",
        pass.fed,
        pass.unique,
        pass.duplicates,
        state.dedup_watermark()
    );
}
