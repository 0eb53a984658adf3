//! In-memory pipeline state using DashMap.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use dashmap::DashMap;
use survey_core::{remove_duplicates, Deduplicator, GeolocatedDetection, GeolocationConfig};

/// Processed flags per captured image.
#[derive(Default)]
pub struct ImageRegistry {
    processed: DashMap<String, AtomicBool>,
}

impl ImageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a captured image as unprocessed. Re-registering keeps the
    /// existing flag.
    pub fn register(&self, image_id: &str) {
        self.processed
            .entry(image_id.to_string())
            .or_insert_with(|| AtomicBool::new(false));
    }

    /// Flip unprocessed -> processed. Exactly one concurrent caller wins;
    /// unknown images are registered on the fly.
    pub fn try_claim(&self, image_id: &str) -> bool {
        let entry = self
            .processed
            .entry(image_id.to_string())
            .or_insert_with(|| AtomicBool::new(false));
        entry
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_processed(&self, image_id: &str) -> bool {
        self.processed
            .get(image_id)
            .map(|flag| flag.load(Ordering::Acquire))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.processed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processed.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.processed
            .iter()
            .filter(|r| !r.value().load(Ordering::Acquire))
            .count()
    }
}

/// Geolocated detections grouped by capture sequence, so concurrent appends
/// still read back in capture order.
///
/// Every image that leaves the pipeline records its sequence here, even with
/// no detections, so readers can tell a finished image from one in flight.
#[derive(Default)]
pub struct DetectionStore {
    by_sequence: DashMap<u64, Vec<GeolocatedDetection>>,
    appended: AtomicU64,
}

impl DetectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, capture_sequence: u64, detections: Vec<GeolocatedDetection>) {
        let count = detections.len() as u64;
        self.by_sequence
            .entry(capture_sequence)
            .or_default()
            .extend(detections);
        self.appended.fetch_add(count, Ordering::SeqCst);
    }

    /// Mark a capture sequence finished without detections.
    pub fn close_sequence(&self, capture_sequence: u64) {
        self.append(capture_sequence, Vec::new());
    }

    /// Total detections appended so far; only grows.
    pub fn appended(&self) -> u64 {
        self.appended.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.appended() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All detections in capture order.
    pub fn snapshot(&self) -> Vec<GeolocatedDetection> {
        let mut entries: Vec<(u64, Vec<GeolocatedDetection>)> = self
            .by_sequence
            .iter()
            .map(|r| (*r.key(), r.value().clone()))
            .collect();
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().flat_map(|(_, batch)| batch).collect()
    }

    /// Full batch pass over everything stored.
    pub fn deduplicated(&self, threshold_m: f64) -> Vec<GeolocatedDetection> {
        remove_duplicates(&self.snapshot(), threshold_m)
    }

    /// Detections of the unbroken run of finished sequences starting at
    /// `from`, and the first sequence not yet finished.
    pub fn contiguous_from(&self, from: u64) -> (Vec<GeolocatedDetection>, u64) {
        let mut next = from;
        let mut batch = Vec::new();
        while let Some(entry) = self.by_sequence.get(&next) {
            batch.extend(entry.value().iter().cloned());
            next += 1;
        }
        (batch, next)
    }
}

/// Incremental dedup state: survivors so far and the first capture sequence
/// not yet fed.
struct DedupProgress {
    deduplicator: Deduplicator,
    next_sequence: u64,
}

/// Result of one incremental dedup pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupPass {
    /// Detections fed in this pass
    pub fed: usize,
    pub unique: usize,
    pub duplicates: usize,
}

/// Shared state for capture, workers and the dedup loop.
pub struct PipelineState {
    images: ImageRegistry,
    detections: DetectionStore,
    dedup: Mutex<DedupProgress>,
    unique: RwLock<Vec<GeolocatedDetection>>,
    dropped_images: AtomicU64,
    lost_images: AtomicU64,
    skipped_detections: AtomicU64,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::with_duplicate_threshold(GeolocationConfig::default().duplicate_threshold_m)
    }
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duplicate_threshold(threshold_m: f64) -> Self {
        Self {
            images: ImageRegistry::new(),
            detections: DetectionStore::new(),
            dedup: Mutex::new(DedupProgress {
                deduplicator: Deduplicator::new(threshold_m),
                next_sequence: 0,
            }),
            unique: RwLock::new(Vec::new()),
            dropped_images: AtomicU64::new(0),
            lost_images: AtomicU64::new(0),
            skipped_detections: AtomicU64::new(0),
        }
    }

    pub fn images(&self) -> &ImageRegistry {
        &self.images
    }

    pub fn detections(&self) -> &DetectionStore {
        &self.detections
    }

    /// Count a frame the queue refused; its sequence is closed empty.
    pub fn record_dropped_image(&self, capture_sequence: u64) -> u64 {
        self.detections.close_sequence(capture_sequence);
        self.dropped_images.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn dropped_images(&self) -> u64 {
        self.dropped_images.load(Ordering::SeqCst)
    }

    /// Count an image whose processing failed; its sequence is closed empty.
    pub fn record_lost_image(&self, capture_sequence: u64) -> u64 {
        self.detections.close_sequence(capture_sequence);
        self.lost_images.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn lost_images(&self) -> u64 {
        self.lost_images.load(Ordering::SeqCst)
    }

    pub fn record_skipped_detections(&self, count: usize) {
        self.skipped_detections
            .fetch_add(count as u64, Ordering::SeqCst);
    }

    pub fn skipped_detections(&self) -> u64 {
        self.skipped_detections.load(Ordering::SeqCst)
    }

    /// Feed detections from newly finished capture sequences to the
    /// deduplicator and publish the unique list.
    ///
    /// Only the unbroken run after the last fed sequence is consumed, so
    /// resolved detections are never compared again and the result does not
    /// depend on worker timing.
    pub fn refresh_unique(&self) -> DedupPass {
        let Ok(mut progress) = self.dedup.lock() else {
            return DedupPass {
                fed: 0,
                unique: self.unique_detections().len(),
                duplicates: 0,
            };
        };

        let (batch, next_sequence) = self.detections.contiguous_from(progress.next_sequence);
        progress.next_sequence = next_sequence;
        let fed = batch.len();
        progress.deduplicator.extend(batch);

        let pass = DedupPass {
            fed,
            unique: progress.deduplicator.unique().len(),
            duplicates: progress.deduplicator.duplicates(),
        };
        if fed > 0 {
            if let Ok(mut guard) = self.unique.write() {
                *guard = progress.deduplicator.unique().to_vec();
            }
        }
        pass
    }

    /// First capture sequence the deduplicator has not consumed.
    pub fn dedup_watermark(&self) -> u64 {
        self.dedup
            .lock()
            .map(|progress| progress.next_sequence)
            .unwrap_or(0)
    }

    /// Detections fed to the deduplicator so far.
    pub fn dedup_seen(&self) -> usize {
        self.dedup
            .lock()
            .map(|progress| progress.deduplicator.seen())
            .unwrap_or(0)
    }

    /// Last published unique list.
    pub fn unique_detections(&self) -> Vec<GeolocatedDetection> {
        self.unique
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(lat: f64, image: &str) -> GeolocatedDetection {
        GeolocatedDetection {
            lat,
            lon: -2.0,
            class_label: "person".to_string(),
            source_image_id: image.to_string(),
        }
    }

    #[test]
    fn claim_only_once() {
        let registry = ImageRegistry::new();
        registry.register("img-1");
        assert!(!registry.is_processed("img-1"));
        assert!(registry.try_claim("img-1"));
        assert!(!registry.try_claim("img-1"));
        assert!(registry.is_processed("img-1"));
    }

    #[test]
    fn contiguous_run_stops_at_first_gap() {
        let store = DetectionStore::new();
        store.append(0, vec![detection(51.0, "a")]);
        store.close_sequence(1);
        store.append(3, vec![detection(51.003, "d")]);

        let (batch, next) = store.contiguous_from(0);
        assert_eq!(batch.len(), 1);
        assert_eq!(next, 2);
        let (batch, next) = store.contiguous_from(next);
        assert!(batch.is_empty());
        assert_eq!(next, 2);
    }

    #[test]
    fn snapshot_follows_capture_order() {
        let store = DetectionStore::new();
        store.append(2, vec![detection(51.002, "c")]);
        store.append(0, vec![detection(51.0, "a"), detection(51.001, "b")]);
        let ids: Vec<String> = store
            .snapshot()
            .into_iter()
            .map(|d| d.source_image_id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(store.appended(), 3);
    }

    #[test]
    fn refresh_publishes_unique_list() {
        let state = PipelineState::new();
        state
            .detections()
            .append(0, vec![detection(51.0, "a"), detection(51.0, "a")]);
        let pass = state.refresh_unique();
        assert_eq!(pass, DedupPass { fed: 2, unique: 1, duplicates: 1 });
        assert_eq!(state.unique_detections().len(), 1);
        assert_eq!(state.dedup_watermark(), 1);
    }

    #[test]
    fn dropped_and_lost_images_close_their_sequence() {
        let state = PipelineState::new();
        assert_eq!(state.record_dropped_image(0), 1);
        assert_eq!(state.record_lost_image(1), 1);
        state.detections().append(2, vec![detection(51.0, "c")]);

        assert_eq!(state.refresh_unique().fed, 1);
        assert_eq!(state.dedup_watermark(), 3);
        assert_eq!(state.detections().len(), 1);
    }
}
