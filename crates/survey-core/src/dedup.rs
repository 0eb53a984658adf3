//! Proximity clustering of geolocated detections.

use crate::models::GeolocatedDetection;
use crate::spatial::haversine_distance;

fn is_near(a: &GeolocatedDetection, b: &GeolocatedDetection, threshold_m: f64) -> bool {
    haversine_distance(a.lat, a.lon, b.lat, b.lon) < threshold_m
}

/// Drop every detection closer than `threshold_m` to an earlier survivor.
///
/// Order matters: the first-seen detection of a cluster survives and output
/// keeps input order.
pub fn remove_duplicates(
    detections: &[GeolocatedDetection],
    threshold_m: f64,
) -> Vec<GeolocatedDetection> {
    let mut duplicate = vec![false; detections.len()];
    for i in 0..detections.len() {
        if duplicate[i] {
            continue;
        }
        for j in (i + 1)..detections.len() {
            if !duplicate[j] && is_near(&detections[i], &detections[j], threshold_m) {
                duplicate[j] = true;
            }
        }
    }

    detections
        .iter()
        .zip(duplicate)
        .filter_map(|(detection, dup)| (!dup).then(|| detection.clone()))
        .collect()
}

/// Incremental deduplication over a growing, ordered detection stream.
///
/// Each new detection is compared only against survivors so far, so feeding
/// more items never revisits resolved duplicates.
#[derive(Debug, Clone)]
pub struct Deduplicator {
    threshold_m: f64,
    unique: Vec<GeolocatedDetection>,
    seen: usize,
}

impl Deduplicator {
    pub fn new(threshold_m: f64) -> Self {
        Self {
            threshold_m,
            unique: Vec::new(),
            seen: 0,
        }
    }

    /// Returns true when `detection` is kept.
    pub fn push(&mut self, detection: GeolocatedDetection) -> bool {
        self.seen += 1;
        if self
            .unique
            .iter()
            .any(|kept| is_near(kept, &detection, self.threshold_m))
        {
            return false;
        }
        self.unique.push(detection);
        true
    }

    /// Feed a batch, returning how many were kept.
    pub fn extend<I>(&mut self, detections: I) -> usize
    where
        I: IntoIterator<Item = GeolocatedDetection>,
    {
        detections
            .into_iter()
            .map(|d| self.push(d))
            .filter(|kept| *kept)
            .count()
    }

    pub fn unique(&self) -> &[GeolocatedDetection] {
        &self.unique
    }

    pub fn seen(&self) -> usize {
        self.seen
    }

    pub fn duplicates(&self) -> usize {
        self.seen - self.unique.len()
    }

    pub fn into_unique(self) -> Vec<GeolocatedDetection> {
        self.unique
    }
}
