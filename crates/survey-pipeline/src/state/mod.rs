mod store;

pub use store::{DedupPass, DetectionStore, ImageRegistry, PipelineState};
