//! Background loops for continuous processing.

pub mod dedup_loop;
pub mod processing_loop;
