//! Capture-to-unique-detection pipeline around the survey core.

pub mod capture;
pub mod config;
pub mod detector;
pub mod loops;
pub mod processor;
pub mod state;
