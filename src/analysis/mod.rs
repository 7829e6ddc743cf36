//! Result aggregation modules
//!
//! Output types shared across the pipeline:
//! - Pitch track (time/frequency/pitch-class/confidence per frame)
//! - Tonic estimate
//! - Raga prediction

pub mod result;
