//! Pitch activation and decoding
//!
//! - Activation engine: frames in, 360-bin salience vectors out (via the
//!   opaque pitch model), plus aggregation to the 60-bin pitch-class histogram
//! - Decoder: salience to cents/frequency, per-frame confidence, coarse
//!   pitch-class estimate
//! - Viterbi: path-smoothed decoding across the whole sequence

pub mod decoder;
pub mod engine;
pub mod viterbi;
