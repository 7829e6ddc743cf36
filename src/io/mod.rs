//! Audio I/O modules
//!
//! Audio decoding (WAV/MP3 via Symphonia, with resampling to the model rate)
//! and the mono sample buffer the pipeline operates on.

pub mod decoder;
pub mod sample_buffer;
