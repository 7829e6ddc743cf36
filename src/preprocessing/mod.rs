//! Audio preprocessing modules
//!
//! Utilities for preparing audio for the pitch model:
//! - Channel mixing (stereo to mono)
//! - Framing (fixed-width standardized analysis windows)

pub mod channel_mixer;
pub mod framing;
