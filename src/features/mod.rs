//! Feature extraction modules
//!
//! This module contains the pipeline's feature stages:
//! - Pitch activation and cents/frequency decoding
//! - Tonic histogram building and tonic decoding
//! - Raga ensemble feature views and classification

pub mod pitch;
pub mod raga;
pub mod tonic;
