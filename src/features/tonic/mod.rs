//! Tonic estimation
//!
//! - Histogram builder: summarizes the pitch track into the rolled 60x4
//!   occurrence statistics ("hist_cqt") the tonic model consumes
//! - Model decode: rotation-augmented inference over the opaque embedding
//!   model, folded from 60 bins to the 12 pitch classes

pub mod histogram;
pub mod model;
