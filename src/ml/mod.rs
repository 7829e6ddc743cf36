//! Model interfaces and inference backends
//!
//! The convolutional pitch and tonic networks are consumed as opaque
//! capabilities: fixed input/output tensor shapes behind a trait, loaded once
//! and held for the lifetime of the owning object. The `ml` feature provides
//! ONNX Runtime implementations; without it, callers bring their own backend
//! (the integration tests use a synthetic spectral-peak model).
//!
//! Inference takes `&mut self`: model sessions are stateful and not documented
//! as thread-safe, so exclusive access per instance is encoded in the
//! signature rather than left to convention.

use ndarray::{Array2, ArrayView2};

use crate::error::AnalysisError;

#[cfg(feature = "ml")]
pub mod onnx_model;

/// Width of a pitch-model input frame
pub const MODEL_FRAME_WIDTH: usize = 1024;

/// Width of a pitch-model activation vector
pub const ACTIVATION_BINS: usize = 360;

/// Bins in the pitch-class histogram and the tonic distribution
pub const PITCH_BINS: usize = 60;

/// Columns in the HistCQT summary fed to the tonic model
pub const HIST_CQT_COLS: usize = 4;

/// Opaque pitch model: batches of 1024-wide standardized frames in,
/// 360-wide activation vectors out.
pub trait ActivationModel {
    /// Run inference on a frame batch of shape `(n_frames, 1024)`.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::ShapeMismatch` if the batch violates the input
    /// contract, or `AnalysisError::ModelError` for backend failures.
    fn infer(&mut self, frames: ArrayView2<f32>) -> Result<Array2<f32>, AnalysisError>;
}

/// Opaque tonic model: rolled HistCQT views in (one flattened `60*4` row per
/// rotation), 60-wide sigmoid tonic distributions out.
pub trait EmbeddingModel {
    /// Run inference on a view batch of shape `(n_views, 240)`.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::ShapeMismatch` if the batch violates the input
    /// contract, or `AnalysisError::ModelError` for backend failures.
    fn infer(&mut self, views: ArrayView2<f32>) -> Result<Array2<f32>, AnalysisError>;
}

/// Validate a pitch-model input batch against the frame contract
pub(crate) fn check_frame_batch(frames: &ArrayView2<f32>) -> Result<(), AnalysisError> {
    if frames.ncols() != MODEL_FRAME_WIDTH {
        return Err(AnalysisError::ShapeMismatch(format!(
            "Pitch model expects {}-wide frames, got {}",
            MODEL_FRAME_WIDTH,
            frames.ncols()
        )));
    }
    Ok(())
}

/// Validate a tonic-model input batch against the view contract
pub(crate) fn check_view_batch(views: &ArrayView2<f32>) -> Result<(), AnalysisError> {
    if views.ncols() != PITCH_BINS * HIST_CQT_COLS {
        return Err(AnalysisError::ShapeMismatch(format!(
            "Tonic model expects {}-wide views, got {}",
            PITCH_BINS * HIST_CQT_COLS,
            views.ncols()
        )));
    }
    Ok(())
}
