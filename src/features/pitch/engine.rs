//! Pitch activation engine
//!
//! Wraps the opaque pitch model: standardized frame batches in, per-frame
//! 360-bin activation vectors out. The engine does no algorithmic work beyond
//! batching and shape checks; it also aggregates activations into the coarser
//! 60-bin pitch-class histogram consumed by the tonic and raga stages.

use ndarray::Array2;

use crate::error::AnalysisError;
use crate::ml::{ActivationModel, ACTIVATION_BINS, PITCH_BINS};

/// Sub-bin groups collapsed by the 60-bin aggregation (360 = 6 * 60)
const OCTAVE_GROUPS: usize = ACTIVATION_BINS / PITCH_BINS;

/// Run the pitch model over a frame batch
///
/// # Arguments
///
/// * `model` - Loaded activation model (exclusive access; sessions are not
///   thread-safe)
/// * `frames` - Frame batch of shape `(n_frames, 1024)`
///
/// # Returns
///
/// Activation matrix of shape `(n_frames, 360)`. Values are unnormalized
/// salience scores; do not assume rows sum to 1.
///
/// # Errors
///
/// Returns `AnalysisError::ShapeMismatch` if the frame batch or the model's
/// output violates the shape contract, or a `ModelError` from the backend.
pub fn predict_activation(
    model: &mut dyn ActivationModel,
    frames: &Array2<f32>,
) -> Result<Array2<f32>, AnalysisError> {
    let activation = model.infer(frames.view())?;

    if activation.nrows() != frames.nrows() || activation.ncols() != ACTIVATION_BINS {
        return Err(AnalysisError::ShapeMismatch(format!(
            "Model returned {}x{} activation for {} frames, expected {}x{}",
            activation.nrows(),
            activation.ncols(),
            frames.nrows(),
            frames.nrows(),
            ACTIVATION_BINS
        )));
    }

    log::debug!(
        "Pitch prediction completed: {} frames -> {}x{} activation",
        frames.nrows(),
        activation.nrows(),
        activation.ncols()
    );

    Ok(activation)
}

/// Collapse the octave-resolution sub-bins of an activation matrix
///
/// Each 360-row is viewed as 6 groups of 60 and summed across the groups,
/// producing one 60-wide pitch-class+cents histogram per frame (the "pitches"
/// tensor).
///
/// # Errors
///
/// Returns `AnalysisError::ShapeMismatch` for non-360-wide input.
pub fn aggregate_to_60bin(activation: &Array2<f32>) -> Result<Array2<f32>, AnalysisError> {
    if activation.ncols() != ACTIVATION_BINS {
        return Err(AnalysisError::ShapeMismatch(format!(
            "Expected {} activation bins, got {}",
            ACTIVATION_BINS,
            activation.ncols()
        )));
    }

    let mut pitches = Array2::zeros((activation.nrows(), PITCH_BINS));
    for (t, row) in activation.outer_iter().enumerate() {
        for g in 0..OCTAVE_GROUPS {
            for b in 0..PITCH_BINS {
                pitches[[t, b]] += row[g * PITCH_BINS + b];
            }
        }
    }

    Ok(pitches)
}
