//! Activation-to-cents/frequency decoding
//!
//! Converts per-frame salience vectors into continuous pitch estimates.
//! Cents are decoded either per frame (weighted local averaging around the
//! salience peak) or globally (Viterbi path smoothing, see
//! [`super::viterbi`]), then mapped to Hz. Degenerate frames decode to NaN
//! cents and are mapped to a frequency of exactly 0, the defined "no pitch"
//! sentinel.

use ndarray::{Array2, ArrayView1};

use crate::error::AnalysisError;
use crate::features::pitch::viterbi::to_viterbi_cents;
use crate::ml::{ACTIVATION_BINS, PITCH_BINS};

/// Cents value of activation bin 0; bins ascend linearly from here
pub const CENTS_OFFSET: f64 = 1997.379_408_437_619_1;

/// Cents span covered by the 360 bins
pub const CENTS_SPAN: f64 = 7180.0;

/// Half-width of the local averaging window around the peak bin
const LOCAL_WINDOW: usize = 4;

/// Decoding mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeMode {
    /// Independent per-frame weighted-centroid decoding around the peak
    LocalAverage,
    /// Globally path-smoothed decoding across the whole sequence
    Viterbi,
}

/// Cents value of an activation bin
pub fn cents_for_bin(bin: usize) -> f64 {
    CENTS_OFFSET + bin as f64 * CENTS_SPAN / (ACTIVATION_BINS - 1) as f64
}

/// Weighted local average of cents around a center bin
///
/// Uses the salience values in the 9-bin window centered on `center` (clamped
/// at the edges) as weights over the bins' cents values. An all-zero window
/// yields NaN, which downstream maps to frequency 0.
pub fn local_average_cents(salience: ArrayView1<f32>, center: usize) -> f64 {
    let start = center.saturating_sub(LOCAL_WINDOW);
    let end = (center + LOCAL_WINDOW + 1).min(salience.len());

    let mut product_sum = 0.0f64;
    let mut weight_sum = 0.0f64;
    for bin in start..end {
        let w = salience[bin] as f64;
        product_sum += w * cents_for_bin(bin);
        weight_sum += w;
    }

    product_sum / weight_sum
}

/// Index of the maximum salience value in a frame
pub(crate) fn argmax(salience: ArrayView1<f32>) -> usize {
    let mut best = 0usize;
    let mut best_val = f32::NEG_INFINITY;
    for (i, &v) in salience.iter().enumerate() {
        if v > best_val {
            best_val = v;
            best = i;
        }
    }
    best
}

/// Convert cents to frequency in Hz: `10 * 2^(cents/1200)`
///
/// NaN cents map to exactly 0 Hz, the "no pitch" sentinel; this path is not
/// an error.
pub fn cents_to_frequency(cents: f64) -> f32 {
    if cents.is_nan() {
        0.0
    } else {
        (10.0 * (cents / 1200.0).exp2()) as f32
    }
}

/// Decoded pitch sequence
#[derive(Debug, Clone)]
pub struct DecodedPitch {
    /// Cents per frame; NaN marks degenerate frames
    pub cents: Vec<f64>,
    /// Frequency in Hz per frame; 0.0 marks degenerate frames
    pub frequency: Vec<f32>,
    /// Max activation value per frame
    pub confidence: Vec<f32>,
}

/// Decode an activation matrix into cents, frequency and confidence
///
/// # Arguments
///
/// * `activation` - Salience matrix of shape `(frames, 360)`
/// * `mode` - Per-frame local averaging, or Viterbi path smoothing
///
/// # Errors
///
/// Returns `AnalysisError::ShapeMismatch` for non-360-wide input.
pub fn decode(activation: &Array2<f32>, mode: DecodeMode) -> Result<DecodedPitch, AnalysisError> {
    if activation.ncols() != ACTIVATION_BINS {
        return Err(AnalysisError::ShapeMismatch(format!(
            "Expected {} activation bins, got {}",
            ACTIVATION_BINS,
            activation.ncols()
        )));
    }

    let confidence: Vec<f32> = activation
        .outer_iter()
        .map(|row| row.iter().cloned().fold(f32::NEG_INFINITY, f32::max))
        .collect();

    let cents: Vec<f64> = match mode {
        DecodeMode::LocalAverage => activation
            .outer_iter()
            .map(|row| local_average_cents(row, argmax(row)))
            .collect(),
        DecodeMode::Viterbi => to_viterbi_cents(activation),
    };

    let frequency: Vec<f32> = cents.iter().map(|&c| cents_to_frequency(c)).collect();

    Ok(DecodedPitch {
        cents,
        frequency,
        confidence,
    })
}

/// Coarse pitch-class-in-octave estimate per frame
///
/// `(argmax(activation) % 60) / 5` per frame, as a float in `[0, 12)`.
pub fn coarse_pitch_classes(activation: &Array2<f32>) -> Vec<f32> {
    activation
        .outer_iter()
        .map(|row| (argmax(row) % PITCH_BINS) as f32 / 5.0)
        .collect()
}
