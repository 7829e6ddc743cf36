//! Rotation-augmented tonic decoding
//!
//! The tonic network was trained with random circular-rotation augmentation,
//! and its inference averages predictions over rotated histogram views: each
//! call samples K offsets, rolls the histogram rows by each offset, embeds
//! every rolled view, un-rotates each 60-bin prediction back to the common
//! frame and averages. Offset sampling is configurable between fresh entropy
//! (the original behavior, non-reproducible run-to-run) and a fixed seed.

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{RotationSampling, TonicConfig};
use crate::error::AnalysisError;
use crate::ml::{EmbeddingModel, HIST_CQT_COLS, PITCH_BINS};

/// Roll histogram rows down by `offset` (row `i` takes row `(i + offset) % 60`)
fn roll_rows(hist: &Array2<f32>, offset: usize) -> Array2<f32> {
    let n = hist.nrows();
    let mut rolled = Array2::zeros(hist.raw_dim());
    for i in 0..n {
        let src = (i + offset) % n;
        for c in 0..hist.ncols() {
            rolled[[i, c]] = hist[[src, c]];
        }
    }
    rolled
}

/// Roll a prediction vector up by `offset` (index `i` takes `(i - offset) % 60`),
/// undoing [`roll_rows`]
fn unroll(prediction: &[f32], offset: usize) -> Vec<f32> {
    let n = prediction.len();
    (0..n)
        .map(|i| prediction[(i + n - offset % n) % n])
        .collect()
}

/// Fold a 60-bin distribution to 12 pitch classes by summing contiguous
/// groups of 5 bins
pub fn fold_to_12(distribution: &[f32]) -> Result<[f32; 12], AnalysisError> {
    if distribution.len() != PITCH_BINS {
        return Err(AnalysisError::ShapeMismatch(format!(
            "Expected {} bins to fold, got {}",
            PITCH_BINS,
            distribution.len()
        )));
    }
    let mut folded = [0.0f32; 12];
    for (i, &v) in distribution.iter().enumerate() {
        folded[i / 5] += v;
    }
    Ok(folded)
}

/// Index of the maximum value (ties resolve to the first)
pub(crate) fn argmax_f32(values: &[f32]) -> usize {
    let mut best = 0usize;
    let mut best_val = f32::NEG_INFINITY;
    for (i, &v) in values.iter().enumerate() {
        if v > best_val {
            best_val = v;
            best = i;
        }
    }
    best
}

/// Decoded tonic distribution
#[derive(Debug, Clone)]
pub struct TonicDistribution {
    /// Averaged 60-bin probability vector
    pub bins: Array1<f32>,
}

impl TonicDistribution {
    /// Fine-grained 60-bin tonic index
    pub fn fine_index(&self) -> usize {
        let mut best = 0usize;
        let mut best_val = f32::NEG_INFINITY;
        for (i, &v) in self.bins.iter().enumerate() {
            if v > best_val {
                best_val = v;
                best = i;
            }
        }
        best
    }

    /// Coarse pitch class from the folded 12-bin distribution
    pub fn pitch_class(&self) -> usize {
        let mut folded = [0.0f32; 12];
        for (i, &v) in self.bins.iter().enumerate() {
            folded[(i / 5) % 12] += v;
        }
        argmax_f32(&folded)
    }
}

/// Run rotation-augmented tonic inference over a `(60, 4)` histogram
///
/// # Arguments
///
/// * `model` - Loaded tonic embedding model (exclusive access)
/// * `hist_cqt` - Histogram from [`super::histogram::build_hist_cqt`]
/// * `config` - Rotation count and offset sampling policy
///
/// # Errors
///
/// Returns `AnalysisError::ShapeMismatch` for a malformed histogram or model
/// output, `InvalidInput` for a zero rotation count, or a backend
/// `ModelError`.
pub fn decode_tonic(
    model: &mut dyn EmbeddingModel,
    hist_cqt: &Array2<f32>,
    config: &TonicConfig,
) -> Result<TonicDistribution, AnalysisError> {
    if hist_cqt.dim() != (PITCH_BINS, HIST_CQT_COLS) {
        return Err(AnalysisError::ShapeMismatch(format!(
            "Expected {}x{} hist_cqt, got {}x{}",
            PITCH_BINS,
            HIST_CQT_COLS,
            hist_cqt.nrows(),
            hist_cqt.ncols()
        )));
    }
    if config.rotations == 0 {
        return Err(AnalysisError::InvalidInput(
            "Rotation count must be non-zero".to_string(),
        ));
    }

    let mut rng = match config.sampling {
        RotationSampling::Fresh => StdRng::from_entropy(),
        RotationSampling::Seeded(seed) => StdRng::seed_from_u64(seed),
    };
    let offsets: Vec<usize> = (0..config.rotations)
        .map(|_| rng.gen_range(0..PITCH_BINS))
        .collect();

    log::debug!("Tonic rotation offsets: {:?}", offsets);

    // One flattened (60*4) row per rotated view
    let mut views = Array2::zeros((config.rotations, PITCH_BINS * HIST_CQT_COLS));
    for (v, &offset) in offsets.iter().enumerate() {
        let rolled = roll_rows(hist_cqt, offset);
        for (i, &x) in rolled.iter().enumerate() {
            views[[v, i]] = x;
        }
    }

    let predictions = model.infer(views.view())?;
    if predictions.dim() != (config.rotations, PITCH_BINS) {
        return Err(AnalysisError::ShapeMismatch(format!(
            "Tonic model returned {}x{}, expected {}x{}",
            predictions.nrows(),
            predictions.ncols(),
            config.rotations,
            PITCH_BINS
        )));
    }

    // Un-rotate each prediction back to the common frame and average
    let mut averaged = vec![0.0f32; PITCH_BINS];
    for (row, &offset) in predictions.outer_iter().zip(offsets.iter()) {
        let row: Vec<f32> = row.iter().cloned().collect();
        let unrolled = unroll(&row, offset);
        for (dst, v) in averaged.iter_mut().zip(unrolled.iter()) {
            *dst += v / config.rotations as f32;
        }
    }

    Ok(TonicDistribution {
        bins: Array1::from_vec(averaged),
    })
}
