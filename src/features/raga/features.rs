//! Ensemble feature views over the tonic-aligned pitch track
//!
//! Every view is derived from the `(frames, 60)` pitch-class histogram after
//! tonic alignment (class 0 = tonic). The per-key scheme is fixed and
//! tradition-tuned:
//!
//! - `k == 0`: global histogram, shape `(12, 60, 2)`
//! - `0 < k < 12`: fixed-interval comparison — for each of the 12 rotations
//!   `t`, the pairwise slice `[t, (t + k) % 12]`, shape `(12, 60, 2)`
//! - `k >= 12`: exhaustive-minus-self comparison at base class `b = k - 12`
//!   — all pairwise slices `[b, j]` with `j != b` concatenated, shape
//!   `(11, 60, 2)`
//!
//! The pairwise tensor scores transitions between dwelled-on pitch classes:
//! entry `[i, j]` accumulates the mean salience profiles of consecutive
//! class-`i` and class-`j` segments of the track.

use std::collections::HashMap;

use ndarray::{Array2, Array3, Array4, Axis};

use crate::config::Tradition;
use crate::error::AnalysisError;
use crate::ml::PITCH_BINS;

/// Coarse pitch classes (60 bins / 5 sub-bins)
const COARSE_CLASSES: usize = 12;

/// Channels per feature cell: segment-entry profile and segment-exit profile
const FEATURE_CHANNELS: usize = 2;

/// Rotate the pitch track along its pitch-class axis so the given 60-bin
/// index becomes bin 0 (tonic alignment)
pub fn rotate_pitches(pitches: &Array2<f32>, fine_index: usize) -> Array2<f32> {
    let n = pitches.ncols();
    let mut rotated = Array2::zeros(pitches.raw_dim());
    for (t, row) in pitches.outer_iter().enumerate() {
        for b in 0..n {
            rotated[[t, b]] = row[(b + fine_index) % n];
        }
    }
    rotated
}

fn check_pitches(pitches: &Array2<f32>) -> Result<(), AnalysisError> {
    if pitches.ncols() != PITCH_BINS {
        return Err(AnalysisError::ShapeMismatch(format!(
            "Expected {} pitch bins, got {}",
            PITCH_BINS,
            pitches.ncols()
        )));
    }
    if pitches.nrows() == 0 {
        return Err(AnalysisError::InvalidInput("Empty pitch track".to_string()));
    }
    Ok(())
}

/// Dominant coarse class per frame
fn dominant_classes(pitches: &Array2<f32>) -> Vec<usize> {
    pitches
        .outer_iter()
        .map(|row| {
            let mut best = 0usize;
            let mut best_val = f32::NEG_INFINITY;
            for (b, &v) in row.iter().enumerate() {
                if v > best_val {
                    best_val = v;
                    best = b;
                }
            }
            best / 5
        })
        .collect()
}

/// Run-length segments of the dominant-class sequence with each segment's
/// mean 60-bin salience profile
fn class_segments(pitches: &Array2<f32>, classes: &[usize]) -> Vec<(usize, Vec<f32>)> {
    let mut segments = Vec::new();
    let mut start = 0usize;

    for t in 1..=classes.len() {
        if t == classes.len() || classes[t] != classes[start] {
            let len = (t - start) as f32;
            let mut profile = vec![0.0f32; PITCH_BINS];
            for row in pitches.axis_iter(Axis(0)).skip(start).take(t - start) {
                for (dst, &v) in profile.iter_mut().zip(row.iter()) {
                    *dst += v / len;
                }
            }
            segments.push((classes[start], profile));
            start = t;
        }
    }

    segments
}

/// Global histogram feature (`k == 0`), shape `(12, 60, 2)`
///
/// Channel 0: salience summed over all frames whose dominant class is the
/// row's class. Channel 1: the per-frame mean of the same.
pub fn global_histogram(pitches: &Array2<f32>) -> Result<Array3<f32>, AnalysisError> {
    check_pitches(pitches)?;

    let classes = dominant_classes(pitches);
    let mut feat = Array3::zeros((COARSE_CLASSES, PITCH_BINS, FEATURE_CHANNELS));
    let mut counts = [0usize; COARSE_CLASSES];

    for (row, &class) in pitches.outer_iter().zip(classes.iter()) {
        counts[class] += 1;
        for (b, &v) in row.iter().enumerate() {
            feat[[class, b, 0]] += v;
        }
    }

    for class in 0..COARSE_CLASSES {
        if counts[class] > 0 {
            for b in 0..PITCH_BINS {
                feat[[class, b, 1]] = feat[[class, b, 0]] / counts[class] as f32;
            }
        }
    }

    Ok(feat)
}

/// Pairwise transition tensor, shape `(12, 12, 60, 2)`
///
/// For every pair of consecutive dominant-class segments `i -> j` with
/// `i != j`, cell `[i, j]` accumulates the class-`i` segment's mean profile
/// in channel 0 and the class-`j` segment's in channel 1.
pub fn pairwise_transition_tensor(pitches: &Array2<f32>) -> Result<Array4<f32>, AnalysisError> {
    check_pitches(pitches)?;

    let classes = dominant_classes(pitches);
    let segments = class_segments(pitches, &classes);

    let mut feat = Array4::zeros((COARSE_CLASSES, COARSE_CLASSES, PITCH_BINS, FEATURE_CHANNELS));

    for pair in segments.windows(2) {
        let (from, from_profile) = (&pair[0].0, &pair[0].1);
        let (to, to_profile) = (&pair[1].0, &pair[1].1);
        if from == to {
            continue;
        }
        for b in 0..PITCH_BINS {
            feat[[*from, *to, b, 0]] += from_profile[b];
            feat[[*from, *to, b, 1]] += to_profile[b];
        }
    }

    Ok(feat)
}

/// Build the feature view for one ensemble key
///
/// See the module docs for the key scheme. Keys must lie in `0..24`.
pub fn build_feature_view(
    pitches: &Array2<f32>,
    key: usize,
) -> Result<Array3<f32>, AnalysisError> {
    if key >= 2 * COARSE_CLASSES {
        return Err(AnalysisError::InvalidInput(format!(
            "Ensemble key {} out of range 0..24",
            key
        )));
    }

    if key == 0 {
        return global_histogram(pitches);
    }

    let tensor = pairwise_transition_tensor(pitches)?;

    if key < COARSE_CLASSES {
        // Fixed interval: each class against the one `key` semitones above,
        // across all 12 rotations.
        let mut view = Array3::zeros((COARSE_CLASSES, PITCH_BINS, FEATURE_CHANNELS));
        for t in 0..COARSE_CLASSES {
            let partner = (t + key) % COARSE_CLASSES;
            for b in 0..PITCH_BINS {
                for c in 0..FEATURE_CHANNELS {
                    view[[t, b, c]] = tensor[[t, partner, b, c]];
                }
            }
        }
        Ok(view)
    } else {
        // Exhaustive minus self: base class against every other class; the
        // trivial diagonal row never appears.
        let base = key - COARSE_CLASSES;
        let mut view = Array3::zeros((COARSE_CLASSES - 1, PITCH_BINS, FEATURE_CHANNELS));
        let mut row = 0usize;
        for j in 0..COARSE_CLASSES {
            if j == base {
                continue;
            }
            for b in 0..PITCH_BINS {
                for c in 0..FEATURE_CHANNELS {
                    view[[row, b, c]] = tensor[[base, j, b, c]];
                }
            }
            row += 1;
        }
        Ok(view)
    }
}

/// Build every feature view of a tradition's ensemble
///
/// The pairwise tensor is shared across keys, so views are cheap once it is
/// built.
pub fn build_features(
    pitches: &Array2<f32>,
    tradition: Tradition,
) -> Result<HashMap<usize, Array3<f32>>, AnalysisError> {
    check_pitches(pitches)?;

    let mut views = HashMap::new();
    for &(key, _) in tradition.ensemble_weights() {
        views.insert(key, build_feature_view(pitches, key)?);
    }

    log::debug!(
        "Built {} ensemble feature views for {:?}",
        views.len(),
        tradition
    );

    Ok(views)
}
