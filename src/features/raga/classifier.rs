//! Cardinality-weighted raga ensemble vote
//!
//! Each ensemble member scores the catalog independently from its own feature
//! view; member votes are scaled by fixed integer weights reflecting each
//! view's believed discriminative reliability, summed, and resolved by
//! argmax. The summed vector is deliberately not renormalized: argmax is
//! invariant to uniform scaling, and the per-key weighting is the point.

use std::collections::HashMap;

use ndarray::Array3;
use rayon::prelude::*;

use crate::error::AnalysisError;
use crate::features::raga::knn::KnnModel;

/// Score the ensemble and select a raga label
///
/// # Arguments
///
/// * `feature_views` - Per-key feature tensors from
///   [`super::features::build_features`]
/// * `ensemble_weights` - Fixed `(key, weight)` pairs for the tradition
/// * `knn_models` - Pre-trained probability model per key
/// * `catalog` - Ordered raga labels; class indices resolve into this list
///
/// # Returns
///
/// The winning catalog label and the summed weighted probability vector.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if a key lacks a view or a model, or
/// `ShapeMismatch`/`ModelError` from the per-key estimators.
pub fn classify(
    feature_views: &HashMap<usize, Array3<f32>>,
    ensemble_weights: &[(usize, u32)],
    knn_models: &HashMap<usize, KnnModel>,
    catalog: &[String],
) -> Result<(String, Vec<f32>), AnalysisError> {
    if catalog.is_empty() {
        return Err(AnalysisError::InvalidInput(
            "Empty raga catalog".to_string(),
        ));
    }
    if ensemble_weights.is_empty() {
        return Err(AnalysisError::InvalidInput(
            "Empty ensemble weight table".to_string(),
        ));
    }

    // Member scoring is independent per key
    let per_key: Vec<Vec<f32>> = ensemble_weights
        .par_iter()
        .map(|&(key, weight)| {
            let view = feature_views.get(&key).ok_or_else(|| {
                AnalysisError::InvalidInput(format!("No feature view for ensemble key {}", key))
            })?;
            let model = knn_models.get(&key).ok_or_else(|| {
                AnalysisError::InvalidInput(format!("No KNN model for ensemble key {}", key))
            })?;

            let flat: Vec<f32> = view.iter().cloned().collect();
            let proba = model.predict_proba(&flat)?;
            if proba.len() != catalog.len() {
                return Err(AnalysisError::ShapeMismatch(format!(
                    "KNN model for key {} scores {} classes, catalog has {}",
                    key,
                    proba.len(),
                    catalog.len()
                )));
            }

            Ok(proba.into_iter().map(|p| p * weight as f32).collect())
        })
        .collect::<Result<_, AnalysisError>>()?;

    let mut summed = vec![0.0f32; catalog.len()];
    for proba in per_key {
        for (dst, p) in summed.iter_mut().zip(proba.iter()) {
            *dst += p;
        }
    }

    let mut best = 0usize;
    let mut best_val = f32::NEG_INFINITY;
    for (i, &v) in summed.iter().enumerate() {
        if v > best_val {
            best_val = v;
            best = i;
        }
    }

    log::debug!(
        "Raga ensemble vote: winner '{}' with score {:.4}",
        catalog[best],
        best_val
    );

    Ok((catalog[best].clone(), summed))
}
