//! Nearest-neighbor probability models
//!
//! Each ensemble key owns a pre-trained K-nearest-neighbor classifier over
//! flattened feature views. Models are stored as JSON (training vectors,
//! class labels, neighbor count) and loaded once at construction time.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Pre-trained KNN probability estimator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnnModel {
    /// Number of neighbors consulted per query
    pub n_neighbors: usize,

    /// Number of classes in the catalog the model was trained against
    pub n_classes: usize,

    /// Training vectors, all of equal dimension
    pub samples: Vec<Vec<f32>>,

    /// Class label per training vector
    pub labels: Vec<usize>,
}

impl KnnModel {
    /// Load a model from a JSON file; fatal if missing or malformed
    pub fn from_file(path: &Path) -> Result<Self, AnalysisError> {
        log::debug!("Loading KNN model from: {}", path.display());
        let file = File::open(path)
            .map_err(|e| AnalysisError::ModelError(format!("{}: {}", path.display(), e)))?;
        let model: KnnModel = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| AnalysisError::ModelError(format!("{}: {}", path.display(), e)))?;
        model.validate()?;
        Ok(model)
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.n_neighbors == 0 {
            return Err(AnalysisError::ModelError(
                "KNN model has zero neighbors".to_string(),
            ));
        }
        if self.samples.is_empty() {
            return Err(AnalysisError::ModelError(
                "KNN model has no training samples".to_string(),
            ));
        }
        if self.samples.len() != self.labels.len() {
            return Err(AnalysisError::ModelError(format!(
                "KNN model has {} samples but {} labels",
                self.samples.len(),
                self.labels.len()
            )));
        }
        let dim = self.samples[0].len();
        if self.samples.iter().any(|s| s.len() != dim) {
            return Err(AnalysisError::ModelError(
                "KNN training vectors have inconsistent dimensions".to_string(),
            ));
        }
        if let Some(&label) = self.labels.iter().find(|&&l| l >= self.n_classes) {
            return Err(AnalysisError::ModelError(format!(
                "KNN label {} out of range for {} classes",
                label, self.n_classes
            )));
        }
        Ok(())
    }

    /// Class-probability vector for a query: the fraction of the K nearest
    /// training vectors (Euclidean distance, uniform weights) per class
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::ShapeMismatch` if the query dimension differs
    /// from the training dimension.
    pub fn predict_proba(&self, query: &[f32]) -> Result<Vec<f32>, AnalysisError> {
        let dim = self.samples[0].len();
        if query.len() != dim {
            return Err(AnalysisError::ShapeMismatch(format!(
                "Query has {} features, model trained on {}",
                query.len(),
                dim
            )));
        }

        let mut distances: Vec<(f32, usize)> = self
            .samples
            .iter()
            .zip(self.labels.iter())
            .map(|(sample, &label)| {
                let d2: f32 = sample
                    .iter()
                    .zip(query.iter())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum();
                (d2, label)
            })
            .collect();

        let k = self.n_neighbors.min(distances.len());
        distances.select_nth_unstable_by(k - 1, |a, b| {
            a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut proba = vec![0.0f32; self.n_classes];
        for &(_, label) in distances.iter().take(k) {
            proba[label] += 1.0 / k as f32;
        }

        Ok(proba)
    }
}
