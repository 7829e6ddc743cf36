//! Raga feature ensemble and classification
//!
//! - Feature builder: per-key engineered views of the tonic-aligned pitch
//!   track (global histogram, fixed-interval comparisons, exhaustive
//!   minus-self comparisons)
//! - KNN models: pre-trained nearest-neighbor probability estimators, one per
//!   ensemble key
//! - Classifier: cardinality-weighted vote over the ensemble

pub mod classifier;
pub mod features;
pub mod knn;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::AnalysisError;

/// Load an ordered raga catalog from a delimited text resource
///
/// One raga per line; only the first delimited field is the label. The
/// catalog's line order defines the class indices the KNN models were trained
/// against, so it must not be sorted or deduplicated.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if the file is unreadable or yields
/// no labels; construction-time callers treat this as fatal.
pub fn load_catalog(path: &Path) -> Result<Vec<String>, AnalysisError> {
    let file = File::open(path)
        .map_err(|e| AnalysisError::InvalidInput(format!("{}: {}", path.display(), e)))?;

    let mut catalog = Vec::new();
    for line in BufReader::new(file).lines() {
        let line =
            line.map_err(|e| AnalysisError::InvalidInput(format!("{}: {}", path.display(), e)))?;
        let label = line.split(',').next().unwrap_or("").trim();
        if !label.is_empty() {
            catalog.push(label.to_string());
        }
    }

    if catalog.is_empty() {
        return Err(AnalysisError::InvalidInput(format!(
            "Empty raga catalog: {}",
            path.display()
        )));
    }

    log::debug!("Loaded {} raga labels from {}", catalog.len(), path.display());
    Ok(catalog)
}
