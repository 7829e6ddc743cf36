//! ONNX model loading and inference
//!
//! Graph I/O contract:
//! - pitch model: input `frames` of shape `(N, 1024)`, output `activation`
//!   of shape `(N, 360)`
//! - tonic model: input `hist_cqt` of shape `(N, 240)`, output `tonic_logits`
//!   of shape `(N, 60)`

use std::path::Path;

use ndarray::{Array2, ArrayView2};
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::Value,
};

use crate::error::AnalysisError;
use crate::ml::{
    check_frame_batch, check_view_batch, ActivationModel, EmbeddingModel, ACTIVATION_BINS,
    PITCH_BINS,
};

fn build_session(path: &Path) -> Result<Session, AnalysisError> {
    log::debug!("Loading ONNX model from: {}", path.display());
    Session::builder()
        .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
        .and_then(|b| b.with_intra_threads(1))
        .and_then(|b| b.commit_from_file(path))
        .map_err(|e| AnalysisError::ModelError(format!("{}: {}", path.display(), e)))
}

fn run_2d(
    session: &mut Session,
    input_name: &str,
    output_name: &str,
    batch: ArrayView2<f32>,
    out_cols: usize,
) -> Result<Array2<f32>, AnalysisError> {
    let n_rows = batch.nrows();
    let value = Value::from_array(batch.to_owned())
        .map_err(|e| AnalysisError::ModelError(format!("Input tensor build failed: {}", e)))?;

    let outputs = session
        .run(ort::inputs![input_name => value])
        .map_err(|e| AnalysisError::ModelError(format!("Inference failed: {}", e)))?;

    let (_, data) = outputs[output_name]
        .try_extract_tensor::<f32>()
        .map_err(|e| AnalysisError::ModelError(format!("Output extraction failed: {}", e)))?;

    if data.len() != n_rows * out_cols {
        return Err(AnalysisError::ShapeMismatch(format!(
            "Model output has {} values, expected {}x{}",
            data.len(),
            n_rows,
            out_cols
        )));
    }

    Array2::from_shape_vec((n_rows, out_cols), data.to_vec())
        .map_err(|e| AnalysisError::ShapeMismatch(e.to_string()))
}

/// ONNX-backed convolutional pitch model
#[derive(Debug)]
pub struct OnnxPitchModel {
    session: Session,
}

impl OnnxPitchModel {
    /// Load the pitch model weights; fatal if the file is missing or invalid
    pub fn load(path: &Path) -> Result<Self, AnalysisError> {
        Ok(Self {
            session: build_session(path)?,
        })
    }
}

impl ActivationModel for OnnxPitchModel {
    fn infer(&mut self, frames: ArrayView2<f32>) -> Result<Array2<f32>, AnalysisError> {
        check_frame_batch(&frames)?;
        run_2d(
            &mut self.session,
            "frames",
            "activation",
            frames,
            ACTIVATION_BINS,
        )
    }
}

/// ONNX-backed tonic embedding model
#[derive(Debug)]
pub struct OnnxTonicModel {
    session: Session,
}

impl OnnxTonicModel {
    /// Load the tonic model weights; fatal if the file is missing or invalid
    pub fn load(path: &Path) -> Result<Self, AnalysisError> {
        Ok(Self {
            session: build_session(path)?,
        })
    }
}

impl EmbeddingModel for OnnxTonicModel {
    fn infer(&mut self, views: ArrayView2<f32>) -> Result<Array2<f32>, AnalysisError> {
        check_view_batch(&views)?;
        run_2d(
            &mut self.session,
            "hist_cqt",
            "tonic_logits",
            views,
            PITCH_BINS,
        )
    }
}
