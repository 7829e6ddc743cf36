//! # Raga DSP
//!
//! Pitch tracking and tonic/raga classification for recordings of Indian
//! classical music.
//!
//! The pipeline frames raw audio, runs an opaque convolutional pitch model to
//! get per-frame 360-bin activations, decodes those into a pitch track,
//! accumulates pitch-class statistics into a rolled histogram for tonic
//! estimation, aligns the track to the resolved tonic, and classifies the
//! raga with a cardinality-weighted ensemble of nearest-neighbor models.
//!
//! ## Quick start
//!
//! Requires the `ml` feature for the ONNX-backed constructors.
//!
//! ```ignore
//! use raga_dsp::{PitchExtractor, PitchConfig, PredictOptions};
//!
//! let mut extractor = PitchExtractor::from_onnx(
//!     std::path::Path::new("model/pitch-full.onnx"),
//!     PitchConfig::default(),
//! )?;
//!
//! let samples: Vec<f32> = vec![]; // Your audio data
//! let track = extractor.predict(&samples, 44_100, &PredictOptions::default())?;
//!
//! for i in 0..track.len() {
//!     println!("{:.3}s  {:.2} Hz  ({:.2})", track.time[i], track.frequency[i],
//!              track.confidence[i]);
//! }
//! # Ok::<(), raga_dsp::AnalysisError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Audio -> Framer -> Activation Engine -> Decoder (pitch track)
//!                                  \-> 60-bin histogram -> Tonic -> Raga
//! ```
//!
//! Model sessions are heavyweight, loaded once at construction, and not
//! thread-safe; callers must serialize access per instance.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod ml;
pub mod preprocessing;

use std::collections::HashMap;
#[cfg(feature = "ml")]
use std::path::Path;

use ndarray::{Array2, Axis};

// Re-export main types
pub use analysis::result::{PitchTrack, RagaPrediction, TonicEstimate, STANDARD_TONIC};
pub use config::{ModelCapacity, PitchConfig, RotationSampling, TonicConfig, Tradition};
pub use error::AnalysisError;
pub use features::pitch::decoder::DecodeMode;
pub use io::sample_buffer::AudioBuffer;
pub use ml::{ActivationModel, EmbeddingModel};

use features::pitch::{decoder, engine};
use features::raga::{classifier, features as raga_features, knn::KnnModel, load_catalog};
use features::tonic::{histogram, model as tonic_model};
use preprocessing::framing;

/// Options for [`PitchExtractor::predict`]
#[derive(Debug, Clone)]
pub struct PredictOptions {
    /// Apply Viterbi smoothing to the estimated pitch curve (default: false)
    pub viterbi: bool,

    /// Pad the signal so frame `t` is centered at `t * hop_length`
    /// (default: true)
    pub center: bool,

    /// Step size in milliseconds between frames (default: 10)
    pub step_size_ms: u32,

    /// Retain the raw activation matrix on the returned track
    /// (default: false)
    pub keep_activation: bool,
}

impl Default for PredictOptions {
    fn default() -> Self {
        Self {
            viterbi: false,
            center: true,
            step_size_ms: 10,
            keep_activation: false,
        }
    }
}

/// Pitch tracker owning the opaque activation model
///
/// Construction is the only point at which model weights are read; the
/// instance is then reused across many predictions.
pub struct PitchExtractor {
    model: Box<dyn ActivationModel>,
    config: PitchConfig,
}

impl PitchExtractor {
    /// Create an extractor from an already loaded activation model
    pub fn new(model: Box<dyn ActivationModel>, config: PitchConfig) -> Self {
        Self { model, config }
    }

    /// Load the ONNX pitch model and build an extractor; fails fast if the
    /// weight file is missing or invalid
    #[cfg(feature = "ml")]
    pub fn from_onnx(path: &Path, config: PitchConfig) -> Result<Self, AnalysisError> {
        let model = ml::onnx_model::OnnxPitchModel::load(path)?;
        Ok(Self::new(Box::new(model), config))
    }

    /// Load the pitch model matching the configured capacity tier from a
    /// model directory (`pitch-{tier}.onnx`)
    #[cfg(feature = "ml")]
    pub fn from_model_dir(model_dir: &Path, config: PitchConfig) -> Result<Self, AnalysisError> {
        let path = model_dir.join(config.model_capacity.weight_file_name());
        Self::from_onnx(&path, config)
    }

    /// The extractor's pitch configuration
    pub fn config(&self) -> &PitchConfig {
        &self.config
    }

    /// Predict the 60-bin pitch-class histogram ("pitches" tensor) for a
    /// whole recording
    ///
    /// The recording is framed slice by slice (`cutoff` seconds each) so the
    /// model never sees an unbounded batch; activations are concatenated and
    /// aggregated to `(frames, 60)`.
    ///
    /// # Errors
    ///
    /// Propagates framing, shape, and model errors; no retries.
    pub fn predict_pitches(&mut self, audio: &AudioBuffer) -> Result<Array2<f32>, AnalysisError> {
        let mut activations: Vec<Array2<f32>> = Vec::new();
        let mut slice = Some(0usize);

        while let Some(index) = slice {
            let (frames, next) = framing::frames_for_slice(audio, index, &self.config)?;
            if frames.nrows() > 0 {
                activations.push(engine::predict_activation(self.model.as_mut(), &frames)?);
            }
            slice = next;
        }

        if activations.is_empty() {
            return Err(AnalysisError::ProcessingError(
                "Recording produced no analysis frames".to_string(),
            ));
        }

        let views: Vec<_> = activations.iter().map(|a| a.view()).collect();
        let activation = ndarray::concatenate(Axis(0), &views)
            .map_err(|e| AnalysisError::ShapeMismatch(e.to_string()))?;

        engine::aggregate_to_60bin(&activation)
    }

    /// Perform pitch estimation on raw samples
    ///
    /// Samples at rates other than the model's native rate are resampled
    /// first. Returns the per-frame `(time, frequency, pitch_class,
    /// confidence)` track; the raw activation matrix is retained when
    /// `options.keep_activation` is set.
    ///
    /// # Errors
    ///
    /// Propagates resampling, framing, shape, and model errors.
    pub fn predict(
        &mut self,
        samples: &[f32],
        sample_rate: u32,
        options: &PredictOptions,
    ) -> Result<PitchTrack, AnalysisError> {
        if samples.is_empty() {
            return Err(AnalysisError::InvalidInput(
                "Empty audio samples".to_string(),
            ));
        }
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidInput(
                "Invalid sample rate".to_string(),
            ));
        }

        let audio = io::decoder::resample(
            &AudioBuffer::new(samples.to_vec(), sample_rate),
            self.config.sample_rate,
        )?;

        let step_size = options.step_size_ms as f32 / 1000.0;
        let config = PitchConfig {
            step_size,
            ..self.config.clone()
        };

        let frames = if options.center {
            framing::audio_to_frames(&audio, &config)?
        } else {
            framing::audio_to_frames_uncentered(&audio, &config)?
        };

        let activation = engine::predict_activation(self.model.as_mut(), &frames)?;

        let mode = if options.viterbi {
            DecodeMode::Viterbi
        } else {
            DecodeMode::LocalAverage
        };
        let decoded = decoder::decode(&activation, mode)?;
        let pitch_class = decoder::coarse_pitch_classes(&activation);
        let time: Vec<f32> = (0..activation.nrows())
            .map(|t| t as f32 * step_size)
            .collect();

        Ok(PitchTrack {
            time,
            frequency: decoded.frequency,
            pitch_class,
            confidence: decoded.confidence,
            activation: options.keep_activation.then_some(activation),
        })
    }
}

/// Tonic and raga classifier owning the tonic model, the KNN ensemble and
/// the raga catalog for one tradition
pub struct RagaClassifier {
    tonic_model: Box<dyn EmbeddingModel>,
    knn_models: HashMap<usize, KnnModel>,
    catalog: Vec<String>,
    tradition: Tradition,
    tonic_config: TonicConfig,
    pitch_hop: usize,
}

impl RagaClassifier {
    /// Create a classifier from already loaded models
    ///
    /// # Errors
    ///
    /// Fails fast if the ensemble is missing a model for any of the
    /// tradition's keys, if the catalog is empty, or if any KNN model was
    /// trained against a different catalog size.
    pub fn new(
        tonic_model: Box<dyn EmbeddingModel>,
        knn_models: HashMap<usize, KnnModel>,
        catalog: Vec<String>,
        tradition: Tradition,
        tonic_config: TonicConfig,
        pitch_config: &PitchConfig,
    ) -> Result<Self, AnalysisError> {
        if catalog.is_empty() {
            return Err(AnalysisError::InvalidInput(
                "Empty raga catalog".to_string(),
            ));
        }
        for &(key, _) in tradition.ensemble_weights() {
            let model = knn_models.get(&key).ok_or_else(|| {
                AnalysisError::ModelError(format!(
                    "Missing KNN model for ensemble key {} ({:?})",
                    key, tradition
                ))
            })?;
            model.validate()?;
            if model.n_classes != catalog.len() {
                return Err(AnalysisError::ModelError(format!(
                    "KNN model for key {} has {} classes, catalog has {}",
                    key,
                    model.n_classes,
                    catalog.len()
                )));
            }
        }

        Ok(Self {
            tonic_model,
            knn_models,
            catalog,
            tradition,
            tonic_config,
            pitch_hop: pitch_config.hop_length(),
        })
    }

    /// Load all per-tradition resources from a model directory
    ///
    /// Expects `{dir}/{tradition}_tonic_model.onnx`,
    /// `{dir}/{tradition}/knn_{tradition}_{k}.json` per ensemble key, and
    /// `{dir}/{tradition}_targets.csv`. Any missing file is fatal.
    #[cfg(feature = "ml")]
    pub fn from_files(
        model_dir: &Path,
        tradition: Tradition,
        tonic_config: TonicConfig,
        pitch_config: &PitchConfig,
    ) -> Result<Self, AnalysisError> {
        let name = tradition.name();
        let tonic =
            ml::onnx_model::OnnxTonicModel::load(&model_dir.join(format!("{}_tonic_model.onnx", name)))?;

        let mut knn_models = HashMap::new();
        for &(key, _) in tradition.ensemble_weights() {
            let path = model_dir
                .join(name)
                .join(format!("knn_{}_{}.json", name, key));
            knn_models.insert(key, KnnModel::from_file(&path)?);
        }

        let catalog = load_catalog(&model_dir.join(format!("{}_targets.csv", name)))?;

        Self::new(
            Box::new(tonic),
            knn_models,
            catalog,
            tradition,
            tonic_config,
            pitch_config,
        )
    }

    /// The classifier's tradition
    pub fn tradition(&self) -> Tradition {
        self.tradition
    }

    /// The ordered raga catalog
    pub fn catalog(&self) -> &[String] {
        &self.catalog
    }

    /// Classify the tonic and raga of a recording
    ///
    /// # Arguments
    ///
    /// * `audio` - The analyzed signal (used by the tonic histogram builder)
    /// * `pitches` - The `(frames, 60)` pitch-class histogram from
    ///   [`PitchExtractor::predict_pitches`]
    /// * `tonic_override` - Optional pitch-class label (e.g. `"C#"`); skips
    ///   the tonic model when given
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an unknown override label, and propagates
    /// histogram, model, and ensemble errors.
    pub fn predict_tonic_raga(
        &mut self,
        audio: &AudioBuffer,
        pitches: &Array2<f32>,
        tonic_override: Option<&str>,
    ) -> Result<RagaPrediction, AnalysisError> {
        let tonic = match tonic_override {
            Some(label) => TonicEstimate::from_label(label).ok_or_else(|| {
                AnalysisError::InvalidInput(format!("Unknown tonic label '{}'", label))
            })?,
            None => {
                let hist = histogram::build_hist_cqt(audio, pitches, self.pitch_hop)?;
                let dist =
                    tonic_model::decode_tonic(self.tonic_model.as_mut(), &hist, &self.tonic_config)?;
                log::debug!("Tonic prediction complete");
                TonicEstimate {
                    pitch_class: dist.pitch_class(),
                    fine_index: dist.fine_index(),
                }
            }
        };

        // Align the track so pitch class 0 denotes the tonic downstream
        let aligned = raga_features::rotate_pitches(pitches, tonic.fine_index);
        let views = raga_features::build_features(&aligned, self.tradition)?;
        let (raga, _scores) = classifier::classify(
            &views,
            self.tradition.ensemble_weights(),
            &self.knn_models,
            &self.catalog,
        )?;

        Ok(RagaPrediction { tonic, raga })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::ArrayView2;

    /// Synthetic activation model firing on a fixed bin
    struct ConstantBinModel {
        bin: usize,
    }

    impl ActivationModel for ConstantBinModel {
        fn infer(&mut self, frames: ArrayView2<f32>) -> Result<Array2<f32>, AnalysisError> {
            ml::check_frame_batch(&frames)?;
            let mut out = Array2::zeros((frames.nrows(), ml::ACTIVATION_BINS));
            for t in 0..frames.nrows() {
                out[[t, self.bin]] = 1.0;
            }
            Ok(out)
        }
    }

    #[test]
    fn test_predict_pitches_shape() {
        let config = PitchConfig::default();
        let mut extractor =
            PitchExtractor::new(Box::new(ConstantBinModel { bin: 100 }), config.clone());
        let audio = AudioBuffer::new(vec![0.1f32; 16_000], config.sample_rate);
        let pitches = extractor.predict_pitches(&audio).unwrap();
        assert_eq!(pitches.ncols(), 60);
        assert!(pitches.nrows() > 0);
        // bin 100 -> pitch class bin 40 after octave-group collapse
        assert!(pitches[[0, 40]] > 0.0);
    }

    #[test]
    fn test_predict_rejects_empty_input() {
        let mut extractor = PitchExtractor::new(
            Box::new(ConstantBinModel { bin: 0 }),
            PitchConfig::default(),
        );
        assert!(extractor
            .predict(&[], 16_000, &PredictOptions::default())
            .is_err());
        assert!(extractor
            .predict(&[0.0; 2048], 0, &PredictOptions::default())
            .is_err());
    }

    #[test]
    fn test_classifier_construction_requires_all_keys() {
        struct NullTonic;
        impl EmbeddingModel for NullTonic {
            fn infer(&mut self, views: ArrayView2<f32>) -> Result<Array2<f32>, AnalysisError> {
                Ok(Array2::zeros((views.nrows(), ml::PITCH_BINS)))
            }
        }

        let result = RagaClassifier::new(
            Box::new(NullTonic),
            HashMap::new(),
            vec!["Yaman".to_string()],
            Tradition::Hindustani,
            TonicConfig::default(),
            &PitchConfig::default(),
        );
        match result {
            Err(AnalysisError::ModelError(_)) => {}
            other => panic!(
                "expected ModelError for missing ensemble, got {:?}",
                other.map(|_| ())
            ),
        }
    }
}
