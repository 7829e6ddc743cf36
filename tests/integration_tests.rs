//! Integration tests for the pitch and raga pipeline
//!
//! Model weights are not shipped with the repository, so these tests drive
//! the full pipeline through synthetic stand-ins: an autocorrelation-based
//! activation model for pitch, and a histogram-peak model for tonic. The
//! stand-ins honor the same tensor contracts as the ONNX sessions.

use std::collections::HashMap;
use std::f32::consts::PI;

use ndarray::{Array2, ArrayView2};

use raga_dsp::features::raga::knn::KnnModel;
use raga_dsp::{
    ActivationModel, AnalysisError, AudioBuffer, EmbeddingModel, PitchConfig, PitchExtractor,
    PredictOptions, RagaClassifier, RotationSampling, TonicConfig, Tradition,
};

const FRAME_WIDTH: usize = 1024;
const ACTIVATION_BINS: usize = 360;
const PITCH_BINS: usize = 60;
const HIST_COLS: usize = 4;
const SAMPLE_RATE: u32 = 16_000;

/// Cents position of activation bin `i`
fn cents_for_bin(bin: usize) -> f64 {
    1997.379_408_437_619_1 + bin as f64 * 7180.0 / 359.0
}

/// Synthetic pitch model: estimates f0 per frame by parabolic-interpolated
/// autocorrelation and emits a Gaussian salience bump at the matching bin.
/// Near-silent frames produce an all-zero activation row.
struct AutocorrPitchModel;

impl AutocorrPitchModel {
    fn frame_f0(frame: &[f32]) -> Option<f64> {
        let peak = frame.iter().fold(0.0f32, |m, &v| m.max(v.abs()));
        if peak < 1e-6 {
            return None;
        }

        // Lags spanning roughly 40..800 Hz at 16 kHz
        let min_lag = 20usize;
        let max_lag = 400usize;
        let corr: Vec<f64> = (min_lag - 1..=max_lag + 1)
            .map(|lag| {
                frame[..FRAME_WIDTH - lag]
                    .iter()
                    .zip(&frame[lag..])
                    .map(|(&a, &b)| a as f64 * b as f64)
                    .sum()
            })
            .collect();

        let mut best = 1usize;
        for i in 1..corr.len() - 1 {
            if corr[i] > corr[best] {
                best = i;
            }
        }

        let (a, b, c) = (corr[best - 1], corr[best], corr[best + 1]);
        let denom = a - 2.0 * b + c;
        let delta = if denom.abs() > 1e-12 {
            0.5 * (a - c) / denom
        } else {
            0.0
        };
        let lag = (min_lag - 1 + best) as f64 + delta;
        Some(SAMPLE_RATE as f64 / lag)
    }
}

impl ActivationModel for AutocorrPitchModel {
    fn infer(&mut self, frames: ArrayView2<f32>) -> Result<Array2<f32>, AnalysisError> {
        let mut out = Array2::zeros((frames.nrows(), ACTIVATION_BINS));
        for (t, frame) in frames.outer_iter().enumerate() {
            let frame: Vec<f32> = frame.iter().cloned().collect();
            let Some(f0) = Self::frame_f0(&frame) else {
                continue;
            };

            let cents = 1200.0 * (f0 / 10.0).log2();
            let bin = ((cents - cents_for_bin(0)) * 359.0 / 7180.0).round();
            if !(0.0..ACTIVATION_BINS as f64).contains(&bin) {
                continue;
            }
            let bin = bin as i64;
            for d in -4i64..=4 {
                let i = bin + d;
                if (0..ACTIVATION_BINS as i64).contains(&i) {
                    out[[t, i as usize]] = (-(d * d) as f32 / 4.5).exp();
                }
            }
        }
        Ok(out)
    }
}

/// Synthetic tonic model: fires on the bin holding the rolled histogram's
/// first-column maximum, matching the rotation applied to its input.
struct HistPeakTonicModel;

impl EmbeddingModel for HistPeakTonicModel {
    fn infer(&mut self, views: ArrayView2<f32>) -> Result<Array2<f32>, AnalysisError> {
        let mut out = Array2::zeros((views.nrows(), PITCH_BINS));
        for (v, view) in views.outer_iter().enumerate() {
            let mut best = 0usize;
            let mut best_val = f32::NEG_INFINITY;
            for b in 0..PITCH_BINS {
                let x = view[b * HIST_COLS];
                if x > best_val {
                    best_val = x;
                    best = b;
                }
            }
            out[[v, best]] = 1.0;
        }
        Ok(out)
    }
}

fn sine(frequency: f32, seconds: f32) -> Vec<f32> {
    let n = (seconds * SAMPLE_RATE as f32) as usize;
    (0..n)
        .map(|i| (2.0 * PI * frequency * i as f32 / SAMPLE_RATE as f32).sin() * 0.5)
        .collect()
}

/// Two-class KNN stub whose zero-vector class always wins for small-valued
/// queries
fn stub_knn(dim: usize) -> KnnModel {
    KnnModel {
        n_neighbors: 1,
        n_classes: 2,
        samples: vec![vec![0.0; dim], vec![1000.0; dim]],
        labels: vec![0, 1],
    }
}

/// KNN ensemble with the correct per-key flattened view dimension
fn stub_ensemble(tradition: Tradition) -> HashMap<usize, KnnModel> {
    tradition
        .ensemble_weights()
        .iter()
        .map(|&(key, _)| {
            let rows = if key >= 12 { 11 } else { 12 };
            (key, stub_knn(rows * PITCH_BINS * 2))
        })
        .collect()
}

/// Pitch histogram dwelling on fine bins in fixed blocks; bin 25 dominates
fn synthetic_pitches(frames: usize) -> Array2<f32> {
    let blocks = [25usize, 35, 25, 45, 25, 35];
    let mut pitches = Array2::zeros((frames, PITCH_BINS));
    for t in 0..frames {
        let bin = blocks[(t / 20) % blocks.len()];
        pitches[[t, bin]] = 1.0;
    }
    pitches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_sine_pitch_tracking() {
        init_logging();
        let samples = sine(440.0, 1.0);
        let mut extractor =
            PitchExtractor::new(Box::new(AutocorrPitchModel), PitchConfig::default());

        let track = extractor
            .predict(&samples, SAMPLE_RATE, &PredictOptions::default())
            .expect("Prediction should succeed");

        // 1 s at a 10 ms hop with centering
        assert_eq!(track.len(), 101);

        let voiced: Vec<f32> = track
            .frequency
            .iter()
            .cloned()
            .filter(|&f| f > 0.0)
            .collect();
        assert!(voiced.len() > 90, "most frames should be voiced");

        let mean = voiced.iter().sum::<f32>() / voiced.len() as f32;
        assert!(
            (mean - 440.0).abs() < 440.0 * 0.02,
            "mean frequency {} should be within 2% of 440 Hz",
            mean
        );

        let mean_confidence =
            track.confidence.iter().sum::<f32>() / track.confidence.len() as f32;
        assert!(mean_confidence > 0.8);
    }

    #[test]
    fn test_sine_pitch_tracking_viterbi() {
        let samples = sine(440.0, 1.0);
        let mut extractor =
            PitchExtractor::new(Box::new(AutocorrPitchModel), PitchConfig::default());

        let options = PredictOptions {
            viterbi: true,
            ..PredictOptions::default()
        };
        let track = extractor
            .predict(&samples, SAMPLE_RATE, &options)
            .expect("Viterbi prediction should succeed");

        let voiced: Vec<f32> = track
            .frequency
            .iter()
            .cloned()
            .filter(|&f| f > 0.0)
            .collect();
        let mean = voiced.iter().sum::<f32>() / voiced.len() as f32;
        assert!((mean - 440.0).abs() < 440.0 * 0.02);
    }

    #[test]
    fn test_silence_is_unvoiced() {
        let samples = vec![0.0f32; SAMPLE_RATE as usize];
        let mut extractor =
            PitchExtractor::new(Box::new(AutocorrPitchModel), PitchConfig::default());

        let track = extractor
            .predict(&samples, SAMPLE_RATE, &PredictOptions::default())
            .expect("Silence should not panic");

        assert!(track.frequency.iter().all(|&f| f == 0.0));
        assert!(track.confidence.iter().all(|&c| c == 0.0));
    }

    #[test]
    fn test_resampled_input_matches_native() {
        // The same tone delivered at 44.1 kHz should land on the same pitch
        let n = (44_100.0f32 * 1.0) as usize;
        let samples: Vec<f32> = (0..n)
            .map(|i| (2.0 * PI * 440.0 * i as f32 / 44_100.0).sin() * 0.5)
            .collect();

        let mut extractor =
            PitchExtractor::new(Box::new(AutocorrPitchModel), PitchConfig::default());
        let track = extractor
            .predict(&samples, 44_100, &PredictOptions::default())
            .expect("Resampled prediction should succeed");

        let voiced: Vec<f32> = track
            .frequency
            .iter()
            .cloned()
            .filter(|&f| f > 0.0)
            .collect();
        assert!(!voiced.is_empty());
        let mean = voiced.iter().sum::<f32>() / voiced.len() as f32;
        assert!((mean - 440.0).abs() < 440.0 * 0.02);
    }

    #[test]
    fn test_keep_activation() {
        let samples = sine(440.0, 0.5);
        let mut extractor =
            PitchExtractor::new(Box::new(AutocorrPitchModel), PitchConfig::default());

        let options = PredictOptions {
            keep_activation: true,
            ..PredictOptions::default()
        };
        let track = extractor.predict(&samples, SAMPLE_RATE, &options).unwrap();
        let activation = track.activation.as_ref().expect("activation retained");
        assert_eq!(activation.nrows(), track.len());
        assert_eq!(activation.ncols(), 360);
    }

    #[test]
    fn test_decode_wav_file_end_to_end() {
        init_logging();

        let dir = std::env::temp_dir().join("raga_dsp_wav_fixture");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("tone_440.wav");

        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 22_050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        let amplitude = 0.4 * i16::MAX as f32;
        for i in 0..22_050u32 {
            let s = ((2.0 * PI * 440.0 * i as f32 / 22_050.0).sin() * amplitude) as i16;
            writer.write_sample(s).unwrap();
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();

        let audio = raga_dsp::io::decoder::decode_audio(&path).expect("WAV decode should succeed");
        assert_eq!(audio.sample_rate, 22_050);
        assert!((audio.duration_seconds() - 1.0).abs() < 0.05);
        let peak = audio.samples.iter().fold(0.0f32, |m, &v| m.max(v.abs()));
        assert!(
            peak > 0.3 && peak <= 1.0,
            "downmixed peak {} out of range",
            peak
        );

        // And on through the pitch path, which resamples to the model rate
        let mut extractor =
            PitchExtractor::new(Box::new(AutocorrPitchModel), PitchConfig::default());
        let track = extractor
            .predict(&audio.samples, audio.sample_rate, &PredictOptions::default())
            .expect("Prediction on decoded audio should succeed");
        let voiced: Vec<f32> = track
            .frequency
            .iter()
            .cloned()
            .filter(|&f| f > 0.0)
            .collect();
        assert!(!voiced.is_empty());
        let mean = voiced.iter().sum::<f32>() / voiced.len() as f32;
        assert!((mean - 440.0).abs() < 440.0 * 0.02);
    }

    #[test]
    fn test_predict_pitches_rejects_degenerate_cutoff() {
        // A sub-sample cutoff must fail fast instead of advancing the slice
        // index without ever reaching the end of the signal.
        let mut config = PitchConfig::default();
        config.cutoff = 1e-6;
        let audio = AudioBuffer::new(sine(440.0, 1.0), SAMPLE_RATE);
        let mut extractor = PitchExtractor::new(Box::new(AutocorrPitchModel), config);
        assert!(matches!(
            extractor.predict_pitches(&audio),
            Err(AnalysisError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_predict_pitches_shape_and_mass() {
        let config = PitchConfig::default();
        let audio = AudioBuffer::new(sine(440.0, 2.5), SAMPLE_RATE);
        let mut extractor = PitchExtractor::new(Box::new(AutocorrPitchModel), config);

        let pitches = extractor.predict_pitches(&audio).unwrap();
        assert_eq!(pitches.ncols(), 60);
        assert!(pitches.nrows() > 200);
        assert!(pitches.iter().all(|&v| v.is_finite() && v >= 0.0));
        assert!(pitches.sum() > 0.0);
    }

    #[test]
    fn test_tonic_override_drives_prediction() {
        let frames = 200;
        let pitches = synthetic_pitches(frames);
        let audio = AudioBuffer::new(sine(440.0, frames as f32 * 0.01), SAMPLE_RATE);

        let mut classifier = RagaClassifier::new(
            Box::new(HistPeakTonicModel),
            stub_ensemble(Tradition::Hindustani),
            vec!["Yaman".to_string(), "Bhairavi".to_string()],
            Tradition::Hindustani,
            TonicConfig::default(),
            &PitchConfig::default(),
        )
        .expect("Classifier construction should succeed");

        let prediction = classifier
            .predict_tonic_raga(&audio, &pitches, Some("D"))
            .expect("Classification should succeed");

        assert_eq!(prediction.tonic.name(), "D");
        assert_eq!(prediction.tonic.fine_index, 10);
        assert_eq!(prediction.raga, "Yaman");
    }

    #[test]
    fn test_tonic_estimated_from_histogram_peak() {
        let frames = 200;
        let pitches = synthetic_pitches(frames);
        let audio = AudioBuffer::new(sine(440.0, frames as f32 * 0.01), SAMPLE_RATE);

        let config = TonicConfig {
            sampling: RotationSampling::Seeded(42),
            ..TonicConfig::default()
        };
        let mut classifier = RagaClassifier::new(
            Box::new(HistPeakTonicModel),
            stub_ensemble(Tradition::Hindustani),
            vec!["Yaman".to_string(), "Bhairavi".to_string()],
            Tradition::Hindustani,
            config,
            &PitchConfig::default(),
        )
        .unwrap();

        let prediction = classifier
            .predict_tonic_raga(&audio, &pitches, None)
            .expect("Classification should succeed");

        // The dwell pattern concentrates salience on fine bin 25 (class 5)
        assert_eq!(prediction.tonic.fine_index, 25);
        assert_eq!(prediction.tonic.pitch_class, 5);
        assert_eq!(prediction.tonic.name(), "F");
    }

    #[test]
    fn test_unknown_tonic_label_rejected() {
        let pitches = synthetic_pitches(100);
        let audio = AudioBuffer::new(sine(440.0, 1.0), SAMPLE_RATE);

        let mut classifier = RagaClassifier::new(
            Box::new(HistPeakTonicModel),
            stub_ensemble(Tradition::Hindustani),
            vec!["Yaman".to_string(), "Bhairavi".to_string()],
            Tradition::Hindustani,
            TonicConfig::default(),
            &PitchConfig::default(),
        )
        .unwrap();

        let result = classifier.predict_tonic_raga(&audio, &pitches, Some("X9"));
        assert!(matches!(result, Err(AnalysisError::InvalidInput(_))));
    }

    #[test]
    fn test_carnatic_ensemble_runs() {
        let frames = 200;
        let pitches = synthetic_pitches(frames);
        let audio = AudioBuffer::new(sine(440.0, frames as f32 * 0.01), SAMPLE_RATE);

        let mut classifier = RagaClassifier::new(
            Box::new(HistPeakTonicModel),
            stub_ensemble(Tradition::Carnatic),
            vec!["Kalyani".to_string(), "Todi".to_string()],
            Tradition::Carnatic,
            TonicConfig::default(),
            &PitchConfig::default(),
        )
        .unwrap();

        let prediction = classifier
            .predict_tonic_raga(&audio, &pitches, Some("C"))
            .unwrap();
        assert_eq!(prediction.raga, "Kalyani");
    }

    #[test]
    fn test_classifier_rejects_catalog_mismatch() {
        let mut models = stub_ensemble(Tradition::Hindustani);
        for model in models.values_mut() {
            model.n_classes = 5; // catalog below has 2 entries
        }

        let result = RagaClassifier::new(
            Box::new(HistPeakTonicModel),
            models,
            vec!["Yaman".to_string(), "Bhairavi".to_string()],
            Tradition::Hindustani,
            TonicConfig::default(),
            &PitchConfig::default(),
        );
        assert!(matches!(result, Err(AnalysisError::ModelError(_))));
    }
}
