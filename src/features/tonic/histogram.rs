//! Tonic histogram ("hist_cqt") builder
//!
//! Condenses the whole pitch track into a `(60, 4)` summary for the tonic
//! model. The four columns are complementary views of which pitch bins the
//! performance dwells on:
//!
//! 0. salience summed over time
//! 1. per-frame argmax occupancy counts
//! 2. salience restricted to stable frames (argmax equal to both neighbors)
//! 3. salience weighted by per-frame melodic-band spectral energy
//!
//! Each column is min-max normalized independently so no single statistic
//! dominates the embedding input.

use ndarray::Array2;
use rustfft::{num_complex::Complex, FftPlanner};

use crate::error::AnalysisError;
use crate::io::sample_buffer::AudioBuffer;
use crate::ml::{HIST_CQT_COLS, PITCH_BINS};

/// STFT window for melodic-band energy weighting
const ENERGY_FFT_SIZE: usize = 2048;

/// Melodic band bounds in Hz; energy outside is ignored
const BAND_LOW_HZ: f32 = 60.0;
const BAND_HIGH_HZ: f32 = 1000.0;

/// Per-frame melodic-band spectral energy
///
/// Windows are centered at `t * hop_length` on the unpadded signal (the same
/// centers the pitch frames use), Hann-weighted, and reduced to the summed
/// magnitude of FFT bins inside the melodic band.
fn band_energy_per_frame(audio: &AudioBuffer, n_frames: usize, hop_length: usize) -> Vec<f32> {
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(ENERGY_FFT_SIZE);

    let bin_hz = audio.sample_rate as f32 / ENERGY_FFT_SIZE as f32;
    let lo_bin = (BAND_LOW_HZ / bin_hz).ceil() as usize;
    let hi_bin = ((BAND_HIGH_HZ / bin_hz).floor() as usize).min(ENERGY_FFT_SIZE / 2);

    let hann: Vec<f32> = (0..ENERGY_FFT_SIZE)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * i as f32 / (ENERGY_FFT_SIZE - 1) as f32;
            0.5 * (1.0 - phase.cos())
        })
        .collect();

    let mut energies = Vec::with_capacity(n_frames);
    let mut buf = vec![Complex::new(0.0f32, 0.0f32); ENERGY_FFT_SIZE];

    for t in 0..n_frames {
        let center = (t * hop_length) as i64;
        let start = center - (ENERGY_FFT_SIZE / 2) as i64;

        for (i, (slot, w)) in buf.iter_mut().zip(hann.iter()).enumerate() {
            let idx = start + i as i64;
            let sample = if idx >= 0 && (idx as usize) < audio.samples.len() {
                audio.samples[idx as usize]
            } else {
                0.0
            };
            *slot = Complex::new(sample * w, 0.0);
        }

        fft.process(&mut buf);

        let energy: f32 = buf[lo_bin..=hi_bin].iter().map(|c| c.norm()).sum();
        energies.push(energy);
    }

    energies
}

/// Min-max normalize one histogram column in place; constant columns zero out
fn normalize_column(col: &mut [f32]) {
    let min = col.iter().cloned().fold(f32::INFINITY, f32::min);
    let max = col.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;
    if range <= f32::EPSILON {
        col.iter_mut().for_each(|x| *x = 0.0);
        return;
    }
    for x in col.iter_mut() {
        *x = (*x - min) / range;
    }
}

/// Build the `(60, 4)` tonic histogram from the audio and its pitch track
///
/// # Arguments
///
/// * `audio` - The analyzed signal, used for the energy-weighted column
/// * `pitches` - Pitch-class histogram of shape `(frames, 60)`
/// * `hop_length` - Hop in samples used when framing the pitch track
///
/// # Errors
///
/// Returns `AnalysisError::ShapeMismatch` for non-60-wide pitches and
/// `AnalysisError::InvalidInput` for an empty track or a zero hop.
pub fn build_hist_cqt(
    audio: &AudioBuffer,
    pitches: &Array2<f32>,
    hop_length: usize,
) -> Result<Array2<f32>, AnalysisError> {
    if pitches.ncols() != PITCH_BINS {
        return Err(AnalysisError::ShapeMismatch(format!(
            "Expected {} pitch bins, got {}",
            PITCH_BINS,
            pitches.ncols()
        )));
    }
    if pitches.nrows() == 0 {
        return Err(AnalysisError::InvalidInput(
            "Empty pitch track".to_string(),
        ));
    }
    if hop_length == 0 {
        return Err(AnalysisError::InvalidInput(
            "Hop length must be non-zero".to_string(),
        ));
    }

    let n_frames = pitches.nrows();
    let argmaxes: Vec<usize> = pitches
        .outer_iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(i, _)| i)
                .unwrap_or(0)
        })
        .collect();

    let energies = band_energy_per_frame(audio, n_frames, hop_length);
    let max_energy = energies.iter().cloned().fold(0.0f32, f32::max);

    let mut hist = Array2::zeros((PITCH_BINS, HIST_CQT_COLS));

    for (t, row) in pitches.outer_iter().enumerate() {
        let stable = t > 0
            && t + 1 < n_frames
            && argmaxes[t - 1] == argmaxes[t]
            && argmaxes[t + 1] == argmaxes[t];
        let energy_w = if max_energy > 0.0 {
            energies[t] / max_energy
        } else {
            0.0
        };

        for (b, &p) in row.iter().enumerate() {
            hist[[b, 0]] += p;
            if stable {
                hist[[b, 2]] += p;
            }
            hist[[b, 3]] += p * energy_w;
        }
        hist[[argmaxes[t], 1]] += 1.0;
    }

    for c in 0..HIST_CQT_COLS {
        let mut col: Vec<f32> = (0..PITCH_BINS).map(|b| hist[[b, c]]).collect();
        normalize_column(&mut col);
        for (b, v) in col.into_iter().enumerate() {
            hist[[b, c]] = v;
        }
    }

    log::debug!(
        "Built hist_cqt from {} frames ({} stable)",
        n_frames,
        argmaxes
            .windows(3)
            .filter(|w| w[0] == w[1] && w[1] == w[2])
            .count()
    );

    Ok(hist)
}
