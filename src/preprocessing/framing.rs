//! Framing of audio into fixed-width standardized analysis windows
//!
//! The pitch model consumes 1024-sample windows taken every `step_size`
//! seconds from the zero-padded signal. Each window is standardized
//! independently so the model sees zero-mean, unit-variance input regardless
//! of recording level.

use ndarray::Array2;

use crate::config::PitchConfig;
use crate::error::AnalysisError;
use crate::io::sample_buffer::AudioBuffer;

/// Analysis window width in samples, fixed by the pitch model's input layer
pub const FRAME_WIDTH: usize = 1024;

/// Zero-padding guard applied to each side of the signal before framing, so
/// edge content is not lost to windowing
pub const PAD_GUARD: usize = 512;

/// Epsilon added to the per-frame standard deviation; keeps silent frames
/// finite instead of dividing by zero
const STD_EPSILON: f32 = 1e-5;

/// Slice fixed-width frames out of a padded signal segment.
///
/// Frame count invariant: `1 + (segment_len - 1024) / hop`. Segments shorter
/// than one frame yield an empty batch.
fn frame_segment(segment: &[f32], hop_length: usize) -> Result<Array2<f32>, AnalysisError> {
    if hop_length == 0 {
        return Err(AnalysisError::InvalidInput(
            "Hop length must be non-zero".to_string(),
        ));
    }

    if segment.len() < FRAME_WIDTH {
        return Ok(Array2::zeros((0, FRAME_WIDTH)));
    }

    let n_frames = 1 + (segment.len() - FRAME_WIDTH) / hop_length;
    let mut frames = Array2::zeros((n_frames, FRAME_WIDTH));

    for (i, mut row) in frames.outer_iter_mut().enumerate() {
        let start = i * hop_length;
        let window = &segment[start..start + FRAME_WIDTH];

        let mean = window.iter().sum::<f32>() / FRAME_WIDTH as f32;
        let var = window.iter().map(|&x| (x - mean) * (x - mean)).sum::<f32>() / FRAME_WIDTH as f32;
        let denom = var.sqrt() + STD_EPSILON;

        for (dst, &src) in row.iter_mut().zip(window.iter()) {
            *dst = (src - mean) / denom;
        }
    }

    Ok(frames)
}

/// Pad the signal with the symmetric zero guard
fn pad_audio(samples: &[f32]) -> Vec<f32> {
    let mut padded = vec![0.0f32; samples.len() + 2 * PAD_GUARD];
    padded[PAD_GUARD..PAD_GUARD + samples.len()].copy_from_slice(samples);
    padded
}

/// Frame the entire signal into standardized analysis windows
///
/// # Arguments
///
/// * `audio` - Mono audio at the model's native sample rate
/// * `config` - Pitch configuration (provides the hop length)
///
/// # Returns
///
/// Frame batch of shape `(n_frames, 1024)` where
/// `n_frames = 1 + (padded_len - 1024) / hop_length`
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for empty audio or a zero hop.
pub fn audio_to_frames(
    audio: &AudioBuffer,
    config: &PitchConfig,
) -> Result<Array2<f32>, AnalysisError> {
    if audio.samples.is_empty() {
        return Err(AnalysisError::InvalidInput(
            "Empty audio samples".to_string(),
        ));
    }

    let padded = pad_audio(&audio.samples);
    let frames = frame_segment(&padded, config.hop_length())?;

    log::debug!(
        "Framed {} samples into {} windows (hop={})",
        audio.samples.len(),
        frames.nrows(),
        config.hop_length()
    );

    Ok(frames)
}

/// Frame the signal without the centering guard
///
/// Frame `t` begins at `t * hop_length` instead of being centered there; used
/// when the caller disables centering in the prediction entry point.
pub fn audio_to_frames_uncentered(
    audio: &AudioBuffer,
    config: &PitchConfig,
) -> Result<Array2<f32>, AnalysisError> {
    if audio.samples.is_empty() {
        return Err(AnalysisError::InvalidInput(
            "Empty audio samples".to_string(),
        ));
    }
    frame_segment(&audio.samples, config.hop_length())
}

/// Frame one `cutoff`-second slice of a long signal
///
/// Long recordings are framed slice by slice so the activation model never
/// sees more than `cutoff` seconds at once. Slices index the padded signal;
/// the caller starts at slice 0 and feeds the returned next index back in
/// until it is `None`, which marks the final slice.
///
/// # Arguments
///
/// * `audio` - Mono audio at the model's native sample rate
/// * `slice_index` - Zero-based slice number into the padded signal
/// * `config` - Pitch configuration (hop length and `cutoff`)
///
/// # Returns
///
/// The slice's frame batch plus `Some(slice_index + 1)` when more slices
/// remain, `None` when this slice reaches the end of the padded signal.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for empty audio, a zero hop, a
/// `cutoff` shorter than one sample, or a slice index past the end of the
/// signal.
pub fn frames_for_slice(
    audio: &AudioBuffer,
    slice_index: usize,
    config: &PitchConfig,
) -> Result<(Array2<f32>, Option<usize>), AnalysisError> {
    if audio.samples.is_empty() {
        return Err(AnalysisError::InvalidInput(
            "Empty audio samples".to_string(),
        ));
    }

    if config.cutoff <= 0.0 {
        return Err(AnalysisError::InvalidInput(format!(
            "Cutoff must be positive, got {}",
            config.cutoff
        )));
    }

    let slice_len = (config.cutoff * config.sample_rate as f32) as usize;
    if slice_len == 0 {
        return Err(AnalysisError::InvalidInput(format!(
            "Cutoff {} is shorter than one sample at {} Hz",
            config.cutoff, config.sample_rate
        )));
    }

    let padded = pad_audio(&audio.samples);
    let start = slice_index * slice_len;

    if start >= padded.len() {
        return Err(AnalysisError::InvalidInput(format!(
            "Slice index {} is past the end of the signal ({} slices)",
            slice_index,
            padded.len().div_ceil(slice_len)
        )));
    }

    let end = (start + slice_len).min(padded.len());
    let frames = frame_segment(&padded[start..end], config.hop_length())?;

    let next = if start + slice_len >= padded.len() {
        None
    } else {
        Some(slice_index + 1)
    };

    Ok((frames, next))
}
