//! Channel mixing utilities (multichannel to mono conversion)

use crate::error::AnalysisError;

/// Downmix interleaved multichannel samples to mono by averaging channels
///
/// # Arguments
///
/// * `samples` - Interleaved samples (frame-major)
/// * `channels` - Number of channels; 1 returns the input unchanged
///
/// # Returns
///
/// Mono samples, one per frame
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if `channels` is zero or the sample
/// count is not a multiple of the channel count.
pub fn downmix_interleaved(samples: &[f32], channels: u32) -> Result<Vec<f32>, AnalysisError> {
    if channels == 0 {
        return Err(AnalysisError::InvalidInput(
            "Channel count must be non-zero".to_string(),
        ));
    }

    let channels = channels as usize;
    if channels == 1 {
        return Ok(samples.to_vec());
    }

    if samples.len() % channels != 0 {
        return Err(AnalysisError::InvalidInput(format!(
            "Sample count {} is not a multiple of channel count {}",
            samples.len(),
            channels
        )));
    }

    log::debug!(
        "Downmixing {} samples from {} channels to mono",
        samples.len(),
        channels
    );

    let mono = samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();

    Ok(mono)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downmix_stereo() {
        let interleaved = vec![1.0, 0.0, 0.5, 0.5, -1.0, 1.0];
        let mono = downmix_interleaved(&interleaved, 2).unwrap();
        assert_eq!(mono, vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_downmix_mono_passthrough() {
        let samples = vec![0.1, 0.2, 0.3];
        let mono = downmix_interleaved(&samples, 1).unwrap();
        assert_eq!(mono, samples);
    }

    #[test]
    fn test_downmix_invalid() {
        assert!(downmix_interleaved(&[0.0; 4], 0).is_err());
        assert!(downmix_interleaved(&[0.0; 5], 2).is_err());
    }
}
