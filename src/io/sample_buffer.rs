//! Mono sample buffer

/// Mono audio at a known sample rate
///
/// The buffer is the pipeline's canonical audio representation: already
/// downmixed, already at the rate the caller intends to analyze at. It is not
/// mutated once produced.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Mono samples
    pub samples: Vec<f32>,

    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Create a buffer from mono samples
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Duration in seconds
    pub fn duration_seconds(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}
