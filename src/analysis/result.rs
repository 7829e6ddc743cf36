//! Analysis result types

use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// The twelve pitch-class labels, tonic-order ("standard tonic") layout
pub const STANDARD_TONIC: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Resolved tonic of a recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TonicEstimate {
    /// Pitch class index (0 = C, 1 = C#, ..., 11 = B)
    pub pitch_class: usize,

    /// Fine-grained 60-bin index; `pitch_class * 5` when the tonic was
    /// supplied externally
    pub fine_index: usize,
}

impl TonicEstimate {
    /// Build an estimate from an externally supplied pitch-class label
    /// (e.g. `"C#"`). Returns `None` for labels outside [`STANDARD_TONIC`].
    pub fn from_label(label: &str) -> Option<Self> {
        let pitch_class = STANDARD_TONIC.iter().position(|&name| name == label)?;
        Some(Self {
            pitch_class,
            fine_index: pitch_class * 5,
        })
    }

    /// Pitch-class label in musical notation (e.g., "C", "F#")
    ///
    /// # Example
    ///
    /// ```
    /// use raga_dsp::analysis::result::TonicEstimate;
    ///
    /// let tonic = TonicEstimate { pitch_class: 6, fine_index: 30 };
    /// assert_eq!(tonic.name(), "F#");
    /// ```
    pub fn name(&self) -> &'static str {
        STANDARD_TONIC[self.pitch_class % 12]
    }
}

/// Per-frame pitch track, the primary numeric output of pitch prediction
#[derive(Debug, Clone)]
pub struct PitchTrack {
    /// Frame timestamps in seconds
    pub time: Vec<f32>,

    /// Predicted pitch in Hz; 0.0 marks unvoiced/degenerate frames
    pub frequency: Vec<f32>,

    /// Coarse pitch-class-in-octave estimate per frame
    /// (`(argmax(activation) % 60) / 5`)
    pub pitch_class: Vec<f32>,

    /// Voicing confidence per frame (max of the frame's activation vector)
    pub confidence: Vec<f32>,

    /// Raw activation matrix, shape `(frames, 360)`, retained on request
    pub activation: Option<Array2<f32>>,
}

impl PitchTrack {
    /// Number of frames in the track
    pub fn len(&self) -> usize {
        self.time.len()
    }

    /// Whether the track contains no frames
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

/// Combined tonic and raga classification output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagaPrediction {
    /// Resolved tonic
    pub tonic: TonicEstimate,

    /// Raga label from the tradition's catalog
    pub raga: String,
}
