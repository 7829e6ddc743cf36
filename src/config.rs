//! Configuration parameters for pitch tracking and tonic/raga classification

/// Model capacity tier, a fixed filter-count multiplier for the convolutional
/// pitch model. Smaller tiers trade pitch accuracy for speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelCapacity {
    /// Multiplier 4
    Tiny,
    /// Multiplier 8
    Small,
    /// Multiplier 16
    Medium,
    /// Multiplier 24
    Large,
    /// Multiplier 32 (the capacity the models were published with)
    Full,
}

impl ModelCapacity {
    /// Filter-count multiplier for this tier
    pub fn filter_multiplier(&self) -> usize {
        match self {
            ModelCapacity::Tiny => 4,
            ModelCapacity::Small => 8,
            ModelCapacity::Medium => 16,
            ModelCapacity::Large => 24,
            ModelCapacity::Full => 32,
        }
    }

    /// Tier name as used in model weight file names
    pub fn name(&self) -> &'static str {
        match self {
            ModelCapacity::Tiny => "tiny",
            ModelCapacity::Small => "small",
            ModelCapacity::Medium => "medium",
            ModelCapacity::Large => "large",
            ModelCapacity::Full => "full",
        }
    }

    /// Published weight file name for this tier
    pub fn weight_file_name(&self) -> String {
        format!("pitch-{}.onnx", self.name())
    }
}

/// Musical tradition; determines the raga catalog, the ensemble key set and
/// the per-key vote weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tradition {
    /// North Indian classical music
    Hindustani,
    /// South Indian classical music
    Carnatic,
}

/// Hindustani ensemble: key -> integer vote weight
const HINDUSTANI_ENSEMBLE: &[(usize, u32)] = &[(0, 4), (5, 2), (11, 1), (14, 3), (7, 1), (19, 1)];

/// Carnatic ensemble drops key 7
const CARNATIC_ENSEMBLE: &[(usize, u32)] = &[(0, 4), (5, 2), (11, 1), (14, 3), (19, 1)];

impl Tradition {
    /// Fixed ensemble member keys with their integer vote weights.
    ///
    /// Keys below 12 select a fixed-interval comparison view, keys at or above
    /// 12 an exhaustive-minus-self comparison at base class `k - 12`; key 0 is
    /// the global histogram. The sets are tradition-tuned and must be
    /// reproduced exactly.
    pub fn ensemble_weights(&self) -> &'static [(usize, u32)] {
        match self {
            Tradition::Hindustani => HINDUSTANI_ENSEMBLE,
            Tradition::Carnatic => CARNATIC_ENSEMBLE,
        }
    }

    /// Tradition name as used in model and catalog file names
    pub fn name(&self) -> &'static str {
        match self {
            Tradition::Hindustani => "hindustani",
            Tradition::Carnatic => "carnatic",
        }
    }
}

/// How the tonic model samples its rotation-augmentation offsets.
///
/// The tonic network averages predictions over randomly rotated histogram
/// views, which makes its output non-reproducible run-to-run when offsets are
/// drawn fresh. `Seeded` pins the offsets for reproducible inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationSampling {
    /// Fresh entropy per call (the behavior the model was trained with)
    Fresh,
    /// Deterministic offsets from a fixed seed
    Seeded(u64),
}

/// Pitch-tracking configuration
#[derive(Debug, Clone)]
pub struct PitchConfig {
    /// Model capacity tier (default: Full)
    pub model_capacity: ModelCapacity,

    /// Native model sample rate in Hz (default: 16000)
    pub sample_rate: u32,

    /// Hop between analysis frames in seconds (default: 0.01, i.e. 10 ms)
    pub step_size: f32,

    /// Per-slice duration in seconds for chunked framing of long files
    /// (default: 60.0)
    pub cutoff: f32,

    /// Sequence length in seconds the published models were trained with;
    /// informational for callers preparing fixed-length batches, not read by
    /// the runtime pipeline (default: 60.0)
    pub sequence_length: f32,
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self {
            model_capacity: ModelCapacity::Full,
            sample_rate: 16_000,
            step_size: 0.01,
            cutoff: 60.0,
            sequence_length: 60.0,
        }
    }
}

impl PitchConfig {
    /// Hop length in samples derived from the step size
    pub fn hop_length(&self) -> usize {
        (self.step_size * self.sample_rate as f32).round() as usize
    }
}

/// Tonic-estimation configuration
#[derive(Debug, Clone)]
pub struct TonicConfig {
    /// Embedding width of the published tonic model; informational, the
    /// runtime treats the model as opaque (default: 384)
    pub note_dim: usize,

    /// Number of rotation-augmentation views averaged per call (default: 9)
    pub rotations: usize,

    /// Offset sampling policy (default: Fresh, matching the original model)
    pub sampling: RotationSampling,
}

impl Default for TonicConfig {
    fn default() -> Self {
        Self {
            note_dim: 384,
            rotations: 9,
            sampling: RotationSampling::Fresh,
        }
    }
}
