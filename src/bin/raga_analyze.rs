//! Command-line driver for pitch tracking and tonic/raga classification
//!
//! Decodes an audio file (WAV or MP3), runs the pitch model, writes the
//! per-frame track as CSV, and optionally classifies the tonic and raga
//! when a model directory is given.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;

use clap::Parser;

use raga_dsp::{
    AnalysisError, PitchConfig, PitchExtractor, PredictOptions, RagaClassifier, TonicConfig,
    Tradition,
};

#[derive(Debug, Parser)]
#[command(name = "raga_analyze")]
#[command(about = "Pitch tracking and tonic/raga classification for Indian classical music")]
struct Args {
    /// Input audio file (WAV or MP3)
    audio: PathBuf,

    /// ONNX pitch model weights; defaults to `pitch-{capacity}.onnx` under
    /// --model-dir when omitted
    #[arg(long)]
    pitch_model: Option<PathBuf>,

    /// Pitch model capacity tier (tiny, small, medium, large, full)
    #[arg(long, default_value = "full")]
    capacity: String,

    /// Output CSV path; defaults to the input path with a .f0.csv suffix
    #[arg(long)]
    output: Option<PathBuf>,

    /// Apply Viterbi smoothing to the pitch curve
    #[arg(long, default_value_t = false)]
    viterbi: bool,

    /// Frame step size in milliseconds
    #[arg(long, default_value_t = 10)]
    step_size: u32,

    /// Also dump the raw 360-bin activation matrix next to the CSV
    #[arg(long, default_value_t = false)]
    save_activation: bool,

    /// Model directory holding tonic/raga resources; enables classification
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Tradition for classification (hindustani or carnatic)
    #[arg(long, default_value = "hindustani")]
    tradition: String,

    /// Known tonic pitch class (e.g. "C#"); skips tonic estimation
    #[arg(long)]
    tonic: Option<String>,

    /// Seed for the tonic rotation sampler; omitted means fresh entropy
    #[arg(long)]
    seed: Option<u64>,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), AnalysisError> {
    let config = PitchConfig {
        model_capacity: parse_capacity(&args.capacity)?,
        ..PitchConfig::default()
    };
    let audio = raga_dsp::io::decoder::decode_to_rate(&args.audio, config.sample_rate)?;
    log::info!(
        "Decoded {}: {:.1}s at {} Hz",
        args.audio.display(),
        audio.duration_seconds(),
        audio.sample_rate
    );

    let mut extractor = match &args.pitch_model {
        Some(path) => PitchExtractor::from_onnx(path, config.clone())?,
        None => {
            let dir = args.model_dir.as_ref().ok_or_else(|| {
                AnalysisError::InvalidInput(
                    "Either --pitch-model or --model-dir is required".to_string(),
                )
            })?;
            PitchExtractor::from_model_dir(dir, config.clone())?
        }
    };

    let options = PredictOptions {
        viterbi: args.viterbi,
        step_size_ms: args.step_size,
        keep_activation: args.save_activation,
        ..PredictOptions::default()
    };
    let track = extractor.predict(&audio.samples, audio.sample_rate, &options)?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.audio.with_extension("f0.csv"));
    write_track_csv(&output, &track)?;
    println!("Pitch track ({} frames) written to {}", track.len(), output.display());

    if args.save_activation {
        if let Some(activation) = &track.activation {
            let path = args.audio.with_extension("activation.csv");
            write_matrix_csv(&path, activation)?;
            println!("Activation matrix written to {}", path.display());
        }
    }

    if let Some(model_dir) = &args.model_dir {
        let tradition = parse_tradition(&args.tradition)?;
        let mut tonic_config = TonicConfig::default();
        if let Some(seed) = args.seed {
            tonic_config.sampling = raga_dsp::RotationSampling::Seeded(seed);
        }

        let mut classifier =
            RagaClassifier::from_files(model_dir, tradition, tonic_config, &config)?;
        let pitches = extractor.predict_pitches(&audio)?;
        let prediction =
            classifier.predict_tonic_raga(&audio, &pitches, args.tonic.as_deref())?;

        println!("Tonic: {}", prediction.tonic.name());
        println!("Raga:  {}", prediction.raga);
    }

    Ok(())
}

fn parse_capacity(name: &str) -> Result<raga_dsp::ModelCapacity, AnalysisError> {
    use raga_dsp::ModelCapacity;
    match name.to_ascii_lowercase().as_str() {
        "tiny" => Ok(ModelCapacity::Tiny),
        "small" => Ok(ModelCapacity::Small),
        "medium" => Ok(ModelCapacity::Medium),
        "large" => Ok(ModelCapacity::Large),
        "full" => Ok(ModelCapacity::Full),
        other => Err(AnalysisError::InvalidInput(format!(
            "Unknown capacity tier '{}' (expected tiny, small, medium, large or full)",
            other
        ))),
    }
}

fn parse_tradition(name: &str) -> Result<Tradition, AnalysisError> {
    match name.to_ascii_lowercase().as_str() {
        "hindustani" => Ok(Tradition::Hindustani),
        "carnatic" => Ok(Tradition::Carnatic),
        other => Err(AnalysisError::InvalidInput(format!(
            "Unknown tradition '{}' (expected hindustani or carnatic)",
            other
        ))),
    }
}

fn write_track_csv(path: &PathBuf, track: &raga_dsp::PitchTrack) -> Result<(), AnalysisError> {
    let file = File::create(path)
        .map_err(|e| AnalysisError::InvalidInput(format!("{}: {}", path.display(), e)))?;
    let mut writer = BufWriter::new(file);

    let io_err = |e: std::io::Error| AnalysisError::ProcessingError(e.to_string());
    writeln!(writer, "time,frequency,pitch_class,confidence").map_err(io_err)?;
    for i in 0..track.len() {
        writeln!(
            writer,
            "{:.3},{:.3},{:.2},{:.4}",
            track.time[i], track.frequency[i], track.pitch_class[i], track.confidence[i]
        )
        .map_err(io_err)?;
    }
    Ok(())
}

fn write_matrix_csv(
    path: &PathBuf,
    matrix: &ndarray::Array2<f32>,
) -> Result<(), AnalysisError> {
    let file = File::create(path)
        .map_err(|e| AnalysisError::InvalidInput(format!("{}: {}", path.display(), e)))?;
    let mut writer = BufWriter::new(file);

    let io_err = |e: std::io::Error| AnalysisError::ProcessingError(e.to_string());
    for row in matrix.rows() {
        let line: Vec<String> = row.iter().map(|v| format!("{:.6}", v)).collect();
        writeln!(writer, "{}", line.join(",")).map_err(io_err)?;
    }
    Ok(())
}
