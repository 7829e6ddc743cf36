//! Audio decoding using Symphonia
//!
//! Decodes WAV and MP3 recordings to mono f32 samples at the file's native
//! rate. `decode_to_rate` additionally resamples to the pitch model's 16 kHz
//! rate for callers feeding the model directly.

use std::fs::File;
use std::path::Path;

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::AnalysisError;
use crate::io::sample_buffer::AudioBuffer;
use crate::preprocessing::channel_mixer::downmix_interleaved;

/// Decode an audio file to a mono buffer at its native rate
///
/// # Arguments
///
/// * `path` - Path to a WAV or MP3 file
///
/// # Returns
///
/// Mono `AudioBuffer` at the file's sample rate
///
/// # Errors
///
/// Returns `AnalysisError::DecodingError` for unreadable or malformed input;
/// the error is surfaced to the caller without retry.
pub fn decode_audio(path: &Path) -> Result<AudioBuffer, AnalysisError> {
    log::debug!("Decoding audio file: {}", path.display());

    let src = File::open(path)
        .map_err(|e| AnalysisError::DecodingError(format!("{}: {}", path.display(), e)))?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AnalysisError::DecodingError(format!("Unsupported format: {}", e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AnalysisError::DecodingError("No supported audio tracks".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AnalysisError::DecodingError(format!("Codec setup failed: {}", e)))?;

    let track_id = track.id;
    let mut interleaved: Vec<f32> = Vec::new();
    let mut sample_rate = 0u32;
    let mut channels = 0u32;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(_)) => break,
            Err(SymphoniaError::ResetRequired) => {
                return Err(AnalysisError::DecodingError(
                    "Track list changed mid-stream".to_string(),
                ));
            }
            Err(e) => return Err(AnalysisError::DecodingError(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channels = spec.channels.count() as u32;

                let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                interleaved.extend_from_slice(buf.samples());
            }
            Err(SymphoniaError::IoError(_)) => break,
            // Recoverable corrupt packets are skipped
            Err(SymphoniaError::DecodeError(_)) => (),
            Err(e) => return Err(AnalysisError::DecodingError(e.to_string())),
        }
    }

    if interleaved.is_empty() || sample_rate == 0 {
        return Err(AnalysisError::DecodingError(format!(
            "No decodable audio in {}",
            path.display()
        )));
    }

    let samples = downmix_interleaved(&interleaved, channels)?;

    log::debug!(
        "Decoded {} mono samples at {} Hz ({} channels in source)",
        samples.len(),
        sample_rate,
        channels
    );

    Ok(AudioBuffer::new(samples, sample_rate))
}

/// Resample a mono buffer to a target rate with a windowed-sinc resampler
///
/// Returns the input unchanged if it is already at the target rate.
///
/// # Errors
///
/// Returns `AnalysisError::ProcessingError` if the resampler rejects the
/// stream parameters.
pub fn resample(audio: &AudioBuffer, target_rate: u32) -> Result<AudioBuffer, AnalysisError> {
    if audio.sample_rate == target_rate {
        return Ok(audio.clone());
    }

    if audio.samples.is_empty() {
        return Err(AnalysisError::InvalidInput(
            "Empty audio samples".to_string(),
        ));
    }

    log::debug!(
        "Resampling {} samples: {} Hz -> {} Hz",
        audio.samples.len(),
        audio.sample_rate,
        target_rate
    );

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(
        target_rate as f64 / audio.sample_rate as f64,
        2.0,
        params,
        audio.samples.len(),
        1,
    )
    .map_err(|e| AnalysisError::ProcessingError(format!("Resampler setup failed: {}", e)))?;

    let waves_in = vec![audio.samples.clone()];
    let waves_out = resampler
        .process(&waves_in, None)
        .map_err(|e| AnalysisError::ProcessingError(format!("Resampling failed: {}", e)))?;

    Ok(AudioBuffer::new(waves_out[0].clone(), target_rate))
}

/// Decode a file and resample to the model's native rate
///
/// This is the MP3 ingestion path of the batch CLI: decode, downmix, then
/// resample to `target_rate` (16 kHz for the published models).
pub fn decode_to_rate(path: &Path, target_rate: u32) -> Result<AudioBuffer, AnalysisError> {
    let native = decode_audio(path)?;
    resample(&native, target_rate)
}
