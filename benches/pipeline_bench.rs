//! Performance benchmarks for the analysis pipeline stages

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndarray::Array2;

use raga_dsp::config::{PitchConfig, Tradition};
use raga_dsp::features::pitch::viterbi::to_viterbi_cents;
use raga_dsp::features::raga::features::build_features;
use raga_dsp::features::tonic::histogram::build_hist_cqt;
use raga_dsp::io::sample_buffer::AudioBuffer;
use raga_dsp::preprocessing::framing::audio_to_frames;

fn synthetic_audio(seconds: f32, sample_rate: u32) -> AudioBuffer {
    let samples: Vec<f32> = (0..(seconds * sample_rate as f32) as usize)
        .map(|i| (i as f32 * 220.0 * 2.0 * std::f32::consts::PI / sample_rate as f32).sin() * 0.5)
        .collect();
    AudioBuffer::new(samples, sample_rate)
}

/// Pitch histogram that walks a five-note loop, 3000 frames (~30 s)
fn synthetic_pitches() -> Array2<f32> {
    let notes = [0usize, 10, 20, 35, 45];
    let mut pitches = Array2::zeros((3000, 60));
    for t in 0..pitches.nrows() {
        pitches[[t, notes[(t / 25) % notes.len()]]] = 1.0;
    }
    pitches
}

/// Activation with a moving salience bump, 1000 frames
fn synthetic_activation() -> Array2<f32> {
    let mut activation = Array2::zeros((1000, 360));
    for t in 0..activation.nrows() {
        let center = 120 + (t / 50) % 60;
        for d in 0..9 {
            let bin = center + d - 4;
            activation[[t, bin]] = (-((d as f32 - 4.0).powi(2)) / 4.5).exp();
        }
    }
    activation
}

fn bench_framing(c: &mut Criterion) {
    let audio = synthetic_audio(30.0, 16_000);
    let config = PitchConfig::default();

    c.bench_function("frame_30s_audio", |b| {
        b.iter(|| {
            let _ = audio_to_frames(black_box(&audio), black_box(&config));
        });
    });
}

fn bench_viterbi(c: &mut Criterion) {
    let activation = synthetic_activation();

    c.bench_function("viterbi_1000_frames", |b| {
        b.iter(|| {
            let _ = to_viterbi_cents(black_box(&activation));
        });
    });
}

fn bench_hist_cqt(c: &mut Criterion) {
    let audio = synthetic_audio(30.0, 16_000);
    let pitches = synthetic_pitches();
    let hop = PitchConfig::default().hop_length();

    c.bench_function("hist_cqt_30s", |b| {
        b.iter(|| {
            let _ = build_hist_cqt(black_box(&audio), black_box(&pitches), black_box(hop));
        });
    });
}

fn bench_raga_features(c: &mut Criterion) {
    let pitches = synthetic_pitches();

    c.bench_function("raga_feature_views_30s", |b| {
        b.iter(|| {
            let _ = build_features(black_box(&pitches), black_box(Tradition::Hindustani));
        });
    });
}

criterion_group!(
    benches,
    bench_framing,
    bench_viterbi,
    bench_hist_cqt,
    bench_raga_features
);
criterion_main!(benches);
