//! Performance benchmarks for the fingerprinting pipeline

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use waveprint::dsp::{hashing, peaks, spectrogram};
use waveprint::{fingerprint_samples, DspConfig};

/// Generate a pulsed two-tone test signal
fn generate_test_audio(seconds: f32) -> Vec<f32> {
    let sample_rate = 44_100.0;
    let n = (seconds * sample_rate) as usize;
    (0..n)
        .map(|i| {
            let t = i as f32 / sample_rate;
            let envelope = 1.0 + 0.8 * (2.0 * std::f32::consts::PI * 3.0 * t).sin();
            0.25 * envelope
                * ((2.0 * std::f32::consts::PI * 1000.0 * t).sin()
                    + (2.0 * std::f32::consts::PI * 3000.0 * t).sin())
        })
        .collect()
}

fn spectrogram_benchmarks(c: &mut Criterion) {
    let audio = generate_test_audio(10.0);
    let config = DspConfig::default();

    let mut group = c.benchmark_group("spectrogram");
    group.bench_function("build_10s", |b| {
        b.iter(|| spectrogram::build(black_box(&audio), 44_100, &config).unwrap());
    });
    group.finish();
}

fn peak_benchmarks(c: &mut Criterion) {
    let audio = generate_test_audio(10.0);
    let config = DspConfig::default();
    let spec = spectrogram::build(&audio, 44_100, &config).unwrap();

    let mut group = c.benchmark_group("peaks");
    group.bench_function("pick_10s", |b| {
        b.iter(|| peaks::pick(black_box(&spec), &config));
    });
    group.finish();
}

fn hashing_benchmarks(c: &mut Criterion) {
    let audio = generate_test_audio(10.0);
    let config = DspConfig::default();
    let spec = spectrogram::build(&audio, 44_100, &config).unwrap();
    let found = peaks::pick(&spec, &config);

    let mut group = c.benchmark_group("hashing");
    group.bench_function("pair_10s", |b| {
        b.iter(|| hashing::pair(black_box(&found), &config));
    });
    group.finish();
}

fn pipeline_benchmarks(c: &mut Criterion) {
    let config = DspConfig::default();

    let mut group = c.benchmark_group("pipeline");
    group.sample_size(20);
    for seconds in [10.0, 30.0] {
        let audio = generate_test_audio(seconds);
        group.bench_function(format!("fingerprint_{}s", seconds as u32), |b| {
            b.iter(|| fingerprint_samples(black_box(&audio), 44_100, &config).unwrap());
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    spectrogram_benchmarks,
    peak_benchmarks,
    hashing_benchmarks,
    pipeline_benchmarks
);
criterion_main!(benches);
