//! Encoder session benchmarks.
//!
//! Benchmarks for the submit/poll loop, lookahead depth and presets.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use encode_session::{EncodeSession, Frame, Preset, SessionConfig, SessionError};

/// Create a frame with a horizontal luma gradient.
fn create_gradient_frame(width: u32, height: u32, offset: u8) -> Frame {
    let mut frame = Frame::new(width, height).unwrap();
    let luma = frame.plane_mut(0);
    for (i, sample) in luma.iter_mut().enumerate() {
        let x = (i as u32) % width;
        *sample = ((x * 255 / width) as u8).wrapping_add(offset);
    }
    frame
}

/// Create a sequence with a hard cut every quarter.
fn create_sequence(frame_count: usize, width: u32, height: u32) -> Vec<Frame> {
    let per_scene = (frame_count / 4).max(1);
    (0..frame_count)
        .map(|i| match (i / per_scene) % 2 {
            0 => create_gradient_frame(width, height, (i % 256) as u8),
            _ => Frame::filled(width, height, 220, 100, 150).unwrap(),
        })
        .collect()
}

/// Push every frame through a session, polling whenever the queue is full.
fn encode_all(config: SessionConfig, frames: &[Frame]) -> usize {
    let mut session = EncodeSession::new(config).unwrap();
    let mut bytes = 0;

    for frame in frames {
        loop {
            match session.submit_frame(frame.clone()) {
                Ok(_) => break,
                Err(SessionError::CapacityExceeded { .. }) => {
                    bytes += session.poll_packet().unwrap().size();
                }
                Err(e) => panic!("submit failed: {e}"),
            }
        }
    }

    session.request_flush().unwrap();
    loop {
        match session.poll_packet() {
            Ok(packet) => bytes += packet.size(),
            Err(SessionError::EndOfStream) => break,
            Err(e) => panic!("poll failed: {e}"),
        }
    }
    bytes
}

// ============================================================================
// Session Loop Benchmarks
// ============================================================================

fn bench_lookahead_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_lookahead");

    let frames = create_sequence(60, 64, 96);
    group.throughput(Throughput::Elements(frames.len() as u64));

    for depth in [0usize, 1, 8, 40] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &frames, |b, frames| {
            b.iter(|| {
                let config = SessionConfig::new(64, 96).with_lookahead(depth);
                encode_all(config, black_box(frames))
            });
        });
    }

    group.finish();
}

fn bench_presets(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_preset");

    let frames = create_sequence(60, 64, 96);
    group.throughput(Throughput::Elements(frames.len() as u64));

    let presets = [
        ("placebo", Preset::Placebo),
        ("medium", Preset::Medium),
        ("ultrafast", Preset::UltraFast),
    ];

    for (name, preset) in presets {
        group.bench_with_input(BenchmarkId::from_parameter(name), &frames, |b, frames| {
            b.iter(|| {
                let config = SessionConfig::new(64, 96)
                    .with_lookahead(8)
                    .with_preset(preset);
                encode_all(config, black_box(frames))
            });
        });
    }

    group.finish();
}

fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_resolution");
    group.sample_size(20);

    let resolutions = [("64x96", 64, 96), ("360p", 640, 360), ("720p", 1280, 720)];

    for (name, width, height) in resolutions {
        let frames = create_sequence(16, width, height);
        group.throughput(Throughput::Elements(u64::from(width * height) * 16));
        group.bench_with_input(BenchmarkId::from_parameter(name), &frames, |b, frames| {
            b.iter(|| {
                let config = SessionConfig::new(width, height).with_lookahead(4);
                encode_all(config, black_box(frames))
            });
        });
    }

    group.finish();
}

criterion_group!(session_benches, bench_lookahead_depth, bench_presets, bench_resolution);

criterion_main!(session_benches);
