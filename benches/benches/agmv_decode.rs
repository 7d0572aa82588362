//! Benchmark suite for AGMV decoding
//!
//! Measures the LZSS stage on its own and full session playback over
//! synthetic streams.
//!
//! Run with: cargo bench --manifest-path benches/Cargo.toml

use std::hint::black_box;
use std::io::Cursor;

use agmv_benches::{generate_lzss_input, generate_test_stream, sizes};
use agmv_types::file::agmv::{AgmvSession, DecodeStep, Header, lzss};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

/// Benchmark LZSS decompression of frame-sized payloads
fn bench_lzss_decompress(c: &mut Criterion) {
	let mut group = c.benchmark_group("lzss_decompress");

	for len in [4096usize, 65536, 307_200] {
		let data = generate_lzss_input(len);
		let packed = lzss::compress(&data);
		let mut out = vec![0u8; len];

		group.throughput(Throughput::Bytes(len as u64));
		group.bench_with_input(BenchmarkId::from_parameter(len), &packed, |b, packed| {
			b.iter(|| {
				lzss::decompress(black_box(packed), &mut out, len).unwrap();
				black_box(&out);
			});
		});
	}

	group.finish();
}

/// Benchmark LZSS compression, which the writer runs once per chunk
fn bench_lzss_compress(c: &mut Criterion) {
	let mut group = c.benchmark_group("lzss_compress");

	let data = generate_lzss_input(65536);
	group.throughput(Throughput::Bytes(data.len() as u64));
	group.bench_function("64k", |b| {
		b.iter(|| black_box(lzss::compress(black_box(&data))));
	});

	group.finish();
}

/// Benchmark decoding every frame of a stream through a session
fn bench_session_decode(c: &mut Criterion) {
	let mut group = c.benchmark_group("session_decode");

	for (name, (width, height)) in [("tiny", sizes::TINY), ("qvga", sizes::QVGA), ("vga", sizes::VGA)] {
		let frames = 30;
		let data = generate_test_stream(width, height, frames, 10).unwrap();

		group.throughput(Throughput::Elements(u64::from(width * height * frames)));
		group.bench_with_input(BenchmarkId::new("frames", name), &data, |b, data| {
			b.iter(|| {
				let mut session = AgmvSession::from_reader(Cursor::new(data.as_slice())).unwrap();
				while let DecodeStep::Frame(info) = session.decode_next_frame().unwrap() {
					black_box(info);
				}
				black_box(session.frame_buffer()[0])
			});
		});
	}

	group.finish();
}

/// Benchmark seeking back and forth across I-frames
fn bench_seek(c: &mut Criterion) {
	let mut group = c.benchmark_group("session_seek");

	let (width, height) = sizes::QVGA;
	let data = generate_test_stream(width, height, 60, 10).unwrap();
	let mut session = AgmvSession::from_reader(Cursor::new(data.as_slice())).unwrap();

	group.bench_function("seek_and_decode", |b| {
		let mut target = 0u32;
		b.iter(|| {
			target = (target + 17) % 60;
			session.seek_to(black_box(target)).unwrap();
			black_box(session.decode_next_frame().unwrap())
		});
	});

	group.finish();
}

/// Benchmark header parsing
fn bench_header_parsing(c: &mut Criterion) {
	let mut group = c.benchmark_group("agmv_header");

	let data = generate_test_stream(64, 64, 1, 1).unwrap();
	group.bench_function("parse_header", |b| {
		b.iter(|| black_box(Header::from_bytes(black_box(&data))));
	});

	group.finish();
}

criterion_group!(
	benches,
	bench_lzss_decompress,
	bench_lzss_compress,
	bench_session_decode,
	bench_seek,
	bench_header_parsing
);
criterion_main!(benches);
