//! Benchmarks for block encoding and decoding.
//!
//! Run with: `cargo bench`
//! Compare with baseline: `cargo bench -- --save-baseline main`
//! Compare against baseline: `cargo bench -- --baseline main`

use arith_stream::bitstream::{BitReader, BitWriter};
use arith_stream::{CoderOptions, Decoder, Encoder};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SYMBOLS: usize = 1 << 16;
const CONTEXTS: usize = 16;

/// Biased source: each context has its own probability of a one.
fn source(p_one: f64) -> Vec<(usize, bool)> {
    let mut rng = StdRng::seed_from_u64(0x5EED);
    (0..SYMBOLS)
        .map(|i| {
            let id = i % CONTEXTS;
            let skew = p_one + (id as f64 / CONTEXTS as f64 - 0.5) * 0.1;
            (id, rng.gen_bool(skew.clamp(0.01, 0.99)))
        })
        .collect()
}

fn encode(symbols: &[(usize, bool)], options: &CoderOptions) -> Vec<u8> {
    let mut out = BitWriter::new(Vec::with_capacity(symbols.len() / 8));
    let mut enc = Encoder::new(&mut out, CONTEXTS, options).expect("valid options");
    enc.start().expect("start");
    for &(id, bit) in symbols {
        enc.encode_regular(id, bit).expect("encode");
    }
    enc.terminate().expect("terminate");
    drop(enc);
    out.into_inner().expect("flush")
}

fn engines() -> [(&'static str, CoderOptions); 2] {
    [
        ("adaptive", CoderOptions::default()),
        ("mcoder", CoderOptions::mcoder()),
    ]
}

/// Benchmark regular-symbol encoding across source skews
fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    group.throughput(Throughput::Elements(SYMBOLS as u64));

    for p_one in [0.5, 0.9, 0.99] {
        let symbols = source(p_one);
        for (name, options) in engines() {
            group.bench_with_input(BenchmarkId::new(name, p_one), &symbols, |b, symbols| {
                b.iter(|| black_box(encode(black_box(symbols), &options)));
            });
        }
    }

    group.finish();
}

/// Benchmark regular-symbol decoding across source skews
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Elements(SYMBOLS as u64));

    for p_one in [0.5, 0.9, 0.99] {
        let symbols = source(p_one);
        for (name, options) in engines() {
            let bytes = encode(&symbols, &options);
            group.bench_with_input(BenchmarkId::new(name, p_one), &bytes, |b, bytes| {
                b.iter(|| {
                    let mut input = BitReader::new(black_box(bytes.as_slice()));
                    let mut dec = Decoder::new(&mut input, CONTEXTS, &options).expect("valid options");
                    dec.start().expect("start");
                    let mut ones = 0u32;
                    for &(id, _) in &symbols {
                        ones += u32::from(dec.decode_regular(id).expect("decode"));
                    }
                    dec.terminate().expect("terminate");
                    black_box(ones)
                });
            });
        }
    }

    group.finish();
}

/// Benchmark equiprobable symbols
fn bench_bypass(c: &mut Criterion) {
    let mut group = c.benchmark_group("bypass");
    group.throughput(Throughput::Elements(SYMBOLS as u64));

    let bits: Vec<bool> = source(0.5).into_iter().map(|(_, bit)| bit).collect();
    for (name, options) in engines() {
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut out = BitWriter::new(Vec::with_capacity(SYMBOLS / 8 + 8));
                let mut enc = Encoder::new(&mut out, 1, &options).expect("valid options");
                enc.start().expect("start");
                for &bit in &bits {
                    enc.encode_bypass(bit).expect("encode");
                }
                enc.terminate().expect("terminate");
                black_box(enc.bit_count())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_bypass);
criterion_main!(benches);
