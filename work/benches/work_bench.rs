use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use mvs_types::{BlockHash, Header, ProofKind, TxHash};
use mvs_work::{block_work, check_proof_of_work, retarget_bits, WorkGenerator};

const REGTEST_LIMIT: u32 = 0x207f_ffff;

fn header(seed: u8, bits: u32) -> Header {
    Header {
        version: 1,
        proof: ProofKind::Pow,
        previous_hash: BlockHash::new([seed; 32]),
        merkle_root: TxHash::ZERO,
        timestamp: 1_000,
        bits,
        nonce: 0,
        number: 1,
    }
}

fn bench_nonce_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("nonce_search");
    let generator = WorkGenerator::default();

    // Easy targets so each iteration completes quickly.
    for bits in [REGTEST_LIMIT, 0x2000_ffff, 0x1f00_ffff] {
        let h = header(0x42, bits);
        group.bench_with_input(BenchmarkId::new("generate", bits), &h, |b, h| {
            b.iter(|| black_box(generator.generate(black_box(h), REGTEST_LIMIT).unwrap()));
        });
    }

    group.finish();
}

fn bench_pow_check(c: &mut Criterion) {
    let mut h = header(0x42, REGTEST_LIMIT);
    h.nonce = WorkGenerator::default().generate(&h, REGTEST_LIMIT).unwrap().0;
    let hash = h.hash();

    c.bench_function("pow_check_valid", |b| {
        b.iter(|| black_box(check_proof_of_work(black_box(&hash), REGTEST_LIMIT, REGTEST_LIMIT)));
    });
}

fn bench_work_arithmetic(c: &mut Criterion) {
    c.bench_function("block_work", |b| {
        b.iter(|| black_box(block_work(black_box(0x1b04_864c))));
    });
    c.bench_function("retarget_bits", |b| {
        b.iter(|| black_box(retarget_bits(black_box(0x1b04_864c), 1_000_000, 1_209_600, 0x1d00_ffff)));
    });
}

criterion_group!(benches, bench_nonce_search, bench_pow_check, bench_work_arithmetic);
criterion_main!(benches);
