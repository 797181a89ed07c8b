// Sealing & hashing benchmarks for the Attest ledger.
//
// Covers canonical block hashing, the proof-of-work search at small
// difficulties, and full-chain integrity verification at various chain
// lengths.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use serde_json::json;

use attest_ledger::block::Block;
use attest_ledger::chain::Chain;
use attest_ledger::config::GENESIS_PREVIOUS_HASH;
use attest_ledger::sealer::Sealer;

fn registration_payload() -> serde_json::Value {
    json!({
        "transaction_type": "certificate_registration",
        "transaction": {
            "certificate_id": "cert-bench",
            "certificate_number": "C-9000",
            "owner_id": "U-bench",
            "verification_status": "verified",
            "hash": "ab".repeat(32),
            "metadata": { "confidence_score": 92, "file_hash": "cd".repeat(32) },
        },
    })
}

fn bench_block_hash(c: &mut Criterion) {
    let block = Block::new(
        1,
        1_700_000_000_000,
        registration_payload(),
        GENESIS_PREVIOUS_HASH.into(),
    );

    c.bench_function("block/compute_hash", |b| {
        b.iter(|| block.compute_hash());
    });
}

fn bench_sealing(c: &mut Criterion) {
    let mut group = c.benchmark_group("sealer/seal");

    for difficulty in [0u32, 1, 2, 3] {
        let sealer = Sealer::new(difficulty).expect("difficulty within cap");
        group.bench_with_input(
            BenchmarkId::from_parameter(difficulty),
            &sealer,
            |b, sealer| {
                b.iter(|| {
                    let mut block = Block::new(
                        1,
                        1_700_000_000_000,
                        registration_payload(),
                        GENESIS_PREVIOUS_HASH.into(),
                    );
                    sealer.seal(&mut block).expect("must seal")
                });
            },
        );
    }

    group.finish();
}

fn bench_integrity_verification(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain/verify_integrity");

    for length in [10usize, 100, 500] {
        let mut chain = Chain::new(0).expect("chain");
        for n in 0..length {
            chain
                .append(json!({ "n": n }))
                .expect("difficulty 0 append");
        }

        group.throughput(Throughput::Elements(length as u64));
        group.bench_with_input(BenchmarkId::from_parameter(length), &chain, |b, chain| {
            b.iter(|| chain.verify_integrity().expect("chain is intact"));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_block_hash,
    bench_sealing,
    bench_integrity_verification,
);
criterion_main!(benches);
