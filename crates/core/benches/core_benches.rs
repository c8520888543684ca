//! Criterion benchmarks for coinhour-core's hot paths: secp256k1 sign/verify,
//! UTXO selection, and transaction (de)serialization.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use coinhour_core::address::{Address, AddressFamily};
use coinhour_core::crypto::KeyPair;
use coinhour_core::selection::choose_spends_minimize_uxouts;
use coinhour_core::types::{Hash256, Transaction, TxOutput, UxBody, UxHead, UxOut};
use coinhour_core::uxbalance::UxBalance;

fn sample_address() -> Address {
    Address::from_pubkey_hash([0xCC; 20], AddressFamily::Skycoin)
}

fn sample_transaction() -> Transaction {
    let mut tx = Transaction {
        tx_type: 0,
        inner_hash: Hash256::ZERO,
        sigs: vec![[0u8; 65]],
        inputs: vec![Hash256([0x11; 32])],
        outputs: vec![
            TxOutput { address: sample_address(), coins: 50_000_000, hours: 10 },
            TxOutput { address: sample_address(), coins: 25_000_000, hours: 5 },
        ],
        lock_time: 0,
    };
    tx.update_inner_hash();
    tx
}

fn make_candidate_uxouts(n: usize) -> Vec<UxBalance> {
    (0..n)
        .map(|i| {
            let ux = UxOut {
                head: UxHead { block_seq: i as u64, block_time: 0 },
                body: UxBody {
                    src_transaction: Hash256([i as u8; 32]),
                    address: sample_address(),
                    coins: 1_000_000 + i as u64 * 1000,
                    hours: 1 + i as u64,
                },
            };
            UxBalance::new(1_000_000, &ux)
        })
        .collect()
}

fn bench_secp256k1_sign_verify(c: &mut Criterion) {
    let keypair = KeyPair::from_secret_bytes([42u8; 32]).unwrap();
    let message = Hash256(*blake3::hash(b"bench message").as_bytes());
    let signature = keypair.sign(&message);
    let pubkey = keypair.public_key();

    c.bench_function("secp256k1_sign", |b| {
        b.iter(|| keypair.sign(black_box(&message)))
    });

    c.bench_function("secp256k1_verify", |b| {
        b.iter(|| pubkey.verify(black_box(&message), black_box(&signature)))
    });
}

fn bench_choose_spends(c: &mut Criterion) {
    let candidates = make_candidate_uxouts(200);

    c.bench_function("choose_spends_minimize_uxouts_200_candidates", |b| {
        b.iter(|| {
            choose_spends_minimize_uxouts(black_box(candidates.clone()), 5_000_000, 0, 1000)
        })
    });
}

fn bench_transaction_serde(c: &mut Criterion) {
    let tx = sample_transaction();
    let encoded = bincode::encode_to_vec(&tx, bincode::config::standard()).expect("encode failed");

    c.bench_function("transaction_serialization", |b| {
        b.iter(|| bincode::encode_to_vec(black_box(&tx), bincode::config::standard()))
    });

    c.bench_function("transaction_deserialization", |b| {
        b.iter(|| {
            let (decoded, _): (Transaction, usize) =
                bincode::decode_from_slice(black_box(&encoded), bincode::config::standard())
                    .expect("decode failed");
            decoded
        })
    });
}

criterion_group!(
    benches,
    bench_secp256k1_sign_verify,
    bench_choose_spends,
    bench_transaction_serde,
);
criterion_main!(benches);
