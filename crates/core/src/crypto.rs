//! secp256k1 recoverable-ECDSA signing and deterministic seed-to-keypair
//! derivation.
//!
//! # Signing scheme
//!
//! Each transaction input is signed over `H(inner_hash || in[i])` (see
//! [`crate::types::Transaction::signing_hash`]). Signatures are the 65-byte
//! recoverable form (`r || s || recovery_id`): the signer's public key is
//! never stored alongside the signature, it is recovered from it, so
//! verification needs only the expected pubkey hash.
//!
//! Nonces are RFC 6979 deterministic (the `secp256k1` crate's default for
//! `sign_ecdsa_recoverable`), so signing the same message with the same key
//! always yields byte-identical signatures.

use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey as Secp256k1PublicKey, Secp256k1, SecretKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::address::pubkey_hash160;
use crate::error::CryptoError;
use crate::types::{Hash256, SignatureBytes, Transaction};

/// Deterministic chain-derivation KDF context suffixes. Kept internal to
/// this crate; two independent hashes (next seed state, key material) are
/// derived from the same concatenation with distinguishing suffixes so
/// neither output can be reconstructed from the other.
const SEED_SUFFIX: &[u8] = b"coinhour-seed-v1";
const KEY_SUFFIX: &[u8] = b"coinhour-seckey-v1";

/// A secp256k1 keypair used to sign transaction inputs.
pub struct KeyPair {
    secret_key: SecretKey,
}

impl KeyPair {
    /// Generate a random keypair using the OS cryptographic RNG.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            secret_key: SecretKey::new(&mut csprng),
        }
    }

    /// Construct a keypair from 32 bytes of secret key material.
    pub fn from_secret_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        SecretKey::from_slice(&bytes)
            .map(|secret_key| Self { secret_key })
            .map_err(|_| CryptoError::InvalidSecretKey)
    }

    pub fn public_key(&self) -> PublicKey {
        let secp = Secp256k1::new();
        PublicKey {
            inner: Secp256k1PublicKey::from_secret_key(&secp, &self.secret_key),
        }
    }

    /// Raw secret key bytes. Handle with care; callers are responsible for
    /// zeroizing any copy they take.
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.secret_key.secret_bytes()
    }

    /// Sign a 32-byte message hash, producing a 65-byte recoverable signature.
    pub fn sign(&self, message_hash: &Hash256) -> SignatureBytes {
        let secp = Secp256k1::new();
        let message = Message::from_digest(*message_hash.as_bytes());
        let sig = secp.sign_ecdsa_recoverable(&message, &self.secret_key);
        let (recovery_id, compact) = sig.serialize_compact();
        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&compact);
        out[64] = recovery_id.to_i32() as u8;
        out
    }

    /// Sign input `index` of `tx`, over `tx.signing_hash(index)`.
    pub fn sign_transaction_input(&self, tx: &Transaction, index: usize) -> SignatureBytes {
        self.sign(&tx.signing_hash(index))
    }
}

/// A secp256k1 public key (compressed, 33 bytes).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey {
    inner: Secp256k1PublicKey,
}

impl PublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        Secp256k1PublicKey::from_slice(bytes)
            .map(|inner| Self { inner })
            .map_err(|_| CryptoError::InvalidPublicKey)
    }

    /// Compressed 33-byte encoding.
    pub fn to_bytes(&self) -> [u8; 33] {
        self.inner.serialize()
    }

    /// `ripemd160(sha256(compressed_pubkey))`, the address pubkey hash.
    pub fn pubkey_hash(&self) -> [u8; 20] {
        pubkey_hash160(&self.to_bytes())
    }

    /// Verify a non-recoverable-style check: recompute the recoverable
    /// signature's recovered key and compare directly against `self`.
    pub fn verify(&self, message_hash: &Hash256, sig: &SignatureBytes) -> Result<(), CryptoError> {
        let recovered = recover_public_key(message_hash, sig)?;
        if recovered == *self {
            Ok(())
        } else {
            Err(CryptoError::VerificationFailed)
        }
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.to_bytes()))
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.to_bytes()))
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        PublicKey::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

fn parse_recoverable_signature(sig: &SignatureBytes) -> Result<RecoverableSignature, CryptoError> {
    let recovery_id =
        RecoveryId::from_i32(sig[64] as i32).map_err(|_| CryptoError::InvalidSignature)?;
    RecoverableSignature::from_compact(&sig[..64], recovery_id)
        .map_err(|_| CryptoError::InvalidSignature)
}

/// Recover the public key that produced `sig` over `message_hash`.
pub fn recover_public_key(
    message_hash: &Hash256,
    sig: &SignatureBytes,
) -> Result<PublicKey, CryptoError> {
    let secp = Secp256k1::new();
    let recoverable = parse_recoverable_signature(sig)?;
    let message = Message::from_digest(*message_hash.as_bytes());
    secp.recover_ecdsa(&message, &recoverable)
        .map(|inner| PublicKey { inner })
        .map_err(|_| CryptoError::InvalidSignature)
}

/// Verify that `sig` over `tx.signing_hash(index)` was produced by the
/// holder of `expected_pubkey_hash`.
pub fn verify_transaction_input(
    tx: &Transaction,
    index: usize,
    expected_pubkey_hash: &[u8; 20],
) -> Result<(), CryptoError> {
    let message_hash = tx.signing_hash(index);
    let sig = tx
        .sigs
        .get(index)
        .ok_or(CryptoError::InvalidSignature)?;
    let recovered = recover_public_key(&message_hash, sig)?;
    if &recovered.pubkey_hash() == expected_pubkey_hash {
        Ok(())
    } else {
        Err(CryptoError::PubkeyHashMismatch)
    }
}

/// Deterministic seed -> keypair chain derivation.
///
/// `s_0 = seed`. For `i` in `1..=n`: `next_seed = SHA256(s_{i-1} ||
/// "coinhour-seed-v1")`, `seckey_material = SHA256(next_seed ||
/// "coinhour-seckey-v1")`, `s_i = next_seed`. Returns the final chain state
/// and the `n` derived keypairs in order. Every seed is valid (secp256k1
/// secret keys cover all but a negligible fraction of 256-bit strings; on
/// the astronomically unlikely event of an invalid scalar this re-hashes
/// the material once more rather than failing, keeping the function total).
pub fn generate_deterministic_key_pairs(seed: &[u8], n: u64) -> ([u8; 32], Vec<KeyPair>) {
    use sha2::{Digest, Sha256};

    let mut state = Sha256::digest(seed).to_vec();
    let mut keypairs = Vec::with_capacity(n as usize);
    for _ in 0..n {
        let mut next_seed_input = state.clone();
        next_seed_input.extend_from_slice(SEED_SUFFIX);
        let next_seed: [u8; 32] = Sha256::digest(&next_seed_input).into();

        let mut key_material = next_seed.to_vec();
        key_material.extend_from_slice(KEY_SUFFIX);
        let mut candidate: [u8; 32] = Sha256::digest(&key_material).into();

        let keypair = loop {
            match KeyPair::from_secret_bytes(candidate) {
                Ok(kp) => break kp,
                Err(_) => {
                    candidate = Sha256::digest(candidate).into();
                }
            }
        };

        keypairs.push(keypair);
        state = next_seed.to_vec();
    }

    let mut next_seed = [0u8; 32];
    next_seed.copy_from_slice(&state);
    (next_seed, keypairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Hash256, TxOutput};

    fn message() -> Hash256 {
        Hash256([0x77; 32])
    }

    #[test]
    fn sign_then_recover_matches_pubkey() {
        let keypair = KeyPair::generate();
        let sig = keypair.sign(&message());
        let recovered = recover_public_key(&message(), &sig).unwrap();
        assert_eq!(recovered, keypair.public_key());
    }

    #[test]
    fn verify_succeeds_for_correct_key() {
        let keypair = KeyPair::generate();
        let sig = keypair.sign(&message());
        assert!(keypair.public_key().verify(&message(), &sig).is_ok());
    }

    #[test]
    fn verify_fails_for_wrong_key() {
        let keypair1 = KeyPair::generate();
        let keypair2 = KeyPair::generate();
        let sig = keypair1.sign(&message());
        assert!(keypair2.public_key().verify(&message(), &sig).is_err());
    }

    #[test]
    fn signing_is_deterministic() {
        let keypair = KeyPair::from_secret_bytes([0x11; 32]).unwrap();
        let sig1 = keypair.sign(&message());
        let sig2 = keypair.sign(&message());
        assert_eq!(sig1, sig2);
    }

    #[test]
    fn different_messages_yield_different_signatures() {
        let keypair = KeyPair::generate();
        let sig1 = keypair.sign(&message());
        let sig2 = keypair.sign(&Hash256([0x88; 32]));
        assert_ne!(sig1, sig2);
    }

    #[test]
    fn pubkey_hash_is_20_bytes_and_deterministic() {
        let keypair = KeyPair::generate();
        let pk = keypair.public_key();
        assert_eq!(pk.pubkey_hash().len(), 20);
        assert_eq!(pk.pubkey_hash(), pk.pubkey_hash());
    }

    #[test]
    fn deterministic_chain_is_repeatable() {
        let (next1, keys1) = generate_deterministic_key_pairs(b"my seed phrase", 3);
        let (next2, keys2) = generate_deterministic_key_pairs(b"my seed phrase", 3);
        assert_eq!(next1, next2);
        for (a, b) in keys1.iter().zip(keys2.iter()) {
            assert_eq!(a.secret_bytes(), b.secret_bytes());
        }
    }

    #[test]
    fn deterministic_chain_prefix_property() {
        // First k < n outputs of generate(seed, n) must prefix generate(seed, k).
        let (_, keys_5) = generate_deterministic_key_pairs(b"seed", 5);
        let (_, keys_3) = generate_deterministic_key_pairs(b"seed", 3);
        for i in 0..3 {
            assert_eq!(keys_5[i].secret_bytes(), keys_3[i].secret_bytes());
        }
    }

    #[test]
    fn different_seeds_yield_different_keys() {
        let (_, keys_a) = generate_deterministic_key_pairs(b"seed-a", 1);
        let (_, keys_b) = generate_deterministic_key_pairs(b"seed-b", 1);
        assert_ne!(keys_a[0].secret_bytes(), keys_b[0].secret_bytes());
    }

    #[test]
    fn successive_keys_in_chain_differ() {
        let (_, keys) = generate_deterministic_key_pairs(b"seed", 2);
        assert_ne!(keys[0].secret_bytes(), keys[1].secret_bytes());
    }

    #[test]
    fn sign_and_verify_transaction_input() {
        use crate::address::{Address, AddressFamily};
        use crate::types::{Hash256 as H, Transaction};

        let keypair = KeyPair::generate();
        let address = Address::from_public_key(&keypair.public_key(), AddressFamily::Skycoin);
        let mut tx = Transaction {
            tx_type: 0,
            inner_hash: H::ZERO,
            sigs: vec![],
            inputs: vec![H([0x01; 32])],
            outputs: vec![TxOutput {
                address,
                coins: 1_000_000,
                hours: 1,
            }],
            lock_time: 0,
        };
        tx.update_inner_hash();
        let sig = keypair.sign_transaction_input(&tx, 0);
        tx.sigs.push(sig);

        assert!(verify_transaction_input(&tx, 0, &keypair.public_key().pubkey_hash()).is_ok());
    }

    #[test]
    fn verify_transaction_input_rejects_wrong_pubkey_hash() {
        use crate::address::{Address, AddressFamily};
        use crate::types::{Hash256 as H, Transaction};

        let keypair = KeyPair::generate();
        let other = KeyPair::generate();
        let address = Address::from_public_key(&keypair.public_key(), AddressFamily::Skycoin);
        let mut tx = Transaction {
            tx_type: 0,
            inner_hash: H::ZERO,
            sigs: vec![],
            inputs: vec![H([0x01; 32])],
            outputs: vec![TxOutput {
                address,
                coins: 1_000_000,
                hours: 1,
            }],
            lock_time: 0,
        };
        tx.update_inner_hash();
        let sig = keypair.sign_transaction_input(&tx, 0);
        tx.sigs.push(sig);

        assert!(verify_transaction_input(&tx, 0, &other.public_key().pubkey_hash()).is_err());
    }
}
