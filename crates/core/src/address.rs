//! Base58 address encoding with a version byte and four-byte checksum.
//!
//! Two address families are supported, modeled as a closed tagged
//! enumeration rather than polymorphism: [`AddressFamily::Skycoin`] and
//! [`AddressFamily::Bitcoin`]. Both share the same byte layout (`version ||
//! pubkey_hash(20) || checksum(4)`) and differ only in version byte and
//! which decode entry point a caller uses — callers pick the family-specific
//! decoder rather than guessing the family from the bytes alone.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::constants::{ADDRESS_CHECKSUM_LEN, PUBKEY_HASH_LEN};
use crate::crypto::PublicKey;
use crate::error::CryptoError;

/// Version byte used for each address family. Both decode to the same
/// layout; the family a caller expects determines which version is valid.
pub const SKYCOIN_VERSION: u8 = 0x00;
pub const BITCOIN_VERSION: u8 = 0x05;

/// The null address: all-zero pubkey hash. Never a valid spend destination.
pub const NULL_PUBKEY_HASH: [u8; PUBKEY_HASH_LEN] = [0u8; PUBKEY_HASH_LEN];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub enum AddressFamily {
    Skycoin,
    Bitcoin,
}

impl AddressFamily {
    pub fn version_byte(self) -> u8 {
        match self {
            AddressFamily::Skycoin => SKYCOIN_VERSION,
            AddressFamily::Bitcoin => BITCOIN_VERSION,
        }
    }
}

/// A structured public-key hash address: version byte, 20-byte pubkey
/// hash, and family tag. The four-byte checksum is not stored; it is
/// recomputed on every encode and verified on every decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Address {
    version: u8,
    pubkey_hash: [u8; PUBKEY_HASH_LEN],
    family: AddressFamily,
}

impl Address {
    pub fn from_pubkey_hash(pubkey_hash: [u8; PUBKEY_HASH_LEN], family: AddressFamily) -> Self {
        Self {
            version: family.version_byte(),
            pubkey_hash,
            family,
        }
    }

    /// Derive an address from a public key: `ripemd160(sha256(pubkey_bytes))`.
    pub fn from_public_key(pubkey: &PublicKey, family: AddressFamily) -> Self {
        Self::from_pubkey_hash(pubkey_hash160(&pubkey.to_bytes()), family)
    }

    pub fn family(&self) -> AddressFamily {
        self.family
    }

    pub fn pubkey_hash(&self) -> &[u8; PUBKEY_HASH_LEN] {
        &self.pubkey_hash
    }

    /// The null address: never valid as a spend destination. Checked at
    /// validation boundaries (params validation), not at decode time.
    pub fn is_null(&self) -> bool {
        self.pubkey_hash == NULL_PUBKEY_HASH
    }

    /// Checksum over `version || pubkey_hash`: first four bytes of the
    /// double-SHA256 digest.
    pub fn checksum(&self) -> [u8; ADDRESS_CHECKSUM_LEN] {
        let mut buf = Vec::with_capacity(1 + PUBKEY_HASH_LEN);
        buf.push(self.version);
        buf.extend_from_slice(&self.pubkey_hash);
        let digest = Sha256::digest(Sha256::digest(&buf));
        let mut out = [0u8; ADDRESS_CHECKSUM_LEN];
        out.copy_from_slice(&digest[..ADDRESS_CHECKSUM_LEN]);
        out
    }

    /// Raw bytes: `version || pubkey_hash || checksum`.
    pub fn bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + PUBKEY_HASH_LEN + ADDRESS_CHECKSUM_LEN);
        out.push(self.version);
        out.extend_from_slice(&self.pubkey_hash);
        out.extend_from_slice(&self.checksum());
        out
    }

    /// Base58-encode this address.
    pub fn to_base58(&self) -> String {
        bs58::encode(self.bytes()).into_string()
    }

    fn decode(s: &str, family: AddressFamily) -> Result<Self, CryptoError> {
        let raw = bs58::decode(s)
            .into_vec()
            .map_err(|_| CryptoError::InvalidAddressEncoding)?;
        if raw.len() != 1 + PUBKEY_HASH_LEN + ADDRESS_CHECKSUM_LEN {
            return Err(CryptoError::InvalidAddressEncoding);
        }
        let version = raw[0];
        if version != family.version_byte() {
            return Err(CryptoError::InvalidAddressVersion(version));
        }
        let mut pubkey_hash = [0u8; PUBKEY_HASH_LEN];
        pubkey_hash.copy_from_slice(&raw[1..1 + PUBKEY_HASH_LEN]);
        let addr = Self {
            version,
            pubkey_hash,
            family,
        };
        let expected_checksum = &raw[1 + PUBKEY_HASH_LEN..];
        if addr.checksum() != expected_checksum {
            return Err(CryptoError::InvalidAddressChecksum);
        }
        Ok(addr)
    }

    /// Decode a Skycoin-family base58 address.
    pub fn decode_skycoin(s: &str) -> Result<Self, CryptoError> {
        Self::decode(s, AddressFamily::Skycoin)
    }

    /// Decode a Bitcoin-family base58 address.
    pub fn decode_bitcoin(s: &str) -> Result<Self, CryptoError> {
        Self::decode(s, AddressFamily::Bitcoin)
    }

    /// Verify that `pubkey` is the one this address was derived from.
    pub fn verify(&self, pubkey: &PublicKey) -> Result<(), CryptoError> {
        if pubkey_hash160(&pubkey.to_bytes()) == self.pubkey_hash {
            Ok(())
        } else {
            Err(CryptoError::PubkeyHashMismatch)
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

/// `ripemd160(sha256(data))`, the hash160-style construction both address
/// families use to derive a 20-byte pubkey hash from a public key.
pub fn pubkey_hash160(data: &[u8]) -> [u8; PUBKEY_HASH_LEN] {
    use ripemd::Ripemd160;
    let sha = Sha256::digest(data);
    let ripe = Ripemd160::digest(sha);
    let mut out = [0u8; PUBKEY_HASH_LEN];
    out.copy_from_slice(&ripe);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    #[test]
    fn round_trip_skycoin_address() {
        let addr = Address::from_pubkey_hash([0x42; PUBKEY_HASH_LEN], AddressFamily::Skycoin);
        let encoded = addr.to_base58();
        let decoded = Address::decode_skycoin(&encoded).unwrap();
        assert_eq!(addr, decoded);
    }

    #[test]
    fn round_trip_bitcoin_address() {
        let addr = Address::from_pubkey_hash([0x99; PUBKEY_HASH_LEN], AddressFamily::Bitcoin);
        let encoded = addr.to_base58();
        let decoded = Address::decode_bitcoin(&encoded).unwrap();
        assert_eq!(addr, decoded);
    }

    #[test]
    fn wrong_family_decode_fails() {
        let addr = Address::from_pubkey_hash([0x11; PUBKEY_HASH_LEN], AddressFamily::Skycoin);
        let encoded = addr.to_base58();
        let err = Address::decode_bitcoin(&encoded).unwrap_err();
        assert_eq!(err, CryptoError::InvalidAddressVersion(SKYCOIN_VERSION));
    }

    #[test]
    fn corrupted_checksum_fails() {
        let addr = Address::from_pubkey_hash([0x33; PUBKEY_HASH_LEN], AddressFamily::Skycoin);
        let mut bytes = addr.bytes();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        let corrupted = bs58::encode(&bytes).into_string();
        let err = Address::decode_skycoin(&corrupted).unwrap_err();
        assert_eq!(err, CryptoError::InvalidAddressChecksum);
    }

    #[test]
    fn garbage_string_fails_to_decode() {
        assert!(Address::decode_skycoin("not-valid-base58-!!!").is_err());
    }

    #[test]
    fn null_address_detection() {
        let null = Address::from_pubkey_hash(NULL_PUBKEY_HASH, AddressFamily::Skycoin);
        assert!(null.is_null());
        let non_null = Address::from_pubkey_hash([1; PUBKEY_HASH_LEN], AddressFamily::Skycoin);
        assert!(!non_null.is_null());
    }

    #[test]
    fn address_from_keypair_verifies() {
        let keypair = KeyPair::generate();
        let addr = Address::from_public_key(&keypair.public_key(), AddressFamily::Skycoin);
        assert!(addr.verify(&keypair.public_key()).is_ok());
    }

    #[test]
    fn address_verify_rejects_wrong_key() {
        let keypair1 = KeyPair::generate();
        let keypair2 = KeyPair::generate();
        let addr = Address::from_public_key(&keypair1.public_key(), AddressFamily::Skycoin);
        assert!(addr.verify(&keypair2.public_key()).is_err());
    }

    #[test]
    fn checksum_changes_with_pubkey_hash() {
        let a = Address::from_pubkey_hash([1; PUBKEY_HASH_LEN], AddressFamily::Skycoin);
        let b = Address::from_pubkey_hash([2; PUBKEY_HASH_LEN], AddressFamily::Skycoin);
        assert_ne!(a.checksum(), b.checksum());
    }

    #[test]
    fn display_matches_base58() {
        let addr = Address::from_pubkey_hash([7; PUBKEY_HASH_LEN], AddressFamily::Bitcoin);
        assert_eq!(format!("{addr}"), addr.to_base58());
    }
}
