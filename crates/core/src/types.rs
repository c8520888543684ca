//! Core data types: hashes, unspent outputs, and transactions.
//!
//! All coin and coin-hour values are `u64` droplets/hours per protocol
//! convention; arithmetic that can overflow goes through `checked_add` and
//! surfaces [`crate::error::BuilderError::MathOverflow`] rather than
//! wrapping or panicking.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::address::Address;

/// A 32-byte hash value, used for transaction ids, UxOut ids, and inner hashes.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Double SHA-256 of `data`, matching the address checksum scheme.
    pub fn double_sha256(data: &[u8]) -> Self {
        let first = Sha256::digest(data);
        Self(Sha256::digest(first).into())
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl From<[u8; 32]> for Hash256 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Hash256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Head metadata of a [`UxOut`]: where and when it was created.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct UxHead {
    pub block_seq: u64,
    pub block_time: u64,
}

/// Body of a [`UxOut`]: what it is worth and who owns it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct UxBody {
    pub src_transaction: Hash256,
    pub address: Address,
    pub coins: u64,
    pub hours: u64,
}

/// An unspent transaction output. Identity is the structural hash of its
/// head and body, computed via bincode-then-BLAKE3, matching
/// [`Transaction::txid`]'s approach to content-addressing.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct UxOut {
    pub head: UxHead,
    pub body: UxBody,
}

impl UxOut {
    /// Structural hash identifying this output.
    pub fn hash(&self) -> Hash256 {
        let encoded = bincode::encode_to_vec(self, bincode::config::standard())
            .expect("UxOut encoding is infallible");
        Hash256(blake3::hash(&encoded).into())
    }
}

/// A transaction output as it appears inside a [`Transaction`]: a recipient
/// address and the coins/hours assigned to it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct TxOutput {
    pub address: Address,
    pub coins: u64,
    pub hours: u64,
}

/// A 65-byte recoverable secp256k1 signature: `r(32) || s(32) || recovery_id(1)`.
pub type SignatureBytes = [u8; 65];

/// A transaction transferring coins and coin-hours between addresses.
///
/// `inputs` is a list of spent [`UxOut`] hashes (not full input records —
/// the spending public key is recovered from each recoverable signature, so
/// no separate pubkey field is carried), and `sigs[i]` authorizes
/// `inputs[i]`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct Transaction {
    /// Protocol version / transaction type tag.
    pub tx_type: u8,
    /// Digest over `inputs` and `outputs`, computed by [`Transaction::update_inner_hash`].
    pub inner_hash: Hash256,
    /// One recoverable signature per input, in input order.
    pub sigs: Vec<SignatureBytes>,
    /// Hashes of the UxOuts being spent.
    pub inputs: Vec<Hash256>,
    /// Newly created outputs.
    pub outputs: Vec<TxOutput>,
    /// Block height or timestamp before which this transaction is invalid.
    pub lock_time: u64,
}

impl Transaction {
    /// Recompute and store `inner_hash` from the current `inputs`/`outputs`.
    /// Must be called after outputs/inputs are finalized and before signing.
    pub fn update_inner_hash(&mut self) {
        self.inner_hash = self.compute_inner_hash();
    }

    fn compute_inner_hash(&self) -> Hash256 {
        #[derive(Serialize, bincode::Encode)]
        struct InnerHashable<'a> {
            inputs: &'a [Hash256],
            outputs: &'a [TxOutput],
        }
        let hashable = InnerHashable {
            inputs: &self.inputs,
            outputs: &self.outputs,
        };
        let encoded = bincode::encode_to_vec(&hashable, bincode::config::standard())
            .expect("inner hash encoding is infallible");
        Hash256(blake3::hash(&encoded).into())
    }

    /// The message each input's signature is over: `H(inner_hash || in[i])`.
    pub fn signing_hash(&self, input_index: usize) -> Hash256 {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(self.inner_hash.as_bytes());
        buf.extend_from_slice(self.inputs[input_index].as_bytes());
        Hash256(blake3::hash(&buf).into())
    }

    /// Full transaction hash, including signatures. Computed over the
    /// complete bincode encoding via BLAKE3.
    pub fn hash(&self) -> Hash256 {
        let encoded = bincode::encode_to_vec(self, bincode::config::standard())
            .expect("transaction encoding is infallible");
        Hash256(blake3::hash(&encoded).into())
    }

    /// Sum of all output coin values, via checked addition.
    pub fn total_output_coins(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |acc, out| acc.checked_add(out.coins))
    }

    /// Sum of all output coin-hour values, via checked addition.
    pub fn total_output_hours(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |acc, out| acc.checked_add(out.hours))
    }
}
