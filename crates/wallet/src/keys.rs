//! Wallet entries and the seed -> entries chain derivation.
//!
//! Entries are a strict `Vec`, ordered by derivation order from the seed,
//! not keyed by index: `crate::wallet::Wallet` carries
//! a separate `HashMap<Address, usize>` alongside this `Vec` for O(1)
//! `get_entry` lookups. Secret key material lives behind an `Option` that
//! is `None` whenever the owning wallet is encrypted or the entry was
//! erased, and is wiped on every drop.

use std::fmt;

use zeroize::Zeroize;

use coinhour_core::address::{Address, AddressFamily};
use coinhour_core::crypto::{generate_deterministic_key_pairs, KeyPair, PublicKey};

/// One `{address, public_key, secret_key}` triple.
#[derive(Clone)]
pub struct WalletEntry {
    pub address: Address,
    pub public_key: PublicKey,
    secret_key: Option<[u8; 32]>,
}

impl WalletEntry {
    pub fn new(address: Address, public_key: PublicKey, secret_key: Option<[u8; 32]>) -> Self {
        Self { address, public_key, secret_key }
    }

    pub fn secret_key_bytes(&self) -> Option<&[u8; 32]> {
        self.secret_key.as_ref()
    }

    pub fn has_secret(&self) -> bool {
        self.secret_key.is_some()
    }

    pub fn keypair(&self) -> Option<KeyPair> {
        self.secret_key.and_then(|sk| KeyPair::from_secret_bytes(sk).ok())
    }

    pub fn set_secret_key(&mut self, bytes: [u8; 32]) {
        self.secret_key = Some(bytes);
    }

    /// Overwrite the secret key (if any) in place and drop it.
    pub fn erase(&mut self) {
        if let Some(mut sk) = self.secret_key.take() {
            sk.zeroize();
        }
    }
}

impl Drop for WalletEntry {
    fn drop(&mut self) {
        self.erase();
    }
}

impl fmt::Debug for WalletEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletEntry")
            .field("address", &self.address)
            .field("public_key", &self.public_key)
            .field("secret_key", &if self.secret_key.is_some() { "<redacted>" } else { "<none>" })
            .finish()
    }
}

/// Derive `n` new entries chained from `last_seed` (`s_0 = seed`,
/// `generate(n) -> (new_last_seed, [entries])`). Returns the advanced
/// chain state and the entries in derivation order.
pub fn derive_entries(last_seed: &[u8], n: u64, family: AddressFamily) -> ([u8; 32], Vec<WalletEntry>) {
    let (next_seed, keypairs) = generate_deterministic_key_pairs(last_seed, n);
    let entries = keypairs
        .into_iter()
        .map(|kp| {
            let public_key = kp.public_key();
            let address = Address::from_public_key(&public_key, family);
            WalletEntry::new(address, public_key, Some(kp.secret_bytes()))
        })
        .collect();
    (next_seed, entries)
}
