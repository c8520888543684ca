//! # coinhour-wallet — encrypted, file-backed deterministic wallet.
//!
//! Deterministic key derivation from a master seed, scan-ahead address
//! discovery, authenticated wallet-secrets encryption, guarded
//! lock/unlock access to signing keys, JSON file persistence, and a thin
//! `Wallet::send` wrapper over `coinhour-core`'s transaction builder.
//!
//! # Modules
//!
//! - [`error`] — `WalletError` enum
//! - [`keys`] — `WalletEntry`, seed -> entries chain derivation
//! - [`meta`] — typed wallet metadata and its string-map wire bridge
//! - [`balance`] — the `BalanceGetter` collaborator used by scan-ahead
//! - [`encryption`] — authenticated wallet-secrets encryption (two variants)
//! - [`mnemonic`] — BIP-39 seed backup and restoration
//! - [`wallet`] — `Wallet`: create, generate, scan, lock/unlock, guard
//! - [`spend`] — `Wallet::send`, wiring the wallet to the transaction builder
//! - [`file`] — on-disk wallet file persistence

pub mod balance;
pub mod encryption;
pub mod error;
pub mod file;
pub mod keys;
pub mod meta;
pub mod mnemonic;
pub mod spend;
pub mod wallet;

pub use balance::{AddressBalance, Balance, BalanceGetter};
pub use encryption::CryptoType;
pub use error::WalletError;
pub use keys::{derive_entries, WalletEntry};
pub use meta::{CoinType, WalletMeta, WalletType};
pub use mnemonic::{mnemonic_to_seed, seed_to_mnemonic};
pub use wallet::{CreateOptions, Wallet};
