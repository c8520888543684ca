//! Wallet-level error taxonomy: the "State errors", plus the handful of
//! wallet-scoped "Input errors" (`MissingSeed`, `MissingPassword`,
//! `MissingEncrypt`, `InvalidCoinType`) that belong to
//! [`crate::wallet::Wallet::create`]'s own contract rather than the
//! transaction builder's.

use thiserror::Error;

use coinhour_core::error::{BuilderError, ConfigError, CoreError, CryptoError, InvariantViolated};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("missing seed")]
    MissingSeed,
    #[error("missing password")]
    MissingPassword,
    #[error("missing encrypt")]
    MissingEncrypt,
    #[error("invalid coin type")]
    InvalidCoinType,
    #[error("scan ahead requested but balance getter is nil")]
    NilBalanceGetter,
    #[error("coin type does not support scan-ahead")]
    CoinTypeNotSupportingScanAddresses,

    #[error("wallet is encrypted")]
    WalletEncrypted,
    #[error("wallet is not encrypted")]
    WalletNotEncrypted,
    #[error("invalid password")]
    InvalidPassword,
    #[error("wrong crypto type")]
    WrongCryptoType,
    #[error("missing authenticated metadata")]
    MissingAuthenticated,
    #[error("wallet doesn't exist")]
    WalletNotExist,
    #[error("address not found in wallet")]
    UnknownAddress,
    #[error("uxout is not owned by any address in the wallet")]
    UnknownUxOut,

    #[error("corrupted wallet secrets: {0}")]
    CorruptedSecrets(String),
    #[error("secret key missing for address {0} in decrypted secrets")]
    MissingEntrySecret(String),
    #[error("wallet file is corrupted: {0}")]
    CorruptedFile(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Builder(#[from] BuilderError),
    #[error(transparent)]
    Invariant(#[from] InvariantViolated),
    #[error("invalid core configuration: {0}")]
    Config(String),
}

/// Flattens [`CoreError`] into this crate's own taxonomy rather than
/// nesting it behind its own variant, so callers can `match` on
/// `WalletError::Crypto`/`Builder`/`Invariant` the same way regardless of
/// whether the failure originated in [`crate::spend`] or elsewhere.
impl From<CoreError> for WalletError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Crypto(e) => WalletError::Crypto(e),
            CoreError::Builder(e) => WalletError::Builder(e),
            CoreError::Invariant(e) => WalletError::Invariant(e),
            CoreError::Config(ConfigError::InvalidBurnFactor(s)) => {
                WalletError::Config(format!("invalid burn factor: {s}"))
            }
            CoreError::Config(ConfigError::BurnFactorTooSmall(n)) => {
                WalletError::Config(format!("burn factor too small: {n}"))
            }
        }
    }
}

impl From<std::io::Error> for WalletError {
    fn from(err: std::io::Error) -> Self {
        WalletError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(err: serde_json::Error) -> Self {
        WalletError::CorruptedFile(err.to_string())
    }
}
