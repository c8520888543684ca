//! Error taxonomy for the transaction construction and UTXO selection core.

use thiserror::Error;

/// Failures from the signing/verification/address layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid secret key bytes")]
    InvalidSecretKey,
    #[error("invalid public key bytes")]
    InvalidPublicKey,
    #[error("invalid signature bytes")]
    InvalidSignature,
    #[error("signature verification failed")]
    VerificationFailed,
    #[error("pubkey hash does not match expected")]
    PubkeyHashMismatch,
    #[error("invalid base58 address string")]
    InvalidAddressEncoding,
    #[error("invalid address checksum")]
    InvalidAddressChecksum,
    #[error("invalid address version byte: {0}")]
    InvalidAddressVersion(u8),
    #[error("address is the null address")]
    NullAddress,
    #[error("encryption failed: {0}")]
    Encryption(String),
    #[error("decryption failed: {0}")]
    Decryption(String),
    #[error("wrong password")]
    InvalidPassword,
    #[error("legacy sha256-xor crypto cannot encrypt new wallets, only decrypt existing ones")]
    LegacyWriteUnsupported,
    #[error("unknown crypto type tag: {0}")]
    UnknownCryptoType(String),
    #[error("corrupted encrypted frame: {0}")]
    CorruptedFrame(String),
}

/// Every "Input error" / "Economic error" from the transaction builder's
/// public contract, plus checked-arithmetic overflow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuilderError {
    #[error("change address must not be the null address")]
    NullChangeAddress,
    #[error("recipients list (`to`) must not be empty")]
    MissingTo,
    #[error("recipient has zero coins")]
    ZeroCoinsTo,
    #[error("recipient has the null address")]
    NullAddressTo,
    #[error("duplicate recipient (address, coins, hours) tuple")]
    DuplicateTo,
    #[error("wallet id must not be empty")]
    MissingWalletID,
    #[error("wallet address set includes the null address")]
    IncludesNullAddress,
    #[error("wallet address set contains duplicates")]
    DuplicateAddresses,
    #[error("manual hours-selection mode must be empty")]
    InvalidModeManual,
    #[error("auto hours-selection requires every recipient's hours to be zero")]
    ZeroToHoursAuto,
    #[error("auto hours-selection requires a mode")]
    MissingModeAuto,
    #[error("unsupported hours-selection mode: {0}")]
    InvalidHoursSelMode(String),
    #[error("unknown hours-selection type: {0}")]
    InvalidHoursSelType(String),
    #[error("share mode requires a share factor")]
    MissingShareFactor,
    #[error("share factor must be a valid decimal")]
    InvalidShareFactor,
    #[error("share factor must be within [0, 1]")]
    ShareFactorOutOfRange,
    #[error("wallet.uxouts and wallet.addresses are mutually exclusive")]
    WalletParamsConflict,
    #[error("wallet.uxouts contains duplicates")]
    DuplicateUxOuts,
    #[error("unknown wallet id: {0}")]
    UnknownWalletID(String),
    #[error("address {0} is not known to this wallet")]
    UnknownAddress(String),
    #[error("unknown uxout: {0}")]
    UnknownUxOut(String),
    #[error("insufficient balance: available {available} < needed {needed}")]
    InsufficientBalance { available: u64, needed: u64 },
    #[error("insufficient coin-hours after fee: available {available} < needed {needed}")]
    InsufficientHours { available: u64, needed: u64 },
    #[error("selected inputs cannot pay any transaction fee")]
    TxnNoFee,
    #[error("cannot spend zero coins")]
    ZeroSpend,
    #[error("no unspent outputs available")]
    NoUnspents,
    #[error("checked arithmetic overflow: {0}")]
    MathOverflow(&'static str),
}

/// A post-construction or selection-state invariant was violated. Every
/// variant here is a programming bug, never a user-input error; callers may
/// choose to abort the process on receipt of one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invariant violated: {0}")]
pub struct InvariantViolated(pub String);

impl InvariantViolated {
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!(invariant = %message, "transaction builder invariant violated");
        Self(message)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{BURN_FACTOR_ENV_VAR} is not a valid integer: {0}", BURN_FACTOR_ENV_VAR = crate::constants::BURN_FACTOR_ENV_VAR)]
    InvalidBurnFactor(String),
    #[error("burn factor must be greater than 1, got {0}")]
    BurnFactorTooSmall(u64),
}

/// Aggregating error for the core crate's public API surface.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Builder(#[from] BuilderError),
    #[error(transparent)]
    Invariant(#[from] InvariantViolated),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
