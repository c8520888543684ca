//! BIP-39 mnemonic seed backup and restoration: wallet creation may accept
//! either a raw seed or a BIP-39 phrase that encodes one. The wallet stores
//! seeds as opaque bytes, so this module operates
//! directly on `[u8; 32]` rather than introducing its own seed newtype.

use bip39::{Language, Mnemonic};

use crate::error::WalletError;

/// Convert a 32-byte seed to a 24-word BIP-39 mnemonic phrase.
pub fn seed_to_mnemonic(seed: &[u8; 32]) -> String {
    let m = Mnemonic::from_entropy_in(Language::English, seed)
        .expect("32 bytes always produces a valid mnemonic");
    m.to_string()
}

/// Parse a BIP-39 mnemonic phrase and extract its 32-byte entropy as a seed.
///
/// Normalizes whitespace and lowercases before parsing.
pub fn mnemonic_to_seed(phrase: &str) -> Result<[u8; 32], WalletError> {
    let normalized = phrase.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    let m = Mnemonic::parse_in(Language::English, &normalized)
        .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))?;
    let entropy = m.to_entropy();
    if entropy.len() != 32 {
        return Err(WalletError::InvalidMnemonic(format!(
            "expected 32 bytes of entropy, got {}",
            entropy.len()
        )));
    }
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&entropy);
    Ok(bytes)
}
