//! Typed wallet metadata, with a string-map serialization bridge for
//! on-disk compatibility -- re-architected as a typed record;
//! `to_meta_map`/`from_meta_map` keep the wire format a `map<string,string>`.

use std::collections::HashMap;

use coinhour_core::address::AddressFamily;

use crate::encryption::CryptoType;
use crate::error::WalletError;

/// Which address family and network this wallet derives addresses for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoinType {
    Skycoin,
    Bitcoin,
}

impl CoinType {
    pub fn address_family(self) -> AddressFamily {
        match self {
            CoinType::Skycoin => AddressFamily::Skycoin,
            CoinType::Bitcoin => AddressFamily::Bitcoin,
        }
    }

    fn tag(self) -> &'static str {
        match self {
            CoinType::Skycoin => "skycoin",
            CoinType::Bitcoin => "bitcoin",
        }
    }

    fn from_tag(tag: &str) -> Result<Self, WalletError> {
        match tag {
            "skycoin" => Ok(CoinType::Skycoin),
            "bitcoin" => Ok(CoinType::Bitcoin),
            _ => Err(WalletError::InvalidCoinType),
        }
    }
}

/// Only `deterministic` is supported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WalletType {
    #[default]
    Deterministic,
}

impl WalletType {
    fn tag(self) -> &'static str {
        match self {
            WalletType::Deterministic => "deterministic",
        }
    }

    fn from_tag(tag: &str) -> Result<Self, WalletError> {
        match tag {
            "deterministic" => Ok(WalletType::Deterministic),
            _ => Err(WalletError::CorruptedFile(format!("unsupported wallet type: {tag}"))),
        }
    }
}

/// Wallet `meta` record. Exactly one of `{seed, last_seed}` and
/// `{secrets}` is populated at any time (the encrypted/decrypted
/// invariant); `crypto_type` is populated iff `secrets` is.
#[derive(Clone, Debug)]
pub struct WalletMeta {
    pub filename: String,
    pub version: String,
    pub label: String,
    pub timestamp: i64,
    pub coin: CoinType,
    pub wallet_type: WalletType,
    pub encrypted: bool,
    pub crypto_type: Option<CryptoType>,
    pub seed: Option<Vec<u8>>,
    pub last_seed: Option<Vec<u8>>,
    pub secrets: Option<Vec<u8>>,
}

pub const CURRENT_VERSION: &str = "0.2";

impl WalletMeta {
    pub fn to_meta_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("filename".to_string(), self.filename.clone());
        map.insert("version".to_string(), self.version.clone());
        map.insert("label".to_string(), self.label.clone());
        map.insert("timestamp".to_string(), self.timestamp.to_string());
        map.insert("coin".to_string(), self.coin.tag().to_string());
        map.insert("type".to_string(), self.wallet_type.tag().to_string());
        map.insert(
            "encrypted".to_string(),
            if self.encrypted { "true" } else { "false" }.to_string(),
        );
        map.insert(
            "cryptoType".to_string(),
            self.crypto_type.map(|t| t.tag().to_string()).unwrap_or_default(),
        );
        map.insert(
            "seed".to_string(),
            self.seed.as_ref().map(hex::encode).unwrap_or_default(),
        );
        map.insert(
            "lastSeed".to_string(),
            self.last_seed.as_ref().map(hex::encode).unwrap_or_default(),
        );
        use base64::Engine;
        map.insert(
            "secrets".to_string(),
            self.secrets
                .as_ref()
                .map(|s| base64::engine::general_purpose::STANDARD.encode(s))
                .unwrap_or_default(),
        );
        map
    }

    pub fn from_meta_map(map: &HashMap<String, String>) -> Result<Self, WalletError> {
        let get = |key: &str| -> Result<&String, WalletError> {
            map.get(key)
                .ok_or_else(|| WalletError::CorruptedFile(format!("missing meta field: {key}")))
        };

        let encrypted_str = get("encrypted")?;
        let encrypted = match encrypted_str.as_str() {
            "true" => true,
            "false" | "" => false,
            other => {
                return Err(WalletError::CorruptedFile(format!(
                    "encrypted field value is not valid, must be \"true\", \"false\" or \"\": {other}"
                )))
            }
        };

        let crypto_type_str = map.get("cryptoType").cloned().unwrap_or_default();
        let crypto_type = if crypto_type_str.is_empty() {
            None
        } else {
            Some(CryptoType::from_tag(&crypto_type_str)?)
        };

        let seed_str = map.get("seed").cloned().unwrap_or_default();
        let seed = if seed_str.is_empty() {
            None
        } else {
            Some(hex::decode(&seed_str).map_err(|e| WalletError::CorruptedFile(e.to_string()))?)
        };

        let last_seed_str = map.get("lastSeed").cloned().unwrap_or_default();
        let last_seed = if last_seed_str.is_empty() {
            None
        } else {
            Some(hex::decode(&last_seed_str).map_err(|e| WalletError::CorruptedFile(e.to_string()))?)
        };

        let secrets_str = map.get("secrets").cloned().unwrap_or_default();
        let secrets = if secrets_str.is_empty() {
            None
        } else {
            use base64::Engine;
            Some(
                base64::engine::general_purpose::STANDARD
                    .decode(&secrets_str)
                    .map_err(|e| WalletError::CorruptedFile(e.to_string()))?,
            )
        };

        let timestamp: i64 = get("timestamp")?
            .parse()
            .map_err(|_| WalletError::CorruptedFile("timestamp is not a valid i64".to_string()))?;

        Ok(Self {
            filename: get("filename")?.clone(),
            version: get("version")?.clone(),
            label: map.get("label").cloned().unwrap_or_default(),
            timestamp,
            coin: CoinType::from_tag(get("coin")?)?,
            wallet_type: WalletType::from_tag(get("type")?)?,
            encrypted,
            crypto_type,
            seed,
            last_seed,
            secrets,
        })
    }
}
