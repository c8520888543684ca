//! On-disk wallet persistence: JSON `{ "meta": {...}, "entries": [...] }`,
//! the `YYYY_MM_DD_XXXX.wlt` filename scheme, and legacy `.wlt.bak` cleanup.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::WalletError;
use crate::keys::WalletEntry;
use crate::meta::WalletMeta;
use crate::wallet::Wallet;

const WALLET_EXT: &str = "wlt";
const BACKUP_EXT: &str = "wlt.bak";
const LEGACY_VERSION: &str = "0.1";

/// Generates a filename of the form `YYYY_MM_DD_XXXX.wlt`, `XXXX` being two
/// random bytes hex-encoded.
pub fn new_wallet_filename(timestamp: chrono::DateTime<chrono::Utc>) -> String {
    let mut padding = [0u8; 2];
    rand::thread_rng().fill_bytes(&mut padding);
    format!("{}_{}.{}", timestamp.format("%Y_%m_%d"), hex::encode(padding), WALLET_EXT)
}

#[derive(Serialize, Deserialize)]
struct ReadableEntry {
    address: String,
    public_key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    secret_key: String,
}

#[derive(Serialize, Deserialize)]
struct ReadableWallet {
    meta: HashMap<String, String>,
    entries: Vec<ReadableEntry>,
}

/// Serializes `wallet` to the on-disk JSON shape and writes it to `path`.
/// The wallet's own `meta.filename` is overwritten to match `path`'s base
/// name before writing, matching `Load`'s symmetric overwrite on read.
pub fn save(wallet: &Wallet, path: &Path) -> Result<(), WalletError> {
    let filename = path
        .file_name()
        .and_then(|f| f.to_str())
        .ok_or_else(|| WalletError::CorruptedFile("wallet path has no file name".to_string()))?
        .to_string();

    let mut meta = wallet.meta().clone();
    meta.filename = filename;

    let readable = ReadableWallet {
        meta: meta.to_meta_map(),
        entries: wallet
            .entries()
            .iter()
            .map(|e| ReadableEntry {
                address: e.address.to_base58(),
                public_key: hex::encode(e.public_key.to_bytes()),
                secret_key: e.secret_key_bytes().map(hex::encode).unwrap_or_default(),
            })
            .collect(),
    };

    let json = serde_json::to_vec_pretty(&readable)?;
    fs::write(path, json)?;
    Ok(())
}

/// Loads a wallet from `path`. Only entry `address`/`public_key` are
/// trusted from the file directly; `secret_key` is restored verbatim but
/// callers relying on signing should go through [`Wallet::unlock`] on an
/// encrypted load.
pub fn load(path: &Path) -> Result<Wallet, WalletError> {
    if !path.exists() {
        return Err(WalletError::WalletNotExist);
    }
    let bytes = fs::read(path)?;
    let mut readable: ReadableWallet = serde_json::from_slice(&bytes)?;

    if let Some(filename) = path.file_name().and_then(|f| f.to_str()) {
        readable.meta.insert("filename".to_string(), filename.to_string());
    }

    let meta = WalletMeta::from_meta_map(&readable.meta)?;

    let mut entries = Vec::with_capacity(readable.entries.len());
    for re in &readable.entries {
        let address = match meta.coin.address_family() {
            coinhour_core::address::AddressFamily::Skycoin => {
                coinhour_core::address::Address::decode_skycoin(&re.address)
            }
            coinhour_core::address::AddressFamily::Bitcoin => {
                coinhour_core::address::Address::decode_bitcoin(&re.address)
            }
        }
        .map_err(|e| WalletError::CorruptedFile(e.to_string()))?;
        let pk_bytes = hex::decode(&re.public_key).map_err(|e| WalletError::CorruptedFile(e.to_string()))?;
        let public_key = coinhour_core::crypto::PublicKey::from_bytes(&pk_bytes)
            .map_err(|e| WalletError::CorruptedFile(e.to_string()))?;
        let secret_key = if re.secret_key.is_empty() {
            None
        } else {
            let bytes = hex::decode(&re.secret_key).map_err(|e| WalletError::CorruptedFile(e.to_string()))?;
            let arr: [u8; 32] = bytes
                .try_into()
                .map_err(|_| WalletError::CorruptedFile("secret key is not 32 bytes".to_string()))?;
            Some(arr)
        };
        entries.push(WalletEntry::new(address, public_key, secret_key));
    }

    Wallet::from_parts(meta, entries)
}

/// Removes any `*.wlt.bak` file that has a matching `*.wlt` file in `dir`
/// and whose on-disk version is the legacy `"0.1"` (`removeBackupFiles`).
pub fn remove_legacy_backup_files(dir: &Path) -> Result<(), WalletError> {
    let wlt_files = filter_dir(dir, &format!(".{WALLET_EXT}"))?;
    let wlt_set: std::collections::HashSet<PathBuf> = wlt_files.into_iter().collect();

    for bak in filter_dir(dir, &format!(".{BACKUP_EXT}"))? {
        let primary = PathBuf::from(bak.to_string_lossy().trim_end_matches(".bak"));
        if !wlt_set.contains(&primary) {
            continue;
        }
        let wallet = load(&primary)?;
        if wallet.meta().version == LEGACY_VERSION {
            fs::remove_file(&bak)?;
        }
    }
    Ok(())
}

fn filter_dir(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>, WalletError> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        if name.to_string_lossy().ends_with(suffix) {
            out.push(entry.path());
        }
    }
    Ok(out)
}
