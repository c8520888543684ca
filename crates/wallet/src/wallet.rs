//! The [`Wallet`] type: a labeled, ordered collection of deterministically
//! derived entries, optionally encrypted at rest.

use std::collections::{BTreeMap, HashMap};

use zeroize::Zeroize;

use coinhour_core::address::Address;

use crate::balance::BalanceGetter;
use crate::encryption::{self, CryptoType};
use crate::error::WalletError;
use crate::keys::{derive_entries, WalletEntry};
use crate::meta::{CoinType, WalletMeta, WalletType, CURRENT_VERSION};

/// Options for [`Wallet::create`]: whether to encrypt at rest, how many
/// addresses to generate up front, and an optional scan-ahead pass.
#[derive(Clone, Debug)]
pub struct CreateOptions {
    pub label: String,
    pub seed: Vec<u8>,
    pub coin: CoinType,
    pub encrypt: bool,
    pub password: Vec<u8>,
    pub crypto_type: CryptoType,
    /// 0 means "use the default of 1".
    pub generate_n: u64,
    /// 0 means "no scan-ahead".
    pub scan_n: u64,
}

impl CreateOptions {
    pub fn new(seed: Vec<u8>, coin: CoinType) -> Self {
        Self {
            label: String::new(),
            seed,
            coin,
            encrypt: false,
            password: Vec::new(),
            crypto_type: CryptoType::ScryptChacha20Poly1305,
            generate_n: 0,
            scan_n: 0,
        }
    }
}

/// A labeled collection of deterministically derived entries. Entries are
/// stored in derivation order in a `Vec`, with a
/// `HashMap<Address, usize>` reverse index for O(1) [`Wallet::get_entry`].
#[derive(Clone, Debug)]
pub struct Wallet {
    meta: WalletMeta,
    entries: Vec<WalletEntry>,
    address_index: HashMap<Address, usize>,
}

impl Wallet {
    /// Builds a new wallet from a seed, optionally encrypting it at rest
    /// and optionally scanning ahead for addresses with existing balance.
    pub fn create(
        filename: String,
        opts: CreateOptions,
        balance_getter: Option<&dyn BalanceGetter>,
    ) -> Result<Self, WalletError> {
        if opts.seed.is_empty() {
            return Err(WalletError::MissingSeed);
        }
        if !opts.encrypt && !opts.password.is_empty() {
            return Err(WalletError::MissingEncrypt);
        }
        if opts.encrypt && opts.password.is_empty() {
            return Err(WalletError::MissingPassword);
        }
        if opts.scan_n > 0 {
            if balance_getter.is_none() {
                return Err(WalletError::NilBalanceGetter);
            }
            if opts.coin != CoinType::Skycoin {
                return Err(WalletError::CoinTypeNotSupportingScanAddresses);
            }
        }

        let generate_n = if opts.generate_n == 0 { 1 } else { opts.generate_n };

        let meta = WalletMeta {
            filename,
            version: CURRENT_VERSION.to_string(),
            label: opts.label.clone(),
            timestamp: chrono::Utc::now().timestamp(),
            coin: opts.coin,
            wallet_type: WalletType::Deterministic,
            encrypted: false,
            crypto_type: None,
            seed: Some(opts.seed.clone()),
            last_seed: Some(opts.seed.clone()),
            secrets: None,
        };

        let mut wallet = Self { meta, entries: Vec::new(), address_index: HashMap::new() };
        wallet.generate(generate_n)?;

        if opts.scan_n > generate_n {
            // `balance_getter` is `Some` here: checked above whenever `scan_n > 0`.
            wallet.scan_addresses(opts.scan_n, balance_getter.expect("checked above"))?;
        }

        if opts.encrypt {
            wallet.lock(&opts.password, opts.crypto_type)?;
        }

        Ok(wallet)
    }

    /// Reassembles a `Wallet` from a decoded meta record and entry list
    /// (used by [`crate::file::load`]). Rebuilds the reverse address index;
    /// does not re-derive anything from the seed.
    pub fn from_parts(meta: WalletMeta, entries: Vec<WalletEntry>) -> Result<Self, WalletError> {
        let mut address_index = HashMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            address_index.insert(entry.address, i);
        }
        Ok(Self { meta, entries, address_index })
    }

    pub fn is_encrypted(&self) -> bool {
        self.meta.encrypted
    }

    pub fn meta(&self) -> &WalletMeta {
        &self.meta
    }

    pub fn label(&self) -> &str {
        &self.meta.label
    }

    pub fn coin(&self) -> CoinType {
        self.meta.coin
    }

    pub fn entries(&self) -> &[WalletEntry] {
        &self.entries
    }

    pub fn address_count(&self) -> usize {
        self.entries.len()
    }

    /// Looks up an entry by address, constant-time regardless of wallet
    /// size.
    pub fn get_entry(&self, address: &Address) -> Option<&WalletEntry> {
        self.address_index.get(address).map(|&i| &self.entries[i])
    }

    /// Derives and appends `n` new addresses.
    pub fn generate(&mut self, n: u64) -> Result<Vec<Address>, WalletError> {
        if self.meta.encrypted {
            return Err(WalletError::WalletEncrypted);
        }
        if n == 0 {
            return Ok(Vec::new());
        }
        let last_seed = self.meta.last_seed.clone().ok_or(WalletError::MissingAuthenticated)?;
        let (next_seed, new_entries) = derive_entries(&last_seed, n, self.meta.coin.address_family());

        let mut addresses = Vec::with_capacity(new_entries.len());
        for entry in new_entries {
            addresses.push(entry.address);
            self.address_index.insert(entry.address, self.entries.len());
            self.entries.push(entry);
        }
        self.meta.last_seed = Some(next_seed.to_vec());
        tracing::debug!(n, total = self.entries.len(), "generated wallet addresses");
        Ok(addresses)
    }

    /// Derives addresses past the end of the wallet until `scan_n`
    /// consecutive addresses show no balance, keeping every address up to
    /// and including the last one with a nonzero balance.
    pub fn scan_addresses(&mut self, scan_n: u64, bg: &dyn BalanceGetter) -> Result<u64, WalletError> {
        if self.meta.encrypted {
            return Err(WalletError::WalletEncrypted);
        }
        if self.meta.coin != CoinType::Skycoin {
            return Err(WalletError::CoinTypeNotSupportingScanAddresses);
        }
        if scan_n == 0 {
            return Ok(0);
        }

        let mut probe = self.clone();
        let n_existing = probe.entries.len() as u64;
        let mut n_add_addrs = 0u64;
        let mut extra_scan = 0u64;
        let mut n = scan_n;

        loop {
            let addrs = probe.generate(n)?;
            let balances = bg.get_balance_of_addrs(&addrs)?;

            let mut keep_num = 0u64;
            for (i, bal) in balances.iter().enumerate().rev() {
                if !bal.is_empty() {
                    keep_num = (i + 1) as u64;
                    break;
                }
            }
            if keep_num == 0 {
                break;
            }
            n_add_addrs += keep_num + extra_scan;
            extra_scan = n - keep_num;
            n = scan_n - extra_scan;
        }

        // Regenerate from scratch so `last_seed` ends up exactly where it
        // would if only the kept entries had ever been derived, discarding
        // the scratch tail grown during the probing loop above.
        probe.reset_to_empty();
        probe.generate(n_existing + n_add_addrs)?;
        *self = probe;

        tracing::debug!(n_add_addrs, "scan-ahead complete");
        Ok(n_add_addrs)
    }

    fn reset_to_empty(&mut self) {
        self.entries.clear();
        self.address_index.clear();
        self.meta.last_seed = self.meta.seed.clone();
    }

    /// Encrypts the wallet's secrets in place, wiping them from memory.
    pub fn lock(&mut self, password: &[u8], crypto_type: CryptoType) -> Result<(), WalletError> {
        if self.meta.encrypted {
            return Err(WalletError::WalletEncrypted);
        }
        if password.is_empty() {
            return Err(WalletError::MissingPassword);
        }

        let mut staged = self.clone();

        let seed = staged.meta.seed.clone().unwrap_or_default();
        let last_seed = staged.meta.last_seed.clone().unwrap_or_default();

        let mut secrets_map: BTreeMap<String, String> = BTreeMap::new();
        secrets_map.insert("seed".to_string(), hex::encode(&seed));
        secrets_map.insert("lastSeed".to_string(), hex::encode(&last_seed));
        for entry in &staged.entries {
            let sk = entry
                .secret_key_bytes()
                .ok_or_else(|| WalletError::MissingEntrySecret(entry.address.to_base58()))?;
            secrets_map.insert(entry.address.to_base58(), hex::encode(sk));
        }

        let plaintext = serde_json::to_vec(&secrets_map)?;
        let ciphertext = encryption::encrypt(&plaintext, password, crypto_type)?;

        staged.meta.crypto_type = Some(crypto_type);
        staged.meta.secrets = Some(ciphertext);
        staged.meta.encrypted = true;
        staged.meta.seed.zeroize();
        staged.meta.seed = None;
        staged.meta.last_seed.zeroize();
        staged.meta.last_seed = None;
        for entry in &mut staged.entries {
            entry.erase();
        }

        self.erase();
        *self = staged;
        Ok(())
    }

    /// Reverse of [`Wallet::lock`]. Returns a fresh decrypted copy; `self`
    /// remains encrypted. Any decrypt failure (bad password, corrupted
    /// frame, wrong crypto type tag) surfaces as [`WalletError::InvalidPassword`],
    /// never as an internal crypto error.
    pub fn unlock(&self, password: &[u8]) -> Result<Self, WalletError> {
        if !self.meta.encrypted {
            return Err(WalletError::WalletNotEncrypted);
        }
        if password.is_empty() {
            return Err(WalletError::MissingPassword);
        }

        let mut staged = self.clone();
        let ciphertext = staged.meta.secrets.clone().ok_or(WalletError::MissingAuthenticated)?;
        let expected_type = staged.meta.crypto_type.ok_or(WalletError::MissingAuthenticated)?;

        let (plaintext, actual_type) =
            encryption::decrypt(&ciphertext, password).map_err(|_| WalletError::InvalidPassword)?;
        if actual_type != expected_type {
            return Err(WalletError::WrongCryptoType);
        }

        let secrets_map: BTreeMap<String, String> =
            serde_json::from_slice(&plaintext).map_err(|e| WalletError::CorruptedSecrets(e.to_string()))?;

        let seed_hex = secrets_map
            .get("seed")
            .ok_or_else(|| WalletError::CorruptedSecrets("missing seed".to_string()))?;
        let last_seed_hex = secrets_map
            .get("lastSeed")
            .ok_or_else(|| WalletError::CorruptedSecrets("missing lastSeed".to_string()))?;
        let seed = hex::decode(seed_hex).map_err(|e| WalletError::CorruptedSecrets(e.to_string()))?;
        let last_seed = hex::decode(last_seed_hex).map_err(|e| WalletError::CorruptedSecrets(e.to_string()))?;

        for entry in &mut staged.entries {
            let addr = entry.address.to_base58();
            let sk_hex = secrets_map
                .get(&addr)
                .ok_or_else(|| WalletError::MissingEntrySecret(addr.clone()))?;
            let sk_bytes = hex::decode(sk_hex).map_err(|e| WalletError::CorruptedSecrets(e.to_string()))?;
            let sk: [u8; 32] = sk_bytes
                .try_into()
                .map_err(|_| WalletError::CorruptedSecrets(format!("secret key for {addr} is not 32 bytes")))?;
            entry.set_secret_key(sk);
        }

        staged.meta.seed = Some(seed);
        staged.meta.last_seed = Some(last_seed);
        staged.meta.encrypted = false;
        staged.meta.crypto_type = None;
        staged.meta.secrets = None;

        Ok(staged)
    }

    /// Scoped acquisition of a decrypted wallet with guaranteed wipe on
    /// every exit path. On success, re-locks the mutated copy (with the
    /// original crypto type) and persists it back into `self`; on any
    /// failure (including one raised by `f`), `self` is left untouched.
    pub fn guard_update<T>(
        &mut self,
        password: &[u8],
        f: impl FnOnce(&mut Wallet) -> Result<T, WalletError>,
    ) -> Result<T, WalletError> {
        if !self.meta.encrypted {
            return Err(WalletError::WalletNotEncrypted);
        }
        if password.is_empty() {
            return Err(WalletError::MissingPassword);
        }
        let crypto_type = self.meta.crypto_type.ok_or(WalletError::MissingAuthenticated)?;

        let mut decrypted = self.unlock(password)?;
        let result = f(&mut decrypted).and_then(|value| {
            decrypted.lock(password, crypto_type)?;
            Ok(value)
        });

        match result {
            Ok(value) => {
                *self = decrypted;
                Ok(value)
            }
            Err(err) => {
                decrypted.erase();
                Err(err)
            }
        }
    }

    /// Read-only counterpart of [`Wallet::guard_update`]: `self` is never
    /// mutated, and the decrypted copy is always wiped before returning.
    pub fn guard_view<T>(
        &self,
        password: &[u8],
        f: impl FnOnce(&Wallet) -> Result<T, WalletError>,
    ) -> Result<T, WalletError> {
        if !self.meta.encrypted {
            return Err(WalletError::WalletNotEncrypted);
        }
        if password.is_empty() {
            return Err(WalletError::MissingPassword);
        }
        let mut decrypted = self.unlock(password)?;
        let result = f(&decrypted);
        decrypted.erase();
        result
    }

    /// Overwrites seed, last_seed, and every entry's secret key in place.
    pub fn erase(&mut self) {
        self.meta.seed.zeroize();
        self.meta.seed = None;
        self.meta.last_seed.zeroize();
        self.meta.last_seed = None;
        for entry in &mut self.entries {
            entry.erase();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::{AddressBalance, Balance};

    struct MockBalanceGetter {
        funded: Vec<Address>,
    }

    impl BalanceGetter for MockBalanceGetter {
        fn get_balance_of_addrs(&self, addresses: &[Address]) -> Result<Vec<AddressBalance>, WalletError> {
            Ok(addresses
                .iter()
                .map(|a| {
                    if self.funded.contains(a) {
                        AddressBalance {
                            confirmed: Balance { coins: 10, hours: 5 },
                            predicted: Balance::default(),
                        }
                    } else {
                        AddressBalance::default()
                    }
                })
                .collect())
        }
    }

    fn filename() -> String {
        "2026_07_28_ab12.wlt".to_string()
    }

    #[test]
    fn create_requires_seed() {
        let opts = CreateOptions::new(Vec::new(), CoinType::Skycoin);
        assert_eq!(Wallet::create(filename(), opts, None).unwrap_err(), WalletError::MissingSeed);
    }

    #[test]
    fn create_rejects_password_without_encrypt() {
        let mut opts = CreateOptions::new(b"seed".to_vec(), CoinType::Skycoin);
        opts.password = b"pw".to_vec();
        assert_eq!(Wallet::create(filename(), opts, None).unwrap_err(), WalletError::MissingEncrypt);
    }

    #[test]
    fn create_rejects_encrypt_without_password() {
        let mut opts = CreateOptions::new(b"seed".to_vec(), CoinType::Skycoin);
        opts.encrypt = true;
        assert_eq!(Wallet::create(filename(), opts, None).unwrap_err(), WalletError::MissingPassword);
    }

    #[test]
    fn create_default_generates_one_address() {
        let opts = CreateOptions::new(b"seed".to_vec(), CoinType::Skycoin);
        let wallet = Wallet::create(filename(), opts, None).unwrap();
        assert_eq!(wallet.address_count(), 1);
    }

    #[test]
    fn create_scan_n_requires_balance_getter() {
        let mut opts = CreateOptions::new(b"seed".to_vec(), CoinType::Skycoin);
        opts.scan_n = 5;
        assert_eq!(Wallet::create(filename(), opts, None).unwrap_err(), WalletError::NilBalanceGetter);
    }

    #[test]
    fn create_scan_n_requires_skycoin() {
        let mut opts = CreateOptions::new(b"seed".to_vec(), CoinType::Bitcoin);
        opts.scan_n = 5;
        let bg = MockBalanceGetter { funded: Vec::new() };
        assert_eq!(
            Wallet::create(filename(), opts, Some(&bg)).unwrap_err(),
            WalletError::CoinTypeNotSupportingScanAddresses
        );
    }

    #[test]
    fn generate_on_encrypted_wallet_fails() {
        let mut opts = CreateOptions::new(b"seed".to_vec(), CoinType::Skycoin);
        opts.encrypt = true;
        opts.password = b"pw".to_vec();
        let mut wallet = Wallet::create(filename(), opts, None).unwrap();
        assert_eq!(wallet.generate(1).unwrap_err(), WalletError::WalletEncrypted);
    }

    #[test]
    fn generate_chains_from_last_seed() {
        let opts = CreateOptions::new(b"seed".to_vec(), CoinType::Skycoin);
        let mut wallet = Wallet::create(filename(), opts, None).unwrap();
        let first = wallet.entries()[0].address;
        let more = wallet.generate(2).unwrap();
        assert_eq!(wallet.address_count(), 3);
        assert_ne!(more[0], first);
        assert_ne!(more[0], more[1]);
    }

    #[test]
    fn get_entry_finds_known_address() {
        let opts = CreateOptions::new(b"seed".to_vec(), CoinType::Skycoin);
        let wallet = Wallet::create(filename(), opts, None).unwrap();
        let addr = wallet.entries()[0].address;
        assert!(wallet.get_entry(&addr).is_some());
    }

    #[test]
    fn get_entry_misses_unknown_address() {
        let opts = CreateOptions::new(b"seed".to_vec(), CoinType::Skycoin);
        let wallet = Wallet::create(filename(), opts, None).unwrap();
        let other = Wallet::create(filename(), CreateOptions::new(b"other seed".to_vec(), CoinType::Skycoin), None)
            .unwrap();
        let unknown = other.entries()[0].address;
        assert!(wallet.get_entry(&unknown).is_none());
    }

    #[test]
    fn lock_then_unlock_restores_entries_scenario_f() {
        let opts = CreateOptions::new(b"a wallet seed".to_vec(), CoinType::Skycoin);
        let mut wallet = Wallet::create(filename(), opts, None).unwrap();
        wallet.generate(2).unwrap();

        let original_addresses: Vec<Address> = wallet.entries().iter().map(|e| e.address).collect();
        let original_secrets: Vec<[u8; 32]> =
            wallet.entries().iter().map(|e| *e.secret_key_bytes().unwrap()).collect();

        wallet.lock(b"correct horse", CryptoType::ScryptChacha20Poly1305).unwrap();
        assert!(wallet.is_encrypted());
        assert!(wallet.meta().seed.is_none());
        assert!(wallet.meta().last_seed.is_none());
        for entry in wallet.entries() {
            assert!(entry.secret_key_bytes().is_none());
        }

        assert_eq!(wallet.unlock(b"wrong password").unwrap_err(), WalletError::InvalidPassword);

        let unlocked = wallet.unlock(b"correct horse").unwrap();
        assert!(!unlocked.is_encrypted());
        let restored_addresses: Vec<Address> = unlocked.entries().iter().map(|e| e.address).collect();
        let restored_secrets: Vec<[u8; 32]> =
            unlocked.entries().iter().map(|e| *e.secret_key_bytes().unwrap()).collect();
        assert_eq!(restored_addresses, original_addresses);
        assert_eq!(restored_secrets, original_secrets);
    }

    #[test]
    fn locking_an_already_encrypted_wallet_fails() {
        let mut opts = CreateOptions::new(b"seed".to_vec(), CoinType::Skycoin);
        opts.encrypt = true;
        opts.password = b"pw".to_vec();
        let mut wallet = Wallet::create(filename(), opts, None).unwrap();
        assert_eq!(
            wallet.lock(b"pw", CryptoType::ScryptChacha20Poly1305).unwrap_err(),
            WalletError::WalletEncrypted
        );
    }

    #[test]
    fn unlocking_an_unencrypted_wallet_fails() {
        let opts = CreateOptions::new(b"seed".to_vec(), CoinType::Skycoin);
        let wallet = Wallet::create(filename(), opts, None).unwrap();
        assert_eq!(wallet.unlock(b"pw").unwrap_err(), WalletError::WalletNotEncrypted);
    }

    #[test]
    fn guard_update_mutates_and_relocks() {
        let mut opts = CreateOptions::new(b"seed".to_vec(), CoinType::Skycoin);
        opts.encrypt = true;
        opts.password = b"pw".to_vec();
        let mut wallet = Wallet::create(filename(), opts, None).unwrap();

        let new_addrs = wallet.guard_update(b"pw", |w| w.generate(1)).unwrap();
        assert_eq!(new_addrs.len(), 1);
        assert!(wallet.is_encrypted());

        let addr = new_addrs[0];
        let found = wallet.guard_view(b"pw", |w| Ok(w.get_entry(&addr).is_some())).unwrap();
        assert!(found);
    }

    #[test]
    fn guard_update_leaves_wallet_untouched_on_closure_error() {
        let mut opts = CreateOptions::new(b"seed".to_vec(), CoinType::Skycoin);
        opts.encrypt = true;
        opts.password = b"pw".to_vec();
        let mut wallet = Wallet::create(filename(), opts, None).unwrap();
        let before = wallet.address_count();

        let result: Result<(), WalletError> =
            wallet.guard_update(b"pw", |_w| Err(WalletError::UnknownAddress));
        assert!(result.is_err());
        assert!(wallet.is_encrypted());
        assert_eq!(wallet.address_count(), before);
    }

    #[test]
    fn scan_addresses_keeps_funded_prefix_and_stops_on_dry_batch() {
        let opts = CreateOptions::new(b"seed".to_vec(), CoinType::Skycoin);
        let mut wallet = Wallet::create(filename(), opts, None).unwrap();

        // Discover which addresses indices 0 and 2 (of a 5-address probe)
        // will be, without mutating `wallet`, so the mock can "fund" them.
        let mut probe = wallet.clone();
        let probe_addrs = probe.generate(5).unwrap();
        let funded = vec![probe_addrs[0], probe_addrs[2]];
        let bg = MockBalanceGetter { funded };

        let added = wallet.scan_addresses(5, &bg).unwrap();
        // entries[0] already existed; highest funded index among the new
        // batch is 2 (0-based), so 3 new addresses are kept.
        assert_eq!(added, 3);
        assert_eq!(wallet.address_count(), 4);
    }

    #[test]
    fn scan_addresses_on_bitcoin_wallet_fails() {
        let opts = CreateOptions::new(b"seed".to_vec(), CoinType::Bitcoin);
        let mut wallet = Wallet::create(filename(), opts, None).unwrap();
        let bg = MockBalanceGetter { funded: Vec::new() };
        assert_eq!(
            wallet.scan_addresses(5, &bg).unwrap_err(),
            WalletError::CoinTypeNotSupportingScanAddresses
        );
    }

    #[test]
    fn erase_wipes_seed_and_entry_secrets() {
        let opts = CreateOptions::new(b"seed".to_vec(), CoinType::Skycoin);
        let mut wallet = Wallet::create(filename(), opts, None).unwrap();
        wallet.erase();
        assert!(wallet.meta().seed.is_none());
        assert!(wallet.meta().last_seed.is_none());
        for entry in wallet.entries() {
            assert!(entry.secret_key_bytes().is_none());
        }
    }
}
