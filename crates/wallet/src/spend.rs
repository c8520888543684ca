//! `Wallet::send` convenience wiring: builds and signs a transaction using
//! only addresses this wallet owns, looking up signing keys by address.
//! The caller still supplies the unspent outputs (`auxs`) and chain head
//! time — this crate has no notion of a chain.

use std::collections::{HashMap, HashSet};

use coinhour_core::address::Address;
use coinhour_core::builder::{
    build_transaction, sign_transaction, verify_created_transaction_invariants,
    CreateTransactionParams, UnsignedTransaction,
};
use coinhour_core::config::CoreConfig;
use coinhour_core::types::{Transaction, UxOut};

use crate::error::WalletError;
use crate::wallet::Wallet;

impl Wallet {
    /// Build, sign, and invariant-check a transaction spending from this
    /// wallet's own addresses. `self` must be unencrypted — callers of an
    /// encrypted wallet drive this through [`Wallet::guard_view`].
    pub fn send(
        &self,
        params: &CreateTransactionParams,
        auxs: &HashMap<Address, Vec<UxOut>>,
        head_time: u64,
        config: CoreConfig,
    ) -> Result<Transaction, WalletError> {
        if self.is_encrypted() {
            return Err(WalletError::WalletEncrypted);
        }

        let wallet_addresses: HashSet<Address> = self.entries().iter().map(|e| e.address).collect();
        let unsigned: UnsignedTransaction =
            build_transaction(params, auxs, &wallet_addresses, head_time, config)?;

        let signed = sign_transaction(&unsigned, |addr| self.get_entry(addr).and_then(|e| e.keypair()))?;

        verify_created_transaction_invariants(params, &signed, &unsigned.inputs, config)?;
        Ok(signed)
    }
}
