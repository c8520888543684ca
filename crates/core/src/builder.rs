//! Transaction builder: parameter validation, the sixteen-step construction
//! algorithm, and post-construction invariant verification.

use std::collections::{HashMap, HashSet};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::address::Address;
use crate::config::CoreConfig;
use crate::constants::MAX_BUILD_ATTEMPTS;
use crate::crypto::KeyPair;
use crate::error::{BuilderError, CoreError, InvariantViolated};
use crate::hours::{distribute_hours_proportional, required_fee, remaining_hours};
use crate::selection::choose_spends_minimize_uxouts;
use crate::types::{Hash256, Transaction, TxOutput, UxOut};
use crate::uxbalance::{sort_by_hours_ascending, uxbalances_sub, UxBalance};

/// A destination for a transaction: an address, a coin amount, and
/// (depending on the hours-selection type) an explicit or to-be-computed
/// hours amount.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Recipient {
    pub address: Address,
    pub coins: u64,
    pub hours: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HoursSelectionType {
    Manual,
    Auto,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HoursSelectionMode {
    Share,
}

/// Policy for assigning input coin-hours to outputs.
#[derive(Clone, Debug, PartialEq)]
pub struct HoursSelection {
    pub selection_type: HoursSelectionType,
    pub mode: Option<HoursSelectionMode>,
    pub share_factor: Option<Decimal>,
}

impl HoursSelection {
    pub fn manual() -> Self {
        Self {
            selection_type: HoursSelectionType::Manual,
            mode: None,
            share_factor: None,
        }
    }

    pub fn auto_share(share_factor: Decimal) -> Self {
        Self {
            selection_type: HoursSelectionType::Auto,
            mode: Some(HoursSelectionMode::Share),
            share_factor: Some(share_factor),
        }
    }
}

/// The wallet-identity portion of a [`CreateTransactionParams`]: which
/// subset of the wallet's addresses/uxouts to spend from.
#[derive(Clone, Debug, Default)]
pub struct WalletParams {
    pub wallet_id: String,
    pub addresses: Option<Vec<Address>>,
    pub uxouts: Option<Vec<Hash256>>,
}

/// Full parameters for [`build_transaction`].
#[derive(Clone, Debug)]
pub struct CreateTransactionParams {
    pub change_address: Option<Address>,
    pub to: Vec<Recipient>,
    pub hours_selection: HoursSelection,
    pub wallet: WalletParams,
    pub ignore_unconfirmed: bool,
}

impl CreateTransactionParams {
    /// Validates recipients, change address, wallet-identity selection,
    /// and the hours-selection policy before any spend is chosen.
    pub fn validate(&self) -> Result<(), BuilderError> {
        if let Some(addr) = &self.change_address {
            if addr.is_null() {
                return Err(BuilderError::NullChangeAddress);
            }
        }

        if self.to.is_empty() {
            return Err(BuilderError::MissingTo);
        }

        let mut seen = HashSet::new();
        for recipient in &self.to {
            if recipient.coins == 0 {
                return Err(BuilderError::ZeroCoinsTo);
            }
            if recipient.address.is_null() {
                return Err(BuilderError::NullAddressTo);
            }
            let key = (recipient.address, recipient.coins, recipient.hours);
            if !seen.insert(key) {
                return Err(BuilderError::DuplicateTo);
            }
        }

        if self.wallet.wallet_id.is_empty() {
            return Err(BuilderError::MissingWalletID);
        }

        if let Some(addresses) = &self.wallet.addresses {
            let mut addr_seen = HashSet::new();
            for addr in addresses {
                if addr.is_null() {
                    return Err(BuilderError::IncludesNullAddress);
                }
                if !addr_seen.insert(*addr) {
                    return Err(BuilderError::DuplicateAddresses);
                }
            }
        }

        match self.hours_selection.selection_type {
            HoursSelectionType::Manual => {
                if self.hours_selection.mode.is_some() {
                    return Err(BuilderError::InvalidModeManual);
                }
            }
            HoursSelectionType::Auto => {
                if self.to.iter().any(|r| r.hours != 0) {
                    return Err(BuilderError::ZeroToHoursAuto);
                }
                match self.hours_selection.mode {
                    None => return Err(BuilderError::MissingModeAuto),
                    Some(HoursSelectionMode::Share) => {
                        match self.hours_selection.share_factor {
                            None => return Err(BuilderError::MissingShareFactor),
                            Some(factor) => {
                                if factor < Decimal::ZERO || factor > Decimal::ONE {
                                    return Err(BuilderError::ShareFactorOutOfRange);
                                }
                            }
                        }
                    }
                }
            }
        }

        if self.wallet.uxouts.is_some() && self.wallet.addresses.is_some() {
            return Err(BuilderError::WalletParamsConflict);
        }

        if let Some(uxouts) = &self.wallet.uxouts {
            let mut seen = HashSet::new();
            for hash in uxouts {
                if !seen.insert(*hash) {
                    return Err(BuilderError::DuplicateUxOuts);
                }
            }
        }

        Ok(())
    }
}

/// A constructed-but-unsigned transaction, paired with the `UxBalance`
/// records for each of its inputs (needed by the caller to look up signing
/// keys by address, and by [`verify_created_transaction_invariants`]).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub tx: Transaction,
    pub inputs: Vec<UxBalance>,
}

enum BuildOutcome {
    Done(UnsignedTransaction),
    RetryWithFullShare,
}

/// Build (but do not sign) a transaction: selection, hours assignment,
/// change creation, including the change-rescue procedure and the bounded
/// share-factor retry. Signing, recovering the input list, and invariant
/// verification happen afterward: signing is
/// [`sign_transaction`]; the input list is `UnsignedTransaction::inputs`;
/// invariants are checked here before returning, since they depend only on
/// the unsigned shape (every check that doesn't reference `sigs` can be,
/// and is, verified before signing — the signature-count check is
/// re-verified by [`sign_transaction`]'s caller once signing is complete).
pub fn build_transaction(
    params: &CreateTransactionParams,
    auxs: &HashMap<Address, Vec<UxOut>>,
    wallet_addresses: &HashSet<Address>,
    head_time: u64,
    config: CoreConfig,
) -> Result<UnsignedTransaction, CoreError> {
    params.validate()?;

    let mut share_factor = params.hours_selection.share_factor.unwrap_or(Decimal::ONE);
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match build_once(params, auxs, wallet_addresses, head_time, config, share_factor)? {
            BuildOutcome::Done(unsigned) => return Ok(unsigned),
            BuildOutcome::RetryWithFullShare => {
                if attempts >= MAX_BUILD_ATTEMPTS || share_factor == Decimal::ONE {
                    return Err(InvariantViolated::new(
                        "change-rescue left orphaned change hours and the share-factor=1.0 retry is exhausted",
                    )
                    .into());
                }
                share_factor = Decimal::ONE;
            }
        }
    }
}

fn build_once(
    params: &CreateTransactionParams,
    auxs: &HashMap<Address, Vec<UxOut>>,
    wallet_addresses: &HashSet<Address>,
    head_time: u64,
    config: CoreConfig,
    share_factor: Decimal,
) -> Result<BuildOutcome, CoreError> {
    // Step 1: every address in auxs must be known to the wallet.
    let mut addresses: Vec<&Address> = auxs.keys().collect();
    addresses.sort_by_key(|a| a.bytes());
    for addr in &addresses {
        if !wallet_addresses.contains(*addr) {
            return Err(BuilderError::UnknownAddress(addr.to_base58()).into());
        }
    }

    // Step 2: flatten, project to UxBalance (deterministic iteration order:
    // addresses lexical-byte order, then by UTXO hash), detect duplicate hashes.
    let mut all_balances = Vec::new();
    let mut by_hash: HashMap<Hash256, UxBalance> = HashMap::new();
    for addr in &addresses {
        let mut outs = auxs[*addr].clone();
        outs.sort_by_key(|ux| ux.hash());
        for ux in &outs {
            let balance = UxBalance::new(head_time, ux);
            if by_hash.insert(balance.hash, balance.clone()).is_some() {
                return Err(InvariantViolated::new(format!(
                    "duplicate UxOut hash across address uxout sets: {}",
                    balance.hash
                ))
                .into());
            }
            all_balances.push(balance);
        }
    }

    // Step 3.
    let total_out_coins = params
        .to
        .iter()
        .try_fold(0u64, |acc, r| acc.checked_add(r.coins))
        .ok_or(BuilderError::MathOverflow("total_out_coins"))?;
    let requested_hours = params
        .to
        .iter()
        .try_fold(0u64, |acc, r| acc.checked_add(r.hours))
        .ok_or(BuilderError::MathOverflow("requested_hours"))?;

    // Step 4.
    let mut spends = choose_spends_minimize_uxouts(
        all_balances.clone(),
        total_out_coins,
        requested_hours,
        config.burn_factor,
    )?;

    // Step 5.
    let mut total_input_coins = spends
        .iter()
        .try_fold(0u64, |acc, u| acc.checked_add(u.coins))
        .ok_or(BuilderError::MathOverflow("total_input_coins"))?;
    let mut total_input_hours = spends
        .iter()
        .try_fold(0u64, |acc, u| acc.checked_add(u.hours))
        .ok_or(BuilderError::MathOverflow("total_input_hours"))?;

    // Step 6.
    let mut fee_hours = required_fee(total_input_hours, config.burn_factor);
    if fee_hours == 0 {
        return Err(BuilderError::TxnNoFee.into());
    }
    let mut remaining = remaining_hours(total_input_hours, config.burn_factor);

    // Step 7.
    let outputs = match params.hours_selection.selection_type {
        HoursSelectionType::Manual => params
            .to
            .iter()
            .map(|r| TxOutput { address: r.address, coins: r.coins, hours: r.hours })
            .collect::<Vec<_>>(),
        HoursSelectionType::Auto => {
            let allocated_decimal = share_factor * Decimal::from(remaining);
            let allocated_hours = allocated_decimal.floor().to_u64().ok_or(
                BuilderError::MathOverflow("allocated_hours exceeds u64"),
            )?;
            let coins: Vec<u64> = params.to.iter().map(|r| r.coins).collect();
            let per_recipient_hours = distribute_hours_proportional(&coins, allocated_hours)?;
            params
                .to
                .iter()
                .zip(per_recipient_hours)
                .map(|(r, hours)| TxOutput { address: r.address, coins: r.coins, hours })
                .collect::<Vec<_>>()
        }
    };

    // Step 8.
    let total_out_hours = outputs
        .iter()
        .try_fold(0u64, |acc, o| acc.checked_add(o.hours))
        .ok_or(BuilderError::MathOverflow("total_out_hours"))?;

    // Step 9.
    if total_input_coins < total_out_coins {
        return Err(InvariantViolated::new(
            "total_input_coins < total_out_coins after selection",
        )
        .into());
    }
    if remaining < total_out_hours {
        return Err(InvariantViolated::new("remaining_hours < total_out_hours after selection").into());
    }

    // Step 10.
    let mut change_coins = total_input_coins - total_out_coins;
    let mut change_hours = remaining - total_out_hours;

    // Step 11: change-rescue.
    if change_coins == 0 && change_hours > 0 {
        let mut candidates = uxbalances_sub(&all_balances, &spends);
        sort_by_hours_ascending(&mut candidates);
        if let Some(candidate) = candidates.into_iter().next() {
            let new_total_hours = total_input_hours
                .checked_add(candidate.hours)
                .ok_or(BuilderError::MathOverflow("new_total_hours"))?;
            let new_fee = required_fee(new_total_hours, config.burn_factor);
            if new_fee < fee_hours {
                return Err(InvariantViolated::new(
                    "change-rescue candidate reduced required fee hours",
                )
                .into());
            }
            let additional_fee = new_fee - fee_hours;
            if additional_fee < change_hours {
                let additional_hours = candidate.hours - additional_fee;
                change_hours = change_hours
                    .checked_add(additional_hours)
                    .ok_or(BuilderError::MathOverflow("change_hours"))?;
                change_coins = candidate.coins;
                total_input_coins = total_input_coins
                    .checked_add(candidate.coins)
                    .ok_or(BuilderError::MathOverflow("total_input_coins"))?;
                total_input_hours = new_total_hours;
                fee_hours = new_fee;
                remaining = remaining_hours(total_input_hours, config.burn_factor);
                spends.push(candidate);
            }
        }
    }
    // Step 12: bounded share-factor retry.
    if change_coins == 0
        && change_hours > 0
        && params.hours_selection.selection_type == HoursSelectionType::Auto
        && share_factor != Decimal::ONE
    {
        return Ok(BuildOutcome::RetryWithFullShare);
    }
    // Manual mode has no share factor to retry with and no obligation to
    // produce a change output: the orphaned hours are simply left unspent
    // as extra fee, and the transaction proceeds without a change output.
    if change_coins == 0
        && change_hours > 0
        && params.hours_selection.selection_type == HoursSelectionType::Auto
    {
        return Err(InvariantViolated::new(
            "change-rescue failed and no further share-factor retry is available",
        )
        .into());
    }

    // Step 13.
    let mut final_outputs = outputs;
    if change_coins > 0 {
        let change_address = match &params.change_address {
            Some(addr) => *addr,
            None => lexicographically_smallest_address(&spends),
        };
        final_outputs.push(TxOutput {
            address: change_address,
            coins: change_coins,
            hours: change_hours,
        });
    }

    // Step 14 (partial): assemble the unsigned transaction shape.
    let mut tx = Transaction {
        tx_type: 0,
        inner_hash: Hash256::ZERO,
        sigs: Vec::new(),
        inputs: spends.iter().map(|u| u.hash).collect(),
        outputs: final_outputs,
        lock_time: 0,
    };
    tx.update_inner_hash();

    // Step 16 (the parts of the invariant set independent of `sigs`).
    verify_unsigned_invariants(params, &tx, &spends, config)?;

    Ok(BuildOutcome::Done(UnsignedTransaction { tx, inputs: spends }))
}

fn lexicographically_smallest_address(spends: &[UxBalance]) -> Address {
    spends
        .iter()
        .map(|u| u.address)
        .min_by_key(|a| a.bytes())
        .expect("spends is non-empty by construction")
}

/// Step 14: sign every input of `unsigned.tx`, looking up each input's
/// signing key by its `UxBalance.address` via `lookup_key`.
pub fn sign_transaction<F>(
    unsigned: &UnsignedTransaction,
    lookup_key: F,
) -> Result<Transaction, BuilderError>
where
    F: Fn(&Address) -> Option<KeyPair>,
{
    let mut tx = unsigned.tx.clone();
    let mut sigs = Vec::with_capacity(unsigned.inputs.len());
    for (index, input) in unsigned.inputs.iter().enumerate() {
        let keypair = lookup_key(&input.address)
            .ok_or_else(|| BuilderError::UnknownAddress(input.address.to_base58()))?;
        sigs.push(keypair.sign_transaction_input(&tx, index));
    }
    tx.sigs = sigs;
    Ok(tx)
}

fn verify_unsigned_invariants(
    params: &CreateTransactionParams,
    tx: &Transaction,
    inputs: &[UxBalance],
    config: CoreConfig,
) -> Result<(), InvariantViolated> {
    for out in &tx.outputs {
        if out.address.is_null() {
            return Err(InvariantViolated::new("output has the null address"));
        }
        if out.coins == 0 {
            return Err(InvariantViolated::new("output has zero coins"));
        }
    }

    if tx.outputs.len() != params.to.len() && tx.outputs.len() != params.to.len() + 1 {
        return Err(InvariantViolated::new(
            "output count is neither len(to) nor len(to)+1",
        ));
    }

    for (i, recipient) in params.to.iter().enumerate() {
        let out = &tx.outputs[i];
        if out.address != recipient.address || out.coins != recipient.coins {
            return Err(InvariantViolated::new(format!(
                "output {i} does not match its recipient's address/coins"
            )));
        }
        if recipient.hours != 0 && out.hours != recipient.hours {
            return Err(InvariantViolated::new(format!(
                "output {i} does not match its recipient's explicit hours"
            )));
        }
    }

    if tx.inputs.len() != inputs.len() {
        return Err(InvariantViolated::new("tx.inputs length does not match selected inputs"));
    }
    for (i, hash) in tx.inputs.iter().enumerate() {
        if *hash != inputs[i].hash {
            return Err(InvariantViolated::new(format!("tx.inputs[{i}] does not match inputs[{i}].hash")));
        }
    }

    let mut seen = HashSet::new();
    for input in inputs {
        if input.hours < input.initial_hours {
            return Err(InvariantViolated::new("input.hours < input.initial_hours"));
        }
        if input.src_transaction.is_zero() || input.hash.is_zero() {
            return Err(InvariantViolated::new("input has a null src_transaction or hash"));
        }
        if !seen.insert(input.hash) {
            return Err(InvariantViolated::new("duplicate input in selected set"));
        }
    }

    let total_input_hours: u64 = inputs.iter().map(|i| i.hours).sum();
    let total_output_hours = tx.total_output_hours().ok_or_else(|| {
        InvariantViolated::new("total output hours overflowed during invariant check")
    })?;
    if total_input_hours < total_output_hours {
        return Err(InvariantViolated::new("sum(input.hours) < sum(output.hours)"));
    }
    let fee_paid = total_input_hours - total_output_hours;
    if fee_paid < required_fee(total_input_hours, config.burn_factor) {
        return Err(InvariantViolated::new(
            "fee paid is less than required_fee(total_input_hours, burn_factor)",
        ));
    }

    Ok(())
}

/// Full invariant set including signature-count checks, run once a
/// transaction has been signed by [`sign_transaction`].
pub fn verify_created_transaction_invariants(
    params: &CreateTransactionParams,
    tx: &Transaction,
    inputs: &[UxBalance],
    config: CoreConfig,
) -> Result<(), InvariantViolated> {
    verify_unsigned_invariants(params, tx, inputs, config)?;
    if tx.sigs.len() != tx.inputs.len() || tx.inputs.len() != inputs.len() {
        return Err(InvariantViolated::new("sigs/inputs/selected-inputs length mismatch"));
    }
    Ok(())
}
