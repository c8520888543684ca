//! UTXO -> balance projection with coin-hour accrual, and the total
//! orderings the selector sorts by.

use crate::address::Address;
use crate::constants::{COIN, SECONDS_PER_COIN_HOUR};
use crate::types::{Hash256, UxOut};

/// The selector's working projection of a [`UxOut`]: its coin-hours as of
/// a given head time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UxBalance {
    pub hash: Hash256,
    pub block_seq: u64,
    pub block_time: u64,
    pub address: Address,
    pub coins: u64,
    pub initial_hours: u64,
    /// `initial_hours` plus hours earned between `block_time` and head
    /// time. Invariant: `hours >= initial_hours`.
    pub hours: u64,
    pub src_transaction: Hash256,
}

impl UxBalance {
    /// Project a [`UxOut`] to `head_time`. Total and saturating: a
    /// `head_time` before `block_time` contributes zero earned hours
    /// rather than going negative, and earned-hours accumulation saturates
    /// at `u64::MAX` rather than overflowing.
    pub fn new(head_time: u64, ux: &UxOut) -> Self {
        let dt_seconds = head_time.saturating_sub(ux.head.block_time);
        let earned = earned_hours(ux.body.coins, dt_seconds);
        let hours = ux.body.hours.saturating_add(earned);
        Self {
            hash: ux.hash(),
            block_seq: ux.head.block_seq,
            block_time: ux.head.block_time,
            address: ux.body.address.clone(),
            coins: ux.body.coins,
            initial_hours: ux.body.hours,
            hours,
            src_transaction: ux.body.src_transaction,
        }
    }

    /// Project every entry in `uxa` to `head_time`.
    pub fn new_batch(head_time: u64, uxa: &[UxOut]) -> Vec<Self> {
        uxa.iter().map(|ux| Self::new(head_time, ux)).collect()
    }
}

/// Coin-hours earned over `dt_seconds` by `coins` droplets, at the
/// reference rate of one coin-hour per whole coin per hour held.
/// Multiplies before dividing, matching the reference `CoinHours`
/// ordering, so sub-hour remainders aren't truncated away before being
/// scaled by `whole_coins`. Saturates rather than overflowing.
pub fn earned_hours(coins: u64, dt_seconds: u64) -> u64 {
    let whole_coins = coins / COIN;
    let product = (whole_coins as u128) * (dt_seconds as u128);
    let coin_hours = product / (SECONDS_PER_COIN_HOUR as u128);
    coin_hours.min(u64::MAX as u128) as u64
}

/// Set difference `a \ b`, by hash. Used by the change-rescue step to find
/// candidate extra inputs outside the already-chosen spend set.
pub fn uxbalances_sub(a: &[UxBalance], b: &[UxBalance]) -> Vec<UxBalance> {
    let chosen: std::collections::HashSet<Hash256> = b.iter().map(|u| u.hash).collect();
    a.iter().filter(|u| !chosen.contains(&u.hash)).cloned().collect()
}

/// Total order by coin value (direction per `asc`), tie-broken by hours
/// ascending, then by age (block_seq ascending, older first), then by hash.
/// The hash tie-break is asserted unique: two distinct `UxBalance`s with
/// equal hash would be a protocol-level duplicate-UTXO bug.
pub fn sort_by_coins(uxa: &mut [UxBalance], ascending: bool) {
    uxa.sort_by(|a, b| cmp_by_coins(a, b, ascending));
}

/// Total order by hours ascending, tie-broken by coins ascending, then age,
/// then hash.
pub fn sort_by_hours_ascending(uxa: &mut [UxBalance]) {
    uxa.sort_by(|a, b| cmp_by_hours(a, b, true));
}

fn cmp_by_coins(a: &UxBalance, b: &UxBalance, ascending: bool) -> std::cmp::Ordering {
    let primary = if ascending {
        a.coins.cmp(&b.coins)
    } else {
        b.coins.cmp(&a.coins)
    };
    primary
        .then_with(|| a.hours.cmp(&b.hours))
        .then_with(|| a.block_seq.cmp(&b.block_seq))
        .then_with(|| cmp_by_uxid(a, b))
}

fn cmp_by_hours(a: &UxBalance, b: &UxBalance, ascending: bool) -> std::cmp::Ordering {
    let primary = if ascending {
        a.hours.cmp(&b.hours)
    } else {
        b.hours.cmp(&a.hours)
    };
    primary
        .then_with(|| a.coins.cmp(&b.coins))
        .then_with(|| a.block_seq.cmp(&b.block_seq))
        .then_with(|| cmp_by_uxid(a, b))
}

fn cmp_by_uxid(a: &UxBalance, b: &UxBalance) -> std::cmp::Ordering {
    let ordering = a.hash.as_bytes().cmp(b.hash.as_bytes());
    debug_assert!(
        ordering != std::cmp::Ordering::Equal || a.hash == b.hash,
        "duplicate UxOut hash reached the selector"
    );
    ordering
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::AddressFamily;
    use crate::types::{UxBody, UxHead};

    fn sample_address() -> Address {
        Address::from_pubkey_hash([1; 20], AddressFamily::Skycoin)
    }

    fn ux(coins: u64, hours: u64, block_time: u64, block_seq: u64) -> UxOut {
        UxOut {
            head: UxHead { block_seq, block_time },
            body: UxBody {
                src_transaction: Hash256([0x11; 32]),
                address: sample_address(),
                coins,
                hours,
            },
        }
    }

    #[test]
    fn hours_never_decrease() {
        let out = ux(5_000_000, 10, 1000, 0);
        let projected = UxBalance::new(1000 + 3600 * 5, &out);
        assert!(projected.hours >= projected.initial_hours);
        assert_eq!(projected.hours, 10 + 5 * 5);
    }

    #[test]
    fn no_earned_hours_when_head_time_before_block_time() {
        let out = ux(1_000_000, 10, 10_000, 0);
        let projected = UxBalance::new(5_000, &out);
        assert_eq!(projected.hours, 10);
    }

    #[test]
    fn fractional_coins_below_one_whole_coin_earn_nothing() {
        let out = ux(COIN / 2, 0, 0, 0);
        let projected = UxBalance::new(SECONDS_PER_COIN_HOUR * 10, &out);
        assert_eq!(projected.hours, 0);
    }

    #[test]
    fn earned_hours_saturates_instead_of_overflowing() {
        assert_eq!(earned_hours(u64::MAX, u64::MAX), u64::MAX);
    }

    #[test]
    fn earned_hours_multiplies_before_dividing() {
        // 2 whole coins held for half an hour (1800s) earn 1 coin-hour
        // under multiply-then-divide: (2 * 1800) / 3600 = 1. A
        // divide-then-multiply ordering would truncate 1800/3600 to 0
        // first and undercount it as 0.
        assert_eq!(earned_hours(2 * COIN, 1_800), 1);
    }

    #[test]
    fn sort_by_coins_descending() {
        let mut balances = vec![
            UxBalance::new(0, &ux(5_000_000, 1, 0, 0)),
            UxBalance::new(0, &ux(10_000_000, 1, 0, 1)),
            UxBalance::new(0, &ux(1_000_000, 1, 0, 2)),
        ];
        sort_by_coins(&mut balances, false);
        assert_eq!(
            balances.iter().map(|b| b.coins).collect::<Vec<_>>(),
            vec![10_000_000, 5_000_000, 1_000_000]
        );
    }

    #[test]
    fn sort_by_coins_ascending() {
        let mut balances = vec![
            UxBalance::new(0, &ux(5_000_000, 1, 0, 0)),
            UxBalance::new(0, &ux(10_000_000, 1, 0, 1)),
            UxBalance::new(0, &ux(1_000_000, 1, 0, 2)),
        ];
        sort_by_coins(&mut balances, true);
        assert_eq!(
            balances.iter().map(|b| b.coins).collect::<Vec<_>>(),
            vec![1_000_000, 5_000_000, 10_000_000]
        );
    }

    #[test]
    fn uxbalances_sub_removes_by_hash() {
        let a = UxBalance::new(0, &ux(1_000_000, 1, 0, 0));
        let b = UxBalance::new(0, &ux(2_000_000, 1, 0, 1));
        let all = vec![a.clone(), b.clone()];
        let minus_a = uxbalances_sub(&all, &[a]);
        assert_eq!(minus_a.len(), 1);
        assert_eq!(minus_a[0].hash, b.hash);
    }
}
