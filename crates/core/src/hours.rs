//! Fee rule and coin-hour distribution helpers.

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};

use crate::error::BuilderError;

/// `ceil(hours / burn_factor)`.
pub fn required_fee(hours: u64, burn_factor: u64) -> u64 {
    debug_assert!(burn_factor > 1);
    hours.div_ceil(burn_factor)
}

/// `hours - required_fee(hours, burn_factor)`.
pub fn remaining_hours(hours: u64, burn_factor: u64) -> u64 {
    hours - required_fee(hours, burn_factor)
}

/// Split `input_hours` between a change output and `n_recipients` outputs,
/// used by the simple single-destination spend path.
///
/// `remaining = input_hours - required_fee`. If `have_change`, change gets
/// `remaining / 2` plus the odd remainder; the rest is split evenly across
/// recipients, with any leftover distributed one-per-recipient starting
/// from index 0. Returns `(change_hours, recipient_hours, sum)` where `sum
/// == remaining` always holds.
pub fn distribute_spend_hours(
    input_hours: u64,
    n_recipients: u64,
    have_change: bool,
    burn_factor: u64,
) -> (u64, Vec<u64>, u64) {
    let fee_hours = required_fee(input_hours, burn_factor);
    let remaining = input_hours.saturating_sub(fee_hours);

    let (change_hours, remaining_for_addrs) = if have_change {
        let half = remaining / 2;
        let odd = remaining % 2;
        (half + odd, remaining - (half + odd))
    } else {
        (0, remaining)
    };

    if n_recipients == 0 {
        let sum = change_hours + remaining_for_addrs;
        return (sum, Vec::new(), sum);
    }

    let share = remaining_for_addrs / n_recipients;
    let extra = remaining_for_addrs % n_recipients;

    let mut addr_hours = vec![share; n_recipients as usize];
    for slot in addr_hours.iter_mut().take(extra as usize) {
        *slot += 1;
    }

    let sum: u64 = change_hours + addr_hours.iter().sum::<u64>();
    debug_assert_eq!(sum, remaining);
    (change_hours, addr_hours, sum)
}

/// Distribute `hours` proportionally to `coins` via big-integer arithmetic,
/// losing no value to floor-division rounding.
///
/// Preconditions: `coins` non-empty; every value non-zero (a caller with a
/// zero-coin recipient is a validation bug upstream, not a runtime
/// possibility here since recipients are validated before this is called).
pub fn distribute_hours_proportional(coins: &[u64], hours: u64) -> Result<Vec<u64>, BuilderError> {
    if coins.is_empty() {
        return Err(BuilderError::MathOverflow("distribute_hours_proportional: empty coins"));
    }
    if coins.iter().any(|&c| c == 0) {
        return Err(BuilderError::MathOverflow(
            "distribute_hours_proportional: zero-valued coin entry",
        ));
    }

    let total: BigUint = coins.iter().map(|&c| BigUint::from(c)).sum();
    let hours_big = BigUint::from(hours);

    let mut addr_hours = Vec::with_capacity(coins.len());
    let mut assigned = BigUint::zero();
    for &c in coins {
        let share = (BigUint::from(c) * &hours_big) / &total;
        assigned += &share;
        addr_hours.push(share.to_u64().ok_or(BuilderError::MathOverflow(
            "distribute_hours_proportional: share exceeds u64",
        ))?);
    }

    if assigned > hours_big {
        return Err(BuilderError::MathOverflow(
            "distribute_hours_proportional: assigned exceeds hours",
        ));
    }
    let remaining = hours - assigned.to_u64().expect("assigned <= hours fits u64");
    if remaining as usize > coins.len() {
        return Err(BuilderError::MathOverflow(
            "distribute_hours_proportional: remaining exceeds coin count",
        ));
    }

    let mut left = remaining;
    // First pass: top up zero-valued shares.
    for slot in addr_hours.iter_mut() {
        if left == 0 {
            break;
        }
        if *slot == 0 {
            *slot += 1;
            left -= 1;
        }
    }
    // Second pass: cyclic top-up from index 0 for any further remainder.
    if left > 0 {
        for slot in addr_hours.iter_mut().cycle() {
            if left == 0 {
                break;
            }
            *slot += 1;
            left -= 1;
        }
    }

    debug_assert_eq!(addr_hours.iter().sum::<u64>(), hours);
    Ok(addr_hours)
}
