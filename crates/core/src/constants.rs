//! Protocol constants. All coin values are in droplets (1 coin = 10^6 droplets).

/// Droplets per whole coin.
pub const COIN: u64 = 1_000_000;

/// Seconds of UTXO age required to earn one coin-hour per whole coin held.
///
/// `earned_hours = (coins / COIN) * (age_seconds / SECONDS_PER_COIN_HOUR)`,
/// i.e. one coin held for one hour earns one coin-hour.
pub const SECONDS_PER_COIN_HOUR: u64 = 3600;

/// Default burn factor when `COINHOUR_BURN_FACTOR` is unset.
pub const DEFAULT_BURN_FACTOR: u64 = 1000;

/// Environment variable carrying the process-wide burn factor.
pub const BURN_FACTOR_ENV_VAR: &str = "COINHOUR_BURN_FACTOR";

/// Bound on the change-rescue / share-factor retry loop: at most this many
/// total attempts of the construction algorithm (the first attempt plus
/// bounded retries), never unbounded recursion.
pub const MAX_BUILD_ATTEMPTS: u32 = 2;

/// Length in bytes of a pubkey hash (hash160-style) used inside an address.
pub const PUBKEY_HASH_LEN: usize = 20;

/// Length in bytes of an address checksum.
pub const ADDRESS_CHECKSUM_LEN: usize = 4;
