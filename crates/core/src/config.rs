//! Process-wide read-mostly configuration.
//!
//! `burn_factor` is host-supplied configuration read from
//! `COINHOUR_BURN_FACTOR` (or a default) once at startup and then treated
//! as immutable, injected by value wherever it affects fee math so
//! tests can parameterize it. This is a single validated integer knob, not
//! the layered file/env/CLI configuration a full node binary's own config
//! crate would exist for — that surface is out of scope for this core.
//! A bare `std::env::var` read with explicit validation is the
//! right-sized ambient surface here (see `DESIGN.md`).

use std::env;

use crate::constants::{BURN_FACTOR_ENV_VAR, DEFAULT_BURN_FACTOR};
use crate::error::ConfigError;

/// Process-wide read-mostly configuration for the transaction builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreConfig {
    /// Minimum fee hours = `ceil(total_input_hours / burn_factor)`. Must be > 1.
    pub burn_factor: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            burn_factor: DEFAULT_BURN_FACTOR,
        }
    }
}

impl CoreConfig {
    /// Read `burn_factor` from `COINHOUR_BURN_FACTOR`, falling back to
    /// [`DEFAULT_BURN_FACTOR`] when unset. An unset variable is not an
    /// error; a malformed or out-of-range one is.
    pub fn from_env() -> Result<Self, ConfigError> {
        match env::var(BURN_FACTOR_ENV_VAR) {
            Ok(raw) => {
                let burn_factor: u64 = raw
                    .parse()
                    .map_err(|_| ConfigError::InvalidBurnFactor(raw.clone()))?;
                Self::validated(burn_factor)
            }
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn validated(burn_factor: u64) -> Result<Self, ConfigError> {
        if burn_factor <= 1 {
            return Err(ConfigError::BurnFactorTooSmall(burn_factor));
        }
        Ok(Self { burn_factor })
    }
}
