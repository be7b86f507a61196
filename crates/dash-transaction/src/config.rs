//! Tunables for building, ordering and finalizing transactions.

use serde::{Deserialize, Serialize};

use crate::sighash::SIGHASH_DEFAULT;
use crate::TransactionError;

/// Transaction version used for new transactions.
pub const DEFAULT_VERSION: u16 = 3;

/// Transaction type for classic payments (no extra payload).
pub const TYPE_CLASSIC: u16 = 0;

/// Smallest change output worth creating; smaller leftovers become fee.
pub const LEGACY_DUST: u64 = 2000;

/// What to do when inputs or outputs are not in deterministic order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortPolicy {
    /// Log a warning and continue.
    #[default]
    Warn,
    /// Refuse to sign.
    Require,
}

/// Configuration for a [`DashTx`](crate::DashTx).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DashTxConfig {
    /// Version for transactions built by the coin selector.
    pub version: u16,
    /// Type for transactions built by the coin selector.
    pub tx_type: u16,
    /// Locktime for transactions built by the coin selector.
    pub locktime: u32,
    /// Dust threshold in satoshis.
    pub dust: u64,
    /// SIGHASH type given to inputs created from coins.
    pub sig_hash_type: u32,
    /// How many times a randomized signer is retried before walking the fee.
    pub max_entropy_retries: u32,
    /// Ordering enforcement at signing time.
    pub sort_policy: SortPolicy,
    /// Synthesize a zero-value memo output when a build has no outputs.
    pub allow_donation: bool,
}

impl Default for DashTxConfig {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION,
            tx_type: TYPE_CLASSIC,
            locktime: 0,
            dust: LEGACY_DUST,
            sig_hash_type: SIGHASH_DEFAULT,
            max_entropy_retries: 10,
            sort_policy: SortPolicy::Warn,
            allow_donation: false,
        }
    }
}

impl DashTxConfig {
    /// Load a configuration from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, TransactionError> {
        Ok(serde_json::from_str(json)?)
    }
}
