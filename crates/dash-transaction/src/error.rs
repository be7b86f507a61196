use dash_primitives::PrimitivesError;
use dash_script::ScriptError;

use crate::parser::ParsedTransaction;

/// Satoshis per DASH, used when reporting amounts to people.
pub const SATOSHIS_PER_DASH: u64 = 100_000_000;

/// Render satoshis as a fixed eight-decimal DASH amount.
pub fn to_dash(satoshis: u64) -> String {
    format!(
        "{}.{:08}",
        satoshis / SATOSHIS_PER_DASH,
        satoshis % SATOSHIS_PER_DASH
    )
}

fn dash_of(satoshis: &u64) -> String {
    to_dash(*satoshis)
}

/// Error types for transaction operations.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// The transaction or one of its fields is malformed.
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    /// A transaction was serialized without any outputs.
    #[error("`outputs` list must not be empty; use a memo output or allow a donation explicitly")]
    EmptyOutputs,

    /// The key list does not line up with the inputs.
    #[error("number of 'keys' ({keys}) must match number of 'inputs' ({inputs})")]
    KeyCountMismatch {
        /// Number of keys supplied.
        keys: usize,
        /// Number of inputs in the transaction.
        inputs: usize,
    },

    /// Two outputs of equal value cannot be put in a deterministic order.
    #[error("incomparable outputs: {0}")]
    IncomparableOutputs(String),

    /// The SIGHASH type is not supported.
    #[error("unsupported sighash type 0x{0:02x}: only ALL and NONE (optionally with ANYONECANPAY) are supported")]
    UnsupportedSigHash(u32),

    /// The injected signer failed or misbehaved.
    #[error("signing error: {0}")]
    SigningError(String),

    /// Inputs or outputs were not in deterministic order.
    #[error("unsorted transaction: {0}")]
    Unsorted(String),

    /// The selected coins cannot pay for the amount plus fee.
    #[error(
        "insufficient funds: cannot pay for {} ({amount}) + fee {} ({fee}) with a balance of {} ({balance})",
        dash_of(.amount), dash_of(.fee), dash_of(.balance)
    )]
    InsufficientFunds {
        /// Requested amount in satoshis.
        amount: u64,
        /// Required fee in satoshis.
        fee: u64,
        /// Available balance in satoshis.
        balance: u64,
    },

    /// The fee-target finalizer exhausted its retry bound.
    #[error("fee target not reached: {0}")]
    NoConvergence(String),

    /// Hex could not be parsed as a transaction. Carries what was read so far.
    #[error("failed to parse transaction: {message}")]
    Parse {
        /// What went wrong and where.
        message: String,
        /// The structure as far as it was parsed.
        partial: Box<ParsedTransaction>,
    },

    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    /// An underlying script error (forwarded from `dash-script`).
    #[error("script error: {0}")]
    Script(#[from] ScriptError),

    /// An underlying primitives error (forwarded from `dash-primitives`).
    #[error("primitives error: {0}")]
    Primitives(#[from] PrimitivesError),
}

impl TransactionError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            TransactionError::Primitives(PrimitivesError::IntRange(e))
            | TransactionError::Script(ScriptError::Primitives(PrimitivesError::IntRange(e))) => {
                e.code()
            }
            TransactionError::InsufficientFunds { .. } => "E_INSUFFICIENT_FUNDS",
            TransactionError::NoConvergence(_) => "E_NO_CONVERGE",
            TransactionError::Parse { .. } => "E_TX_PARSE",
            TransactionError::UnsupportedSigHash(_) => "E_UNSUPPORTED_SIGHASH",
            TransactionError::SigningError(_) => "E_SIGNER",
            TransactionError::Unsorted(_) => "E_UNSORTED",
            TransactionError::Config(_) => "E_CONFIG",
            _ => "E_INVALID_INPUT",
        }
    }

    /// The partially parsed transaction attached to a parse error.
    pub fn partial(&self) -> Option<&ParsedTransaction> {
        match self {
            TransactionError::Parse { partial, .. } => Some(partial),
            _ => None,
        }
    }
}
