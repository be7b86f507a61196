//! Dash transactions: building, signing, fee appraisal, coin selection,
//! deterministic ordering, serialization and parsing.
//!
//! Key material and elliptic-curve math stay outside the crate, behind the
//! [`TxSigner`] trait.

pub mod config;
pub mod dash_tx;
pub mod fees;
pub mod input;
pub mod legacy;
pub mod output;
pub mod parser;
pub mod sighash;
pub mod signer;
pub mod sort;
pub mod transaction;

mod error;
pub use config::{DashTxConfig, SortPolicy};
pub use dash_tx::{DashTx, SignedTx};
pub use error::{to_dash, TransactionError, SATOSHIS_PER_DASH};
pub use fees::FeeEstimate;
pub use input::{InputForSig, InputSigned, LockSource, Outpoint, TxId, TxInput};
pub use legacy::{Coin, Recipient, TxDraft, TxSummary};
pub use output::{OutputMemo, OutputValue, TxOutput};
pub use parser::{parse_unknown, ParsedTransaction};
pub use signer::{PrivateKey, TxSigner};
pub use transaction::Transaction;

#[cfg(test)]
mod tests;
