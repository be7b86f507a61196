#![deny(missing_docs)]

//! Dash transaction SDK.
//!
//! Re-exports the primitives, script and transaction crates for
//! single-crate usage. Start with [`transaction::DashTx`] and a
//! [`transaction::TxSigner`] implementation.

pub use dash_primitives as primitives;
pub use dash_script as script;
pub use dash_transaction as transaction;
