//! Signature hash computation for transaction signing.
//!
//! Dash uses the original (pre-BIP-143) algorithm: the transaction is
//! restricted to the inputs and outputs the SIGHASH flags commit to, the
//! input being signed carries the lock script of the output it spends,
//! every other input carries an empty script, and the serialization plus a
//! 4-byte SIGHASH word is double-SHA256 hashed.

use dash_primitives::hash::sha256d;

use crate::input::{InputForSig, TxInput};
use crate::transaction::Transaction;
use crate::TransactionError;

// -----------------------------------------------------------------------
// Sighash flag constants
// -----------------------------------------------------------------------

/// Sign all inputs and all outputs.
pub const SIGHASH_ALL: u32 = 0x01;

/// Sign the inputs but no outputs.
pub const SIGHASH_NONE: u32 = 0x02;

/// Sign only the output with the same index as the input. Unsupported:
/// outputs are reordered deterministically, so the pairing is not stable.
pub const SIGHASH_SINGLE: u32 = 0x03;

/// Combined with another flag: only sign the current input.
pub const SIGHASH_ANYONECANPAY: u32 = 0x80;

/// Flags given to new inputs: ALL | ANYONECANPAY.
pub const SIGHASH_DEFAULT: u32 = SIGHASH_ALL | SIGHASH_ANYONECANPAY;

/// Mask applied to extract the base sighash type (ALL, NONE, SINGLE).
pub const SIGHASH_MASK: u32 = 0x1f;

/// Whether the ANYONECANPAY bit is set.
pub fn is_anyone_can_pay(sig_hash_type: u32) -> bool {
    sig_hash_type & SIGHASH_ANYONECANPAY != 0
}

// -----------------------------------------------------------------------
// Preimage
// -----------------------------------------------------------------------

/// Build the restricted transaction that is hashed to sign one input.
///
/// # Arguments
/// * `tx`             - The transaction being signed.
/// * `input_index`    - Index of the input being signed.
/// * `sig_hash_type`  - SIGHASH flags.
///
/// # Returns
/// The restricted transaction: with ANYONECANPAY only the signed input,
/// otherwise all inputs with the others reduced to raw outpoints; all
/// outputs for ALL, none for NONE.
pub fn create_hashable(
    tx: &Transaction,
    input_index: usize,
    sig_hash_type: u32,
) -> Result<Transaction, TransactionError> {
    let signing = for_sig_input(tx, input_index)?;

    let inputs = if is_anyone_can_pay(sig_hash_type) {
        vec![TxInput::ForSig(signing)]
    } else {
        tx.inputs
            .iter()
            .enumerate()
            .map(|(i, input)| {
                if i == input_index {
                    TxInput::ForSig(signing.clone())
                } else {
                    input.to_raw()
                }
            })
            .collect()
    };

    let outputs = match sig_hash_type & SIGHASH_MASK {
        SIGHASH_ALL => tx.outputs.clone(),
        SIGHASH_NONE => Vec::new(),
        _ => return Err(TransactionError::UnsupportedSigHash(sig_hash_type)),
    };

    Ok(Transaction { inputs, outputs, ..tx.clone() })
}

/// Serialize the preimage for one input, including the SIGHASH trailer.
pub fn calc_preimage(
    tx: &Transaction,
    input_index: usize,
    sig_hash_type: u32,
) -> Result<Vec<u8>, TransactionError> {
    create_hashable(tx, input_index, sig_hash_type)?.to_preimage_bytes(sig_hash_type)
}

/// Compute the signature hash for one input.
///
/// # Returns
/// The 32-byte double-SHA256 of the preimage, ready to be signed.
pub fn signature_hash(
    tx: &Transaction,
    input_index: usize,
    sig_hash_type: u32,
) -> Result<[u8; 32], TransactionError> {
    Ok(sha256d(&calc_preimage(tx, input_index, sig_hash_type)?))
}

/// Double-hash an already-serialized preimage given as hex.
pub fn hash_partial(preimage_hex: &str) -> Result<[u8; 32], TransactionError> {
    let bytes = dash_primitives::util::decode_hex("preimage", preimage_hex)?;
    Ok(sha256d(&bytes))
}

fn for_sig_input(tx: &Transaction, input_index: usize) -> Result<InputForSig, TransactionError> {
    match tx.inputs.get(input_index) {
        Some(TxInput::ForSig(input)) => Ok(input.clone()),
        Some(_) => Err(TransactionError::InvalidTransaction(format!(
            "signable input must have either 'pubKeyHash' or 'script' (inputs[{}])",
            input_index
        ))),
        None => Err(TransactionError::InvalidTransaction(format!(
            "input index {} out of range ({} inputs)",
            input_index,
            tx.inputs.len()
        ))),
    }
}
