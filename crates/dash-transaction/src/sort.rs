//! Deterministic (BIP-69 style) ordering of inputs and outputs.
//!
//! Inputs sort by display-order txid, then output index. Outputs sort by
//! value; equal values put memo outputs first (by memo bytes), then value
//! outputs by lock script. Outputs known only by address order among
//! themselves by address.

use std::cmp::Ordering;

use crate::input::TxInput;
use crate::output::{OutputValue, TxOutput};
use crate::TransactionError;

/// Compare two inputs by outpoint.
pub fn compare_inputs(a: &TxInput, b: &TxInput) -> Ordering {
    a.outpoint().cmp(b.outpoint())
}

/// Compare two outputs.
///
/// # Returns
/// The ordering, or `IncomparableOutputs` when two equal-value outputs
/// describe their destinations in ways that cannot be related (e.g. one
/// only has an address, the other only a script).
pub fn compare_outputs(a: &TxOutput, b: &TxOutput) -> Result<Ordering, TransactionError> {
    let by_value = a.satoshis().cmp(&b.satoshis());
    if by_value != Ordering::Equal {
        return Ok(by_value);
    }
    match (a, b) {
        (TxOutput::Memo(x), TxOutput::Memo(y)) => Ok(x.memo.cmp(&y.memo)),
        (TxOutput::Memo(_), TxOutput::Value(_)) => Ok(Ordering::Less),
        (TxOutput::Value(_), TxOutput::Memo(_)) => Ok(Ordering::Greater),
        (TxOutput::Value(x), TxOutput::Value(y)) => compare_destinations(x, y),
    }
}

/// What an equal-value output is ordered by.
#[derive(PartialEq, Eq, PartialOrd, Ord)]
enum TieBreak<'a> {
    /// Known lock script, built from the public key hash or the raw script.
    LockScript(Vec<u8>),
    /// Address not yet resolved to a hash.
    Address(&'a str),
}

fn tie_break(output: &OutputValue) -> Option<TieBreak<'_>> {
    if output.pub_key_hash.is_some() || output.script.is_some() {
        return output.lock_script().ok().map(|s| TieBreak::LockScript(s.into_bytes()));
    }
    output.address.as_deref().map(TieBreak::Address)
}

fn compare_destinations(a: &OutputValue, b: &OutputValue) -> Result<Ordering, TransactionError> {
    match (tie_break(a), tie_break(b)) {
        (Some(x @ TieBreak::LockScript(_)), Some(y @ TieBreak::LockScript(_)))
        | (Some(x @ TieBreak::Address(_)), Some(y @ TieBreak::Address(_))) => Ok(x.cmp(&y)),
        _ => Err(TransactionError::IncomparableOutputs(format!(
            "two outputs of {} satoshis cannot be ordered: one has only an address and \
             the other a 'pubKeyHash' or 'script'; resolve the address first",
            a.satoshis
        ))),
    }
}

/// Sort inputs in place.
pub fn sort_inputs(inputs: &mut [TxInput]) {
    inputs.sort_by(compare_inputs);
}

/// Sort outputs in place.
///
/// Fails without reordering anything if two outputs are incomparable.
pub fn sort_outputs(outputs: &mut [TxOutput]) -> Result<(), TransactionError> {
    check_comparable(outputs)?;
    outputs.sort_by(|a, b| compare_outputs(a, b).unwrap_or(Ordering::Equal));
    Ok(())
}

/// Whether the inputs are already in deterministic order.
pub fn inputs_sorted(inputs: &[TxInput]) -> bool {
    inputs
        .windows(2)
        .all(|w| compare_inputs(&w[0], &w[1]) != Ordering::Greater)
}

/// Whether the outputs are already in deterministic order.
pub fn outputs_sorted(outputs: &[TxOutput]) -> Result<bool, TransactionError> {
    for w in outputs.windows(2) {
        if compare_outputs(&w[0], &w[1])? == Ordering::Greater {
            return Ok(false);
        }
    }
    Ok(true)
}

fn check_comparable(outputs: &[TxOutput]) -> Result<(), TransactionError> {
    for (i, a) in outputs.iter().enumerate() {
        for b in &outputs[i + 1..] {
            compare_outputs(a, b)?;
        }
    }
    Ok(())
}
