//! Fee appraisal.
//!
//! Legacy Dash fees are one satoshi per byte, but the final size is only
//! known after signing: each DER signature's R and S values carry a
//! sign-padding byte roughly half the time. [`appraise`] brackets the
//! signed size between the all-unpadded and all-padded cases.

use dash_primitives::util::VarInt;
use serde::{Deserialize, Serialize};

use crate::output::TxOutput;
use crate::transaction::Transaction;
use crate::TransactionError;

/// version (2) + type (2) + locktime (4).
pub const HEADER_FIXED_SIZE: u64 = 8;

/// txid (32) + index (4) + script length (1) + unpadded signed script (106) + sequence (4).
pub const MIN_INPUT_SIZE: u64 = 147;

/// Worst-case extra bytes per input: one padding byte each for R and S.
pub const MAX_INPUT_PAD: u64 = 2;

pub const MAX_INPUT_SIZE: u64 = MIN_INPUT_SIZE + MAX_INPUT_PAD;

/// A P2PKH value output.
pub const OUTPUT_SIZE: u64 = 34;

/// Bracketed estimate of the signed transaction size in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeEstimate {
    /// No signature needed padding.
    pub min: u64,
    /// Midpoint; the signed size is at or below it about 75% of the time.
    pub mid: u64,
    /// Every signature needed padding on both R and S.
    pub max: u64,
}

impl FeeEstimate {
    fn from_bounds(min: u64, max: u64) -> Self {
        let mid = min + (max - min).div_ceil(2);
        FeeEstimate { min, mid, max }
    }
}

/// Size of the fixed header for the given counts and payload.
pub fn header_size(input_count: usize, output_count: usize, tx_type: u16, extra_payload_len: usize) -> u64 {
    let mut size = HEADER_FIXED_SIZE
        + VarInt::from(input_count).length() as u64
        + VarInt::from(output_count).length() as u64;
    if tx_type > 0 {
        size += (VarInt::from(extra_payload_len).length() + extra_payload_len) as u64;
    }
    size
}

/// Size of the outputs; P2PKH outputs count [`OUTPUT_SIZE`], memo and
/// custom-script outputs their exact size.
pub fn outputs_size(outputs: &[TxOutput]) -> Result<u64, TransactionError> {
    outputs.iter().try_fold(0u64, |acc, output| Ok(acc + output.size()? as u64))
}

/// Estimate the signed size of a classic transaction from its shape.
///
/// # Arguments
/// * `input_count` - Number of inputs, all assumed to be signed P2PKH.
/// * `outputs` - The outputs.
pub fn appraise_counts(input_count: usize, outputs: &[TxOutput]) -> Result<FeeEstimate, TransactionError> {
    let base = header_size(input_count, outputs.len(), 0, 0) + outputs_size(outputs)?;
    let n = input_count as u64;
    Ok(FeeEstimate::from_bounds(base + n * MIN_INPUT_SIZE, base + n * MAX_INPUT_SIZE))
}

/// Estimate the signed size (and so the fee) of a transaction.
///
/// # Returns
/// `{min, mid, max}` where `max - min` is [`MAX_INPUT_PAD`] per input.
pub fn appraise(tx: &Transaction) -> Result<FeeEstimate, TransactionError> {
    let base = header_size(tx.inputs.len(), tx.outputs.len(), tx.tx_type, tx.extra_payload.len())
        + outputs_size(&tx.outputs)?;
    let n = tx.inputs.len() as u64;
    Ok(FeeEstimate::from_bounds(base + n * MIN_INPUT_SIZE, base + n * MAX_INPUT_SIZE))
}
