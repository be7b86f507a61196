//! Core transaction type and its wire serializer.
//!
//! Represents a Dash legacy-format transaction: a 16-bit version and
//! 16-bit type, inputs, outputs, locktime, and (for `tx_type > 0`) a
//! length-prefixed extra payload.

use dash_primitives::hash::sha256d;
use dash_primitives::util::{decode_hex, DashWriter, VarInt};

use crate::config::{DEFAULT_VERSION, TYPE_CLASSIC};
use crate::input::TxInput;
use crate::output::TxOutput;
use crate::TransactionError;

/// A Dash transaction.
///
/// # Wire format
///
/// | Field         | Size                          |
/// |---------------|-------------------------------|
/// | version       | 2 bytes (LE)                  |
/// | type          | 2 bytes (LE)                  |
/// | input count   | VarInt                        |
/// | inputs        | variable (per input)          |
/// | output count  | VarInt                        |
/// | outputs       | variable (per output)         |
/// | locktime      | 4 bytes (LE)                  |
/// | extra payload | VarInt + bytes, if `type > 0` |
///
/// When rendered as a signature preimage a 4-byte LE SIGHASH type follows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub version: u16,
    /// 0 for classic payments; special transactions carry `extra_payload`.
    pub tx_type: u16,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub locktime: u32,
    pub extra_payload: Vec<u8>,
}

impl Transaction {
    /// Create an empty version-3 classic transaction.
    pub fn new() -> Self {
        Transaction {
            version: DEFAULT_VERSION,
            tx_type: TYPE_CLASSIC,
            inputs: Vec::new(),
            outputs: Vec::new(),
            locktime: 0,
            extra_payload: Vec::new(),
        }
    }

    /// Create a classic transaction from inputs and outputs.
    pub fn with_parts(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Self {
        Transaction { inputs, outputs, ..Self::new() }
    }

    // -----------------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------------

    /// Serialize the transaction to wire bytes.
    ///
    /// # Returns
    /// The bytes, or an error if there are no outputs or an output has no
    /// usable script.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TransactionError> {
        let mut writer = DashWriter::with_capacity(self.estimated_capacity());
        self.write_to(&mut writer, false)?;
        Ok(writer.into_bytes())
    }

    /// Serialize the transaction and append the SIGHASH type word.
    ///
    /// An empty output list is allowed here, as `SIGHASH_NONE` commits
    /// to no outputs.
    pub fn to_preimage_bytes(&self, sig_hash_type: u32) -> Result<Vec<u8>, TransactionError> {
        let mut writer = DashWriter::with_capacity(self.estimated_capacity() + 4);
        self.write_to(&mut writer, true)?;
        writer.write_u32_le(sig_hash_type);
        Ok(writer.into_bytes())
    }

    /// Serialize to hex, optionally as a signature preimage.
    ///
    /// # Arguments
    /// * `sig_hash_type` - `Some(flags)` appends the SIGHASH trailer.
    pub fn serialize(&self, sig_hash_type: Option<u32>) -> Result<String, TransactionError> {
        let bytes = match sig_hash_type {
            Some(flags) => self.to_preimage_bytes(flags)?,
            None => self.to_bytes()?,
        };
        Ok(hex::encode(bytes))
    }

    /// Serialize the transaction to a hex string.
    pub fn to_hex(&self) -> Result<String, TransactionError> {
        self.serialize(None)
    }

    fn write_to(&self, writer: &mut DashWriter, preimage: bool) -> Result<(), TransactionError> {
        if self.outputs.is_empty() && !preimage {
            return Err(TransactionError::EmptyOutputs);
        }

        writer.write_u16_le(self.version);
        writer.write_u16_le(self.tx_type);

        writer.write_varint(VarInt::from(self.inputs.len()));
        for input in &self.inputs {
            input.write_to(writer)?;
        }

        writer.write_varint(VarInt::from(self.outputs.len()));
        for (i, output) in self.outputs.iter().enumerate() {
            output.write_to(writer).map_err(|e| match e {
                TransactionError::InvalidTransaction(msg) => {
                    TransactionError::InvalidTransaction(format!("outputs[{}]: {}", i, msg))
                }
                other => other,
            })?;
        }

        writer.write_u32_le(self.locktime);
        if self.tx_type > 0 {
            writer.write_var_bytes(&self.extra_payload);
        }
        Ok(())
    }

    fn estimated_capacity(&self) -> usize {
        12 + self.inputs.len() * 150 + self.outputs.len() * 34 + self.extra_payload.len()
    }

    // -----------------------------------------------------------------------
    // Identification
    // -----------------------------------------------------------------------

    /// Compute the transaction id in display (reversed) byte order.
    pub fn tx_id(&self) -> Result<[u8; 32], TransactionError> {
        Ok(id_of(&self.to_bytes()?))
    }

    /// Compute the transaction id as a display-order hex string.
    pub fn tx_id_hex(&self) -> Result<String, TransactionError> {
        Ok(hex::encode(self.tx_id()?))
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Sum of all output values.
    pub fn total_output_satoshis(&self) -> Result<u64, TransactionError> {
        sum_satoshis(self.outputs.iter().map(TxOutput::satoshis))
    }

    /// Sum of all input values.
    ///
    /// # Returns
    /// The total, or an error naming the first input without a known value.
    pub fn total_input_satoshis(&self) -> Result<u64, TransactionError> {
        self.inputs.iter().enumerate().try_fold(0u64, |acc, (i, input)| {
            let satoshis = input.satoshis().ok_or_else(|| {
                TransactionError::InvalidTransaction(format!(
                    "inputs[{}] has no 'satoshis' value",
                    i
                ))
            })?;
            add_satoshis(acc, satoshis)
        })
    }

    /// Replace an empty output list with a single zero-value memo output.
    pub fn donate_if_empty(&mut self) {
        if self.outputs.is_empty() {
            self.outputs.push(TxOutput::donation());
        }
    }

    /// Copy with every input reduced to its bare outpoint.
    pub fn to_raw(&self) -> Transaction {
        Transaction {
            inputs: self.inputs.iter().map(TxInput::to_raw).collect(),
            ..self.clone()
        }
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

/// Add two satoshi amounts, failing instead of wrapping past `u64::MAX`.
pub fn add_satoshis(a: u64, b: u64) -> Result<u64, TransactionError> {
    a.checked_add(b).ok_or_else(|| {
        TransactionError::InvalidTransaction("satoshi total exceeds u64".to_string())
    })
}

/// Sum satoshi amounts with [`add_satoshis`].
pub fn sum_satoshis(values: impl IntoIterator<Item = u64>) -> Result<u64, TransactionError> {
    values.into_iter().try_fold(0, add_satoshis)
}

/// Transaction id of serialized transaction bytes: sha256d, byte-reversed.
pub fn id_of(bytes: &[u8]) -> [u8; 32] {
    let mut id = sha256d(bytes);
    id.reverse();
    id
}

/// Transaction id of a serialized transaction given as hex.
pub fn get_id(tx_hex: &str) -> Result<String, TransactionError> {
    let bytes = decode_hex("transaction", tx_hex)?;
    Ok(hex::encode(id_of(&bytes)))
}
