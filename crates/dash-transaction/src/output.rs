//! Transaction outputs: value outputs and OP_RETURN memo outputs.

use dash_primitives::util::{DashWriter, VarInt};
use dash_script::{memo, p2pkh, Script};
use serde::{Deserialize, Serialize};

use crate::TransactionError;

/// Wire size of a P2PKH value output: 8 (value) + 1 (script length) + 25.
pub const P2PKH_OUTPUT_SIZE: usize = 34;

/// An output paying satoshis to a lock script.
///
/// The destination is given by a `pub_key_hash`, an `address` (resolved to a
/// hash by the signer), or a raw `script`. The `change` flag is a local-only
/// annotation marking the output that receives leftover funds; it is not
/// serialized.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OutputValue {
    pub satoshis: u64,
    #[serde(default, with = "opt_hex20", skip_serializing_if = "Option::is_none")]
    pub pub_key_hash: Option<[u8; 20]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<Script>,
    #[serde(skip)]
    pub change: bool,
}

impl OutputValue {
    /// Pay `satoshis` to a public key hash.
    pub fn to_pub_key_hash(satoshis: u64, pub_key_hash: [u8; 20]) -> Self {
        OutputValue { satoshis, pub_key_hash: Some(pub_key_hash), ..Default::default() }
    }

    /// Pay `satoshis` to an address; the signer resolves it before serializing.
    pub fn to_address(satoshis: u64, address: impl Into<String>) -> Self {
        OutputValue { satoshis, address: Some(address.into()), ..Default::default() }
    }

    /// Pay `satoshis` to an arbitrary lock script.
    pub fn to_script(satoshis: u64, script: Script) -> Self {
        OutputValue { satoshis, script: Some(script), ..Default::default() }
    }

    /// The lock script, preferring the public key hash over a raw script.
    ///
    /// # Returns
    /// The lock script, or an error if the output only has an address
    /// (not yet resolved) or nothing at all.
    pub fn lock_script(&self) -> Result<Script, TransactionError> {
        if let Some(pkh) = &self.pub_key_hash {
            return Ok(p2pkh::lock(pkh));
        }
        if let Some(script) = &self.script {
            return Ok(script.clone());
        }
        match &self.address {
            Some(address) => Err(TransactionError::InvalidTransaction(format!(
                "output to address {:?} has no 'pubKeyHash'; resolve the address first",
                address
            ))),
            None => Err(TransactionError::InvalidTransaction(
                "output must have a 'pubKeyHash', 'address' or 'script'".to_string(),
            )),
        }
    }
}

/// A zero-value output carrying up to 80 bytes of data.
///
/// Reads `{"memo": "<hex>"}` or `{"message": "<text>"}`, optionally with
/// `"satoshis": 0`; always writes the hex form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MemoJson")]
pub struct OutputMemo {
    #[serde(with = "hex_bytes")]
    pub memo: Vec<u8>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct MemoJson {
    #[serde(default)]
    satoshis: Option<u64>,
    #[serde(default, deserialize_with = "opt_hex_bytes::deserialize")]
    memo: Option<Vec<u8>>,
    #[serde(default)]
    message: Option<String>,
}

impl TryFrom<MemoJson> for OutputMemo {
    type Error = TransactionError;

    fn try_from(json: MemoJson) -> Result<Self, Self::Error> {
        if let Some(satoshis) = json.satoshis.filter(|&s| s != 0) {
            return Err(TransactionError::InvalidTransaction(format!(
                "memo outputs carry 0 satoshis, not {}",
                satoshis
            )));
        }
        match (json.memo, json.message) {
            (Some(memo), None) => OutputMemo::new(memo),
            (None, Some(message)) => OutputMemo::from_message(&message),
            _ => Err(TransactionError::InvalidTransaction(
                "memo output needs exactly one of 'memo' or 'message'".to_string(),
            )),
        }
    }
}

impl OutputMemo {
    /// A memo from raw bytes.
    pub fn new(memo: impl Into<Vec<u8>>) -> Result<Self, TransactionError> {
        let memo = memo.into();
        if memo.len() > memo::MAX_MEMO_SIZE {
            return Err(dash_script::ScriptError::MemoTooLong(memo.len()).into());
        }
        Ok(OutputMemo { memo })
    }

    /// A memo from a UTF-8 message.
    pub fn from_message(message: &str) -> Result<Self, TransactionError> {
        Self::new(message.as_bytes())
    }

    pub fn lock_script(&self) -> Result<Script, TransactionError> {
        Ok(memo::lock(&self.memo)?)
    }
}

/// A single output of a Dash transaction.
///
/// # Wire format
///
/// | Field         | Size         |
/// |---------------|--------------|
/// | satoshis      | 8 bytes (LE) |
/// | script length | VarInt       |
/// | script        | variable     |
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TxOutput {
    Memo(OutputMemo),
    Value(OutputValue),
}

impl TxOutput {
    /// Shorthand for a P2PKH value output.
    pub fn p2pkh(satoshis: u64, pub_key_hash: [u8; 20]) -> Self {
        TxOutput::Value(OutputValue::to_pub_key_hash(satoshis, pub_key_hash))
    }

    /// Shorthand for a memo output from a UTF-8 message.
    pub fn message(message: &str) -> Result<Self, TransactionError> {
        OutputMemo::from_message(message).map(TxOutput::Memo)
    }

    /// The zero-value empty memo used when a transaction donates everything to fees.
    pub fn donation() -> Self {
        TxOutput::Memo(OutputMemo::default())
    }

    /// Satoshis paid; memo outputs are always zero.
    pub fn satoshis(&self) -> u64 {
        match self {
            TxOutput::Value(output) => output.satoshis,
            TxOutput::Memo(_) => 0,
        }
    }

    pub fn is_change(&self) -> bool {
        matches!(self, TxOutput::Value(OutputValue { change: true, .. }))
    }

    pub fn lock_script(&self) -> Result<Script, TransactionError> {
        match self {
            TxOutput::Value(output) => output.lock_script(),
            TxOutput::Memo(output) => output.lock_script(),
        }
    }

    /// Serialize this output into a `DashWriter`.
    pub fn write_to(&self, writer: &mut DashWriter) -> Result<(), TransactionError> {
        writer.write_u64_le(self.satoshis());
        writer.write_var_bytes(self.lock_script()?.to_bytes());
        Ok(())
    }

    /// Wire size of this output in bytes.
    ///
    /// Address-only outputs count as P2PKH since they resolve to one.
    pub fn size(&self) -> Result<usize, TransactionError> {
        let script_len = match self {
            TxOutput::Value(OutputValue { pub_key_hash: None, script: None, address: Some(_), .. }) => {
                p2pkh::LOCK_SCRIPT_SIZE
            }
            TxOutput::Value(output) => output.lock_script()?.len(),
            TxOutput::Memo(output) => memo::script_size(output.memo.len())?,
        };
        Ok(8 + VarInt::from(script_len).length() + script_len)
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}

mod opt_hex_bytes {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        let s: Option<String> = Option::deserialize(deserializer)?;
        s.map(|s| hex::decode(&s).map_err(serde::de::Error::custom)).transpose()
    }
}

pub(crate) mod opt_hex20 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(pkh: &Option<[u8; 20]>, serializer: S) -> Result<S::Ok, S::Error> {
        match pkh {
            Some(pkh) => serializer.serialize_str(&hex::encode(pkh)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<[u8; 20]>, D::Error> {
        let s: Option<String> = Option::deserialize(deserializer)?;
        s.map(|s| {
            dash_primitives::util::decode_hex_array::<20>("pubKeyHash", &s)
                .map_err(serde::de::Error::custom)
        })
        .transpose()
    }
}
