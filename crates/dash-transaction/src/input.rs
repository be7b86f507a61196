//! Transaction inputs in their three stages.
//!
//! An input starts as a sign-ready reference ([`InputForSig`]) carrying the
//! lock script of the coin it spends, becomes an [`InputSigned`] once the
//! signer has produced a signature, and is reduced to a bare [`Outpoint`]
//! (`TxInput::Raw`) inside signature preimages for every input other than
//! the one being signed.

use std::cmp::Ordering;
use std::fmt;

use dash_primitives::util::{decode_hex, DashReader, DashWriter, VarInt};
use dash_script::{p2pkh, Script};
use serde::{Deserialize, Serialize};

use crate::sighash::SIGHASH_DEFAULT;
use crate::TransactionError;

/// Sequence number written for every input (final, no relative locktime).
pub const DEFAULT_SEQUENCE_NUMBER: u32 = 0xFFFF_FFFF;

// ---------------------------------------------------------------------------
// TxId
// ---------------------------------------------------------------------------

/// A 32-byte transaction id, held in display (big-endian) order.
///
/// Ids are shown and compared in display order; on the wire they are
/// written reversed.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TxId([u8; 32]);

impl TxId {
    /// Build an id from display-order bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        TxId(bytes)
    }

    /// Parse a 64-character display-order hex id.
    pub fn from_hex(hex_str: &str) -> Result<Self, TransactionError> {
        let bytes = decode_hex("txId", hex_str).ok().filter(|b| b.len() == 32).ok_or_else(|| {
            TransactionError::InvalidTransaction(format!(
                "expected txId to be a valid 64-character (32-byte) hex string, but got {:?}",
                hex_str
            ))
        })?;
        let mut id = [0u8; 32];
        id.copy_from_slice(&bytes);
        Ok(TxId(id))
    }

    /// Build an id from wire-order (little-endian) bytes.
    pub fn from_wire_bytes(mut bytes: [u8; 32]) -> Self {
        bytes.reverse();
        TxId(bytes)
    }

    /// Display-order bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Wire-order bytes.
    pub fn to_wire_bytes(&self) -> [u8; 32] {
        let mut bytes = self.0;
        bytes.reverse();
        bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({})", self.to_hex())
    }
}

impl std::str::FromStr for TxId {
    type Err = TransactionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TxId::from_hex(s)
    }
}

impl Serialize for TxId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for TxId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        TxId::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Outpoint and lock source
// ---------------------------------------------------------------------------

/// Reference to a previous transaction output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outpoint {
    /// Id of the transaction holding the output.
    #[serde(rename = "txId")]
    pub txid: TxId,
    /// Index of the output in that transaction.
    pub output_index: u32,
}

impl Outpoint {
    pub fn new(txid: TxId, output_index: u32) -> Self {
        Outpoint { txid, output_index }
    }
}

impl PartialOrd for Outpoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Outpoint {
    /// Display-order txid, then output index.
    fn cmp(&self, other: &Self) -> Ordering {
        self.txid
            .cmp(&other.txid)
            .then(self.output_index.cmp(&other.output_index))
    }
}

/// Where the lock script of the spent output comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LockSource {
    /// Derive a P2PKH lock script from this hash.
    PubKeyHash([u8; 20]),
    /// Use this lock script as-is.
    Script(Script),
}

impl LockSource {
    /// The previous output's lock script.
    pub fn lock_script(&self) -> Script {
        match self {
            LockSource::PubKeyHash(pkh) => p2pkh::lock(pkh),
            LockSource::Script(script) => script.clone(),
        }
    }

    /// The public key hash, when known or recoverable from a P2PKH script.
    pub fn pub_key_hash(&self) -> Option<[u8; 20]> {
        match self {
            LockSource::PubKeyHash(pkh) => Some(*pkh),
            LockSource::Script(script) => script.public_key_hash().ok(),
        }
    }
}

// ---------------------------------------------------------------------------
// Input stages
// ---------------------------------------------------------------------------

/// A sign-ready input: the outpoint plus what is needed to build its preimage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputForSig {
    pub outpoint: Outpoint,
    /// Lock script of the output being spent.
    pub lock: LockSource,
    /// SIGHASH flags this input will be signed with.
    pub sig_hash_type: u32,
    /// Value of the spent output, when known (needed for fee math).
    pub satoshis: Option<u64>,
    /// Address of the spent output, for key lookup by the signer.
    pub address: Option<String>,
    /// Public key, when the caller already has it.
    pub public_key: Option<Vec<u8>>,
}

impl InputForSig {
    /// A sign-ready input with the default SIGHASH type and no extras.
    pub fn new(outpoint: Outpoint, lock: LockSource) -> Self {
        InputForSig {
            outpoint,
            lock,
            sig_hash_type: SIGHASH_DEFAULT,
            satoshis: None,
            address: None,
            public_key: None,
        }
    }
}

/// A signed input: DER signature, SIGHASH flags and public key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputSigned {
    pub outpoint: Outpoint,
    /// DER-encoded ECDSA signature without the SIGHASH byte.
    pub signature: Vec<u8>,
    pub public_key: Vec<u8>,
    pub sig_hash_type: u32,
}

impl InputSigned {
    /// The `push(sig ‖ sighash) push(pubkey)` unlocking script.
    pub fn unlocking_script(&self) -> Result<Script, TransactionError> {
        Ok(p2pkh::unlock(&self.signature, self.sig_hash_type, &self.public_key)?)
    }
}

/// A single input of a Dash transaction.
///
/// # Wire format
///
/// | Field         | Size                         |
/// |---------------|------------------------------|
/// | txid          | 32 bytes (reversed)          |
/// | output index  | 4 bytes (LE)                 |
/// | script length | VarInt                       |
/// | script        | empty, lock, or unlock script|
/// | sequence      | 4 bytes, always `ffffffff`   |
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TxInput {
    /// Outpoint only; serialized with an empty script.
    Raw(Outpoint),
    /// Serialized with the spent output's lock script.
    ForSig(InputForSig),
    /// Serialized with the signed unlocking script.
    Signed(InputSigned),
}

impl TxInput {
    /// Shorthand for a sign-ready P2PKH input.
    pub fn p2pkh(txid: TxId, output_index: u32, pub_key_hash: [u8; 20]) -> Self {
        TxInput::ForSig(InputForSig::new(
            Outpoint::new(txid, output_index),
            LockSource::PubKeyHash(pub_key_hash),
        ))
    }

    pub fn outpoint(&self) -> &Outpoint {
        match self {
            TxInput::Raw(outpoint) => outpoint,
            TxInput::ForSig(input) => &input.outpoint,
            TxInput::Signed(input) => &input.outpoint,
        }
    }

    /// SIGHASH flags of this input; raw inputs report the default.
    pub fn sig_hash_type(&self) -> u32 {
        match self {
            TxInput::Raw(_) => SIGHASH_DEFAULT,
            TxInput::ForSig(input) => input.sig_hash_type,
            TxInput::Signed(input) => input.sig_hash_type,
        }
    }

    /// Value of the spent output, if the input carries it.
    pub fn satoshis(&self) -> Option<u64> {
        match self {
            TxInput::ForSig(input) => input.satoshis,
            _ => None,
        }
    }

    /// Reduce to the bare outpoint.
    pub fn to_raw(&self) -> TxInput {
        TxInput::Raw(*self.outpoint())
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, TxInput::Signed(_))
    }

    /// The script this input serializes with.
    pub fn script(&self) -> Result<Script, TransactionError> {
        match self {
            TxInput::Raw(_) => Ok(Script::new()),
            TxInput::ForSig(input) => Ok(input.lock.lock_script()),
            TxInput::Signed(input) => input.unlocking_script(),
        }
    }

    /// Serialize this input into a `DashWriter`.
    pub fn write_to(&self, writer: &mut DashWriter) -> Result<(), TransactionError> {
        let outpoint = self.outpoint();
        writer.write_bytes(&outpoint.txid.to_wire_bytes());
        writer.write_u32_le(outpoint.output_index);
        writer.write_var_bytes(self.script()?.to_bytes());
        writer.write_u32_le(DEFAULT_SEQUENCE_NUMBER);
        Ok(())
    }

    /// Read an input's fields without classifying its script.
    ///
    /// # Returns
    /// The outpoint, the raw script bytes and the sequence number.
    pub fn read_parts<'a>(
        reader: &mut DashReader<'a>,
    ) -> Result<(Outpoint, &'a [u8], u32), TransactionError> {
        let txid = TxId::from_wire_bytes(reader.read_array()?);
        let output_index = reader.read_u32_le()?;
        let script_len = reader.read_varint()?;
        let script = reader.read_bytes(script_len.value() as usize)?;
        let sequence = reader.read_u32_le()?;
        Ok((Outpoint::new(txid, output_index), script, sequence))
    }

    /// Wire size of this input in bytes.
    pub fn size(&self) -> Result<usize, TransactionError> {
        let script_len = self.script()?.len();
        Ok(32 + 4 + VarInt::from(script_len).length() + script_len + 4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TXID: &str = "7f305558cbeba3a9271d2559e8277f473f29d6b64a7a7a27e02a8564bde8352b";

    #[test]
    fn test_txid_wire_order() {
        let id = TxId::from_hex(TXID).unwrap();
        assert_eq!(id.to_hex(), TXID);
        assert_eq!(
            hex::encode(id.to_wire_bytes()),
            "2b35e8bd64852ae0277a7a4ab6d6293f477f27e859251d27a9a3ebcb5855307f"
        );
        assert_eq!(TxId::from_wire_bytes(id.to_wire_bytes()), id);
    }

    #[test]
    fn test_txid_rejects_bad_hex() {
        for bad in ["", "abcd", &TXID[1..], &format!("{}zz", &TXID[2..])] {
            let err = TxId::from_hex(bad).unwrap_err();
            assert!(err.to_string().contains("64-character"), "{}", err);
        }
    }

    #[test]
    fn test_raw_input_bytes() {
        let input = TxInput::Raw(Outpoint::new(TxId::from_hex(TXID).unwrap(), 1));
        let mut writer = DashWriter::new();
        input.write_to(&mut writer).unwrap();
        assert_eq!(
            hex::encode(writer.as_bytes()),
            "2b35e8bd64852ae0277a7a4ab6d6293f477f27e859251d27a9a3ebcb5855307f0100000000ffffffff"
        );
        assert_eq!(input.size().unwrap(), 41);
    }

    #[test]
    fn test_for_sig_input_uses_lock_script() {
        let pkh = [0x1e; 20];
        let input = TxInput::p2pkh(TxId::from_hex(TXID).unwrap(), 0, pkh);
        assert_eq!(input.script().unwrap(), p2pkh::lock(&pkh));
        assert_eq!(input.sig_hash_type(), SIGHASH_DEFAULT);
        assert_eq!(input.size().unwrap(), 32 + 4 + 1 + 25 + 4);
        assert!(matches!(input.to_raw(), TxInput::Raw(_)));
    }

    #[test]
    fn test_read_parts() {
        let input = TxInput::p2pkh(TxId::from_hex(TXID).unwrap(), 7, [0xab; 20]);
        let mut writer = DashWriter::new();
        input.write_to(&mut writer).unwrap();
        let bytes = writer.into_bytes();

        let mut reader = DashReader::new(&bytes);
        let (outpoint, script, sequence) = TxInput::read_parts(&mut reader).unwrap();
        assert_eq!(outpoint, *input.outpoint());
        assert_eq!(script, input.script().unwrap().to_bytes());
        assert_eq!(sequence, DEFAULT_SEQUENCE_NUMBER);
    }

    #[test]
    fn test_outpoint_order() {
        let a = Outpoint::new(TxId::from_hex(&"00ff".repeat(16)).unwrap(), 9);
        let b = Outpoint::new(TxId::from_hex(&"aacc".repeat(16)).unwrap(), 0);
        let c = Outpoint::new(TxId::from_hex(&"aacc".repeat(16)).unwrap(), 5);
        assert!(a < b);
        assert!(b < c);
    }
}
