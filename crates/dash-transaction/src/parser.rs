//! Parsing of arbitrary transaction hex.
//!
//! [`parse_unknown`] walks serialized bytes and recovers the structure of an
//! unsigned request, a signature preimage, or a signed transaction,
//! decomposing DER signatures and memo scripts along the way.

use dash_primitives::hash::sha256d;
use dash_primitives::util::{decode_hex, DashReader};
use dash_primitives::PrimitivesError;
use dash_script::{memo, p2pkh, Script};
use tracing::trace;

use crate::input::{InputForSig, InputSigned, LockSource, Outpoint, TxInput, DEFAULT_SEQUENCE_NUMBER};
use crate::output::{OutputMemo, OutputValue, TxOutput};
use crate::sighash::SIGHASH_DEFAULT;
use crate::transaction::{id_of, Transaction};
use crate::TransactionError;

/// Message reported for memos that are not valid UTF-8.
pub const NON_UTF8_MESSAGE: &str = "<non-utf8 bytes>";

/// What the parsed hex turned out to be.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TxKind {
    /// No signatures and no SIGHASH trailer.
    #[default]
    Unsigned,
    /// A signature preimage ending in a SIGHASH word.
    Preimage,
    /// At least one input is signed; ready to broadcast once all are.
    Signed,
}

/// A signed P2PKH unlocking script, field by field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedSignature {
    pub script_size: usize,
    /// Push length of DER signature plus SIGHASH byte.
    pub sig_size: u8,
    pub asn1_seq: u8,
    pub asn1_len: u8,
    pub r_type: u8,
    pub r_size: u8,
    pub r_value: Vec<u8>,
    pub s_type: u8,
    pub s_size: u8,
    pub s_value: Vec<u8>,
    pub sig_hash_type: u8,
    pub public_key_size: u8,
    pub public_key: Vec<u8>,
    /// Bytes left over after the public key.
    pub spurious_extra: Vec<u8>,
}

impl ParsedSignature {
    /// Reassemble the DER signature (without the SIGHASH byte).
    pub fn der(&self) -> Vec<u8> {
        let mut der = Vec::with_capacity(6 + self.r_value.len() + self.s_value.len());
        der.extend_from_slice(&[self.asn1_seq, self.asn1_len, self.r_type, self.r_size]);
        der.extend_from_slice(&self.r_value);
        der.extend_from_slice(&[self.s_type, self.s_size]);
        der.extend_from_slice(&self.s_value);
        der
    }

    fn read(script: &[u8]) -> Result<Self, PrimitivesError> {
        let mut r = DashReader::new(script);
        let sig_size = r.read_u8()?;
        let asn1_seq = r.read_u8()?;
        let asn1_len = r.read_u8()?;
        let r_type = r.read_u8()?;
        let r_size = r.read_u8()?;
        let r_value = r.read_bytes(r_size as usize)?.to_vec();
        let s_type = r.read_u8()?;
        let s_size = r.read_u8()?;
        let s_value = r.read_bytes(s_size as usize)?.to_vec();
        let sig_hash_type = r.read_u8()?;
        let public_key_size = r.read_u8()?;
        let public_key = r.read_bytes(public_key_size as usize)?.to_vec();
        Ok(ParsedSignature {
            script_size: script.len(),
            sig_size,
            asn1_seq,
            asn1_len,
            r_type,
            r_size,
            r_value,
            s_type,
            s_size,
            s_value,
            sig_hash_type,
            public_key_size,
            public_key,
            spurious_extra: r.rest().to_vec(),
        })
    }
}

/// How an input's script was recognized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedInputScript {
    /// Empty script.
    Raw,
    /// P2PKH lock script of the spent output (a pre-sign reference).
    Hashable { pub_key_hash: [u8; 20] },
    /// Signed unlocking script.
    Signed(ParsedSignature),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedInput {
    pub outpoint: Outpoint,
    pub script: ParsedInputScript,
    pub sequence: u32,
}

/// How an output's script was recognized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedOutput {
    PayToPubKeyHash {
        satoshis: u64,
        pub_key_hash: [u8; 20],
    },
    Memo {
        satoshis: u64,
        memo: Vec<u8>,
        /// The memo as text, or [`NON_UTF8_MESSAGE`].
        message: String,
    },
    /// Any other lock script.
    Script { satoshis: u64, script: Script },
}

impl ParsedOutput {
    pub fn satoshis(&self) -> u64 {
        match self {
            ParsedOutput::PayToPubKeyHash { satoshis, .. }
            | ParsedOutput::Memo { satoshis, .. }
            | ParsedOutput::Script { satoshis, .. } => *satoshis,
        }
    }

    fn classify(satoshis: u64, script: &[u8]) -> Self {
        let script = Script::from_bytes(script);
        if let Ok(pub_key_hash) = script.public_key_hash() {
            trace!(satoshis, "p2pkh output");
            return ParsedOutput::PayToPubKeyHash { satoshis, pub_key_hash };
        }
        // canonically framed memos only; other OP_RETURN scripts stay raw
        if let Some(data) = memo::decode(script.to_bytes())
            .ok()
            .filter(|data| data.len() <= memo::MAX_MEMO_SIZE)
            .filter(|data| memo::lock(data).is_ok_and(|framed| framed == script))
        {
            trace!(len = data.len(), "memo output");
            let message = match std::str::from_utf8(data) {
                Ok(text) => text.to_string(),
                Err(_) => NON_UTF8_MESSAGE.to_string(),
            };
            return ParsedOutput::Memo { satoshis, memo: data.to_vec(), message };
        }
        trace!(satoshis, len = script.len(), "script output");
        ParsedOutput::Script { satoshis, script }
    }
}

/// A transaction recovered from hex, possibly only in part.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedTransaction {
    pub version: u16,
    pub tx_type: u16,
    pub input_count: u64,
    pub inputs: Vec<ParsedInput>,
    pub output_count: u64,
    pub outputs: Vec<ParsedOutput>,
    pub locktime: u32,
    /// Present only for `tx_type > 0`.
    pub extra_payload: Option<Vec<u8>>,
    /// The trailing SIGHASH word of a preimage.
    pub sig_hash_type: Option<u32>,
    /// Signature hash of a preimage (sha256d of the whole input, hex).
    pub transaction_hash: Option<String>,
    /// Id of a signed transaction.
    pub transaction_id: Option<String>,
    pub kind: TxKind,
}

impl ParsedTransaction {
    /// Rebuild the transaction model, e.g. for re-signing.
    ///
    /// Hashable inputs become sign-ready inputs with the preimage's SIGHASH
    /// type (or the default). Spurious bytes after a signature are dropped.
    pub fn to_transaction(&self) -> Result<Transaction, TransactionError> {
        let sig_hash_type = self.sig_hash_type.unwrap_or(SIGHASH_DEFAULT);
        let inputs = self
            .inputs
            .iter()
            .map(|input| match &input.script {
                ParsedInputScript::Raw => TxInput::Raw(input.outpoint),
                ParsedInputScript::Hashable { pub_key_hash } => TxInput::ForSig(InputForSig {
                    sig_hash_type,
                    ..InputForSig::new(input.outpoint, LockSource::PubKeyHash(*pub_key_hash))
                }),
                ParsedInputScript::Signed(sig) => TxInput::Signed(InputSigned {
                    outpoint: input.outpoint,
                    signature: sig.der(),
                    public_key: sig.public_key.clone(),
                    sig_hash_type: sig.sig_hash_type as u32,
                }),
            })
            .collect();

        let outputs = self
            .outputs
            .iter()
            .map(|output| -> Result<TxOutput, TransactionError> {
                match output {
                    ParsedOutput::PayToPubKeyHash { satoshis, pub_key_hash } => {
                        Ok(TxOutput::p2pkh(*satoshis, *pub_key_hash))
                    }
                    ParsedOutput::Memo { satoshis: 0, memo, .. } => {
                        Ok(TxOutput::Memo(OutputMemo::new(memo.clone())?))
                    }
                    ParsedOutput::Memo { satoshis, memo: data, .. } => Ok(TxOutput::Value(
                        OutputValue::to_script(*satoshis, memo::lock(data)?),
                    )),
                    ParsedOutput::Script { satoshis, script } => {
                        Ok(TxOutput::Value(OutputValue::to_script(*satoshis, script.clone())))
                    }
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Transaction {
            version: self.version,
            tx_type: self.tx_type,
            inputs,
            outputs,
            locktime: self.locktime,
            extra_payload: self.extra_payload.clone().unwrap_or_default(),
        })
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse transaction, preimage, or unsigned request hex.
///
/// # Returns
/// The parsed structure, or `TransactionError::Parse` carrying whatever
/// was read before the failure.
pub fn parse_unknown(tx_hex: &str) -> Result<ParsedTransaction, TransactionError> {
    let bytes = decode_hex("transaction", tx_hex).map_err(|e| TransactionError::Parse {
        message: e.to_string(),
        partial: Box::default(),
    })?;
    let mut parsed = ParsedTransaction::default();
    match walk(&bytes, &mut parsed) {
        Ok(()) => Ok(parsed),
        Err(message) => Err(TransactionError::Parse { message, partial: Box::new(parsed) }),
    }
}

fn read<'a, T>(
    reader: &mut DashReader<'a>,
    field: &str,
    f: impl FnOnce(&mut DashReader<'a>) -> Result<T, PrimitivesError>,
) -> Result<T, String> {
    let at = reader.position();
    f(reader).map_err(|e| format!("{} at byte {}: {}", field, at, e))
}

fn walk(bytes: &[u8], parsed: &mut ParsedTransaction) -> Result<(), String> {
    let mut r = DashReader::new(bytes);

    parsed.version = read(&mut r, "version", |r| r.read_u16_le())?;
    parsed.tx_type = read(&mut r, "type", |r| r.read_u16_le())?;

    parsed.input_count = read(&mut r, "input count", |r| r.read_varint())?.value();
    for i in 0..parsed.input_count {
        let (outpoint, script, sequence) =
            TxInput::read_parts(&mut r).map_err(|e| format!("inputs[{}]: {}", i, e))?;
        if sequence != DEFAULT_SEQUENCE_NUMBER {
            trace!(index = i, sequence, "non-final sequence number");
        }
        let script = parse_input_script(script).map_err(|e| format!("inputs[{}]: {}", i, e))?;
        parsed.inputs.push(ParsedInput { outpoint, script, sequence });
    }

    parsed.output_count = read(&mut r, "output count", |r| r.read_varint())?.value();
    for i in 0..parsed.output_count {
        let field = format!("outputs[{}]", i);
        let satoshis = read(&mut r, &field, |r| r.read_u64_le())?;
        let script_len = read(&mut r, &field, |r| r.read_varint())?.value() as usize;
        let script = read(&mut r, &field, |r| r.read_bytes(script_len))?;
        parsed.outputs.push(ParsedOutput::classify(satoshis, script));
    }

    parsed.locktime = read(&mut r, "locktime", |r| r.read_u32_le())?;
    if parsed.tx_type > 0 {
        let len = read(&mut r, "extra payload length", |r| r.read_varint())?.value() as usize;
        let payload = read(&mut r, "extra payload", |r| r.read_bytes(len))?;
        parsed.extra_payload = Some(payload.to_vec());
    }

    match r.remaining() {
        4 => {
            let sig_hash_type = read(&mut r, "sighash type", |r| r.read_u32_le())?;
            trace!(sig_hash_type, "trailing sighash word, parsed as preimage");
            parsed.sig_hash_type = Some(sig_hash_type);
            parsed.transaction_hash = Some(hex::encode(sha256d(bytes)));
            parsed.kind = TxKind::Preimage;
        }
        0 => {
            let signed = parsed
                .inputs
                .iter()
                .any(|i| matches!(i.script, ParsedInputScript::Signed(_)));
            if signed {
                parsed.transaction_id = Some(hex::encode(id_of(bytes)));
                parsed.kind = TxKind::Signed;
            }
        }
        n => {
            return Err(format!(
                "{} unexpected trailing bytes at byte {}",
                n,
                r.position()
            ))
        }
    }
    Ok(())
}

fn parse_input_script(script: &[u8]) -> Result<ParsedInputScript, String> {
    match script.len() {
        0 => {
            trace!("raw input");
            Ok(ParsedInputScript::Raw)
        }
        p2pkh::LOCK_SCRIPT_SIZE => {
            trace!("hashable input");
            let pub_key_hash = Script::from_bytes(script)
                .public_key_hash()
                .map_err(|e| format!("25-byte script is not a P2PKH lock script: {}", e))?;
            Ok(ParsedInputScript::Hashable { pub_key_hash })
        }
        p2pkh::UNLOCK_SCRIPT_SIZE..=p2pkh::MAX_UNLOCK_SCRIPT_SIZE => {
            let sig = ParsedSignature::read(script).map_err(|e| format!("signature: {}", e))?;
            trace!(size = script.len(), spurious = sig.spurious_extra.len(), "signed input");
            Ok(ParsedInputScript::Signed(sig))
        }
        n => Err(format!("unrecognized script size {}", n)),
    }
}
