//! Pay-to-Public-Key-Hash scripts.
//!
//! `lock` builds the 25-byte output script; `unlock` assembles the input
//! script from a DER signature, its SIGHASH byte and the public key.

use crate::opcodes::*;
use crate::{Script, ScriptError};

/// Byte length of a P2PKH lock script.
pub const LOCK_SCRIPT_SIZE: usize = 25;

/// Unlocking script length when neither R nor S carries a sign-padding byte:
/// 1 + 71 (DER + sighash) + 1 + 33 (compressed key).
pub const UNLOCK_SCRIPT_SIZE: usize = 106;

/// Largest signed unlocking script length recognized when parsing.
pub const MAX_UNLOCK_SCRIPT_SIZE: usize = 109;

/// Build a P2PKH lock script for `pub_key_hash`.
///
/// `OP_DUP OP_HASH160 <20> <pubKeyHash> OP_EQUALVERIFY OP_CHECKSIG`
pub fn lock(pub_key_hash: &[u8; 20]) -> Script {
    let mut bytes = Vec::with_capacity(LOCK_SCRIPT_SIZE);
    bytes.extend_from_slice(&[OP_DUP, OP_HASH160, OP_DATA_20]);
    bytes.extend_from_slice(pub_key_hash);
    bytes.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
    Script::from(bytes)
}

/// Build a signed P2PKH unlocking script.
///
/// Layout: `push(signature ‖ sig_hash_type)` then `push(public_key)`.
///
/// # Arguments
/// * `der_signature` - DER-encoded ECDSA signature, without the SIGHASH byte.
/// * `sig_hash_type` - The SIGHASH flags; only the low byte is appended.
/// * `public_key` - Serialized public key.
///
/// # Returns
/// The unlocking script.
pub fn unlock(
    der_signature: &[u8],
    sig_hash_type: u32,
    public_key: &[u8],
) -> Result<Script, ScriptError> {
    let mut sig = Vec::with_capacity(der_signature.len() + 1);
    sig.extend_from_slice(der_signature);
    sig.push(sig_hash_type as u8);

    let mut script = Script::new();
    script.append_push_data(&sig)?;
    script.append_push_data(public_key)?;
    Ok(script)
}
