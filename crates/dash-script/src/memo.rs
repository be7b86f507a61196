//! OP_RETURN memo scripts.
//!
//! A memo output carries up to [`MAX_MEMO_SIZE`] bytes of arbitrary data in
//! an unspendable `OP_RETURN <push>` script. Payloads of 76 bytes or more
//! need an `OP_PUSHDATA1` prefix.

use crate::chunk::{push_data_prefix, read_push_data};
use crate::opcodes::OP_RETURN;
use crate::{Script, ScriptError};

/// Largest memo payload that still fits in an 83-byte standard output.
pub const MAX_MEMO_SIZE: usize = 80;

/// Build an `OP_RETURN` memo script.
///
/// # Arguments
/// * `memo` - Raw memo bytes, 0 to 80 bytes long.
///
/// # Returns
/// The memo script, or `MemoTooLong` above [`MAX_MEMO_SIZE`].
pub fn lock(memo: &[u8]) -> Result<Script, ScriptError> {
    if memo.len() > MAX_MEMO_SIZE {
        return Err(ScriptError::MemoTooLong(memo.len()));
    }
    let mut script = Script::new();
    script.append_opcodes(&[OP_RETURN]);
    script.append_push_data(memo)?;
    Ok(script)
}

/// Byte length of the memo script for a payload of `memo_len` bytes.
pub fn script_size(memo_len: usize) -> Result<usize, ScriptError> {
    Ok(1 + push_data_prefix(memo_len)?.len() + memo_len)
}

/// Extract the memo payload from an `OP_RETURN <push>` script.
///
/// # Returns
/// The pushed bytes, or `NotMemo` if the script is not a single-push
/// OP_RETURN script.
pub fn decode(script: &[u8]) -> Result<&[u8], ScriptError> {
    match script.split_first() {
        Some((&OP_RETURN, rest)) => {
            let (data, used) = read_push_data(rest).map_err(|_| ScriptError::NotMemo)?;
            if used != rest.len() {
                return Err(ScriptError::NotMemo);
            }
            Ok(data)
        }
        _ => Err(ScriptError::NotMemo),
    }
}
