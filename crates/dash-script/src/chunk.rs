//! Push data framing.
//!
//! Encodes data pushes with the minimal OP_PUSHDATA prefix and reads a
//! single push back out of raw script bytes.

use crate::opcodes::*;
use crate::ScriptError;

/// Compute the push prefix for a payload of `data_len` bytes.
///
/// | Length          | Prefix                    |
/// |-----------------|---------------------------|
/// | 0..=75          | the length itself         |
/// | 76..=255        | `OP_PUSHDATA1 <u8>`       |
/// | 256..=65535     | `OP_PUSHDATA2 <u16 LE>`   |
/// | up to u32::MAX  | `OP_PUSHDATA4 <u32 LE>`   |
///
/// # Arguments
/// * `data_len` - Length of the data to be pushed.
///
/// # Returns
/// The prefix bytes, or `DataTooBig` beyond the 32-bit range.
pub fn push_data_prefix(data_len: usize) -> Result<Vec<u8>, ScriptError> {
    if data_len <= OP_DATA_75 as usize {
        Ok(vec![data_len as u8])
    } else if data_len <= 0xFF {
        Ok(vec![OP_PUSHDATA1, data_len as u8])
    } else if data_len <= 0xFFFF {
        let mut buf = vec![OP_PUSHDATA2];
        buf.extend_from_slice(&(data_len as u16).to_le_bytes());
        Ok(buf)
    } else if data_len <= 0xFFFF_FFFF {
        let mut buf = vec![OP_PUSHDATA4];
        buf.extend_from_slice(&(data_len as u32).to_le_bytes());
        Ok(buf)
    } else {
        Err(ScriptError::DataTooBig)
    }
}

/// Encode a single push: prefix followed by the data.
pub fn encode_push_data(data: &[u8]) -> Result<Vec<u8>, ScriptError> {
    let mut out = push_data_prefix(data.len())?;
    out.extend_from_slice(data);
    Ok(out)
}

/// Read one push from the start of `bytes`.
///
/// # Arguments
/// * `bytes` - Script bytes beginning with a push opcode.
///
/// # Returns
/// The pushed data and the total number of bytes consumed (prefix + data),
/// or `DataTooSmall` when the script is truncated.
pub fn read_push_data(bytes: &[u8]) -> Result<(&[u8], usize), ScriptError> {
    let op = *bytes.first().ok_or(ScriptError::DataTooSmall)?;
    let (len, header) = match op {
        OP_PUSHDATA1 => (*bytes.get(1).ok_or(ScriptError::DataTooSmall)? as usize, 2),
        OP_PUSHDATA2 => {
            let b = bytes.get(1..3).ok_or(ScriptError::DataTooSmall)?;
            (u16::from_le_bytes([b[0], b[1]]) as usize, 3)
        }
        OP_PUSHDATA4 => {
            let b = bytes.get(1..5).ok_or(ScriptError::DataTooSmall)?;
            (u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize, 5)
        }
        n if n <= OP_DATA_75 => (n as usize, 1),
        _ => return Err(ScriptError::DataTooSmall),
    };
    let data = bytes
        .get(header..header + len)
        .ok_or(ScriptError::DataTooSmall)?;
    Ok((data, header + len))
}
