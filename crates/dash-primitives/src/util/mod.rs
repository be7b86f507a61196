//! Utility types for binary serialization.
//!
//! Provides VarInt encoding/decoding, `DashReader` and `DashWriter` for
//! reading/writing wire data, hex helpers that name the offending field on
//! failure, and the byte-order reversal used for transaction ids.

use crate::{IntRangeError, PrimitivesError};

/// Largest integer a 53-bit-safe (double precision) number represents exactly.
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

// ---------------------------------------------------------------------------
// Hex and byte order
// ---------------------------------------------------------------------------

/// Decode a hex string, naming `field` in the error.
///
/// Rejects odd-length strings and any non-hex digit.
///
/// # Arguments
/// * `field` - Name of the value being decoded, used in error messages.
/// * `hex_str` - The hex string.
///
/// # Returns
/// The decoded bytes.
pub fn decode_hex(field: &str, hex_str: &str) -> Result<Vec<u8>, PrimitivesError> {
    if hex_str.len() % 2 != 0 {
        return Err(PrimitivesError::InvalidHexField {
            field: field.to_string(),
            reason: format!("odd number of hex digits ({})", hex_str.len()),
        });
    }
    if let Some((i, c)) = hex_str.char_indices().find(|(_, c)| !c.is_ascii_hexdigit()) {
        return Err(PrimitivesError::InvalidHexField {
            field: field.to_string(),
            reason: format!("non-hex character {:?} at position {}", c, i),
        });
    }
    Ok(hex::decode(hex_str)?)
}

/// Decode a hex string that must hold exactly `N` bytes.
///
/// # Arguments
/// * `field` - Name of the value being decoded, used in error messages.
/// * `hex_str` - The hex string (`2 * N` digits).
///
/// # Returns
/// A fixed-size byte array.
pub fn decode_hex_array<const N: usize>(
    field: &str,
    hex_str: &str,
) -> Result<[u8; N], PrimitivesError> {
    let bytes = decode_hex(field, hex_str)?;
    bytes.as_slice().try_into().map_err(|_| PrimitivesError::InvalidLength {
        field: field.to_string(),
        expected: N,
        got: bytes.len(),
    })
}

/// Return a copy of `bytes` in reverse order.
pub fn reverse_bytes(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().rev().copied().collect()
}

/// Reverse the byte order of a hex string (e.g. display txid to wire order).
///
/// # Arguments
/// * `hex_str` - Hex string with an even number of digits.
///
/// # Returns
/// The hex string with its bytes reversed.
pub fn reverse_hex(hex_str: &str) -> Result<String, PrimitivesError> {
    let bytes = decode_hex("hex", hex_str)?;
    Ok(hex::encode(reverse_bytes(&bytes)))
}

// ---------------------------------------------------------------------------
// Integer range
// ---------------------------------------------------------------------------

/// Convert a platform-native number into a `u64`.
///
/// Numbers above [`MAX_SAFE_INTEGER`] may already have lost precision, so
/// they are refused with `E_LITTLE_INT`; callers holding such values must
/// pass them as `u64` directly.
///
/// # Arguments
/// * `n` - A non-negative whole number.
///
/// # Returns
/// The value as `u64`, or an integer error.
pub fn safe_u64_from_f64(n: f64) -> Result<u64, PrimitivesError> {
    if !n.is_finite() || n < 0.0 || n.fract() != 0.0 {
        return Err(PrimitivesError::InvalidInteger(format!(
            "{} is not a non-negative whole number",
            n
        )));
    }
    if n > MAX_SAFE_INTEGER as f64 {
        return Err(IntRangeError::LittleInt(n).into());
    }
    Ok(n as u64)
}

// ---------------------------------------------------------------------------
// VarInt
// ---------------------------------------------------------------------------

/// A variable-length integer.
///
/// Used for input/output counts and script/payload lengths. The encoding
/// uses 1, 3, 5, or 9 bytes depending on the magnitude of the value:
///
/// | Value            | Encoding             |
/// |------------------|----------------------|
/// | `< 0xfd`         | 1 byte               |
/// | `<= 0xffff`      | `0xfd` + 2 bytes LE  |
/// | `<= 0xffffffff`  | `0xfe` + 4 bytes LE  |
/// | otherwise        | `0xff` + 8 bytes LE  |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarInt(pub u64);

impl VarInt {
    /// Decode a VarInt from the start of a byte slice.
    ///
    /// # Arguments
    /// * `data` - Byte slice starting with a VarInt encoding.
    ///
    /// # Returns
    /// A tuple of `(VarInt, bytes_consumed)`, or `UnexpectedEof` when the
    /// slice is shorter than the encoding it announces.
    pub fn from_bytes(data: &[u8]) -> Result<(Self, usize), PrimitivesError> {
        let mut reader = DashReader::new(data);
        let vi = reader.read_varint()?;
        Ok((vi, reader.position()))
    }

    /// Build a VarInt from a platform-native number.
    ///
    /// Fails with `E_LITTLE_INT` above [`MAX_SAFE_INTEGER`].
    pub fn from_safe_f64(n: f64) -> Result<Self, PrimitivesError> {
        safe_u64_from_f64(n).map(VarInt)
    }

    /// Return the wire-format byte length of this VarInt.
    ///
    /// # Returns
    /// 1, 3, 5, or 9 depending on the value.
    pub fn length(&self) -> usize {
        Self::size_of(self.0)
    }

    /// Wire-format byte length a VarInt of value `n` would take.
    pub fn size_of(n: u64) -> usize {
        if n < 0xfd {
            1
        } else if n <= 0xffff {
            3
        } else if n <= 0xffff_ffff {
            5
        } else {
            9
        }
    }

    /// Encode the VarInt into a new byte vector.
    ///
    /// # Returns
    /// A `Vec<u8>` of 1, 3, 5, or 9 bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let v = self.0;
        let mut buf = Vec::with_capacity(self.length());
        if v < 0xfd {
            buf.push(v as u8);
        } else if v <= 0xffff {
            buf.push(0xfd);
            buf.extend_from_slice(&(v as u16).to_le_bytes());
        } else if v <= 0xffff_ffff {
            buf.push(0xfe);
            buf.extend_from_slice(&(v as u32).to_le_bytes());
        } else {
            buf.push(0xff);
            buf.extend_from_slice(&v.to_le_bytes());
        }
        buf
    }

    /// Encode the VarInt as lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Return the underlying u64 value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for VarInt {
    fn from(v: u64) -> Self {
        VarInt(v)
    }
}

impl From<u32> for VarInt {
    fn from(v: u32) -> Self {
        VarInt(v as u64)
    }
}

impl From<usize> for VarInt {
    fn from(v: usize) -> Self {
        VarInt(v as u64)
    }
}

impl TryFrom<u128> for VarInt {
    type Error = IntRangeError;

    fn try_from(v: u128) -> Result<Self, Self::Error> {
        u64::try_from(v).map(VarInt).map_err(|_| IntRangeError::TooBigInt(v))
    }
}

// ---------------------------------------------------------------------------
// DashReader
// ---------------------------------------------------------------------------

/// A cursor-based reader for wire data.
///
/// Wraps a byte slice and maintains a read position, providing methods
/// to read fixed-size integers and VarInt values in little-endian order.
pub struct DashReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> DashReader<'a> {
    /// Create a new reader over the given byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        DashReader { data, pos: 0 }
    }

    /// Read `n` bytes and advance the position.
    ///
    /// # Arguments
    /// * `n` - Number of bytes to read.
    ///
    /// # Returns
    /// A byte slice of length `n`, or an error if insufficient data remains.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], PrimitivesError> {
        if n > self.remaining() {
            return Err(PrimitivesError::UnexpectedEof);
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Read exactly `N` bytes into an array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], PrimitivesError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Read a single byte and advance the position.
    pub fn read_u8(&mut self) -> Result<u8, PrimitivesError> {
        let [b] = self.read_array::<1>()?;
        Ok(b)
    }

    /// Read a little-endian u16 and advance the position by 2 bytes.
    pub fn read_u16_le(&mut self) -> Result<u16, PrimitivesError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    /// Read a little-endian u32 and advance the position by 4 bytes.
    pub fn read_u32_le(&mut self) -> Result<u32, PrimitivesError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Read a little-endian u64 and advance the position by 8 bytes.
    pub fn read_u64_le(&mut self) -> Result<u64, PrimitivesError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Read a VarInt and advance the position accordingly.
    ///
    /// # Returns
    /// The decoded `VarInt`, or an error if insufficient data.
    pub fn read_varint(&mut self) -> Result<VarInt, PrimitivesError> {
        let first = self.read_u8()?;
        let val = match first {
            0xff => self.read_u64_le()?,
            0xfe => self.read_u32_le()? as u64,
            0xfd => self.read_u16_le()? as u64,
            b => b as u64,
        };
        Ok(VarInt(val))
    }

    /// Return the unread tail without advancing.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Return the number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Return the number of bytes remaining.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

// ---------------------------------------------------------------------------
// DashWriter
// ---------------------------------------------------------------------------

/// A buffer-based writer for wire data.
///
/// Wraps a `Vec<u8>` and provides methods to append fixed-size integers
/// and VarInt values in little-endian order.
#[derive(Debug, Default)]
pub struct DashWriter {
    buf: Vec<u8>,
}

impl DashWriter {
    /// Create a new empty writer.
    pub fn new() -> Self {
        DashWriter { buf: Vec::new() }
    }

    /// Create a new writer with a pre-allocated capacity.
    ///
    /// # Arguments
    /// * `capacity` - Initial byte capacity of the internal buffer.
    pub fn with_capacity(capacity: usize) -> Self {
        DashWriter { buf: Vec::with_capacity(capacity) }
    }

    /// Append raw bytes to the buffer.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Append a single byte to the buffer.
    pub fn write_u8(&mut self, val: u8) {
        self.buf.push(val);
    }

    /// Append a little-endian u16 (2 bytes) to the buffer.
    pub fn write_u16_le(&mut self, val: u16) {
        self.buf.extend_from_slice(&val.to_le_bytes());
    }

    /// Append a little-endian u32 (4 bytes) to the buffer.
    pub fn write_u32_le(&mut self, val: u32) {
        self.buf.extend_from_slice(&val.to_le_bytes());
    }

    /// Append a little-endian u64 (8 bytes) to the buffer.
    pub fn write_u64_le(&mut self, val: u64) {
        self.buf.extend_from_slice(&val.to_le_bytes());
    }

    /// Append a VarInt to the buffer.
    pub fn write_varint(&mut self, varint: VarInt) {
        self.buf.extend_from_slice(&varint.to_bytes());
    }

    /// Append a VarInt length prefix followed by the bytes themselves.
    pub fn write_var_bytes(&mut self, bytes: &[u8]) {
        self.write_varint(VarInt::from(bytes.len()));
        self.write_bytes(bytes);
    }

    /// Consume the writer and return the accumulated bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Return a reference to the current buffer contents.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Return the current length of the buffer.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
