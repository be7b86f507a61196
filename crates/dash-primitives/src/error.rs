/// Unified error type for byte and integer codec operations.
#[derive(Debug, thiserror::Error)]
pub enum PrimitivesError {
    /// A hex string could not be decoded.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// A named hex field failed to decode (odd length or a non-hex digit).
    #[error("invalid hex in '{field}': {reason}")]
    InvalidHexField {
        /// Name of the offending field (e.g. `txId`).
        field: String,
        /// Human-readable reason.
        reason: String,
    },

    /// A fixed-size value had the wrong length.
    #[error("expected '{field}' to be {expected} bytes, got {got}")]
    InvalidLength {
        /// Name of the offending field.
        field: String,
        /// Required byte length.
        expected: usize,
        /// Actual byte length.
        got: usize,
    },

    /// A platform-native number was negative, fractional or not finite.
    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    /// An integer fell outside the range its encoding path supports.
    #[error(transparent)]
    IntRange(#[from] IntRangeError),

    #[error("unexpected end of data")]
    UnexpectedEof,
}

impl From<hex::FromHexError> for PrimitivesError {
    fn from(e: hex::FromHexError) -> Self {
        PrimitivesError::InvalidHex(e.to_string())
    }
}

/// Integer range failures, distinguished by a stable code.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum IntRangeError {
    /// A platform-native (53-bit-safe) number was asked to carry a value that
    /// needs full 64-bit precision.
    #[error("{0} is above the 53-bit safe integer limit; use a widened integer type (u64)")]
    LittleInt(f64),

    /// The value exceeds the unsigned 64-bit range.
    #[error("{0} exceeds the unsigned 64-bit range")]
    TooBigInt(u128),
}

impl IntRangeError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            IntRangeError::LittleInt(_) => "E_LITTLE_INT",
            IntRangeError::TooBigInt(_) => "E_TOO_BIG_INT",
        }
    }
}
