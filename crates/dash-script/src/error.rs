/// Error types for script construction and recognition.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// Invalid hex string.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// Script is not a P2PKH lock script.
    #[error("not a P2PKH script")]
    NotP2PKH,

    /// Script is not an OP_RETURN memo script.
    #[error("not an OP_RETURN memo script")]
    NotMemo,

    /// Memo payload exceeds the standard-output ceiling.
    #[error(
        "memo is {0} bytes, but the limit is 80 bytes \
         (a standard OP_RETURN output is at most 83 bytes: 8-byte value, \
         varint size, opcodes and payload)"
    )]
    MemoTooLong(usize),

    /// Not enough data in script to complete a push operation.
    #[error("not enough data")]
    DataTooSmall,

    /// Push data exceeds maximum allowed size.
    #[error("data too big")]
    DataTooBig,

    /// Error from primitives crate.
    #[error("primitives error: {0}")]
    Primitives(#[from] dash_primitives::PrimitivesError),
}
