//! Opcode constants for the script shapes this SDK builds and recognizes.

/// Push an empty byte vector.
pub const OP_0: u8 = 0x00;
/// Direct push of 20 bytes (a public key hash).
pub const OP_DATA_20: u8 = 0x14;
/// Largest direct push opcode; the opcode is the data length.
pub const OP_DATA_75: u8 = 0x4b;
/// Next byte holds the push length.
pub const OP_PUSHDATA1: u8 = 0x4c;
/// Next two bytes (LE) hold the push length.
pub const OP_PUSHDATA2: u8 = 0x4d;
/// Next four bytes (LE) hold the push length.
pub const OP_PUSHDATA4: u8 = 0x4e;
/// Marks an output as provably unspendable; used for memos.
pub const OP_RETURN: u8 = 0x6a;
pub const OP_DUP: u8 = 0x76;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_CHECKSIG: u8 = 0xac;
