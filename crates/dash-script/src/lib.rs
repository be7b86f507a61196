//! Dash transaction SDK - script builders.
//!
//! Builds and recognizes the few script shapes a legacy Dash payment uses:
//! the P2PKH lock script, the OP_RETURN memo script, and the signed P2PKH
//! unlocking script.

pub mod chunk;
pub mod memo;
pub mod opcodes;
pub mod p2pkh;
pub mod script;

mod error;
pub use error::ScriptError;
pub use script::Script;
