//! Dash transaction SDK - byte, integer and hashing primitives.
//!
//! This crate provides the foundational building blocks for the SDK:
//! - Hex encoding with field-aware validation and byte-order reversal
//! - Little-endian fixed-width integers and Bitcoin-style variable-length integers
//! - Cursor-based reader and buffer-based writer for wire data
//! - SHA-256 and double SHA-256

pub mod hash;
pub mod util;

mod error;
pub use error::{IntRangeError, PrimitivesError};
