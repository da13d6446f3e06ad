//! LEB128-style variable-length integers used by the structured file format.

use crate::error::{Result, TaxisError};

/// Encode `value` with 7 data bits per byte, low bits first.
pub fn encode_u64(mut value: u64) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(10);
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            bytes.push(byte);
            return bytes;
        }
        bytes.push(byte | 0x80);
    }
}

/// Decode a value from the front of `bytes`, returning it with the number of
/// bytes consumed.
pub fn decode_u64(bytes: &[u8]) -> Result<(u64, usize)> {
    let mut result = 0u64;
    for (index, &byte) in bytes.iter().enumerate() {
        let shift = 7 * index as u32;
        if shift >= 64 {
            return Err(TaxisError::storage("varint overflow"));
        }
        result |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok((result, index + 1));
        }
    }
    Err(TaxisError::storage("incomplete varint"))
}
