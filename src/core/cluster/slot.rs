// src/core/cluster/slot.rs

//! Implements the cluster hash slot algorithm.

use crc::{CRC_16_XMODEM, Crc};

/// The total number of hash slots in the cluster.
pub const NUM_SLOTS: usize = 16384;

/// The CRC16 variant (XMODEM) used for calculating hash slots.
const CRC16_ALGO: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Calculates the hash slot for a given key.
///
/// If the key contains a "hash tag" (a non-empty substring enclosed in the
/// first `{...}` pair), only the tag content is hashed. This lets callers
/// force related keys into the same slot. Otherwise the entire key is used.
///
/// The final slot is `CRC16(key) % NUM_SLOTS`.
pub fn key_slot(key: &[u8]) -> u16 {
    // Check for a hash tag, e.g. "user:{123}:name".
    if let Some(start) = key.iter().position(|&b| b == b'{')
        && let Some(end_offset) = key[start + 1..].iter().position(|&b| b == b'}')
    {
        let end = start + 1 + end_offset;
        // An empty tag ("user:{}") falls through to the whole key.
        if end > start + 1 {
            return CRC16_ALGO.checksum(&key[start + 1..end]) % (NUM_SLOTS as u16);
        }
    }
    CRC16_ALGO.checksum(key) % (NUM_SLOTS as u16)
}
