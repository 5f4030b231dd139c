//! Compact-bits difficulty encoding.
//!
//! The `nBits` header field packs a 256-bit target into 32 bits: one byte
//! of base-256 exponent and a 23-bit mantissa, with bit 0x00800000 acting
//! as a sign bit. Both directions must be reproduced exactly; targets flow
//! into the proof-of-stake kernel predicate.

use crypto_hashes::Hash;
use primitive_types::U256;

/// Decode a compact representation into a 256-bit target.
///
/// Returns `None` when the encoding is negative or overflows 256 bits,
/// which no honest header can carry.
pub fn compact_to_u256(bits: u32) -> Option<U256> {
    let size = (bits >> 24) as usize;
    let word = bits & 0x007f_ffff;

    let negative = word != 0 && (bits & 0x0080_0000) != 0;
    let overflow = word != 0 && (size > 34 || (word > 0xff && size > 33) || (word > 0xffff && size > 32));
    if negative || overflow {
        return None;
    }

    let target = if size <= 3 {
        U256::from(word >> (8 * (3 - size)))
    } else {
        U256::from(word) << (8 * (size - 3))
    };
    Some(target)
}

/// Encode a 256-bit target into its compact representation.
pub fn u256_to_compact(target: U256) -> u32 {
    let mut size = (target.bits() + 7) / 8;
    let mut compact = if size <= 3 {
        target.low_u64() << (8 * (3 - size))
    } else {
        (target >> (8 * (size - 3))).low_u64()
    };
    // The 0x00800000 bit denotes the sign; shift the mantissa down if set.
    if compact & 0x0080_0000 != 0 {
        compact >>= 8;
        size += 1;
    }
    (compact as u32) | ((size as u32) << 24)
}

/// Interpret a hash as a 256-bit little-endian integer
pub fn u256_from_hash(hash: &Hash) -> U256 {
    U256::from_little_endian(hash.as_bytes())
}
