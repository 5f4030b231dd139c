use crypto_hashes::{Hash, HashWriter};

use super::{put_i32_le, put_u32_le, WireSink};
use crate::block::Header;

/// Encode the 80-byte block header
pub fn encode<S: WireSink>(header: &Header, s: &mut S) {
    put_i32_le(s, header.version);
    s.put(header.hash_prev_block.as_bytes());
    s.put(header.hash_merkle_root.as_bytes());
    put_u32_le(s, header.time);
    put_u32_le(s, header.bits);
    put_u32_le(s, header.nonce);
}

/// Block hash: double-SHA256 over the 80-byte header encoding
pub fn header_hash(header: &Header) -> Hash {
    let mut writer = HashWriter::new();
    encode(header, &mut writer);
    Hash::from_bytes(writer.finalize_double())
}
