pub mod hasher;

// Re-export commonly used types
pub use hasher::{double_sha256, sha256, HashWriter};

use std::fmt;
use std::hash::Hash as StdHash;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

pub const HASH_SIZE: usize = 32;

/// All-zero hash, used for null prevouts and the genesis parent link.
pub const ZERO_HASH: Hash = Hash([0u8; 32]);

/// A 32-byte hash wrapper used across the project.
///
/// Bytes are kept in wire order (little-endian as an integer). Hex display
/// and parsing follow the conventional reversed (big-endian) notation, so
/// `to_string()` of a block hash matches what explorers print.
///
/// `Ord` compares the raw byte arrays; candidate tie-breaking in the stake
/// modifier engine relies on exactly this order.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct Hash([u8; 32]);

impl Hash {
    /// Create a hash from a 32-byte array in wire order
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns raw bytes in wire order
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Constructs a hash from four little-endian u64s (used in tests)
    pub const fn from_le_u64(parts: [u64; 4]) -> Self {
        let mut bytes = [0u8; 32];
        let mut i = 0;
        while i < 4 {
            let part = parts[i].to_le_bytes();
            let mut j = 0;
            while j < 8 {
                bytes[i * 8 + j] = part[j];
                j += 1;
            }
            i += 1;
        }
        Self(bytes)
    }

    /// Tries to create a Hash from a slice of bytes
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, std::array::TryFromSliceError> {
        let array: [u8; 32] = slice.try_into()?;
        Ok(Self(array))
    }

    /// Parse the reversed-hex notation, e.g.
    /// `"0000098e30a3d29ee06c8f371e9e1fc516c8218b1be2615b7b0ec31649ed12e3"`.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        bytes.reverse();
        Ok(Self(bytes))
    }
}

impl From<[u8; 32]> for Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Hash::from_bytes(bytes)
    }
}

impl From<Hash> for [u8; 32] {
    fn from(h: Hash) -> Self {
        h.0
    }
}

impl TryFrom<&[u8]> for Hash {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let array: [u8; 32] = slice.try_into()?;
        Ok(Self(array))
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for Hash {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut reversed = self.0;
        reversed.reverse();
        write!(f, "{}", hex::encode(reversed))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self)
    }
}

impl StdHash for Hash {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        // use the last u64 as a fast hasher source
        let mut le = [0u8; 8];
        le.copy_from_slice(&self.0[24..32]);
        let v = u64::from_le_bytes(le);
        v.hash(state);
    }
}

impl Deref for Hash {
    type Target = [u8; 32];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Hash {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
