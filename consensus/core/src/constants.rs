/// Monetary amount in atomic units. Signed, matching the wire encoding of
/// transaction output values.
pub type Amount = i64;

/// Number of atomic units in one coin
pub const COIN: Amount = 100_000_000;

/// Maximum money supply (21 million coins)
pub const MAX_MONEY: Amount = 21_000_000 * COIN;

/// True when the amount lies inside the legal monetary range
pub fn money_range(value: Amount) -> bool {
    (0..=MAX_MONEY).contains(&value)
}

/// Current block version
pub const BLOCK_VERSION: i32 = 1;

/// Scale factor applied to the no-witness serialized size when weighing a
/// transaction against the block weight limit
pub const WITNESS_SCALE_FACTOR: usize = 4;

/// Maximum block weight (no-witness size times the scale factor)
pub const MAX_BLOCK_WEIGHT: usize = 4_000_000;

/// Maximum size of a special transaction's extra payload in bytes
pub const MAX_TX_EXTRA_PAYLOAD: usize = 10_000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_range_bounds() {
        assert!(money_range(0));
        assert!(money_range(MAX_MONEY));
        assert!(!money_range(-1));
        assert!(!money_range(MAX_MONEY + 1));
    }
}
