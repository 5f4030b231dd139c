use crypto_hashes::{double_sha256, Hash, ZERO_HASH};

use crate::tx::Transaction;

/// Compute the merkle root of a list of hashes using the classic pairing
/// scheme: odd levels duplicate their last entry.
pub fn compute_merkle_root(hashes: &[Hash]) -> Hash {
    if hashes.is_empty() {
        return ZERO_HASH;
    }
    let mut level: Vec<Hash> = hashes.to_vec();
    while level.len() > 1 {
        if level.len() % 2 == 1 {
            level.push(*level.last().unwrap());
        }
        level = level
            .chunks(2)
            .map(|pair| {
                let mut concat = [0u8; 64];
                concat[..32].copy_from_slice(pair[0].as_bytes());
                concat[32..].copy_from_slice(pair[1].as_bytes());
                Hash::from_bytes(double_sha256(&concat))
            })
            .collect();
    }
    level[0]
}

/// Merkle root over a block's transaction ids
pub fn block_merkle_root(transactions: &[Transaction]) -> Hash {
    let txids: Vec<Hash> = transactions.iter().map(|tx| tx.txid()).collect();
    compute_merkle_root(&txids)
}
