use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::hashing;
use crate::merkle;
use crate::tx::Transaction;
use crate::Hash;

/// Block header
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Header {
    pub version: i32,
    pub hash_prev_block: Hash,
    pub hash_merkle_root: Hash,
    pub time: u32,
    pub bits: u32,
    pub nonce: u32,
}

impl Header {
    /// Block hash over the 80-byte wire encoding
    pub fn hash(&self) -> Hash {
        hashing::header::header_hash(self)
    }

    pub fn block_time(&self) -> i64 {
        self.time as i64
    }
}

/// Complete block structure including header and transactions
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Block {
    pub header: Header,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(header: Header, transactions: Vec<Transaction>) -> Self {
        Self { header, transactions }
    }

    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    /// A proof-of-stake block carries its coinstake as the second transaction
    pub fn is_proof_of_stake(&self) -> bool {
        self.transactions.len() > 1 && self.transactions[1].is_coinstake()
    }

    /// Merkle root over the transaction ids
    pub fn merkle_root(&self) -> Hash {
        merkle::block_merkle_root(&self.transactions)
    }
}
