//!
//! # Transaction
//!
//! This module implements the consensus [`Transaction`] structure and related types.
//!

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::constants::Amount;
use crate::hashing;
use crate::Hash;

/// A 32-byte transaction identifier.
pub type TransactionId = Hash;

/// Sequence number finalizing an input
pub const SEQUENCE_FINAL: u32 = 0xffff_ffff;

/// Special transaction types, carried in the high half of the 32-bit
/// version word on the wire. Unknown values survive deserialization as raw
/// `u16`s and are rejected during context-free validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
pub enum TxType {
    Normal = 0,
    Coinbase = 1,
    ProviderRegister = 2,
    ProviderUpdateService = 3,
    ProviderUpdateRevoke = 4,
    QuorumCommitment = 5,
    Stake = 6,
}

impl TxType {
    pub fn from_u16(raw: u16) -> Option<TxType> {
        match raw {
            0 => Some(TxType::Normal),
            1 => Some(TxType::Coinbase),
            2 => Some(TxType::ProviderRegister),
            3 => Some(TxType::ProviderUpdateService),
            4 => Some(TxType::ProviderUpdateRevoke),
            5 => Some(TxType::QuorumCommitment),
            6 => Some(TxType::Stake),
            _ => None,
        }
    }
}

/// Reference to an output of a previous transaction
#[derive(
    Eq, Default, Hash, PartialEq, Debug, Copy, Clone, Serialize, Deserialize, BorshSerialize, BorshDeserialize, PartialOrd, Ord,
)]
pub struct OutPoint {
    pub txid: TransactionId,
    pub index: u32,
}

impl OutPoint {
    pub fn new(txid: TransactionId, index: u32) -> Self {
        Self { txid, index }
    }

    /// The null outpoint marks coinbase inputs
    pub fn null() -> Self {
        Self { txid: Hash::default(), index: u32::MAX }
    }

    pub fn is_null(&self) -> bool {
        self.txid.is_zero() && self.index == u32::MAX
    }
}

impl Display for OutPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.txid, self.index)
    }
}

/// Transaction input
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TxIn {
    pub prevout: OutPoint,
    pub script_sig: Vec<u8>,
    pub sequence: u32,
    /// Segregated witness stack; excluded from the txid encoding
    pub witness: Vec<Vec<u8>>,
}

impl TxIn {
    pub fn new(prevout: OutPoint, script_sig: Vec<u8>, sequence: u32) -> Self {
        Self { prevout, script_sig, sequence, witness: Vec::new() }
    }
}

/// Transaction output
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TxOut {
    pub value: Amount,
    pub script_pubkey: Vec<u8>,
}

impl TxOut {
    pub fn new(value: Amount, script_pubkey: Vec<u8>) -> Self {
        Self { value, script_pubkey }
    }

    /// Empty outputs mark the coinstake slot: no value and no script
    pub fn is_empty(&self) -> bool {
        self.value == 0 && self.script_pubkey.is_empty()
    }
}

/// A transaction
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Transaction {
    pub version: i16,
    /// Raw special-transaction type; see [`TxType`]
    pub tx_type: u16,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub lock_time: u32,
    /// Special-transaction payload, bounded by `MAX_TX_EXTRA_PAYLOAD`
    pub extra_payload: Vec<u8>,
}

impl Transaction {
    pub fn new(
        version: i16,
        tx_type: TxType,
        inputs: Vec<TxIn>,
        outputs: Vec<TxOut>,
        lock_time: u32,
        extra_payload: Vec<u8>,
    ) -> Self {
        Self { version, tx_type: tx_type as u16, inputs, outputs, lock_time, extra_payload }
    }

    /// The declared special-transaction type, if it is a known one
    pub fn typ(&self) -> Option<TxType> {
        TxType::from_u16(self.tx_type)
    }

    pub fn is_type(&self, typ: TxType) -> bool {
        self.tx_type == typ as u16
    }

    /// A coinbase transaction has exactly one input spending the null outpoint
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].prevout.is_null()
    }

    /// A coinstake commits a real outpoint in input 0 and leaves output 0 empty
    pub fn is_coinstake(&self) -> bool {
        !self.inputs.is_empty()
            && !self.inputs[0].prevout.is_null()
            && self.outputs.len() >= 2
            && self.outputs[0].is_empty()
    }

    /// Transaction id: double-SHA256 over the no-witness wire encoding
    pub fn txid(&self) -> TransactionId {
        hashing::tx::transaction_id(self)
    }

    /// Serialized size excluding witness data
    pub fn serialized_size_no_witness(&self) -> usize {
        hashing::tx::serialized_size_no_witness(self)
    }
}
