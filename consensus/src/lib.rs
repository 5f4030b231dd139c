//! Consensus library for the Peridot proof-of-stake chain
//!
//! This library implements the staking consensus core: the block index
//! view, context-free transaction validation, the stake-modifier engine
//! and the kernel-hash predicate.

pub mod consensus;

// Re-export key types for easier access
pub use consensus_core::Hash;
pub use consensus::index::{BlockIndex, BlockIndexNode, NodeId};
pub use consensus::pos::kernel::{
    check_proof_of_stake, check_stake_kernel_hash, kernel_stake_modifier, KernelModifier,
    ScriptVerifier, TransactionProvider,
};
pub use consensus::pos::modifier::{
    check_stake_modifier_checkpoints, compute_next_stake_modifier, selection_interval,
    stake_entropy_bit, stake_modifier_checksum, update_stake_modifier,
};
pub use consensus::pos::KernelError;
pub use consensus::validation::check_transaction;
