//! Consensus module for the proof-of-stake chain
//!
//! This module implements the staking consensus rules: the block index,
//! stateless transaction checks, stake-modifier generation and kernel
//! verification.

pub mod index;
pub mod pos;
pub mod validation;

pub use index::{BlockIndex, BlockIndexNode, NodeId};
pub use pos::KernelError;
pub use validation::check_transaction;
