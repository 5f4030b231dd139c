//! Proof-of-stake consensus: stake modifier generation and the kernel
//! hash predicate.

pub mod kernel;
pub mod modifier;

#[cfg(test)]
mod integration_test;

use consensus_core::errors::TxRejection;
use consensus_core::Hash;
use thiserror::Error;

/// Failures of the staking consensus paths.
///
/// Two families live here. Consensus rejections ([`KernelError::Rejected`])
/// are terminal verdicts on the block or transaction. Everything else is
/// operational: the caller may retry once the missing data arrives, and
/// [`KernelError::TooYoung`] is the silent negative returned while a kernel
/// is not yet verifiable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    #[error("block {0} not found in index")]
    BlockNotIndexed(Hash),

    #[error("transaction {0} not found")]
    TxNotIndexed(Hash),

    #[error("no stake modifier generated before genesis")]
    NoGeneratedModifier,

    #[error("unable to select candidate block at round {0}")]
    SelectionFailed(usize),

    #[error("ancestor walk exceeded its bound of {0} nodes")]
    AncestryTooDeep(usize),

    #[error("reached best block {hash} at height {height} before covering the selection interval")]
    ForwardExhausted { hash: Hash, height: i32 },

    #[error("stake kernel not yet verifiable")]
    TooYoung,

    #[error(transparent)]
    Rejected(#[from] TxRejection),
}

impl KernelError {
    pub fn rejected(reason: &'static str) -> Self {
        KernelError::Rejected(TxRejection::consensus(reason))
    }

    /// True for terminal consensus rejections, false for operational
    /// failures that may clear up after a retry
    pub fn is_rejection(&self) -> bool {
        matches!(self, KernelError::Rejected(_))
    }
}
