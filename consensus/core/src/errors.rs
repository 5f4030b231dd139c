use thiserror::Error;

/// Reject code attached to consensus-invalid transactions and blocks,
/// mirroring the P2P reject-message code space.
pub const REJECT_INVALID: u8 = 0x10;

/// Classification of a validation rejection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    /// The object violates a consensus rule and is permanently invalid
    Consensus,
}

/// A structured consensus rejection. These are terminal: the offending
/// transaction or block is never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct TxRejection {
    pub kind: RejectionKind,
    pub code: u8,
    pub reason: &'static str,
}

impl TxRejection {
    pub fn consensus(reason: &'static str) -> Self {
        Self { kind: RejectionKind::Consensus, code: REJECT_INVALID, reason }
    }
}

/// Errors raised while constructing or mutating chain parameters
#[derive(Error, Debug)]
pub enum ParamsError {
    #[error("invalid chain parameter '{field}': {message}")]
    Invalid { field: &'static str, message: String },

    #[error("version bits parameters malformed, expecting deployment:start:end, got '{0}'")]
    MalformedVersionBits(String),

    #[error("invalid version bits start time '{0}'")]
    InvalidVersionBitsStart(String),

    #[error("invalid version bits timeout '{0}'")]
    InvalidVersionBitsTimeout(String),

    #[error("invalid deployment '{0}'")]
    UnknownDeployment(String),

    #[error("invalid hash literal: {0}")]
    BadHash(#[from] hex::FromHexError),

    #[error("genesis {field} mismatch: computed {got}, committed {expected}")]
    GenesisMismatch { field: &'static str, got: String, expected: String },

    #[error("chain parameters already selected")]
    AlreadySelected,
}
