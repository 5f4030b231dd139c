//! Core consensus types for the Peridot chain: transactions, headers,
//! amounts, compact difficulty encoding, and the per-network chain
//! parameter registry.

pub mod block;
pub mod compact;
pub mod config;
pub mod constants;
pub mod errors;
pub mod hashing;
pub mod merkle;
pub mod network;
pub mod tx;

// Re-export key types for easier access
pub use crypto_hashes::{Hash, ZERO_HASH};

pub use block::{Block, Header};
pub use config::params::{ChainParams, Params};
pub use constants::{Amount, COIN, MAX_MONEY};
pub use errors::{ParamsError, TxRejection};
pub use network::NetworkType;
pub use tx::{OutPoint, Transaction, TxIn, TxOut, TxType};
