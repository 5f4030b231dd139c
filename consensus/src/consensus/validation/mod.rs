//! Validation module for consensus
//!
//! Context-free transaction checks: shape, size and value rules that do
//! not depend on any chain state.

pub mod transaction_validator;

pub use transaction_validator::check_transaction;
