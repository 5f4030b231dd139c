//! Context-free transaction validation.
//!
//! These checks are pure: they depend only on the transaction itself and
//! stop at the first violated rule, reporting it as a structured
//! consensus rejection.

use std::collections::HashSet;

use consensus_core::constants::{money_range, Amount, MAX_BLOCK_WEIGHT, MAX_MONEY, MAX_TX_EXTRA_PAYLOAD, WITNESS_SCALE_FACTOR};
use consensus_core::errors::TxRejection;
use consensus_core::tx::{Transaction, TxType};

/// Validate a transaction independent of chain state.
///
/// The duplicate-input scan is quadratic-ish in allocations, so block-level
/// callers that already checked it elsewhere pass `check_duplicate_inputs
/// = false`.
pub fn check_transaction(tx: &Transaction, check_duplicate_inputs: bool) -> Result<(), TxRejection> {
    // Quorum commitments are the one type allowed to have no inputs or outputs
    let allow_empty_in_out = tx.is_type(TxType::QuorumCommitment);

    if !allow_empty_in_out && tx.inputs.is_empty() {
        return Err(TxRejection::consensus("bad-txns-vin-empty"));
    }
    if !allow_empty_in_out && tx.outputs.is_empty() {
        return Err(TxRejection::consensus("bad-txns-vout-empty"));
    }

    // Size limits (witness data is excluded here; it has not been checked
    // for malleability yet)
    if tx.serialized_size_no_witness() * WITNESS_SCALE_FACTOR > MAX_BLOCK_WEIGHT {
        return Err(TxRejection::consensus("bad-txns-oversize"));
    }
    if tx.extra_payload.len() > MAX_TX_EXTRA_PAYLOAD {
        return Err(TxRejection::consensus("bad-txns-payload-oversize"));
    }

    // check transaction types
    if tx.version >= 2 && tx.typ().is_none() {
        return Err(TxRejection::consensus("bad-txns-type"));
    }
    if tx.is_coinbase() && tx.version >= 2 && !tx.is_type(TxType::Coinbase) {
        return Err(TxRejection::consensus("bad-txns-cb-type"));
    }

    // Check for negative or overflow output values
    let mut value_out: Amount = 0;
    for output in &tx.outputs {
        if output.value < 0 {
            return Err(TxRejection::consensus("bad-txns-vout-negative"));
        }
        if output.value > MAX_MONEY {
            return Err(TxRejection::consensus("bad-txns-vout-toolarge"));
        }
        value_out += output.value;
        if !money_range(value_out) {
            return Err(TxRejection::consensus("bad-txns-txouttotal-toolarge"));
        }
    }

    // Check for duplicate inputs - note that this check is slow so it is
    // skipped in the block path
    if check_duplicate_inputs {
        let mut outpoints = HashSet::with_capacity(tx.inputs.len());
        for input in &tx.inputs {
            if !outpoints.insert(input.prevout) {
                return Err(TxRejection::consensus("bad-txns-inputs-duplicate"));
            }
        }
    }

    if tx.is_coinbase() {
        let script_len = tx.inputs[0].script_sig.len();
        if !(1..=100).contains(&script_len) {
            return Err(TxRejection::consensus("bad-cb-length"));
        }
    } else {
        for input in &tx.inputs {
            if input.prevout.is_null() {
                return Err(TxRejection::consensus("bad-txns-prevout-null"));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use consensus_core::tx::{OutPoint, TxIn, TxOut, SEQUENCE_FINAL};
    use consensus_core::Hash;

    fn outpoint(n: u64) -> OutPoint {
        OutPoint::new(Hash::from_le_u64([n, 0, 0, 0]), 0)
    }

    fn simple_tx() -> Transaction {
        Transaction::new(
            1,
            TxType::Normal,
            vec![TxIn::new(outpoint(1), vec![], SEQUENCE_FINAL)],
            vec![TxOut::new(1000, vec![0x51])],
            0,
            vec![],
        )
    }

    fn coinbase(script_sig_len: usize) -> Transaction {
        Transaction::new(
            1,
            TxType::Normal,
            vec![TxIn::new(OutPoint::null(), vec![0x00; script_sig_len], SEQUENCE_FINAL)],
            vec![TxOut::new(0, vec![0x51])],
            0,
            vec![],
        )
    }

    fn reason(result: Result<(), TxRejection>) -> &'static str {
        result.unwrap_err().reason
    }

    #[test]
    fn valid_transaction_passes_and_is_idempotent() {
        let tx = simple_tx();
        assert!(check_transaction(&tx, true).is_ok());
        assert!(check_transaction(&tx, true).is_ok());
        assert!(check_transaction(&tx, false).is_ok());
    }

    #[test]
    fn empty_vectors_rejected_except_quorum_commitment() {
        let mut tx = simple_tx();
        tx.inputs.clear();
        assert_eq!(reason(check_transaction(&tx, true)), "bad-txns-vin-empty");

        let mut tx = simple_tx();
        tx.outputs.clear();
        assert_eq!(reason(check_transaction(&tx, true)), "bad-txns-vout-empty");

        let commitment = Transaction::new(2, TxType::QuorumCommitment, vec![], vec![], 0, vec![1, 2, 3]);
        assert!(check_transaction(&commitment, true).is_ok());
    }

    #[test]
    fn oversize_transaction_rejected() {
        let mut tx = simple_tx();
        // Push the no-witness size above MAX_BLOCK_WEIGHT / WITNESS_SCALE_FACTOR
        tx.outputs[0].script_pubkey = vec![0; MAX_BLOCK_WEIGHT / WITNESS_SCALE_FACTOR];
        assert_eq!(reason(check_transaction(&tx, true)), "bad-txns-oversize");
    }

    #[test]
    fn oversize_payload_rejected() {
        let mut tx = simple_tx();
        tx.version = 2;
        tx.tx_type = TxType::Stake as u16;
        tx.extra_payload = vec![0; MAX_TX_EXTRA_PAYLOAD + 1];
        assert_eq!(reason(check_transaction(&tx, true)), "bad-txns-payload-oversize");
    }

    #[test]
    fn unknown_type_rejected_for_v2() {
        let mut tx = simple_tx();
        tx.version = 2;
        tx.tx_type = 999;
        assert_eq!(reason(check_transaction(&tx, true)), "bad-txns-type");
        // Version 1 predates typed transactions
        tx.version = 1;
        assert!(check_transaction(&tx, true).is_ok());
    }

    #[test]
    fn v2_coinbase_must_declare_coinbase_type() {
        let mut tx = coinbase(10);
        tx.version = 2;
        tx.tx_type = TxType::Normal as u16;
        assert_eq!(reason(check_transaction(&tx, true)), "bad-txns-cb-type");
        tx.tx_type = TxType::Coinbase as u16;
        assert!(check_transaction(&tx, true).is_ok());
    }

    #[test]
    fn output_value_range_checks() {
        let mut tx = simple_tx();
        tx.outputs[0].value = -1;
        assert_eq!(reason(check_transaction(&tx, true)), "bad-txns-vout-negative");

        tx.outputs[0].value = MAX_MONEY + 1;
        assert_eq!(reason(check_transaction(&tx, true)), "bad-txns-vout-toolarge");

        tx.outputs = vec![TxOut::new(MAX_MONEY, vec![]), TxOut::new(1, vec![])];
        assert_eq!(reason(check_transaction(&tx, true)), "bad-txns-txouttotal-toolarge");
    }

    #[test]
    fn duplicate_inputs_only_rejected_when_checked() {
        let mut tx = simple_tx();
        tx.inputs.push(tx.inputs[0].clone());
        assert_eq!(reason(check_transaction(&tx, true)), "bad-txns-inputs-duplicate");
        // The flag disables the scan
        assert!(check_transaction(&tx, false).is_ok());
    }

    #[test]
    fn coinbase_script_length_bounds() {
        assert_eq!(reason(check_transaction(&coinbase(0), true)), "bad-cb-length");
        assert!(check_transaction(&coinbase(1), true).is_ok());
        assert!(check_transaction(&coinbase(100), true).is_ok());
        assert_eq!(reason(check_transaction(&coinbase(101), true)), "bad-cb-length");
    }

    #[test]
    fn null_prevout_rejected_outside_coinbase() {
        let mut tx = simple_tx();
        tx.inputs.push(TxIn::new(OutPoint::null(), vec![], SEQUENCE_FINAL));
        assert_eq!(reason(check_transaction(&tx, true)), "bad-txns-prevout-null");
    }
}
