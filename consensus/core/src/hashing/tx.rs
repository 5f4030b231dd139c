use crypto_hashes::{Hash, HashWriter};

use super::{put_compact_size, put_i64_le, put_u32_le, put_var_bytes, SizeSink, WireSink};
use crate::tx::{Transaction, TransactionId, TxType};

/// Encode a transaction without witness data.
///
/// Layout: `(type << 16 | version)` as u32, inputs, outputs, lock time,
/// then the extra payload for special transactions (`version >= 2` with a
/// non-Normal type).
pub fn encode_no_witness<S: WireSink>(tx: &Transaction, s: &mut S) {
    let version_word = ((tx.tx_type as u32) << 16) | (tx.version as u16 as u32);
    put_u32_le(s, version_word);

    put_compact_size(s, tx.inputs.len() as u64);
    for input in &tx.inputs {
        s.put(input.prevout.txid.as_bytes());
        put_u32_le(s, input.prevout.index);
        put_var_bytes(s, &input.script_sig);
        put_u32_le(s, input.sequence);
    }

    put_compact_size(s, tx.outputs.len() as u64);
    for output in &tx.outputs {
        put_i64_le(s, output.value);
        put_var_bytes(s, &output.script_pubkey);
    }

    put_u32_le(s, tx.lock_time);

    if tx.version >= 2 && !tx.is_type(TxType::Normal) {
        put_var_bytes(s, &tx.extra_payload);
    }
}

/// Transaction id: double-SHA256 over the no-witness encoding
pub fn transaction_id(tx: &Transaction) -> TransactionId {
    let mut writer = HashWriter::new();
    encode_no_witness(tx, &mut writer);
    Hash::from_bytes(writer.finalize_double())
}

/// Serialized size of the no-witness encoding in bytes
pub fn serialized_size_no_witness(tx: &Transaction) -> usize {
    let mut sink = SizeSink::default();
    encode_no_witness(tx, &mut sink);
    sink.0
}
