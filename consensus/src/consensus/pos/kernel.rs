//! Proof-of-stake kernel verification.
//!
//! A coinstake's kernel (input 0) must satisfy
//! `hash(modifier || block_from.time || tx_prev.time || prevout.n || time_tx)
//! <= coin_day_weight * target`, tying the chance of minting to the coin
//! age one owns. The modifier is taken about a selection interval after
//! the staked coin, so it cannot be known at confirmation time. Block and
//! transaction hashes are deliberately absent from the kernel: they can be
//! generated in vast quantities, which would degrade the scheme back into
//! proof-of-work.

use consensus_core::block::{Block, Header};
use consensus_core::compact::{compact_to_u256, u256_from_hash};
use consensus_core::config::params::Params;
use consensus_core::constants::{Amount, COIN};
use consensus_core::hashing::{put_u32_le, put_u64_le};
use consensus_core::tx::{OutPoint, Transaction};
use consensus_core::Hash;
use crypto_hashes::HashWriter;
use primitive_types::U256;
use tracing::{debug, info};

use super::modifier::selection_interval;
use super::KernelError;
use crate::consensus::index::{BlockIndex, NodeId};

/// The stake modifier chosen for a kernel, with the height and time of the
/// block that generated it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelModifier {
    pub modifier: u64,
    pub height: i32,
    pub time: i64,
}

/// External lookup of a transaction and the header of its containing block
pub trait TransactionProvider {
    fn transaction(&self, txid: &Hash) -> Option<(Transaction, Header)>;
}

/// External script interpreter checking the coinstake input signature
pub trait ScriptVerifier {
    fn verify(&self, script_sig: &[u8], script_pubkey: &[u8], witness: &[Vec<u8>], amount: Amount) -> bool;
}

/// Locate the stake modifier to hash for a kernel: the one generated about
/// a selection interval after the block containing the staked coin.
///
/// `prev` is the block before the one under validation; it need not sit on
/// the active chain, so the forward walk stitches a synthetic chain from
/// `prev` down toward `from` before falling back to active-chain links.
pub fn kernel_stake_modifier(
    params: &Params,
    index: &BlockIndex,
    prev: NodeId,
    from_hash: &Hash,
    print_proof: bool,
    now: i64,
) -> Result<KernelModifier, KernelError> {
    let from = index.by_hash(from_hash).ok_or(KernelError::BlockNotIndexed(*from_hash))?;
    let from_node = index.node(from);
    let mut found = KernelModifier {
        modifier: 0,
        height: from_node.height,
        time: from_node.block_time(),
    };
    let interval = selection_interval(params);

    // The off-active-chain stretch from prev back toward from, reversed so
    // iteration runs forward. Depth includes from itself.
    let depth = index.node(prev).height - (from_node.height - 1);
    let mut tmp_chain: Vec<NodeId> = Vec::with_capacity(depth.max(0) as usize);
    let mut it = Some(prev);
    let mut steps = 1;
    while let Some(id) = it {
        if steps > depth || index.active_contains(id) {
            break;
        }
        tmp_chain.push(id);
        it = index.parent(id);
        steps += 1;
    }
    tmp_chain.reverse();
    let mut n = 0usize;

    let mut cursor = from;
    // loop to find the stake modifier later by a selection interval
    while found.time < from_node.block_time() + interval {
        let old = cursor;
        let use_tmp = !tmp_chain.is_empty() && index.node(cursor).height >= index.node(tmp_chain[0]).height - 1;
        let next = if use_tmp {
            let next = tmp_chain.get(n).copied();
            n += 1;
            next
        } else {
            index.active_next(cursor)
        };
        cursor = match next {
            Some(id) => id,
            None => {
                // reached best block; may happen if this node is behind on
                // the block chain
                let old_node = index.node(old);
                if print_proof || old_node.block_time() + params.stake_min_age - interval > now {
                    return Err(KernelError::ForwardExhausted {
                        hash: old_node.hash,
                        height: old_node.height,
                    });
                }
                return Err(KernelError::TooYoung);
            }
        };
        let node = index.node(cursor);
        if node.generated_stake_modifier() {
            found.height = node.height;
            found.time = node.block_time();
        }
    }
    found.modifier = index.node(cursor).stake_modifier;
    Ok(found)
}

fn time_weight(params: &Params, time_tx: u32, time_block_from: u32) -> i64 {
    ((time_tx - time_block_from) as i64).min(params.stake_max_age - params.stake_min_age)
}

/// Check whether a stake kernel meets the hash target.
///
/// Returns the proof hash on success. Consensus violations come back as
/// [`KernelError::Rejected`]; a kernel that cannot be verified yet because
/// the chain has not advanced far enough surfaces the locator's
/// operational error instead.
#[allow(clippy::too_many_arguments)]
pub fn check_stake_kernel_hash(
    params: &Params,
    index: &BlockIndex,
    bits: u32,
    prev: NodeId,
    block_from: &Header,
    tx_prev: &Transaction,
    prevout: &OutPoint,
    time_tx: u32,
    now: i64,
) -> Result<Hash, KernelError> {
    let hardened = index.node(prev).height + 1 > params.stake_enforcement_height;

    let tx_prev_time = block_from.time;
    if time_tx < tx_prev_time {
        if hardened {
            debug!(target: "kernel", "timestamp violation (time_tx < tx_prev_time)");
        } else {
            debug!(target: "kernel", "nTime violation");
        }
        return Err(KernelError::rejected("bad-stake-time"));
    }

    let time_block_from = block_from.time;
    if time_block_from as i64 + params.stake_min_age > time_tx as i64 {
        if hardened {
            debug!(target: "kernel", "min age violation (time_block_from + stake_min_age > time_tx)");
        } else {
            debug!(target: "kernel", "min age violation");
        }
        return Err(KernelError::rejected("bad-stake-min-age"));
    }

    let target_per_coin_day =
        compact_to_u256(bits).ok_or_else(|| KernelError::rejected("bad-diffbits"))?;
    let value_in = tx_prev
        .outputs
        .get(prevout.index as usize)
        .ok_or_else(|| KernelError::rejected("bad-stake-prevout"))?
        .value;
    if value_in < 0 {
        return Err(KernelError::rejected("bad-stake-prevout"));
    }

    // enforce minimum stake amount
    if value_in < params.min_stake_amount && hardened {
        info!(
            target: "kernel",
            minimum = params.min_stake_amount / COIN,
            found = value_in / COIN,
            "stake amount below minimum"
        );
        return Err(KernelError::rejected("bad-stake-amount"));
    }

    // Kernel hash weight starts from 0 at the min age; capping it at the
    // max age keeps old coins from dominating once difficulty is low.
    let weight = time_weight(params, time_tx, tx_prev_time);
    let coin_day_weight =
        U256::from(value_in as u64) * U256::from(weight as u64) / U256::from(COIN as u64) / U256::from(200u64);

    let kernel = kernel_stake_modifier(params, index, prev, &block_from.hash(), false, now)?;

    let mut writer = HashWriter::new();
    put_u64_le(&mut writer, kernel.modifier);
    put_u32_le(&mut writer, time_block_from);
    put_u32_le(&mut writer, tx_prev_time);
    put_u32_le(&mut writer, prevout.index);
    put_u32_le(&mut writer, time_tx);
    let hash_proof = Hash::from_bytes(writer.finalize_double());

    // 256-bit multiply; an overflowing target can never be met
    let weighted_target = coin_day_weight
        .checked_mul(target_per_coin_day)
        .ok_or_else(|| KernelError::rejected("bad-stake-kernel"))?;

    debug!(
        target: "kernel",
        value_in,
        proof = %hash_proof,
        hash_target = format_args!("{weighted_target:x}"),
        "kernel hash check"
    );
    if u256_from_hash(&hash_proof) > weighted_target {
        return Err(KernelError::rejected("bad-stake-kernel"));
    }

    debug!(
        target: "kernel",
        modifier = format_args!("{:#018x}", kernel.modifier),
        modifier_height = kernel.height,
        modifier_time = kernel.time,
        time_block_from,
        prevout_n = prevout.index,
        time_tx,
        proof = %hash_proof,
        "kernel accepted"
    );
    Ok(hash_proof)
}

/// Check the kernel hash target and coinstake signature of a block.
///
/// The transaction index and script interpreter are external collaborators
/// supplied through the trait seams.
pub fn check_proof_of_stake(
    params: &Params,
    index: &BlockIndex,
    prev: NodeId,
    block: &Block,
    transactions: &dyn TransactionProvider,
    scripts: &dyn ScriptVerifier,
    now: i64,
) -> Result<Hash, KernelError> {
    let hardened = index.node(prev).height + 1 > params.stake_enforcement_height;

    let tx = block
        .transactions
        .get(1)
        .filter(|tx| tx.is_coinstake())
        .ok_or_else(|| KernelError::rejected("bad-coinstake"))?;

    // Kernel (input 0) must match the stake hash target per coin age
    let txin = &tx.inputs[0];

    let (tx_prev, header_from) = transactions
        .transaction(&txin.prevout.txid)
        .ok_or(KernelError::TxNotIndexed(txin.prevout.txid))?;

    // Enforce minimum stake depth
    let prev_height = index.node(prev).height;
    let from_height = index.lookup_height(&header_from.hash()).unwrap_or(0);
    if from_height == 0 && hardened {
        return Err(KernelError::TxNotIndexed(txin.prevout.txid));
    }
    if !params.has_stake_min_depth(prev_height + 1, from_height) && hardened {
        info!(
            target: "kernel",
            height = prev_height,
            from_height,
            depth = prev_height - from_height,
            "stake depth below minimum"
        );
        return Err(KernelError::rejected("bad-stake-depth"));
    }

    // Verify signature on the kernel input
    let prev_out = tx_prev
        .outputs
        .get(txin.prevout.index as usize)
        .ok_or_else(|| KernelError::rejected("bad-stake-prevout"))?;
    if !scripts.verify(&txin.script_sig, &prev_out.script_pubkey, &txin.witness, prev_out.value) {
        return Err(KernelError::rejected("bad-coinstake-script"));
    }

    check_stake_kernel_hash(
        params,
        index,
        block.header.bits,
        prev,
        &header_from,
        &tx_prev,
        &txin.prevout,
        block.header.time,
        now,
    )
}
