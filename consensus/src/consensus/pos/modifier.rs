//! Stake modifier generation.
//!
//! The stake modifier prevents a txout owner from computing the future
//! proof-of-stake generated by that txout at the time of its confirmation:
//! the kernel must hash with a modifier that is only fixed later. The
//! modifier is a 64-bit value whose bits are contributed by blocks selected
//! from a rolling window of history, one per round, and it is recomputed at
//! a fixed time interval instead of every block so an attacker cannot gain
//! control of additional bits by generating a burst of blocks.

use std::collections::HashMap;

use consensus_core::compact::u256_from_hash;
use consensus_core::config::params::Params;
use consensus_core::hashing::{put_u32_le, put_u64_le, WireSink};
use consensus_core::{Hash, NetworkType};
use crypto_hashes::HashWriter;
use primitive_types::U256;
use tracing::debug;

use super::KernelError;
use crate::consensus::index::{BlockIndex, NodeId};

/// Ratio of group interval length between the last group and the first group
pub const MODIFIER_INTERVAL_RATIO: i64 = 3;

/// Hard checkpoints of stake modifier checksums, enforced on main only
const STAKE_MODIFIER_CHECKPOINTS: [(i32, u32); 16] = [
    (0, 0x0e00670b),
    (10_000, 0x5cfbce9d),
    (20_000, 0xc16b56d1),
    (40_000, 0xb9778a75),
    (60_000, 0x20607fd3),
    (80_000, 0x5ea04d7d),
    (100_000, 0x8c5032f4),
    (120_000, 0x02f548e8),
    (140_000, 0xa6ce0a3c),
    (160_000, 0xfdb8036e),
    (180_000, 0xa0987af6),
    (200_000, 0x3ab8869c),
    (220_000, 0x06de4abd),
    (240_000, 0x835b2471),
    (260_000, 0x9b40c935),
    (280_000, 0xd07f22c6),
];

/// Entropy bit of a block: the lowest bit of its hash read as a
/// little-endian integer
pub fn stake_entropy_bit(hash: &Hash) -> u32 {
    (hash.as_bytes()[0] & 1) as u32
}

/// Width in seconds of one selection section. The last section spans the
/// full modifier interval; the first is narrower by
/// [`MODIFIER_INTERVAL_RATIO`].
pub fn selection_interval_section(params: &Params, section: i32) -> i64 {
    assert!((0..64).contains(&section));
    params.modifier_interval * 63 / (63 + (63 - section as i64) * (MODIFIER_INTERVAL_RATIO - 1))
}

/// Total width of the 64-section selection interval in seconds
pub fn selection_interval(params: &Params) -> i64 {
    (0..64).map(|section| selection_interval_section(params, section)).sum()
}

/// Walk back from `node` to the nearest ancestor that generated a
/// modifier, returning the modifier and its generation time
fn last_stake_modifier(index: &BlockIndex, start: NodeId) -> Result<(u64, i64), KernelError> {
    let mut cursor = Some(start);
    while let Some(id) = cursor {
        let node = index.node(id);
        if node.generated_stake_modifier() {
            return Ok((node.stake_modifier, node.block_time()));
        }
        cursor = node.prev;
    }
    Err(KernelError::NoGeneratedModifier)
}

/// Selection hash binding a candidate's proof hash to the previous modifier
fn selection_hash(proof: &Hash, prev_modifier: u64) -> U256 {
    let mut writer = HashWriter::new();
    writer.put(proof.as_bytes());
    put_u64_le(&mut writer, prev_modifier);
    u256_from_hash(&Hash::from_bytes(writer.finalize_double()))
}

/// Select one block from the sorted candidates, excluding already selected
/// blocks, considering timestamps up to `stop` once something is selected.
fn select_block_from_candidates(
    index: &BlockIndex,
    sorted_by_timestamp: &[(i64, Hash)],
    selected: &HashMap<Hash, NodeId>,
    stop: i64,
    prev_modifier: u64,
    round: usize,
) -> Result<NodeId, KernelError> {
    let mut best: Option<(U256, NodeId)> = None;
    for (time, hash) in sorted_by_timestamp {
        let id = index.by_hash(hash).ok_or(KernelError::BlockNotIndexed(*hash))?;
        if best.is_some() && *time > stop {
            break;
        }
        if selected.contains_key(hash) {
            continue;
        }
        let node = index.node(id);
        // Hash the candidate's proof hash with the previous modifier; PoS
        // blocks shift right by 32 bits so they are always favored over
        // proof-of-work blocks, preserving the energy-efficiency property.
        let proof = if node.is_proof_of_stake() { node.hash_proof_of_stake } else { node.hash };
        let mut hash_selection = selection_hash(&proof, prev_modifier);
        if node.is_proof_of_stake() {
            hash_selection = hash_selection >> 32usize;
        }
        match best {
            Some((best_hash, _)) if hash_selection < best_hash => best = Some((hash_selection, id)),
            None => best = Some((hash_selection, id)),
            _ => {}
        }
    }
    match best {
        Some((hash_selection, id)) => {
            debug!(target: "kernel", selection_hash = format_args!("{hash_selection:064x}"), "candidate selected");
            Ok(id)
        }
        None => Err(KernelError::SelectionFailed(round)),
    }
}

/// Compute the stake modifier contributed by `current`.
///
/// Returns the modifier and whether it was freshly generated; the caller
/// commits both onto the node. The result is a pure function of the
/// parent's history and the block times involved.
pub fn compute_next_stake_modifier(
    params: &Params,
    index: &BlockIndex,
    current: NodeId,
) -> Result<(u64, bool), KernelError> {
    let current_node = index.node(current);
    let prev = match current_node.prev {
        Some(prev) => prev,
        // genesis block's modifier is 0
        None => return Ok((0, true)),
    };

    // First find the current modifier and its generation time; if no new
    // interval has elapsed, keep it.
    let (prev_modifier, modifier_time) = last_stake_modifier(index, prev)?;
    debug!(
        target: "kernel",
        modifier = format_args!("{prev_modifier:#018x}"),
        time = modifier_time,
        "previous stake modifier"
    );

    let prev_node = index.node(prev);
    if modifier_time / params.modifier_interval >= prev_node.block_time() / params.modifier_interval {
        debug!(
            target: "kernel",
            height = prev_node.height,
            time = prev_node.time,
            "no new interval, keeping current modifier"
        );
        return Ok((prev_modifier, false));
    }
    if modifier_time / params.modifier_interval >= current_node.block_time() / params.modifier_interval {
        debug!(
            target: "kernel",
            height = current_node.height,
            time = current_node.time,
            "no new interval, keeping current modifier"
        );
        return Ok((prev_modifier, false));
    }

    // Collect candidate blocks inside the selection window, oldest first
    let interval = selection_interval(params);
    let selection_start =
        prev_node.block_time() / params.modifier_interval * params.modifier_interval - interval;
    let walk_bound = (interval + params.pos_target_spacing - 1) / params.pos_target_spacing
        + params.min_stake_history as i64;
    let mut candidates: Vec<(i64, Hash)> = Vec::new();
    let mut cursor = Some(prev);
    while let Some(id) = cursor {
        let node = index.node(id);
        if node.block_time() < selection_start {
            break;
        }
        if candidates.len() as i64 > walk_bound {
            return Err(KernelError::AncestryTooDeep(walk_bound as usize));
        }
        candidates.push((node.block_time(), node.hash));
        cursor = node.prev;
    }
    candidates.reverse();
    candidates.sort();

    // Select up to 64 blocks from the candidates to assemble the modifier
    let mut new_modifier: u64 = 0;
    let mut stop = selection_start;
    let mut selected: HashMap<Hash, NodeId> = HashMap::new();
    for round in 0..candidates.len().min(64) {
        // add an interval section to the current selection round
        stop += selection_interval_section(params, round as i32);
        let id = select_block_from_candidates(index, &candidates, &selected, stop, prev_modifier, round)?;
        let node = index.node(id);
        // write the entropy bit of the selected block
        new_modifier |= (node.stake_entropy_bit() as u64) << round;
        selected.insert(node.hash, id);
        debug!(
            target: "kernel",
            round,
            stop,
            height = node.height,
            bit = node.stake_entropy_bit(),
            "selected round"
        );
    }

    debug!(
        target: "kernel",
        modifier = format_args!("{new_modifier:#018x}"),
        time = prev_node.time,
        "new stake modifier"
    );
    Ok((new_modifier, true))
}

/// Checksum committing a node's staking state to its ancestry
pub fn stake_modifier_checksum(index: &BlockIndex, node_id: NodeId) -> u32 {
    let node = index.node(node_id);
    // Hash previous checksum with flags, hash_proof_of_stake and stake_modifier
    let mut writer = HashWriter::new();
    if let Some(prev) = node.prev {
        put_u32_le(&mut writer, index.node(prev).stake_modifier_checksum);
    }
    put_u32_le(&mut writer, node.flags);
    writer.put(node.hash_proof_of_stake.as_bytes());
    put_u64_le(&mut writer, node.stake_modifier);
    let checksum = u256_from_hash(&Hash::from_bytes(writer.finalize_double()));
    (checksum >> (256usize - 32)).low_u64() as u32
}

/// Check a computed checksum against the hard checkpoints. Only main
/// enforces them; testnet and regtest always pass.
pub fn check_stake_modifier_checkpoints(network: NetworkType, height: i32, checksum: u32) -> bool {
    if network != NetworkType::Mainnet {
        return true;
    }
    match STAKE_MODIFIER_CHECKPOINTS.iter().find(|(h, _)| *h == height) {
        Some((_, expected)) => *expected == checksum,
        None => true,
    }
}

/// Compute and commit the stake modifier and its checksum for a freshly
/// connected block, rejecting checkpoint mismatches.
pub fn update_stake_modifier(
    params: &Params,
    network: NetworkType,
    index: &mut BlockIndex,
    node_id: NodeId,
) -> Result<(), KernelError> {
    let (modifier, generated) = compute_next_stake_modifier(params, index, node_id)?;
    index.set_stake_modifier(node_id, modifier, generated);
    let checksum = stake_modifier_checksum(index, node_id);
    index.set_stake_modifier_checksum(node_id, checksum);
    let node = index.node(node_id);
    if !check_stake_modifier_checkpoints(network, node.height, checksum) {
        debug!(
            target: "kernel",
            height = node.height,
            checksum = format_args!("{checksum:#010x}"),
            "stake modifier checkpoint mismatch"
        );
        return Err(KernelError::rejected("bad-stake-modifier-checkpoint"));
    }
    Ok(())
}
