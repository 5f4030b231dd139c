//! Block index for consensus
//!
//! Nodes live in an arena and reference their parent by id, so validators
//! can hold ids without borrowing the index. The index is single-writer,
//! multi-reader: block validation mutates it under the chain-state lock,
//! pure readers only ever see nodes whose stake-modifier fields were
//! committed by a single assignment.

use std::collections::HashMap;

use consensus_core::Hash;

use crate::consensus::pos::modifier::stake_entropy_bit;

/// Arena id of a block index node
pub type NodeId = usize;

/// Flag bit marking a proof-of-stake block
pub const BLOCK_PROOF_OF_STAKE: u32 = 1 << 0;
/// Flag bit carrying the block's entropy bit
pub const BLOCK_STAKE_ENTROPY: u32 = 1 << 1;
/// Flag bit set once the node generated a new stake modifier
pub const BLOCK_STAKE_MODIFIER: u32 = 1 << 2;

/// The per-block state read and written by the staking consensus
#[derive(Debug, Clone)]
pub struct BlockIndexNode {
    pub hash: Hash,
    pub prev: Option<NodeId>,
    pub height: i32,
    pub time: u32,
    pub bits: u32,
    pub flags: u32,
    pub stake_modifier: u64,
    pub stake_modifier_checksum: u32,
    pub hash_proof_of_stake: Hash,
}

impl BlockIndexNode {
    pub fn is_proof_of_stake(&self) -> bool {
        self.flags & BLOCK_PROOF_OF_STAKE != 0
    }

    pub fn generated_stake_modifier(&self) -> bool {
        self.flags & BLOCK_STAKE_MODIFIER != 0
    }

    pub fn stake_entropy_bit(&self) -> u32 {
        (self.flags & BLOCK_STAKE_ENTROPY) >> 1
    }

    pub fn block_time(&self) -> i64 {
        self.time as i64
    }
}

/// Arena-backed block index with an active-chain view
#[derive(Debug, Default)]
pub struct BlockIndex {
    nodes: Vec<BlockIndexNode>,
    by_hash: HashMap<Hash, NodeId>,
    /// Active chain ordered by height; `active[h]` is the node at height `h`
    active: Vec<NodeId>,
}

impl BlockIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a block to the index. The entropy bit is captured from the block
    /// hash at creation; stake-modifier fields start unset.
    pub fn insert(
        &mut self,
        hash: Hash,
        prev: Option<NodeId>,
        time: u32,
        bits: u32,
        proof_of_stake: bool,
        hash_proof_of_stake: Hash,
    ) -> NodeId {
        let height = match prev {
            Some(p) => self.nodes[p].height + 1,
            None => 0,
        };
        let mut flags = 0;
        if proof_of_stake {
            flags |= BLOCK_PROOF_OF_STAKE;
        }
        if stake_entropy_bit(&hash) == 1 {
            flags |= BLOCK_STAKE_ENTROPY;
        }
        let id = self.nodes.len();
        self.nodes.push(BlockIndexNode {
            hash,
            prev,
            height,
            time,
            bits,
            flags,
            stake_modifier: 0,
            stake_modifier_checksum: 0,
            hash_proof_of_stake,
        });
        self.by_hash.insert(hash, id);
        id
    }

    pub fn by_hash(&self, hash: &Hash) -> Option<NodeId> {
        self.by_hash.get(hash).copied()
    }

    pub fn node(&self, id: NodeId) -> &BlockIndexNode {
        &self.nodes[id]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].prev
    }

    pub fn lookup_height(&self, hash: &Hash) -> Option<i32> {
        self.by_hash(hash).map(|id| self.nodes[id].height)
    }

    /// Make the chain ending in `tip` the active chain
    pub fn set_active_tip(&mut self, tip: NodeId) {
        let mut chain = Vec::with_capacity(self.nodes[tip].height as usize + 1);
        let mut cursor = Some(tip);
        while let Some(id) = cursor {
            chain.push(id);
            cursor = self.nodes[id].prev;
        }
        chain.reverse();
        self.active = chain;
    }

    pub fn active_tip(&self) -> Option<NodeId> {
        self.active.last().copied()
    }

    pub fn active_contains(&self, id: NodeId) -> bool {
        let height = self.nodes[id].height;
        height >= 0 && self.active.get(height as usize) == Some(&id)
    }

    /// Next node on the active chain, or none at the tip or off-chain
    pub fn active_next(&self, id: NodeId) -> Option<NodeId> {
        if !self.active_contains(id) {
            return None;
        }
        self.active.get(self.nodes[id].height as usize + 1).copied()
    }

    /// Commit the stake modifier for a node. Called exactly once per node,
    /// after the parent's modifier is known.
    pub fn set_stake_modifier(&mut self, id: NodeId, modifier: u64, generated: bool) {
        let node = &mut self.nodes[id];
        debug_assert!(!node.generated_stake_modifier(), "stake modifier already generated");
        node.stake_modifier = modifier;
        if generated {
            node.flags |= BLOCK_STAKE_MODIFIER;
        }
    }

    pub fn set_stake_modifier_checksum(&mut self, id: NodeId, checksum: u32) {
        self.nodes[id].stake_modifier_checksum = checksum;
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
