//! End-to-end kernel verification over a synthetic chain.
//!
//! The chain below pins every input of the kernel hash, so the expected
//! proof hash and the compact targets bracketing it are fixed vectors.

use std::collections::HashMap;

use consensus_core::block::{Block, Header};
use consensus_core::config::params::Params;
use consensus_core::constants::{Amount, COIN};
use consensus_core::tx::{OutPoint, Transaction, TxIn, TxOut, TxType, SEQUENCE_FINAL};
use consensus_core::{ChainParams, Hash, ZERO_HASH};

use super::kernel::{
    check_proof_of_stake, check_stake_kernel_hash, kernel_stake_modifier, KernelModifier,
    ScriptVerifier, TransactionProvider,
};
use super::modifier::selection_interval;
use super::KernelError;
use crate::consensus::index::{BlockIndex, NodeId};

const MODIFIER: u64 = 0x0123_4567_89ab_cdef;
const T0: u32 = 1_600_000_000;
/// Proof hash for (MODIFIER, T0, T0, prevout 1, T0 + 60)
const EXPECTED_PROOF: &str = "0c6f394615dea23afec05821fe3102cc34720a90130e583066c730d7cabf62dd";
/// Smallest compact target whose product with coin-day-weight 3 covers the proof
const BITS_ACCEPT: u32 = 0x2004_2514;
/// One mantissa step below: the product falls short of the proof
const BITS_REJECT: u32 = 0x2004_2513;

fn testnet_params() -> Params {
    ChainParams::testnet().unwrap().consensus
}

fn hardened_params() -> Params {
    let mut params = testnet_params();
    params.stake_enforcement_height = 0;
    params
}

fn from_header() -> Header {
    Header {
        version: 1,
        hash_prev_block: ZERO_HASH,
        hash_merkle_root: ZERO_HASH,
        time: T0,
        bits: 0x1e0f_fff0,
        nonce: 7,
    }
}

/// A chain of generated-modifier blocks spaced one minute apart: a dummy
/// genesis, the block containing the staked output at height 1, then
/// `blocks_after_from` successors.
fn build_chain(blocks_after_from: usize) -> (BlockIndex, Header, NodeId) {
    let mut index = BlockIndex::new();
    let genesis = index.insert(Hash::from_le_u64([999, 0, 0, 0]), None, T0 - 60, 0x1e0f_fff0, false, Hash::default());
    index.set_stake_modifier(genesis, MODIFIER, true);

    let header = from_header();
    let from = index.insert(header.hash(), Some(genesis), T0, 0x1e0f_fff0, false, Hash::default());
    index.set_stake_modifier(from, MODIFIER, true);

    let mut prev = from;
    for i in 1..=blocks_after_from {
        let id = index.insert(
            Hash::from_le_u64([i as u64, 1, 0, 0]),
            Some(prev),
            T0 + 60 * i as u32,
            0x1e0f_fff0,
            false,
            Hash::default(),
        );
        index.set_stake_modifier(id, MODIFIER, true);
        prev = id;
    }
    index.set_active_tip(prev);
    (index, header, prev)
}

/// The funding transaction: output 1 carries the staked 10 coins
fn funding_tx() -> Transaction {
    Transaction::new(
        1,
        TxType::Normal,
        vec![TxIn::new(OutPoint::new(Hash::from_le_u64([77, 0, 0, 0]), 0), vec![0x51], SEQUENCE_FINAL)],
        vec![TxOut::new(5 * COIN, vec![0x51]), TxOut::new(10 * COIN, vec![0x52])],
        0,
        vec![],
    )
}

struct MapProvider(HashMap<Hash, (Transaction, Header)>);

impl MapProvider {
    fn with(tx: &Transaction, header: &Header) -> Self {
        let mut map = HashMap::new();
        map.insert(tx.txid(), (tx.clone(), header.clone()));
        Self(map)
    }
}

impl TransactionProvider for MapProvider {
    fn transaction(&self, txid: &Hash) -> Option<(Transaction, Header)> {
        self.0.get(txid).cloned()
    }
}

struct AcceptAllScripts;

impl ScriptVerifier for AcceptAllScripts {
    fn verify(&self, _: &[u8], _: &[u8], _: &[Vec<u8>], _: Amount) -> bool {
        true
    }
}

struct RejectAllScripts;

impl ScriptVerifier for RejectAllScripts {
    fn verify(&self, _: &[u8], _: &[u8], _: &[Vec<u8>], _: Amount) -> bool {
        false
    }
}

fn rejection_reason(err: KernelError) -> &'static str {
    match err {
        KernelError::Rejected(rejection) => rejection.reason,
        other => panic!("expected consensus rejection, got {other:?}"),
    }
}

#[test]
fn locator_returns_first_generated_modifier_past_interval() {
    let params = testnet_params();
    let (index, header, prev) = build_chain(40);
    let interval = selection_interval(&params);

    let found = kernel_stake_modifier(&params, &index, prev, &header.hash(), true, 0).unwrap();
    // Every block generated a modifier, so the walk stops at the first one
    // whose time reaches from.time + interval.
    let steps = (interval + 59) / 60;
    assert_eq!(
        found,
        KernelModifier { modifier: MODIFIER, height: 1 + steps as i32, time: T0 as i64 + 60 * steps }
    );
}

#[test]
fn locator_walks_synthetic_chain_when_prev_is_off_active() {
    let params = testnet_params();
    let (mut index, header, prev) = build_chain(40);
    // Reorganize the active chain onto a one-block fork off the from-block;
    // the 40-block branch holding prev is now off the active chain.
    let from = index.by_hash(&header.hash()).unwrap();
    let alt = index.insert(Hash::from_le_u64([555, 0, 0, 0]), Some(from), T0 + 30, 0x1e0f_fff0, false, Hash::default());
    index.set_active_tip(alt);

    let interval = selection_interval(&params);
    let steps = (interval + 59) / 60;
    let found = kernel_stake_modifier(&params, &index, prev, &header.hash(), true, 0).unwrap();
    assert_eq!(
        found,
        KernelModifier { modifier: MODIFIER, height: 1 + steps as i32, time: T0 as i64 + 60 * steps }
    );
}

#[test]
fn locator_fails_for_unindexed_block() {
    let params = testnet_params();
    let (index, _, prev) = build_chain(40);
    let missing = Hash::from_le_u64([0, 0, 0, 5]);
    assert_eq!(
        kernel_stake_modifier(&params, &index, prev, &missing, true, 0),
        Err(KernelError::BlockNotIndexed(missing))
    );
}

#[test]
fn locator_exhaustion_is_loud_or_silent_depending_on_age() {
    let params = testnet_params();
    // Ten blocks cover 600 seconds, far short of the selection interval
    let (index, header, prev) = build_chain(10);

    // Proof printing forces the loud error
    assert!(matches!(
        kernel_stake_modifier(&params, &index, prev, &header.hash(), true, 0),
        Err(KernelError::ForwardExhausted { .. })
    ));
    // A young kernel stays a silent negative
    let now_late = i64::MAX / 2;
    assert_eq!(
        kernel_stake_modifier(&params, &index, prev, &header.hash(), false, now_late),
        Err(KernelError::TooYoung)
    );
    // If the wall clock says the kernel should already be verifiable, the
    // exhaustion is an error even without proof printing.
    assert!(matches!(
        kernel_stake_modifier(&params, &index, prev, &header.hash(), false, 0),
        Err(KernelError::ForwardExhausted { .. })
    ));
}

#[test]
fn kernel_accepts_at_exact_boundary() {
    let params = testnet_params();
    let (index, header, prev) = build_chain(40);
    let tx_prev = funding_tx();
    let prevout = OutPoint::new(tx_prev.txid(), 1);

    // time_tx sits exactly at block_from.time + stake_min_age
    let time_tx = T0 + params.stake_min_age as u32;
    let proof = check_stake_kernel_hash(&params, &index, BITS_ACCEPT, prev, &header, &tx_prev, &prevout, time_tx, 0)
        .unwrap();
    assert_eq!(proof, Hash::from_hex(EXPECTED_PROOF).unwrap());
}

#[test]
fn kernel_rejects_one_mantissa_step_below() {
    let params = testnet_params();
    let (index, header, prev) = build_chain(40);
    let tx_prev = funding_tx();
    let prevout = OutPoint::new(tx_prev.txid(), 1);

    let err = check_stake_kernel_hash(
        &params,
        &index,
        BITS_REJECT,
        prev,
        &header,
        &tx_prev,
        &prevout,
        T0 + params.stake_min_age as u32,
        0,
    )
    .unwrap_err();
    assert_eq!(rejection_reason(err), "bad-stake-kernel");
}

#[test]
fn kernel_rejects_time_before_funding_block() {
    let params = testnet_params();
    let (index, header, prev) = build_chain(40);
    let tx_prev = funding_tx();
    let prevout = OutPoint::new(tx_prev.txid(), 1);

    let err = check_stake_kernel_hash(&params, &index, BITS_ACCEPT, prev, &header, &tx_prev, &prevout, T0 - 1, 0)
        .unwrap_err();
    assert_eq!(rejection_reason(err), "bad-stake-time");
}

#[test]
fn kernel_rejects_one_second_under_min_age() {
    let params = testnet_params();
    let (index, header, prev) = build_chain(40);
    let tx_prev = funding_tx();
    let prevout = OutPoint::new(tx_prev.txid(), 1);

    let time_tx = T0 + params.stake_min_age as u32 - 1;
    let err = check_stake_kernel_hash(&params, &index, BITS_ACCEPT, prev, &header, &tx_prev, &prevout, time_tx, 0)
        .unwrap_err();
    assert_eq!(rejection_reason(err), "bad-stake-min-age");
}

#[test]
fn hardened_minimum_stake_amount_boundary() {
    let params = hardened_params();
    let (index, header, prev) = build_chain(40);

    // One atomic unit below the minimum is rejected before any hashing
    let poor = Transaction::new(
        1,
        TxType::Normal,
        vec![TxIn::new(OutPoint::new(Hash::from_le_u64([78, 0, 0, 0]), 0), vec![0x51], SEQUENCE_FINAL)],
        vec![TxOut::new(params.min_stake_amount - 1, vec![0x51])],
        0,
        vec![],
    );
    let err = check_stake_kernel_hash(
        &params,
        &index,
        BITS_ACCEPT,
        prev,
        &header,
        &poor,
        &OutPoint::new(poor.txid(), 0),
        T0 + params.stake_min_age as u32,
        0,
    )
    .unwrap_err();
    assert_eq!(rejection_reason(err), "bad-stake-amount");

    // Exactly the minimum passes the amount gate; whatever happens next is
    // a kernel verdict, not an amount rejection.
    let exact = Transaction::new(
        1,
        TxType::Normal,
        vec![TxIn::new(OutPoint::new(Hash::from_le_u64([79, 0, 0, 0]), 0), vec![0x51], SEQUENCE_FINAL)],
        vec![TxOut::new(params.min_stake_amount, vec![0x51])],
        0,
        vec![],
    );
    let err = check_stake_kernel_hash(
        &params,
        &index,
        BITS_ACCEPT,
        prev,
        &header,
        &exact,
        &OutPoint::new(exact.txid(), 0),
        T0 + params.stake_min_age as u32,
        0,
    )
    .unwrap_err();
    assert_eq!(rejection_reason(err), "bad-stake-kernel");
}

fn coinstake_block(tx_prev: &Transaction, bits: u32, time: u32) -> Block {
    let coinbase = Transaction::new(
        1,
        TxType::Normal,
        vec![TxIn::new(OutPoint::null(), vec![0x01], SEQUENCE_FINAL)],
        vec![TxOut::new(0, vec![])],
        0,
        vec![],
    );
    let coinstake = Transaction::new(
        1,
        TxType::Normal,
        vec![TxIn::new(OutPoint::new(tx_prev.txid(), 1), vec![0x51], SEQUENCE_FINAL)],
        vec![TxOut::new(0, vec![]), TxOut::new(11 * COIN, vec![0x52])],
        0,
        vec![],
    );
    Block::new(
        Header {
            version: 1,
            hash_prev_block: ZERO_HASH,
            hash_merkle_root: ZERO_HASH,
            time,
            bits,
            nonce: 0,
        },
        vec![coinbase, coinstake],
    )
}

#[test]
fn proof_of_stake_block_verifies_end_to_end() {
    let params = testnet_params();
    let (index, header, prev) = build_chain(40);
    let tx_prev = funding_tx();
    let block = coinstake_block(&tx_prev, BITS_ACCEPT, T0 + params.stake_min_age as u32);
    let provider = MapProvider::with(&tx_prev, &header);

    let proof = check_proof_of_stake(&params, &index, prev, &block, &provider, &AcceptAllScripts, 0).unwrap();
    assert_eq!(proof, Hash::from_hex(EXPECTED_PROOF).unwrap());
}

#[test]
fn proof_of_stake_rejects_bad_script() {
    let params = testnet_params();
    let (index, header, prev) = build_chain(40);
    let tx_prev = funding_tx();
    let block = coinstake_block(&tx_prev, BITS_ACCEPT, T0 + params.stake_min_age as u32);
    let provider = MapProvider::with(&tx_prev, &header);

    let err = check_proof_of_stake(&params, &index, prev, &block, &provider, &RejectAllScripts, 0).unwrap_err();
    assert_eq!(rejection_reason(err), "bad-coinstake-script");
}

#[test]
fn proof_of_stake_requires_coinstake_second_tx() {
    let params = testnet_params();
    let (index, header, prev) = build_chain(40);
    let tx_prev = funding_tx();
    let mut block = coinstake_block(&tx_prev, BITS_ACCEPT, T0 + params.stake_min_age as u32);
    // Break the coinstake shape: output 0 no longer empty
    block.transactions[1].outputs[0].value = 1;
    let provider = MapProvider::with(&tx_prev, &header);

    let err = check_proof_of_stake(&params, &index, prev, &block, &provider, &AcceptAllScripts, 0).unwrap_err();
    assert_eq!(rejection_reason(err), "bad-coinstake");
}

#[test]
fn proof_of_stake_missing_funding_tx_is_operational() {
    let params = testnet_params();
    let (index, header, prev) = build_chain(40);
    let tx_prev = funding_tx();
    let block = coinstake_block(&tx_prev, BITS_ACCEPT, T0 + params.stake_min_age as u32);
    // Provider knows a different transaction only
    let other = Transaction::new(
        1,
        TxType::Normal,
        vec![TxIn::new(OutPoint::new(Hash::from_le_u64([80, 0, 0, 0]), 0), vec![0x51], SEQUENCE_FINAL)],
        vec![TxOut::new(COIN, vec![0x51])],
        0,
        vec![],
    );
    let provider = MapProvider::with(&other, &header);

    let err = check_proof_of_stake(&params, &index, prev, &block, &provider, &AcceptAllScripts, 0).unwrap_err();
    assert_eq!(err, KernelError::TxNotIndexed(tx_prev.txid()));
    assert!(!err.is_rejection());
}

#[test]
fn hardened_stake_depth_enforced() {
    let mut params = hardened_params();
    params.min_stake_history = 100; // deeper than the 41-block chain
    let (index, header, prev) = build_chain(40);
    let tx_prev = funding_tx();
    let block = coinstake_block(&tx_prev, BITS_ACCEPT, T0 + params.stake_min_age as u32);
    let provider = MapProvider::with(&tx_prev, &header);

    let err = check_proof_of_stake(&params, &index, prev, &block, &provider, &AcceptAllScripts, 0).unwrap_err();
    assert_eq!(rejection_reason(err), "bad-stake-depth");
}
