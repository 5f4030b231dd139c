//! Genesis block construction.
//!
//! The genesis coinbase embeds a newspaper-style timestamp message behind
//! the historic `486604799 / OP_PUSH 4` prefix. Main's block hash and
//! merkle root are committed constants; testnet and regtest hashes were
//! recomputed from their nonces and frozen here.

use hex_literal::hex;

use crate::block::{Block, Header};
use crate::constants::Amount;
use crate::merkle;
use crate::tx::{OutPoint, Transaction, TxIn, TxOut, TxType, SEQUENCE_FINAL};

/// Message embedded in the genesis coinbase
pub const GENESIS_TIMESTAMP_MESSAGE: &str =
    "06112020 Craig Wright Apparently Just Admitted to Hacking Mt. Gox";

/// Uncompressed public key paid by the genesis output
const GENESIS_OUTPUT_PUBKEY: [u8; 65] = hex!(
    "04e5a8143f86ad8ac63791fbbdb8e0b9111da88c8c693a2222c2c13c063ea790f7960b8025a9047a7bc671d5cfe707a2dd2e13b86182e1064a0eea7bf863636363"
);

/// Committed main genesis block hash
pub const MAIN_GENESIS_HASH: &str =
    "0000098e30a3d29ee06c8f371e9e1fc516c8218b1be2615b7b0ec31649ed12e3";

/// Committed main genesis merkle root
pub const MAIN_GENESIS_MERKLE_ROOT: &str =
    "7f572dcc0eae0471f168f6424b3247c1f5da22e7944b23e0cf06d39d57e2f352";

/// Frozen testnet genesis block hash (recomputed from the testnet nonce)
pub const TESTNET_GENESIS_HASH: &str =
    "5509c55468606bed4ea48a05bcdfd9665d778339f5574f9e2570cdd7850138e1";

/// Frozen regtest genesis block hash (recomputed from the regtest nonce)
pub const REGTEST_GENESIS_HASH: &str =
    "15a1b7318c0bc75af4ee95d44271e5e91fba26ce173e3be168a374adb996c367";

/// Script sig of the genesis coinbase: `PUSH4(486604799) PUSH1(4) PUSH(message)`
fn genesis_script_sig(message: &str) -> Vec<u8> {
    let msg = message.as_bytes();
    debug_assert!(msg.len() < 0x4c);
    let mut script = Vec::with_capacity(8 + msg.len());
    script.extend_from_slice(&[0x04, 0xff, 0xff, 0x00, 0x1d]);
    script.extend_from_slice(&[0x01, 0x04]);
    script.push(msg.len() as u8);
    script.extend_from_slice(msg);
    script
}

/// `PUSH(pubkey) OP_CHECKSIG`
fn genesis_output_script() -> Vec<u8> {
    let mut script = Vec::with_capacity(67);
    script.push(GENESIS_OUTPUT_PUBKEY.len() as u8);
    script.extend_from_slice(&GENESIS_OUTPUT_PUBKEY);
    script.push(0xac);
    script
}

/// Build a genesis block from its parameters
pub fn create_genesis_block(
    message: &str,
    output_script: Vec<u8>,
    time: u32,
    nonce: u32,
    bits: u32,
    version: i32,
    reward: Amount,
) -> Block {
    let coinbase = Transaction::new(
        1,
        TxType::Normal,
        vec![TxIn::new(OutPoint::null(), genesis_script_sig(message), SEQUENCE_FINAL)],
        vec![TxOut::new(reward, output_script)],
        0,
        vec![],
    );

    let header = Header {
        version,
        hash_prev_block: crate::ZERO_HASH,
        hash_merkle_root: merkle::block_merkle_root(std::slice::from_ref(&coinbase)),
        time,
        bits,
        nonce,
    };
    Block::new(header, vec![coinbase])
}

pub fn main_genesis() -> Block {
    create_genesis_block(GENESIS_TIMESTAMP_MESSAGE, genesis_output_script(), 1_592_001_039, 28_269_589, 0x1e0f_fff0, 1, 0)
}

pub fn testnet_genesis() -> Block {
    create_genesis_block(GENESIS_TIMESTAMP_MESSAGE, genesis_output_script(), 1_565_017_975, 21_212_214, 0x1e0f_fff0, 1, 0)
}

pub fn regtest_genesis() -> Block {
    create_genesis_block(GENESIS_TIMESTAMP_MESSAGE, genesis_output_script(), 1_565_017_975, 20_542_302, 0x207f_ffff, 1, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Hash;

    #[test]
    fn main_genesis_matches_commitment() {
        let genesis = main_genesis();
        assert_eq!(genesis.hash(), Hash::from_hex(MAIN_GENESIS_HASH).unwrap());
        assert_eq!(
            genesis.header.hash_merkle_root,
            Hash::from_hex(MAIN_GENESIS_MERKLE_ROOT).unwrap()
        );
    }

    #[test]
    fn test_chain_geneses_match_frozen_hashes() {
        assert_eq!(testnet_genesis().hash(), Hash::from_hex(TESTNET_GENESIS_HASH).unwrap());
        assert_eq!(regtest_genesis().hash(), Hash::from_hex(REGTEST_GENESIS_HASH).unwrap());
    }

    #[test]
    fn genesis_script_sig_layout() {
        let script = genesis_script_sig(GENESIS_TIMESTAMP_MESSAGE);
        assert_eq!(script.len(), 73);
        assert_eq!(&script[0..5], &[0x04, 0xff, 0xff, 0x00, 0x1d]);
        assert_eq!(&script[5..7], &[0x01, 0x04]);
        assert_eq!(script[7] as usize, GENESIS_TIMESTAMP_MESSAGE.len());
    }

    #[test]
    fn genesis_coinbase_shape() {
        let genesis = main_genesis();
        assert_eq!(genesis.transactions.len(), 1);
        let coinbase = &genesis.transactions[0];
        assert!(coinbase.is_coinbase());
        assert_eq!(coinbase.outputs[0].value, 0);
        assert_eq!(coinbase.outputs[0].script_pubkey.len(), 67);
        assert!(!genesis.is_proof_of_stake());
    }
}
