//! Per-network chain parameters.
//!
//! Three frozen instances exist: [`ChainParams::main`], [`ChainParams::testnet`]
//! and [`ChainParams::regtest`]. Construction validates the cross-field
//! invariants and, on main, checks the freshly built genesis block against
//! its committed hash. Regtest is returned behind [`RegtestParams`], the
//! only variant that permits mutating version-bits deployments before the
//! value is frozen.

use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::OnceLock;

use primitive_types::U256;

use crate::block::Block;
use crate::config::genesis;
use crate::constants::{Amount, COIN};
use crate::errors::ParamsError;
use crate::network::NetworkType;
use crate::Hash;

/// Version-bits deployment start time meaning "always active"
pub const ALWAYS_ACTIVE: i64 = -1;

/// Version-bits deployment timeout meaning "never expires"
pub const NO_TIMEOUT: i64 = i64::MAX;

/// Known version-bits deployments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deployment {
    TestDummy = 0,
    Csv = 1,
    Segwit = 2,
}

impl Deployment {
    pub const COUNT: usize = 3;

    pub fn name(self) -> &'static str {
        match self {
            Deployment::TestDummy => "testdummy",
            Deployment::Csv => "csv",
            Deployment::Segwit => "segwit",
        }
    }

    pub fn from_name(name: &str) -> Option<Deployment> {
        match name {
            "testdummy" => Some(Deployment::TestDummy),
            "csv" => Some(Deployment::Csv),
            "segwit" => Some(Deployment::Segwit),
            _ => None,
        }
    }
}

/// BIP9-style deployment schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bip9Deployment {
    /// Bit position to signal on
    pub bit: u8,
    /// Start of the signalling window (unix time), or [`ALWAYS_ACTIVE`]
    pub start_time: i64,
    /// End of the signalling window (unix time), or [`NO_TIMEOUT`]
    pub timeout: i64,
}

/// Long-living masternode quorum types
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LlmqType {
    Llmq5_60,
    Llmq50_60,
    Llmq400_60,
    Llmq400_85,
}

/// Parameters of one LLMQ class. Immutable after initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmqParams {
    pub llmq_type: LlmqType,
    pub name: &'static str,
    pub size: i32,
    pub min_size: i32,
    pub threshold: i32,
    pub dkg_interval: i32,
    pub dkg_phase_blocks: i32,
    pub dkg_mining_window_start: i32,
    pub dkg_mining_window_end: i32,
    pub dkg_bad_votes_threshold: i32,
    pub signing_active_quorum_count: i32,
    pub keep_old_connections: i32,
}

// this one is for testing only
const LLMQ_5_60: LlmqParams = LlmqParams {
    llmq_type: LlmqType::Llmq5_60,
    name: "llmq_5_60",
    size: 5,
    min_size: 3,
    threshold: 3,
    dkg_interval: 24, // one DKG per hour
    dkg_phase_blocks: 2,
    dkg_mining_window_start: 10, // dkg_phase_blocks * 5 = after finalization
    dkg_mining_window_end: 18,
    dkg_bad_votes_threshold: 8,
    signing_active_quorum_count: 2, // just a few ones to allow easier testing
    keep_old_connections: 3,
};

const LLMQ_50_60: LlmqParams = LlmqParams {
    llmq_type: LlmqType::Llmq50_60,
    name: "llmq_50_60",
    size: 50,
    min_size: 40,
    threshold: 30,
    dkg_interval: 24, // one DKG per hour
    dkg_phase_blocks: 2,
    dkg_mining_window_start: 10,
    dkg_mining_window_end: 18,
    dkg_bad_votes_threshold: 40,
    signing_active_quorum_count: 24, // a full day worth of LLMQs
    keep_old_connections: 25,
};

const LLMQ_400_60: LlmqParams = LlmqParams {
    llmq_type: LlmqType::Llmq400_60,
    name: "llmq_400_60",
    size: 400,
    min_size: 300,
    threshold: 240,
    dkg_interval: 24 * 12, // one DKG every 12 hours
    dkg_phase_blocks: 4,
    dkg_mining_window_start: 20,
    dkg_mining_window_end: 28,
    dkg_bad_votes_threshold: 300,
    signing_active_quorum_count: 4, // two days worth of LLMQs
    keep_old_connections: 5,
};

// Used for deployment and min-proto-version signalling, so it needs a higher threshold
const LLMQ_400_85: LlmqParams = LlmqParams {
    llmq_type: LlmqType::Llmq400_85,
    name: "llmq_400_85",
    size: 400,
    min_size: 350,
    threshold: 340,
    dkg_interval: 24 * 24, // one DKG every 24 hours
    dkg_phase_blocks: 4,
    dkg_mining_window_start: 20,
    dkg_mining_window_end: 48, // give it a larger mining window to make sure it is mined
    dkg_bad_votes_threshold: 300,
    signing_active_quorum_count: 4,
    keep_old_connections: 5,
};

/// Consensus parameters
#[derive(Debug, Clone)]
pub struct Params {
    pub subsidy_halving_interval: i32,
    pub pow_limit: U256,
    pub pow_target_timespan: i64,
    pub pow_target_spacing: i64,
    pub pow_allow_min_difficulty_blocks: bool,
    pub pow_no_retargeting: bool,
    pub pos_target_spacing: i64,
    pub pos_target_timespan: i64,
    /// Minimum age of the staked output before it may generate a kernel (seconds)
    pub stake_min_age: i64,
    /// Age beyond which coin-day weight stops accumulating (seconds)
    pub stake_max_age: i64,
    /// Time to elapse before a new stake modifier is computed (seconds)
    pub modifier_interval: i64,
    /// Height of the last proof-of-work block
    pub last_pow_block: i32,
    /// Height above which the hardened staking checks activate
    pub stake_enforcement_height: i32,
    /// Smallest output value allowed to stake once hardened checks are active
    pub min_stake_amount: Amount,
    /// Minimum depth of the staked output below the staking block
    pub min_stake_history: i32,

    // Governance
    pub superblock_cycle: i32,
    pub superblock_start_block: i32,
    pub governance_min_quorum: i32,
    pub governance_filter_elements: i32,
    pub budget_payments_start_block: i32,
    pub budget_payments_cycle_blocks: i32,
    pub budget_payments_window_blocks: i32,

    /// Version-bits deployments, indexed by [`Deployment`]
    pub deployments: [Bip9Deployment; Deployment::COUNT],

    // long living quorum params
    pub llmqs: BTreeMap<LlmqType, LlmqParams>,
    pub llmq_chain_locks: LlmqType,
    pub llmq_for_instant_send: LlmqType,
    pub llmq_activation_height: i32,

    pub genesis_hash: Hash,
}

impl Params {
    /// True when the staked output at `utxo_height` is buried deeply enough
    /// below a block at `height`
    pub fn has_stake_min_depth(&self, height: i32, utxo_height: i32) -> bool {
        height - utxo_height >= self.min_stake_history
    }
}

/// Network parameters: the consensus rules plus the identity of the chain
/// on the wire (magic bytes, address prefixes, genesis block, checkpoints).
#[derive(Debug, Clone)]
pub struct ChainParams {
    pub network: NetworkType,
    pub consensus: Params,
    /// Message start bytes, unlikely to occur in normal data
    pub message_start: [u8; 4],
    pub default_port: u32,
    pub pubkey_address_prefix: u8,
    pub script_address_prefix: u8,
    pub secret_key_prefix: u8,
    pub ext_public_key_prefix: [u8; 4],
    pub ext_secret_key_prefix: [u8; 4],
    pub bech32_hrp: &'static str,
    pub genesis: Block,
    /// Hard-coded block checkpoints; height 0 always maps to the genesis hash
    pub checkpoints: BTreeMap<i32, Hash>,
}

impl ChainParams {
    /// Main network
    pub fn main() -> Result<Self, ParamsError> {
        let genesis_block = genesis::main_genesis();
        let genesis_hash = genesis_block.hash();
        let committed = Hash::from_hex(genesis::MAIN_GENESIS_HASH)?;
        if genesis_hash != committed {
            return Err(ParamsError::GenesisMismatch {
                field: "hash",
                got: genesis_hash.to_string(),
                expected: committed.to_string(),
            });
        }
        let committed_root = Hash::from_hex(genesis::MAIN_GENESIS_MERKLE_ROOT)?;
        if genesis_block.header.hash_merkle_root != committed_root {
            return Err(ParamsError::GenesisMismatch {
                field: "merkle root",
                got: genesis_block.header.hash_merkle_root.to_string(),
                expected: committed_root.to_string(),
            });
        }

        let consensus = Params {
            subsidy_halving_interval: 525_600,
            pow_limit: U256::MAX >> 20usize,
            pow_target_timespan: 24 * 60 * 60, // 1 day
            pow_target_spacing: 60,
            pow_allow_min_difficulty_blocks: false,
            pow_no_retargeting: false,
            pos_target_spacing: 60,
            pos_target_timespan: 60 * 40,
            stake_min_age: 60 * 60,      // 1 hour
            stake_max_age: 60 * 60 * 24, // 24 hours
            modifier_interval: 60,
            last_pow_block: 1500,
            stake_enforcement_height: 7001,
            min_stake_amount: 150 * COIN,
            min_stake_history: 60,
            superblock_cycle: 20_571, // ~(60*24*30)/2.1
            superblock_start_block: 12_000,
            governance_min_quorum: 10,
            governance_filter_elements: 20_000,
            budget_payments_start_block: 10_000,
            budget_payments_cycle_blocks: 20_571,
            budget_payments_window_blocks: 100,
            deployments: [
                Bip9Deployment { bit: 28, start_time: 1_199_145_601, timeout: 1_230_767_999 },
                Bip9Deployment { bit: 0, start_time: 1_462_060_800, timeout: 1_493_596_800 },
                Bip9Deployment { bit: 1, start_time: ALWAYS_ACTIVE, timeout: NO_TIMEOUT },
            ],
            llmqs: BTreeMap::from([
                (LlmqType::Llmq50_60, LLMQ_50_60),
                (LlmqType::Llmq400_60, LLMQ_400_60),
                (LlmqType::Llmq400_85, LLMQ_400_85),
            ]),
            llmq_chain_locks: LlmqType::Llmq400_60,
            llmq_for_instant_send: LlmqType::Llmq50_60,
            llmq_activation_height: 50,
            genesis_hash,
        };

        let mut checkpoints = main_checkpoints()?;
        checkpoints.insert(0, genesis_hash);

        let params = Self {
            network: NetworkType::Mainnet,
            consensus,
            message_start: [0xd4, 0xf4, 0xa6, 0x12],
            default_port: 13_370,
            pubkey_address_prefix: 28, // wallet addresses start with "C"
            script_address_prefix: 6,
            secret_key_prefix: 46,
            ext_public_key_prefix: [0x04, 0x88, 0xb2, 0x1e],
            ext_secret_key_prefix: [0x04, 0x88, 0xad, 0xe4],
            bech32_hrp: "cp",
            genesis: genesis_block,
            checkpoints,
        };
        params.validate()?;
        Ok(params)
    }

    /// Test network
    pub fn testnet() -> Result<Self, ParamsError> {
        let genesis_block = genesis::testnet_genesis();
        let genesis_hash = genesis_block.hash();

        let consensus = Params {
            subsidy_halving_interval: 210_000,
            pow_limit: parse_pow_limit("00000ffff0000000000000000000000000000000000000000000000000000000")?,
            pow_target_timespan: 14 * 24 * 60 * 60, // two weeks
            pow_target_spacing: 60,
            pow_allow_min_difficulty_blocks: true,
            pow_no_retargeting: false,
            pos_target_spacing: 2 * 60,
            pos_target_timespan: 60 * 40,
            stake_min_age: 60,      // 1 minute
            stake_max_age: 60 * 60, // 1 hour
            modifier_interval: 60,
            last_pow_block: 200,
            stake_enforcement_height: 200,
            min_stake_amount: COIN,
            min_stake_history: 10,
            superblock_cycle: 24, // superblocks can be issued hourly on testnet
            superblock_start_block: 300,
            governance_min_quorum: 1,
            governance_filter_elements: 500,
            budget_payments_start_block: 200,
            budget_payments_cycle_blocks: 50,
            budget_payments_window_blocks: 10,
            deployments: [
                Bip9Deployment { bit: 28, start_time: 1_199_145_601, timeout: 1_230_767_999 },
                Bip9Deployment { bit: 0, start_time: 1_456_790_400, timeout: 1_493_596_800 },
                Bip9Deployment { bit: 1, start_time: 1_462_060_800, timeout: 1_493_596_800 },
            ],
            llmqs: BTreeMap::from([
                (LlmqType::Llmq50_60, LLMQ_50_60),
                (LlmqType::Llmq400_60, LLMQ_400_60),
                (LlmqType::Llmq400_85, LLMQ_400_85),
            ]),
            llmq_chain_locks: LlmqType::Llmq50_60,
            llmq_for_instant_send: LlmqType::Llmq50_60,
            llmq_activation_height: 50,
            genesis_hash,
        };

        let mut checkpoints = BTreeMap::new();
        checkpoints.insert(0, genesis_hash);

        let params = Self {
            network: NetworkType::Testnet,
            consensus,
            message_start: [0xa3, 0x6b, 0xb0, 0x4b],
            default_port: 113_370,
            pubkey_address_prefix: 98,
            script_address_prefix: 12,
            secret_key_prefix: 108,
            ext_public_key_prefix: [0x04, 0x35, 0x87, 0xcf],
            ext_secret_key_prefix: [0x04, 0x35, 0x83, 0x94],
            bech32_hrp: "tbg",
            genesis: genesis_block,
            checkpoints,
        };
        params.validate()?;
        Ok(params)
    }

    /// Regression test network. Returned behind [`RegtestParams`] so that
    /// version-bits deployments can be adjusted before freezing.
    pub fn regtest() -> Result<RegtestParams, ParamsError> {
        let genesis_block = genesis::regtest_genesis();
        let genesis_hash = genesis_block.hash();

        let consensus = Params {
            subsidy_halving_interval: 150,
            pow_limit: U256::MAX >> 1usize,
            pow_target_timespan: 14 * 24 * 60 * 60,
            pow_target_spacing: 10 * 60,
            pow_allow_min_difficulty_blocks: true,
            pow_no_retargeting: true,
            pos_target_spacing: 2 * 60,
            pos_target_timespan: 60 * 40,
            stake_min_age: 60,
            stake_max_age: 60 * 10,
            modifier_interval: 60,
            last_pow_block: 1000,
            // Hardened staking rules have no activation row on regtest;
            // zero amounts keep the hardened path reachable but vacuous.
            stake_enforcement_height: 0,
            min_stake_amount: 0,
            min_stake_history: 0,
            superblock_cycle: 10,
            superblock_start_block: 1500,
            governance_min_quorum: 1,
            governance_filter_elements: 100,
            budget_payments_start_block: 1000,
            budget_payments_cycle_blocks: 50,
            budget_payments_window_blocks: 10,
            deployments: [
                Bip9Deployment { bit: 28, start_time: 0, timeout: NO_TIMEOUT },
                Bip9Deployment { bit: 0, start_time: 0, timeout: NO_TIMEOUT },
                Bip9Deployment { bit: 1, start_time: ALWAYS_ACTIVE, timeout: NO_TIMEOUT },
            ],
            llmqs: BTreeMap::from([(LlmqType::Llmq5_60, LLMQ_5_60), (LlmqType::Llmq50_60, LLMQ_50_60)]),
            llmq_chain_locks: LlmqType::Llmq5_60,
            llmq_for_instant_send: LlmqType::Llmq5_60,
            llmq_activation_height: 500,
            genesis_hash,
        };

        let mut checkpoints = BTreeMap::new();
        checkpoints.insert(0, genesis_hash);

        let params = Self {
            network: NetworkType::Regtest,
            consensus,
            message_start: [0xf2, 0x90, 0xb5, 0x78],
            default_port: 213_370,
            pubkey_address_prefix: 98,
            script_address_prefix: 12,
            secret_key_prefix: 108,
            ext_public_key_prefix: [0x04, 0x35, 0x87, 0xcf],
            ext_secret_key_prefix: [0x04, 0x35, 0x83, 0x94],
            bech32_hrp: "bgrt",
            genesis: genesis_block,
            checkpoints,
        };
        params.validate()?;
        Ok(RegtestParams(params))
    }

    /// Cross-field invariants checked at construction
    fn validate(&self) -> Result<(), ParamsError> {
        if !self.checkpoints.contains_key(&0) {
            return Err(ParamsError::Invalid {
                field: "checkpoints",
                message: "missing genesis checkpoint at height 0".into(),
            });
        }
        if self.consensus.last_pow_block < 0 {
            return Err(ParamsError::Invalid {
                field: "last_pow_block",
                message: format!("negative height {}", self.consensus.last_pow_block),
            });
        }
        if self.consensus.stake_min_age >= self.consensus.stake_max_age {
            return Err(ParamsError::Invalid {
                field: "stake_min_age",
                message: format!(
                    "min age {} must be below max age {}",
                    self.consensus.stake_min_age, self.consensus.stake_max_age
                ),
            });
        }
        if self.consensus.modifier_interval <= 0 {
            return Err(ParamsError::Invalid {
                field: "modifier_interval",
                message: "must be positive".into(),
            });
        }
        if self.consensus.pos_target_spacing <= 0 {
            return Err(ParamsError::Invalid {
                field: "pos_target_spacing",
                message: "must be positive".into(),
            });
        }
        for llmq in self.consensus.llmqs.values() {
            if llmq.min_size > llmq.size || llmq.threshold > llmq.min_size {
                return Err(ParamsError::Invalid {
                    field: "llmqs",
                    message: format!(
                        "{}: threshold {} / min size {} / size {} out of order",
                        llmq.name, llmq.threshold, llmq.min_size, llmq.size
                    ),
                });
            }
        }
        if self.consensus.superblock_start_block <= self.consensus.budget_payments_start_block {
            return Err(ParamsError::Invalid {
                field: "superblock_start_block",
                message: format!(
                    "superblock start {} must exceed budget payments start {}",
                    self.consensus.superblock_start_block, self.consensus.budget_payments_start_block
                ),
            });
        }
        Ok(())
    }
}

/// Regtest parameters before freezing. The only chain variant whose
/// version-bits schedule may be modified.
#[derive(Debug, Clone)]
pub struct RegtestParams(ChainParams);

impl RegtestParams {
    /// Override one deployment's signalling window
    pub fn update_version_bits(&mut self, deployment: Deployment, start_time: i64, timeout: i64) {
        let slot = &mut self.0.consensus.deployments[deployment as usize];
        slot.start_time = start_time;
        slot.timeout = timeout;
    }

    /// Apply `-vbparams=<deployment>:<start>:<timeout>` arguments in order;
    /// for repeated deployments the last occurrence wins.
    pub fn update_version_bits_from_args(&mut self, args: &[String]) -> Result<(), ParamsError> {
        for arg in args {
            let parts: Vec<&str> = arg.split(':').collect();
            if parts.len() != 3 {
                return Err(ParamsError::MalformedVersionBits(arg.clone()));
            }
            let start_time: i64 = parts[1]
                .parse()
                .map_err(|_| ParamsError::InvalidVersionBitsStart(parts[1].to_string()))?;
            let timeout: i64 = parts[2]
                .parse()
                .map_err(|_| ParamsError::InvalidVersionBitsTimeout(parts[2].to_string()))?;
            let deployment = Deployment::from_name(parts[0])
                .ok_or_else(|| ParamsError::UnknownDeployment(parts[0].to_string()))?;
            self.update_version_bits(deployment, start_time, timeout);
            tracing::info!(
                deployment = parts[0],
                start_time,
                timeout,
                "setting version bits activation parameters"
            );
        }
        Ok(())
    }

    /// Freeze into an immutable [`ChainParams`]
    pub fn freeze(self) -> ChainParams {
        self.0
    }
}

impl Deref for RegtestParams {
    type Target = ChainParams;

    fn deref(&self) -> &ChainParams {
        &self.0
    }
}

fn parse_pow_limit(hex: &str) -> Result<U256, ParamsError> {
    U256::from_str_radix(hex, 16).map_err(|e| ParamsError::Invalid {
        field: "pow_limit",
        message: e.to_string(),
    })
}

fn main_checkpoints() -> Result<BTreeMap<i32, Hash>, ParamsError> {
    let table: [(i32, &str); 19] = [
        (1, "000000af1c83cdf16aba8e539aa86b90f8aa39afb1c9dcd489f02202c92b90a9"),
        (1000, "000000a687ae1b49630c53b78983bfa3e40248f811336480cc0454300b7ca0e4"),
        (1500, "00000027336a6d7cb44105e66b19b7c357a128f12ec097138b783b082c15f075"),
        (10_000, "d4b13fe1ce11047cc04ef099bf85062a0bdc01913644a6e05ba4b6f44331bbc9"),
        (12_167, "6a5b1939de7f55943aa73c02e033e5326f52fa07446c78db62c513f2e9bddafb"),
        (20_000, "d2889eb5d03ae4cf77967c4f6dd5e0a3b25cd6c06b2ebe065b0399504b5f84ed"),
        (40_000, "0a8c530d9b7a2a92fdf1deeb26f62b91bad189c880af1e5d51aa1aa60b5a0ab4"),
        (60_000, "ba66203533e488a13f7be8e8f459259a970997e921c337153aa6ab4498206094"),
        (80_000, "f6469b539bfa8da20404024284a11ed5400152e47d38484ecb7f065b7ec538f6"),
        (100_000, "9432475502579e22b27a93caf0314158159da4c979c0d75765944ed325588e9f"),
        (120_000, "a55f1dfcc9f499235493a2ace0a4708c33d6b8b4017c4e2f11a3f136023b5563"),
        (140_000, "098747dc5350c1b9c6dc00aa52d35383fbeb02539770873260e0b16b28b84ec8"),
        (160_000, "e63bcee630d93e501372beb62e565ef67cde0345a80b88bd5ee29d0d2b736eea"),
        (180_000, "3ade170816a5bd5a94980594e9e6c0974c6cf306cbf4f5f8a6e2bff7e06b1980"),
        (200_000, "88761a6b98dd3d2dd83f995db8035788a599a068e183913ac88165fcf7b42d62"),
        (220_000, "8b3ba3f0fa56d69272317630ffb352826bf3d1bbd6b00031d1a427d57e10e0df"),
        (240_000, "e2a53ce2246a7f4ff51b68a04ded11ed68f7dcb7f916daeb54f475d10dbebc7d"),
        (260_000, "f7bd7a739f08cd17a7be8fa3f378892bcfb56e553ba92b49f2b50c0542d6e3c4"),
        (280_000, "12ea41d7c1d7e3d2b15ae5b58d65343948d5540a6ca5cd648719fdb45e0789f5"),
    ];
    let mut map = BTreeMap::new();
    for (height, hex) in table {
        map.insert(height, Hash::from_hex(hex)?);
    }
    Ok(map)
}

/// Build the frozen parameters for a network
pub fn create_chain_params(network: NetworkType) -> Result<ChainParams, ParamsError> {
    match network {
        NetworkType::Mainnet => ChainParams::main(),
        NetworkType::Testnet => ChainParams::testnet(),
        NetworkType::Regtest => Ok(ChainParams::regtest()?.freeze()),
    }
}

static GLOBAL_PARAMS: OnceLock<ChainParams> = OnceLock::new();

/// Install the process-wide parameter handle. Installing twice is an error.
pub fn install_params(params: ChainParams) -> Result<&'static ChainParams, ParamsError> {
    GLOBAL_PARAMS.set(params).map_err(|_| ParamsError::AlreadySelected)?;
    Ok(params_handle())
}

/// Select and install the parameters for a network
pub fn select_params(network: NetworkType) -> Result<&'static ChainParams, ParamsError> {
    install_params(create_chain_params(network)?)
}

/// The installed process-wide parameters.
///
/// Panics when called before [`select_params`] / [`install_params`]; library
/// code takes `&Params` by argument and never touches this.
pub fn params_handle() -> &'static ChainParams {
    GLOBAL_PARAMS.get().expect("chain parameters not selected")
}
