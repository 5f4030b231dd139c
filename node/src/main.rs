use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use consensus::selection_interval;
use consensus_core::config::params::{install_params, ChainParams};
use consensus_core::{NetworkType, ParamsError};

#[derive(Parser, Debug)]
#[command(name = "peridotd")]
#[command(about = "Peridot proof-of-stake chain daemon", long_about = None)]
struct Args {
    /// Network (main, testnet, regtest)
    #[arg(short, long, default_value = "main")]
    network: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Override a version bits deployment, regtest only: deployment:start:timeout
    #[arg(long = "vbparams")]
    vbparams: Vec<String>,
}

fn run(args: &Args) -> Result<(), ParamsError> {
    let network: NetworkType = args
        .network
        .parse()
        .map_err(|message| ParamsError::Invalid { field: "network", message })?;

    let params = match network {
        NetworkType::Regtest => {
            let mut regtest = ChainParams::regtest()?;
            regtest.update_version_bits_from_args(&args.vbparams)?;
            regtest.freeze()
        }
        NetworkType::Mainnet => {
            if !args.vbparams.is_empty() {
                warn!("-vbparams is regtest-only and will be ignored");
            }
            ChainParams::main()?
        }
        NetworkType::Testnet => {
            if !args.vbparams.is_empty() {
                warn!("-vbparams is regtest-only and will be ignored");
            }
            ChainParams::testnet()?
        }
    };

    let params = install_params(params)?;
    info!(
        network = %params.network,
        port = params.default_port,
        genesis = %params.consensus.genesis_hash,
        bech32_hrp = params.bech32_hrp,
        last_pow_block = params.consensus.last_pow_block,
        modifier_selection_interval = selection_interval(&params.consensus),
        "chain parameters selected"
    );
    Ok(())
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_level.clone())),
        )
        .init();

    if let Err(err) = run(&args) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
