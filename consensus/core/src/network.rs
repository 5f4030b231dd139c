use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Network type identifies the chain a node is operating on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkType {
    /// Main network
    Mainnet,
    /// Test network
    Testnet,
    /// Regression test network
    Regtest,
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkType::Mainnet => write!(f, "main"),
            NetworkType::Testnet => write!(f, "test"),
            NetworkType::Regtest => write!(f, "regtest"),
        }
    }
}

impl FromStr for NetworkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "main" | "mainnet" => Ok(NetworkType::Mainnet),
            "test" | "testnet" => Ok(NetworkType::Testnet),
            "regtest" => Ok(NetworkType::Regtest),
            other => Err(format!("unknown network '{other}'")),
        }
    }
}

impl NetworkType {
    /// Returns an iterator over all NetworkType variants
    pub fn iter() -> impl Iterator<Item = NetworkType> {
        [NetworkType::Mainnet, NetworkType::Testnet, NetworkType::Regtest].into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_roundtrip() {
        for net in NetworkType::iter() {
            assert_eq!(net.to_string().parse::<NetworkType>().unwrap(), net);
        }
        assert!("simnet".parse::<NetworkType>().is_err());
    }
}
