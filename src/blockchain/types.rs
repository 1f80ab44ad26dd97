// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Tezos network types and constants.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of mutez in one tez.
pub const MUTEZ_PER_TEZ: u64 = 1_000_000;

/// Decimal places of the tez unit.
pub const TEZ_DECIMALS: u8 = 6;

/// Public RPC endpoint for Ghostnet.
pub const GHOSTNET_RPC_URL: &str = "https://ghostnet.smartpy.io";

/// Public RPC endpoint for mainnet.
pub const MAINNET_RPC_URL: &str = "https://mainnet.smartpy.io";

/// ArtCrowd collecting contract deployed on Ghostnet.
pub const ARTCROWD_CONTRACT: &str = "KT1WYtFLhxmBkLYJrBg4xaA6sStnMuTwZA57";

/// Contract entrypoint taking `(num_shares, project_id)`.
pub const BUY_SHARES_ENTRYPOINT: &str = "buy_shares";

/// Platform fee added on top of the share price, in percent.
pub const DEFAULT_FEE_PCT: u16 = 3;

/// Network identifier as understood by the wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    Mainnet,
    Ghostnet,
    Custom,
}

impl NetworkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkType::Mainnet => "mainnet",
            NetworkType::Ghostnet => "ghostnet",
            NetworkType::Custom => "custom",
        }
    }
}

impl FromStr for NetworkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(NetworkType::Mainnet),
            "ghostnet" => Ok(NetworkType::Ghostnet),
            "custom" => Ok(NetworkType::Custom),
            other => Err(format!(
                "unknown network `{other}` (expected mainnet, ghostnet or custom)"
            )),
        }
    }
}

impl std::fmt::Display for NetworkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Network scope of a wallet permission: chain identifier plus RPC endpoint.
///
/// Serialized the way the wallet protocol expects it (`{ type, rpcUrl }`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    #[serde(rename = "type")]
    pub network_type: NetworkType,
    #[serde(rename = "rpcUrl")]
    pub rpc_url: String,
}

impl Network {
    pub fn new(network_type: NetworkType, rpc_url: impl Into<String>) -> Self {
        Self {
            network_type,
            rpc_url: rpc_url.into(),
        }
    }

    /// Ghostnet testnet through the public SmartPy node.
    pub fn ghostnet() -> Self {
        Self::new(NetworkType::Ghostnet, GHOSTNET_RPC_URL)
    }

    /// Mainnet through the public SmartPy node.
    pub fn mainnet() -> Self {
        Self::new(NetworkType::Mainnet, MAINNET_RPC_URL)
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::ghostnet()
    }
}

/// Amount in mutez, the chain's smallest unit.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Mutez(pub u64);

impl Mutez {
    pub const ZERO: Mutez = Mutez(0);

    pub fn from_tez(tez: u64) -> Option<Self> {
        tez.checked_mul(MUTEZ_PER_TEZ).map(Mutez)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for Mutez {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Mutez {
    fn from(value: u64) -> Self {
        Mutez(value)
    }
}
