// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults and the [`ClientConfig`] loaded from
//! them at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `ARTCROWD_SITE_NAME` | dApp name shown in the wallet and the login statement | `ArtCrowd` |
//! | `ARTCROWD_API_BASE_URL` | Backend REST root | `http://localhost:8000/api/` |
//! | `TEZOS_NETWORK` | `mainnet`, `ghostnet` or `custom` | `ghostnet` |
//! | `TEZOS_RPC_URL` | RPC endpoint handed to the wallet | network default |
//! | `ARTCROWD_CONTRACT` | Collecting contract address | ghostnet contract |
//! | `ARTCROWD_FEE_PCT` | Platform fee in percent | `3` |
//! | `ARTCROWD_CONFIRMATIONS` | Confirmations awaited before recording | `1` |
//! | `DATA_DIR` | Client state directory | `.artcrowd` |
//! | `REPLAY_INTERVAL_SECS` | Receipt replayer period | `30` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,artcrowd_wallet=debug` |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::blockchain::{
    Network, NetworkType, ARTCROWD_CONTRACT, DEFAULT_FEE_PCT, GHOSTNET_RPC_URL, MAINNET_RPC_URL,
};
use crate::storage::DATA_ROOT;

pub const SITE_NAME_ENV: &str = "ARTCROWD_SITE_NAME";
pub const API_BASE_URL_ENV: &str = "ARTCROWD_API_BASE_URL";
pub const NETWORK_ENV: &str = "TEZOS_NETWORK";
pub const RPC_URL_ENV: &str = "TEZOS_RPC_URL";
pub const CONTRACT_ENV: &str = "ARTCROWD_CONTRACT";
pub const FEE_PCT_ENV: &str = "ARTCROWD_FEE_PCT";
pub const CONFIRMATIONS_ENV: &str = "ARTCROWD_CONFIRMATIONS";

/// Environment variable name for the client state directory.
///
/// Holds the session, the receipt journal and the audit log.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const REPLAY_INTERVAL_ENV: &str = "REPLAY_INTERVAL_SECS";

/// Environment variable name for the logging format (`json` or `pretty`).
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_SITE_NAME: &str = "ArtCrowd";
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/";
pub const DEFAULT_CONFIRMATIONS: u32 = 1;
pub const DEFAULT_REPLAY_INTERVAL_SECS: u64 = 30;

/// Default `RUST_LOG` filter when none is set.
pub const DEFAULT_LOG_FILTER: &str = "info,artcrowd_wallet=debug";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?} ({reason})")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub site_name: String,
    pub api_base_url: String,
    pub network: Network,
    pub contract: String,
    pub fee_pct: u16,
    pub confirmations: u32,
    pub data_dir: PathBuf,
    pub replay_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            site_name: DEFAULT_SITE_NAME.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            network: Network::ghostnet(),
            contract: ARTCROWD_CONTRACT.to_string(),
            fee_pct: DEFAULT_FEE_PCT,
            confirmations: DEFAULT_CONFIRMATIONS,
            data_dir: PathBuf::from(DATA_ROOT),
            replay_interval: Duration::from_secs(DEFAULT_REPLAY_INTERVAL_SECS),
        }
    }
}

impl ClientConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let network_type = match get(NETWORK_ENV) {
            Some(value) => NetworkType::from_str(&value).map_err(|reason| {
                ConfigError::InvalidValue {
                    var: NETWORK_ENV,
                    value,
                    reason,
                }
            })?,
            None => NetworkType::Ghostnet,
        };

        let rpc_url = match (get(RPC_URL_ENV), network_type) {
            (Some(url), _) => url,
            (None, NetworkType::Mainnet) => MAINNET_RPC_URL.to_string(),
            (None, NetworkType::Ghostnet) => GHOSTNET_RPC_URL.to_string(),
            (None, NetworkType::Custom) => {
                return Err(ConfigError::InvalidValue {
                    var: RPC_URL_ENV,
                    value: String::new(),
                    reason: "required for a custom network".to_string(),
                })
            }
        };
        let rpc_url = parse_url(RPC_URL_ENV, rpc_url)?;

        let api_base_url = parse_url(
            API_BASE_URL_ENV,
            get(API_BASE_URL_ENV).unwrap_or(defaults.api_base_url),
        )?;
        if !api_base_url.starts_with("https://") {
            warn!(
                api_base_url = %api_base_url,
                "Backend API is not served over HTTPS"
            );
        }

        let fee_pct: u16 = parse_number(FEE_PCT_ENV, get(FEE_PCT_ENV), defaults.fee_pct)?;
        if fee_pct > 100 {
            return Err(ConfigError::InvalidValue {
                var: FEE_PCT_ENV,
                value: fee_pct.to_string(),
                reason: "must be between 0 and 100".to_string(),
            });
        }

        let confirmations: u32 =
            parse_number(CONFIRMATIONS_ENV, get(CONFIRMATIONS_ENV), defaults.confirmations)?;
        if confirmations == 0 {
            return Err(ConfigError::InvalidValue {
                var: CONFIRMATIONS_ENV,
                value: "0".to_string(),
                reason: "at least one confirmation is required".to_string(),
            });
        }

        let replay_secs: u64 = parse_number(
            REPLAY_INTERVAL_ENV,
            get(REPLAY_INTERVAL_ENV),
            DEFAULT_REPLAY_INTERVAL_SECS,
        )?;

        Ok(Self {
            site_name: get(SITE_NAME_ENV).unwrap_or(defaults.site_name),
            api_base_url,
            network: Network::new(network_type, rpc_url),
            contract: get(CONTRACT_ENV).unwrap_or(defaults.contract),
            fee_pct,
            confirmations,
            data_dir: get(DATA_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            replay_interval: Duration::from_secs(replay_secs.max(1)),
        })
    }
}

fn parse_url(var: &'static str, value: String) -> Result<String, ConfigError> {
    match url::Url::parse(&value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(value),
        Ok(url) => Err(ConfigError::InvalidValue {
            var,
            reason: format!("unsupported scheme {}", url.scheme()),
            value,
        }),
        Err(e) => Err(ConfigError::InvalidValue {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}

fn parse_number<T>(var: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                var,
                reason: e.to_string(),
                value,
            }),
        None => Ok(default),
    }
}
