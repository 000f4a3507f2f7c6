use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::{fs, path::Path};

use crate::domain::host::PoolSetup;
use crate::domain::pool::DEFAULT_FEE_RATE_BIPS;
use crate::domain::token::TokenInfo;
use crate::infrastructure::hermes::DEFAULT_HERMES_URL;
use crate::shared::types::{Bips, FeedId};

/// Pyth ETH/USD
pub const DEFAULT_BASE_FEED: &str = "0xff61491a931112ddf1bd8147cd1b641375f79f5825126d665480874634fd0ace";
/// Pyth USDC/USD
pub const DEFAULT_QUOTE_FEED: &str = "0xeaa020c61cc479712813461ce153894a96a6c00b21ed0cfc2798d1f9a9e9c94a";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoolCfg {
    pub fee_rate_bips: Bips,
    pub lp_symbol: String,
    /// Lets anyone call withdraw_all / reinitialize
    pub unsafe_demo_mode: bool,
}

impl Default for PoolCfg {
    fn default() -> Self {
        Self {
            fee_rate_bips: DEFAULT_FEE_RATE_BIPS,
            lp_symbol: "OSLP".to_string(),
            unsafe_demo_mode: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenCfg {
    pub symbol: String,
    pub decimals: u8,
}

impl From<&TokenCfg> for TokenInfo {
    fn from(cfg: &TokenCfg) -> Self {
        TokenInfo::new(cfg.symbol.clone(), cfg.decimals)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TokensCfg {
    pub base: TokenCfg,
    pub quote: TokenCfg,
}

impl Default for TokensCfg {
    fn default() -> Self {
        Self {
            base: TokenCfg {
                symbol: "BASE".to_string(),
                decimals: 18,
            },
            quote: TokenCfg {
                symbol: "QUOTE".to_string(),
                decimals: 18,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OracleCfg {
    pub base_feed: String,
    pub quote_feed: String,
    /// Native coin charged per update payload. TOML integers stop at 64 bits.
    pub single_update_fee: u64,
    /// Seconds a stored quote stays usable
    pub valid_time_period: u64,
    pub max_confidence_bips: Option<Bips>,
}

impl Default for OracleCfg {
    fn default() -> Self {
        Self {
            base_feed: DEFAULT_BASE_FEED.to_string(),
            quote_feed: DEFAULT_QUOTE_FEED.to_string(),
            single_update_fee: 1,
            valid_time_period: 60,
            max_confidence_bips: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HermesCfg {
    pub url: String,
}

impl Default for HermesCfg {
    fn default() -> Self {
        Self {
            url: DEFAULT_HERMES_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StateCfg {
    pub path: PathBuf,
}

impl Default for StateCfg {
    fn default() -> Self {
        Self {
            path: PathBuf::from("oracle-swap-state.json"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pool: PoolCfg,
    pub tokens: TokensCfg,
    pub oracle: OracleCfg,
    pub hermes: HermesCfg,
    pub state: StateCfg,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path.as_ref())?;
        let cfg: Self = toml::from_str(&s).context("parse Config.toml")?;
        Ok(cfg)
    }

    pub fn base_feed(&self) -> Result<FeedId> {
        self.oracle.base_feed.parse().context("oracle.base_feed")
    }

    pub fn quote_feed(&self) -> Result<FeedId> {
        self.oracle.quote_feed.parse().context("oracle.quote_feed")
    }

    pub fn pool_setup(&self) -> Result<PoolSetup> {
        Ok(PoolSetup {
            base: (&self.tokens.base).into(),
            quote: (&self.tokens.quote).into(),
            base_feed: self.base_feed()?,
            quote_feed: self.quote_feed()?,
            fee_rate_bips: self.pool.fee_rate_bips,
            lp_symbol: self.pool.lp_symbol.clone(),
            single_update_fee: self.oracle.single_update_fee.into(),
            valid_time_period: self.oracle.valid_time_period,
            max_confidence_bips: self.oracle.max_confidence_bips,
            unsafe_demo_mode: self.pool.unsafe_demo_mode,
        })
    }
}
