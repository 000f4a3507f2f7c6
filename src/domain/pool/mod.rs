//! Pool domain - liquidity ledger, swap engine and the pool aggregate

mod auth;
mod ledger;
mod oracle_pool;
mod swap;

pub use auth::{AdminCap, AdminPolicy, Authorization};
pub use ledger::{plan_deposit, plan_withdrawal, DepositPlan, LiquidityLedger, WithdrawalPlan};
pub use oracle_pool::{LiquidityReceipt, OraclePool, SwapReceipt, WithdrawalReceipt};
pub use swap::{SwapDirection, SwapEngine, SwapQuote};

use serde::{Deserialize, Serialize};

use crate::shared::types::{Address, Amount, Bips, FeedId};

/// Default trading fee: 30 bips = 0.3%
pub const DEFAULT_FEE_RATE_BIPS: Bips = 30;

/// Token identities, oracle feeds and fee rate of a pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub base_token: Address,
    pub quote_token: Address,
    pub base_feed: FeedId,
    pub quote_feed: FeedId,
    pub fee_rate_bips: Bips,
}

/// Pool reserves, read from the pool's token balances
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reserves {
    pub base: Amount,
    pub quote: Amount,
}

impl Reserves {
    pub fn new(base: Amount, quote: Amount) -> Self {
        Self { base, quote }
    }

    pub fn is_empty(&self) -> bool {
        self.base == 0 || self.quote == 0
    }
}

/// Empty until the first deposit mints shares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolStatus {
    Empty,
    Active,
}
