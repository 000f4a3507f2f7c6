//! Transaction host: owns the world state and runs every entry point as one
//! all-or-nothing transaction.
//!
//! Each call executes against a buffered clone of [`HostState`]; the buffer
//! replaces the committed state only when the call returns `Ok`.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::oracle::{LocalOracle, OracleAdapter, PriceOracle};
use crate::domain::pool::{
    AdminCap, Authorization, LiquidityReceipt, OraclePool, PoolConfig, PoolStatus, Reserves, SwapDirection,
    SwapReceipt, WithdrawalReceipt,
};
use crate::domain::token::{FungibleToken, TokenInfo, TokenRegistry};
use crate::shared::errors::{LiquidityError, PoolError, TokenError};
use crate::shared::types::{Address, Amount, Bips, FeedId, TxContext};

/// Everything needed to deploy a pool and its collaborators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSetup {
    pub base: TokenInfo,
    pub quote: TokenInfo,
    pub base_feed: FeedId,
    pub quote_feed: FeedId,
    pub fee_rate_bips: Bips,
    pub lp_symbol: String,
    pub single_update_fee: Amount,
    pub valid_time_period: u64,
    pub max_confidence_bips: Option<Bips>,
    pub unsafe_demo_mode: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostState {
    pub tokens: TokenRegistry,
    pub oracle: LocalOracle,
    pub pool: OraclePool,
}

/// Balances of one account across every ledger the pool touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalances {
    pub native: Amount,
    pub base: Amount,
    pub quote: Amount,
    pub lp: Amount,
    pub position: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    state: HostState,
}

impl Host {
    /// Deploy tokens, oracle and pool. The returned capability is the only
    /// way to call admin operations outside unsafe demo mode.
    pub fn deploy(setup: &PoolSetup) -> (Self, AdminCap) {
        let mut tokens = TokenRegistry::new();
        let base_token = tokens.register(setup.base.clone());
        let quote_token = tokens.register(setup.quote.clone());

        let oracle = LocalOracle::new(Address::new_unique(), setup.single_update_fee, setup.valid_time_period);
        let config = PoolConfig {
            base_token,
            quote_token,
            base_feed: setup.base_feed,
            quote_feed: setup.quote_feed,
            fee_rate_bips: setup.fee_rate_bips,
        };
        let (pool, cap) = OraclePool::new(
            Address::new_unique(),
            config,
            OracleAdapter::new(setup.max_confidence_bips),
            Address::new_unique(),
            &setup.lp_symbol,
            setup.unsafe_demo_mode,
        );

        debug!(pool = %pool.address(), oracle = %oracle.address(), "pool deployed");
        (
            Self {
                state: HostState { tokens, oracle, pool },
            },
            cap,
        )
    }

    pub fn from_state(state: HostState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &HostState {
        &self.state
    }

    pub fn into_state(self) -> HostState {
        self.state
    }

    /// Run `f` against a buffered copy of the state, committing only on success
    pub fn transact<T>(
        &mut self,
        operation: &str,
        f: impl FnOnce(&mut HostState) -> Result<T, PoolError>,
    ) -> Result<T, PoolError> {
        let mut buffer = self.state.clone();
        match f(&mut buffer) {
            Ok(output) => {
                self.state = buffer;
                debug!(operation, "transaction committed");
                Ok(output)
            }
            Err(err) => {
                warn!(operation, error = %err, "transaction reverted");
                Err(err)
            }
        }
    }

    pub fn swap(
        &mut self,
        ctx: &TxContext,
        direction: SwapDirection,
        size: Amount,
        updates: &[Vec<u8>],
    ) -> Result<SwapReceipt, PoolError> {
        self.transact("swap", |state| {
            let HostState { tokens, oracle, pool } = state;
            pool.swap(ctx, tokens, oracle, direction, size, updates)
        })
    }

    pub fn add_liquidity(
        &mut self,
        ctx: &TxContext,
        base_desired: Amount,
        quote_desired: Amount,
    ) -> Result<LiquidityReceipt, PoolError> {
        self.transact("add_liquidity", |state| {
            state.pool.add_liquidity(ctx, &mut state.tokens, base_desired, quote_desired)
        })
    }

    pub fn remove_liquidity(&mut self, ctx: &TxContext, shares: Amount) -> Result<WithdrawalReceipt, PoolError> {
        self.transact("remove_liquidity", |state| {
            state.pool.remove_liquidity(ctx, &mut state.tokens, shares)
        })
    }

    pub fn withdraw_all(&mut self, ctx: &TxContext, cap: Option<&AdminCap>) -> Result<Reserves, PoolError> {
        self.transact("withdraw_all", |state| {
            state.pool.withdraw_all(ctx, &mut state.tokens, Authorization::from(cap))
        })
    }

    pub fn reinitialize(
        &mut self,
        cap: Option<&AdminCap>,
        base_feed: FeedId,
        quote_feed: FeedId,
        base_token: Address,
        quote_token: Address,
    ) -> Result<(), PoolError> {
        self.transact("reinitialize", |state| {
            state.pool.reinitialize(
                &state.tokens,
                Authorization::from(cap),
                base_feed,
                quote_feed,
                base_token,
                quote_token,
            )
        })
    }

    /// Publish price updates directly, paying the fee from the attached value
    pub fn publish_prices(&mut self, ctx: &TxContext, updates: &[Vec<u8>]) -> Result<Amount, PoolError> {
        self.transact("publish_prices", |state| {
            let adapter = *state.pool.adapter();
            adapter.refresh(&mut state.oracle, &mut state.tokens, ctx.sender, ctx.value, updates)
        })
    }

    /// Deploy an extra open-mint token, e.g. as a `reinitialize` target
    pub fn register_token(&mut self, info: TokenInfo) -> Address {
        self.state.tokens.register(info)
    }

    /// Mint demo tokens to the caller
    pub fn faucet(&mut self, ctx: &TxContext, token: Address, amount: Amount) -> Result<(), PoolError> {
        self.transact("faucet", |state| {
            Ok(state.tokens.token_mut(&token)?.mint(ctx.sender, ctx.sender, amount)?)
        })
    }

    pub fn faucet_native(&mut self, ctx: &TxContext, amount: Amount) -> Result<(), PoolError> {
        self.transact("faucet_native", |state| {
            Ok(state.tokens.native_mut().mint(ctx.sender, ctx.sender, amount)?)
        })
    }

    pub fn approve(&mut self, ctx: &TxContext, token: Address, spender: Address, amount: Amount) -> Result<(), PoolError> {
        self.transact("approve", |state| {
            state.tokens.token_mut(&token)?.approve(ctx.sender, spender, amount);
            Ok(())
        })
    }

    /// Transfer LP shares. The receiver gets the tokens but no recorded
    /// position, so it cannot redeem them.
    pub fn transfer_lp(&mut self, ctx: &TxContext, to: Address, amount: Amount) -> Result<(), PoolError> {
        self.transact("transfer_lp", |state| {
            Ok(state.pool.lp_token_mut().transfer(ctx.sender, to, amount)?)
        })
    }

    pub fn pool_address(&self) -> Address {
        self.state.pool.address()
    }

    pub fn config(&self) -> &PoolConfig {
        self.state.pool.config()
    }

    pub fn status(&self) -> PoolStatus {
        self.state.pool.status()
    }

    pub fn reserves(&self) -> Result<Reserves, PoolError> {
        self.state.pool.reserves(&self.state.tokens)
    }

    pub fn base_balance(&self) -> Result<Amount, PoolError> {
        self.state.pool.base_balance(&self.state.tokens)
    }

    pub fn quote_balance(&self) -> Result<Amount, PoolError> {
        self.state.pool.quote_balance(&self.state.tokens)
    }

    pub fn lp_total_supply(&self) -> Amount {
        self.state.pool.lp_token().total_supply()
    }

    pub fn lp_balance(&self, owner: &Address) -> Amount {
        self.state.pool.lp_token().balance_of(owner)
    }

    pub fn position_of(&self, owner: &Address) -> Amount {
        self.state.pool.positions().position_of(owner)
    }

    pub fn update_fee(&self, updates: &[Vec<u8>]) -> Amount {
        self.state.oracle.update_fee(updates)
    }

    pub fn balances(&self, owner: &Address) -> Result<AccountBalances, TokenError> {
        let config = self.state.pool.config();
        Ok(AccountBalances {
            native: self.state.tokens.native().balance_of(owner),
            base: self.state.tokens.balance_of(&config.base_token, owner)?,
            quote: self.state.tokens.balance_of(&config.quote_token, owner)?,
            lp: self.lp_balance(owner),
            position: self.position_of(owner),
        })
    }

    /// LP total supply must equal the sum of recorded positions
    pub fn check_invariants(&self) -> Result<(), PoolError> {
        let supply = self.lp_total_supply();
        let positions = self.state.pool.positions().total()?;
        if supply != positions {
            return Err(LiquidityError::SupplyMismatch { supply, positions }.into());
        }
        Ok(())
    }
}
