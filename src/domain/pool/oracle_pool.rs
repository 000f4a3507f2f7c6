//! The pool aggregate: swap, liquidity and admin entry points.
//!
//! Every entry point receives its collaborators (token registry, oracle) as
//! explicit `&mut` borrows and follows validate → update ledger → transfer.
//! Atomicity across a whole call is provided by the host, which runs each
//! call against a buffered copy of state.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{
    plan_deposit, plan_withdrawal, AdminCap, AdminPolicy, Authorization, LiquidityLedger, PoolConfig,
    PoolStatus, Reserves, SwapDirection, SwapEngine, SwapQuote,
};
use crate::domain::oracle::{OracleAdapter, PairPrice, PriceOracle};
use crate::domain::token::{FungibleToken, LpShareToken, TokenRegistry};
use crate::shared::errors::{LiquidityError, PoolError, TokenError};
use crate::shared::types::{Address, Amount, FeedId, TxContext};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapReceipt {
    pub quote: SwapQuote,
    pub price: PairPrice,
    pub oracle_fee: Amount,
    /// BASE moved from caller to pool (sell) or pool to caller (buy)
    pub base_amount: Amount,
    /// QUOTE moved in the opposite direction
    pub quote_amount: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityReceipt {
    pub base: Amount,
    pub quote: Amount,
    pub shares: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalReceipt {
    pub base: Amount,
    pub quote: Amount,
    pub shares_burned: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OraclePool {
    address: Address,
    config: PoolConfig,
    adapter: OracleAdapter,
    positions: LiquidityLedger,
    lp: LpShareToken,
    admin: AdminPolicy,
}

fn ensure_can_pull(token: &impl FungibleToken, owner: Address, spender: Address, amount: Amount) -> Result<(), TokenError> {
    let allowance = token.allowance(&owner, &spender);
    if allowance < amount {
        return Err(TokenError::InsufficientAllowance {
            owner,
            spender,
            available: allowance,
            required: amount,
        });
    }
    let balance = token.balance_of(&owner);
    if balance < amount {
        return Err(TokenError::InsufficientBalance {
            owner,
            available: balance,
            required: amount,
        });
    }
    Ok(())
}

impl OraclePool {
    /// New pool plus the capability that administers it
    pub fn new(
        address: Address,
        config: PoolConfig,
        adapter: OracleAdapter,
        lp_token: Address,
        lp_symbol: &str,
        unsafe_demo_mode: bool,
    ) -> (Self, AdminCap) {
        let cap = AdminCap::mint();
        let pool = Self {
            address,
            config,
            adapter,
            positions: LiquidityLedger::new(),
            lp: LpShareToken::new(lp_token, address, lp_symbol),
            admin: AdminPolicy::new(&cap, unsafe_demo_mode),
        };
        (pool, cap)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn adapter(&self) -> &OracleAdapter {
        &self.adapter
    }

    pub fn lp_token(&self) -> &LpShareToken {
        &self.lp
    }

    pub fn lp_token_mut(&mut self) -> &mut LpShareToken {
        &mut self.lp
    }

    pub fn positions(&self) -> &LiquidityLedger {
        &self.positions
    }

    pub fn admin_policy(&self) -> &AdminPolicy {
        &self.admin
    }

    pub fn status(&self) -> PoolStatus {
        if self.lp.total_supply() == 0 {
            PoolStatus::Empty
        } else {
            PoolStatus::Active
        }
    }

    pub fn base_balance(&self, tokens: &TokenRegistry) -> Result<Amount, PoolError> {
        Ok(tokens.balance_of(&self.config.base_token, &self.address)?)
    }

    pub fn quote_balance(&self, tokens: &TokenRegistry) -> Result<Amount, PoolError> {
        Ok(tokens.balance_of(&self.config.quote_token, &self.address)?)
    }

    pub fn reserves(&self, tokens: &TokenRegistry) -> Result<Reserves, PoolError> {
        Ok(Reserves::new(self.base_balance(tokens)?, self.quote_balance(tokens)?))
    }

    pub fn swap(
        &mut self,
        ctx: &TxContext,
        tokens: &mut TokenRegistry,
        oracle: &mut dyn PriceOracle,
        direction: SwapDirection,
        size: Amount,
        updates: &[Vec<u8>],
    ) -> Result<SwapReceipt, PoolError> {
        // Attached value lands in the pool first; the oracle fee is paid
        // out of it and any excess stays with the pool
        if ctx.value > 0 {
            tokens.native_mut().transfer(ctx.sender, self.address, ctx.value)?;
        }
        let oracle_fee = self.adapter.refresh(oracle, tokens, self.address, ctx.value, updates)?;

        let price = self.adapter.pair_price(
            oracle,
            &self.config.base_feed,
            &self.config.quote_feed,
            ctx.block_time,
        )?;
        let quote = SwapEngine::new(self.config.fee_rate_bips).quote(direction, size, price)?;

        let (pull_token, pull_amount, push_token, push_amount) = match direction {
            SwapDirection::BuyBase => (self.config.quote_token, quote.quote_size, self.config.base_token, size),
            SwapDirection::SellBase => (self.config.base_token, size, self.config.quote_token, quote.quote_size),
        };

        ensure_can_pull(tokens.token(&pull_token)?, ctx.sender, self.address, pull_amount)?;
        tokens
            .token_mut(&pull_token)?
            .transfer_from(self.address, ctx.sender, self.address, pull_amount)?;
        tokens
            .token_mut(&push_token)?
            .transfer(self.address, ctx.sender, push_amount)?;

        info!(
            sender = %ctx.sender,
            direction = %direction,
            size,
            quote_size = quote.quote_size,
            fee = quote.fee,
            "swap executed"
        );

        Ok(SwapReceipt {
            quote,
            price,
            oracle_fee,
            base_amount: size,
            quote_amount: quote.quote_size,
        })
    }

    pub fn add_liquidity(
        &mut self,
        ctx: &TxContext,
        tokens: &mut TokenRegistry,
        base_desired: Amount,
        quote_desired: Amount,
    ) -> Result<LiquidityReceipt, PoolError> {
        let reserves = self.reserves(tokens)?;
        let plan = plan_deposit(reserves, self.lp.total_supply(), base_desired, quote_desired)?;

        ensure_can_pull(tokens.token(&self.config.base_token)?, ctx.sender, self.address, plan.base)?;
        ensure_can_pull(tokens.token(&self.config.quote_token)?, ctx.sender, self.address, plan.quote)?;

        self.lp.mint(self.address, ctx.sender, plan.shares)?;
        self.positions.credit(ctx.sender, plan.shares)?;

        tokens
            .token_mut(&self.config.base_token)?
            .transfer_from(self.address, ctx.sender, self.address, plan.base)?;
        tokens
            .token_mut(&self.config.quote_token)?
            .transfer_from(self.address, ctx.sender, self.address, plan.quote)?;

        info!(
            provider = %ctx.sender,
            base = plan.base,
            quote = plan.quote,
            shares = plan.shares,
            "liquidity added"
        );

        Ok(LiquidityReceipt {
            base: plan.base,
            quote: plan.quote,
            shares: plan.shares,
        })
    }

    pub fn remove_liquidity(
        &mut self,
        ctx: &TxContext,
        tokens: &mut TokenRegistry,
        shares: Amount,
    ) -> Result<WithdrawalReceipt, PoolError> {
        if shares == 0 {
            return Err(LiquidityError::ZeroAmount("withdrawal").into());
        }
        let held = self.lp.balance_of(&ctx.sender);
        if held < shares {
            return Err(LiquidityError::InsufficientShares { held, requested: shares }.into());
        }
        let recorded = self.positions.position_of(&ctx.sender);
        if recorded < shares {
            return Err(LiquidityError::InsufficientShares {
                held: recorded,
                requested: shares,
            }
            .into());
        }

        // Priced against reserves and supply as they stand before the burn
        let reserves = self.reserves(tokens)?;
        let plan = plan_withdrawal(reserves, self.lp.total_supply(), shares)?;

        self.lp.burn_from(self.address, ctx.sender, shares)?;
        self.positions.debit(ctx.sender, shares)?;

        tokens
            .token_mut(&self.config.base_token)?
            .transfer(self.address, ctx.sender, plan.base)?;
        tokens
            .token_mut(&self.config.quote_token)?
            .transfer(self.address, ctx.sender, plan.quote)?;

        info!(
            provider = %ctx.sender,
            shares,
            base = plan.base,
            quote = plan.quote,
            "liquidity removed"
        );

        Ok(WithdrawalReceipt {
            base: plan.base,
            quote: plan.quote,
            shares_burned: shares,
        })
    }

    /// Drain both reserves to the caller. Shares stay outstanding.
    pub fn withdraw_all(
        &mut self,
        ctx: &TxContext,
        tokens: &mut TokenRegistry,
        auth: Authorization<'_>,
    ) -> Result<Reserves, PoolError> {
        self.admin.authorize(auth, "withdraw_all")?;
        let reserves = self.reserves(tokens)?;

        tokens
            .token_mut(&self.config.base_token)?
            .transfer(self.address, ctx.sender, reserves.base)?;
        tokens
            .token_mut(&self.config.quote_token)?
            .transfer(self.address, ctx.sender, reserves.quote)?;

        info!(to = %ctx.sender, base = reserves.base, quote = reserves.quote, "pool drained");
        Ok(reserves)
    }

    /// Replace feed ids and token identities. Reserves held in the old
    /// tokens stay where they are.
    pub fn reinitialize(
        &mut self,
        tokens: &TokenRegistry,
        auth: Authorization<'_>,
        base_feed: FeedId,
        quote_feed: FeedId,
        base_token: Address,
        quote_token: Address,
    ) -> Result<(), PoolError> {
        self.admin.authorize(auth, "reinitialize")?;
        for token in [base_token, quote_token] {
            if !tokens.contains(&token) {
                return Err(TokenError::UnknownToken(token).into());
            }
        }

        self.config.base_feed = base_feed;
        self.config.quote_feed = quote_feed;
        self.config.base_token = base_token;
        self.config.quote_token = quote_token;

        info!(%base_token, %quote_token, %base_feed, %quote_feed, "pool reinitialized");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::oracle::{encode_payload, LocalOracle, PriceFeedMessage, PriceQuote};
    use crate::domain::pool::DEFAULT_FEE_RATE_BIPS;
    use crate::domain::token::TokenInfo;
    use crate::shared::errors::{AuthError, OracleError, SwapError};

    const NOW: i64 = 1_700_000_000;
    const BASE_FEED: FeedId = FeedId::new([1; 32]);
    const QUOTE_FEED: FeedId = FeedId::new([2; 32]);

    struct Fixture {
        tokens: TokenRegistry,
        oracle: LocalOracle,
        pool: OraclePool,
        cap: AdminCap,
        base: Address,
        quote: Address,
    }

    fn fixture() -> Fixture {
        let mut tokens = TokenRegistry::new();
        let base = tokens.register(TokenInfo::new("BASE", 18));
        let quote = tokens.register(TokenInfo::new("QUOTE", 18));
        let config = PoolConfig {
            base_token: base,
            quote_token: quote,
            base_feed: BASE_FEED,
            quote_feed: QUOTE_FEED,
            fee_rate_bips: DEFAULT_FEE_RATE_BIPS,
        };
        let (pool, cap) = OraclePool::new(
            Address::new_unique(),
            config,
            OracleAdapter::default(),
            Address::new_unique(),
            "OSLP",
            false,
        );
        Fixture {
            tokens,
            oracle: LocalOracle::new(Address::new_unique(), 1, 60),
            pool,
            cap,
            base,
            quote,
        }
    }

    fn prices(base_price: i64, quote_price: i64) -> Vec<Vec<u8>> {
        [(BASE_FEED, base_price), (QUOTE_FEED, quote_price)]
            .into_iter()
            .map(|(id, price)| {
                encode_payload(&PriceFeedMessage {
                    id,
                    price: PriceQuote::new(price, 0, -8, NOW),
                })
            })
            .collect()
    }

    /// Fund `who` with BASE, QUOTE and native coin and approve the pool
    fn fund(f: &mut Fixture, who: Address, amount: Amount) {
        let pool = f.pool.address();
        for token in [f.base, f.quote] {
            let ledger = f.tokens.token_mut(&token).unwrap();
            ledger.mint(who, who, amount).unwrap();
            ledger.approve(who, pool, Amount::MAX);
        }
        f.tokens.native_mut().mint(who, who, amount).unwrap();
    }

    fn seeded() -> (Fixture, Address) {
        let mut f = fixture();
        let provider = Address::new_unique();
        fund(&mut f, provider, 10_000);
        let ctx = TxContext::new(provider, NOW);
        f.pool.add_liquidity(&ctx, &mut f.tokens, 1000, 2000).unwrap();
        (f, provider)
    }

    #[test]
    fn test_first_deposit_activates_pool() {
        let mut f = fixture();
        assert_eq!(f.pool.status(), PoolStatus::Empty);

        let provider = Address::new_unique();
        fund(&mut f, provider, 5_000);
        let receipt = f
            .pool
            .add_liquidity(&TxContext::new(provider, NOW), &mut f.tokens, 1000, 2000)
            .unwrap();

        assert_eq!(receipt, LiquidityReceipt { base: 1000, quote: 2000, shares: 1000 });
        assert_eq!(f.pool.status(), PoolStatus::Active);
        assert_eq!(f.pool.reserves(&f.tokens).unwrap(), Reserves::new(1000, 2000));
        assert_eq!(f.pool.lp_token().balance_of(&provider), 1000);
        assert_eq!(f.pool.positions().position_of(&provider), 1000);
    }

    #[test]
    fn test_buy_base_pays_rounded_up_quote() {
        let (mut f, _) = seeded();
        let trader = Address::new_unique();
        fund(&mut f, trader, 1_000);

        let ctx = TxContext::new(trader, NOW).with_value(2);
        let receipt = f
            .pool
            .swap(&ctx, &mut f.tokens, &mut f.oracle, SwapDirection::BuyBase, 100, &prices(200_000_000, 100_000_000))
            .unwrap();

        assert_eq!(receipt.quote.quote_size, 201);
        assert_eq!(receipt.oracle_fee, 2);
        assert_eq!(f.tokens.balance_of(&f.base, &trader).unwrap(), 1_100);
        assert_eq!(f.tokens.balance_of(&f.quote, &trader).unwrap(), 799);
        assert_eq!(f.pool.reserves(&f.tokens).unwrap(), Reserves::new(900, 2201));
        assert_eq!(f.tokens.native().balance_of(&f.oracle.address()), 2);
    }

    #[test]
    fn test_excess_value_stays_in_pool() {
        let (mut f, _) = seeded();
        let trader = Address::new_unique();
        fund(&mut f, trader, 1_000);

        let ctx = TxContext::new(trader, NOW).with_value(10);
        f.pool
            .swap(&ctx, &mut f.tokens, &mut f.oracle, SwapDirection::SellBase, 100, &prices(200_000_000, 100_000_000))
            .unwrap();

        assert_eq!(f.tokens.native().balance_of(&f.pool.address()), 8);
        assert_eq!(f.tokens.balance_of(&f.quote, &trader).unwrap(), 1_200);
    }

    #[test]
    fn test_swap_without_fee_fails() {
        let (mut f, _) = seeded();
        let trader = Address::new_unique();
        fund(&mut f, trader, 1_000);

        let err = f
            .pool
            .swap(
                &TxContext::new(trader, NOW).with_value(1),
                &mut f.tokens,
                &mut f.oracle,
                SwapDirection::BuyBase,
                100,
                &prices(200_000_000, 100_000_000),
            )
            .unwrap_err();
        assert_eq!(err, PoolError::Oracle(OracleError::InsufficientFee { required: 2, provided: 1 }));
    }

    #[test]
    fn test_swap_rejects_zero_size_and_missing_prices() {
        let (mut f, _) = seeded();
        let trader = Address::new_unique();
        fund(&mut f, trader, 1_000);
        let ctx = TxContext::new(trader, NOW);

        let err = f
            .pool
            .swap(&ctx, &mut f.tokens, &mut f.oracle, SwapDirection::SellBase, 100, &[])
            .unwrap_err();
        assert_eq!(err, PoolError::Oracle(OracleError::PriceFeedNotFound(BASE_FEED)));

        let ctx = ctx.with_value(2);
        let err = f
            .pool
            .swap(&ctx, &mut f.tokens, &mut f.oracle, SwapDirection::SellBase, 0, &prices(1, 1))
            .unwrap_err();
        assert_eq!(err, PoolError::Swap(SwapError::ZeroSize));
    }

    #[test]
    fn test_swap_needs_allowance() {
        let (mut f, _) = seeded();
        let trader = Address::new_unique();
        f.tokens.token_mut(&f.quote).unwrap().mint(trader, trader, 1_000).unwrap();
        f.tokens.native_mut().mint(trader, trader, 2).unwrap();

        let err = f
            .pool
            .swap(
                &TxContext::new(trader, NOW).with_value(2),
                &mut f.tokens,
                &mut f.oracle,
                SwapDirection::BuyBase,
                100,
                &prices(200_000_000, 100_000_000),
            )
            .unwrap_err();
        assert!(matches!(err, PoolError::Token(TokenError::InsufficientAllowance { .. })));
    }

    #[test]
    fn test_remove_half_of_shares() {
        let (mut f, provider) = seeded();
        let receipt = f
            .pool
            .remove_liquidity(&TxContext::new(provider, NOW), &mut f.tokens, 500)
            .unwrap();

        assert_eq!(receipt, WithdrawalReceipt { base: 500, quote: 1000, shares_burned: 500 });
        assert_eq!(f.pool.lp_token().total_supply(), 500);
        assert_eq!(f.pool.positions().position_of(&provider), 500);
        assert_eq!(f.pool.reserves(&f.tokens).unwrap(), Reserves::new(500, 1000));
    }

    #[test]
    fn test_remove_requires_recorded_position() {
        let (mut f, provider) = seeded();
        let outsider = Address::new_unique();
        f.pool.lp_token_mut().transfer(provider, outsider, 100).unwrap();

        let err = f
            .pool
            .remove_liquidity(&TxContext::new(outsider, NOW), &mut f.tokens, 100)
            .unwrap_err();
        assert_eq!(
            err,
            PoolError::Liquidity(LiquidityError::InsufficientShares { held: 0, requested: 100 })
        );

        let err = f
            .pool
            .remove_liquidity(&TxContext::new(provider, NOW), &mut f.tokens, 0)
            .unwrap_err();
        assert_eq!(err, PoolError::Liquidity(LiquidityError::ZeroAmount("withdrawal")));
    }

    #[test]
    fn test_admin_operations_require_capability() {
        let (mut f, _) = seeded();
        let admin = Address::new_unique();
        let ctx = TxContext::new(admin, NOW);

        let err = f.pool.withdraw_all(&ctx, &mut f.tokens, Authorization::Anonymous).unwrap_err();
        assert_eq!(err, PoolError::Auth(AuthError::MissingCapability));

        let drained = f
            .pool
            .withdraw_all(&ctx, &mut f.tokens, Authorization::Capability(&f.cap))
            .unwrap();
        assert_eq!(drained, Reserves::new(1000, 2000));
        assert_eq!(f.tokens.balance_of(&f.base, &admin).unwrap(), 1000);
        // Shares survive the drain, so new deposits are refused
        assert_eq!(f.pool.status(), PoolStatus::Active);
    }

    #[test]
    fn test_reinitialize_swaps_tokens_and_feeds() {
        let mut f = fixture();
        let new_base = f.tokens.register(TokenInfo::new("NB", 6));
        let feed = FeedId::new([3; 32]);

        let err = f
            .pool
            .reinitialize(&f.tokens, Authorization::Capability(&f.cap), feed, feed, new_base, Address::new_unique())
            .unwrap_err();
        assert!(matches!(err, PoolError::Token(TokenError::UnknownToken(_))));

        f.pool
            .reinitialize(&f.tokens, Authorization::Capability(&f.cap), feed, QUOTE_FEED, new_base, f.quote)
            .unwrap();
        assert_eq!(f.pool.config().base_token, new_base);
        assert_eq!(f.pool.config().base_feed, feed);
    }
}
