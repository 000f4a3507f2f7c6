//! Application services and use cases

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::host::{AccountBalances, Host};
use crate::domain::pool::{
    AdminCap, LiquidityReceipt, Reserves, SwapDirection, SwapReceipt, WithdrawalReceipt,
};
use crate::infrastructure::hermes::PriceSource;
use crate::shared::errors::{AppError, PoolError};
use crate::shared::types::{Address, Amount, FeedId, TxContext};
use crate::shared::utils::generate_id;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TxStatus {
    Committed,
    Reverted { reason: String },
}

/// One submitted transaction, committed or not
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecord {
    pub id: Uuid,
    pub operation: String,
    pub sender: Address,
    #[serde(flatten)]
    pub status: TxStatus,
    pub timestamp: DateTime<Utc>,
}

/// What the service persists between runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSnapshot {
    pub host: Host,
    #[serde(default)]
    pub history: Vec<TxRecord>,
}

struct ServiceState {
    host: Host,
    history: Vec<TxRecord>,
}

/// Serializes every request against one host and records the outcome
#[derive(Clone)]
pub struct ExchangeService {
    state: Arc<Mutex<ServiceState>>,
    price_source: Option<Arc<dyn PriceSource>>,
}

impl ExchangeService {
    pub fn new(host: Host) -> Self {
        Self::from_snapshot(ServiceSnapshot {
            host,
            history: Vec::new(),
        })
    }

    pub fn from_snapshot(snapshot: ServiceSnapshot) -> Self {
        Self {
            state: Arc::new(Mutex::new(ServiceState {
                host: snapshot.host,
                history: snapshot.history,
            })),
            price_source: None,
        }
    }

    pub fn with_price_source(mut self, source: Arc<dyn PriceSource>) -> Self {
        self.price_source = Some(source);
        self
    }

    pub async fn snapshot(&self) -> ServiceSnapshot {
        let state = self.state.lock().await;
        ServiceSnapshot {
            host: state.host.clone(),
            history: state.history.clone(),
        }
    }

    /// Run one host transaction under the lock and record its outcome
    pub async fn execute<T>(
        &self,
        operation: &str,
        sender: Address,
        f: impl FnOnce(&mut Host) -> Result<T, PoolError>,
    ) -> Result<T, AppError> {
        let mut state = self.state.lock().await;
        let result = f(&mut state.host);

        let status = match &result {
            Ok(_) => TxStatus::Committed,
            Err(err) => {
                warn!("❌ {} from {} reverted: {}", operation, sender, err);
                TxStatus::Reverted {
                    reason: err.to_string(),
                }
            }
        };
        state.history.push(TxRecord {
            id: generate_id(),
            operation: operation.to_string(),
            sender,
            status,
            timestamp: Utc::now(),
        });

        Ok(result?)
    }

    pub async fn swap(
        &self,
        ctx: TxContext,
        direction: SwapDirection,
        size: Amount,
        updates: Vec<Vec<u8>>,
    ) -> Result<SwapReceipt, AppError> {
        self.execute("swap", ctx.sender, |host| host.swap(&ctx, direction, size, &updates))
            .await
    }

    /// Fetch fresh prices for the pool's feeds and relay them with the swap.
    /// With no attached value the exact update fee is attached.
    pub async fn swap_with_live_prices(
        &self,
        ctx: TxContext,
        direction: SwapDirection,
        size: Amount,
    ) -> Result<SwapReceipt, AppError> {
        let source = self
            .price_source
            .clone()
            .ok_or_else(|| AppError::ConfigError("no price source configured".to_string()))?;
        let feeds = self.feeds().await;

        let updates = source
            .latest(&[feeds.0, feeds.1])
            .await
            .map_err(|e| AppError::NetworkError(format!("{:#}", e)))?;
        let payloads = updates.payloads();

        let ctx = if ctx.value == 0 {
            let fee = self.state.lock().await.host.update_fee(&payloads);
            ctx.with_value(fee)
        } else {
            ctx
        };
        info!("📡 Relaying {} live prices with the swap", payloads.len());
        self.swap(ctx, direction, size, payloads).await
    }

    pub async fn add_liquidity(
        &self,
        ctx: TxContext,
        base_desired: Amount,
        quote_desired: Amount,
    ) -> Result<LiquidityReceipt, AppError> {
        self.execute("add_liquidity", ctx.sender, |host| {
            host.add_liquidity(&ctx, base_desired, quote_desired)
        })
        .await
    }

    pub async fn remove_liquidity(&self, ctx: TxContext, shares: Amount) -> Result<WithdrawalReceipt, AppError> {
        self.execute("remove_liquidity", ctx.sender, |host| host.remove_liquidity(&ctx, shares))
            .await
    }

    pub async fn withdraw_all(&self, ctx: TxContext, cap: Option<&AdminCap>) -> Result<Reserves, AppError> {
        self.execute("withdraw_all", ctx.sender, |host| host.withdraw_all(&ctx, cap))
            .await
    }

    pub async fn reinitialize(
        &self,
        ctx: TxContext,
        cap: Option<&AdminCap>,
        feeds: (FeedId, FeedId),
        tokens: (Address, Address),
    ) -> Result<(), AppError> {
        self.execute("reinitialize", ctx.sender, |host| {
            host.reinitialize(cap, feeds.0, feeds.1, tokens.0, tokens.1)
        })
        .await
    }

    pub async fn publish_prices(&self, ctx: TxContext, updates: Vec<Vec<u8>>) -> Result<Amount, AppError> {
        self.execute("publish_prices", ctx.sender, |host| host.publish_prices(&ctx, &updates))
            .await
    }

    /// Mint BASE, QUOTE and native coin to the caller
    pub async fn faucet(&self, ctx: TxContext, base: Amount, quote: Amount, native: Amount) -> Result<(), AppError> {
        self.execute("faucet", ctx.sender, |host| {
            let (base_token, quote_token) = (host.config().base_token, host.config().quote_token);
            host.faucet(&ctx, base_token, base)?;
            host.faucet(&ctx, quote_token, quote)?;
            host.faucet_native(&ctx, native)
        })
        .await
    }

    /// Approve the pool to pull BASE and QUOTE from the caller
    pub async fn approve_pool(&self, ctx: TxContext, amount: Amount) -> Result<(), AppError> {
        self.execute("approve", ctx.sender, |host| {
            let pool = host.pool_address();
            let (base_token, quote_token) = (host.config().base_token, host.config().quote_token);
            host.approve(&ctx, base_token, pool, amount)?;
            host.approve(&ctx, quote_token, pool, amount)
        })
        .await
    }

    pub async fn transfer_lp(&self, ctx: TxContext, to: Address, amount: Amount) -> Result<(), AppError> {
        self.execute("transfer_lp", ctx.sender, |host| host.transfer_lp(&ctx, to, amount))
            .await
    }

    pub async fn balances(&self, owner: Address) -> Result<AccountBalances, AppError> {
        let state = self.state.lock().await;
        Ok(state.host.balances(&owner).map_err(PoolError::from)?)
    }

    pub async fn reserves(&self) -> Result<Reserves, AppError> {
        Ok(self.state.lock().await.host.reserves()?)
    }

    pub async fn feeds(&self) -> (FeedId, FeedId) {
        let state = self.state.lock().await;
        let config = state.host.config();
        (config.base_feed, config.quote_feed)
    }

    pub async fn history(&self) -> Vec<TxRecord> {
        self.state.lock().await.history.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::host::PoolSetup;
    use crate::domain::oracle::{PriceFeedMessage, PriceQuote};
    use crate::domain::token::TokenInfo;
    use crate::infrastructure::hermes::PriceUpdates;
    use async_trait::async_trait;

    const NOW: i64 = 1_700_000_000;

    fn setup() -> PoolSetup {
        PoolSetup {
            base: TokenInfo::new("BASE", 18),
            quote: TokenInfo::new("QUOTE", 18),
            base_feed: FeedId::new([1; 32]),
            quote_feed: FeedId::new([2; 32]),
            fee_rate_bips: 30,
            lp_symbol: "OSLP".to_string(),
            single_update_fee: 1,
            valid_time_period: 60,
            max_confidence_bips: None,
            unsafe_demo_mode: false,
        }
    }

    struct FixedPrices(Vec<PriceFeedMessage>);

    #[async_trait]
    impl PriceSource for FixedPrices {
        async fn latest(&self, _ids: &[FeedId]) -> anyhow::Result<PriceUpdates> {
            Ok(PriceUpdates {
                messages: self.0.clone(),
                upstream: Vec::new(),
            })
        }

        async fn is_available(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_history_records_reverts() {
        let (host, _) = Host::deploy(&setup());
        let service = ExchangeService::new(host);
        let user = Address::new_unique();
        let ctx = TxContext::new(user, NOW);

        service.faucet(ctx, 1_000, 1_000, 10).await.unwrap();
        let err = service.add_liquidity(ctx, 100, 100).await.unwrap_err();
        assert!(matches!(err, AppError::Reverted(_)));

        let history = service.history().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].status, TxStatus::Committed);
        assert!(matches!(history[1].status, TxStatus::Reverted { .. }));
        assert_eq!(history[1].operation, "add_liquidity");
    }

    #[tokio::test]
    async fn test_concurrent_callers_are_serialized() {
        let (host, _) = Host::deploy(&setup());
        let service = ExchangeService::new(host);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                let ctx = TxContext::new(Address::new_unique(), NOW);
                service.faucet(ctx, 10, 10, 1).await.unwrap();
                service.approve_pool(ctx, Amount::MAX).await.unwrap();
                service.add_liquidity(ctx, 10, 10).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(service.reserves().await.unwrap(), Reserves::new(160, 160));
        let snapshot = service.snapshot().await;
        assert_eq!(snapshot.host.lp_total_supply(), 160);
        snapshot.host.check_invariants().unwrap();
        assert_eq!(snapshot.history.len(), 48);
    }

    #[tokio::test]
    async fn test_live_swap_attaches_update_fee() {
        let (host, _) = Host::deploy(&setup());
        let prices = [(FeedId::new([1; 32]), 200_000_000), (FeedId::new([2; 32]), 100_000_000)]
            .into_iter()
            .map(|(id, price)| PriceFeedMessage {
                id,
                price: PriceQuote::new(price, 0, -8, NOW),
            })
            .collect();
        let service = ExchangeService::new(host).with_price_source(Arc::new(FixedPrices(prices)));

        let lp = TxContext::new(Address::new_unique(), NOW);
        service.faucet(lp, 1_000, 2_000, 0).await.unwrap();
        service.approve_pool(lp, Amount::MAX).await.unwrap();
        service.add_liquidity(lp, 1_000, 2_000).await.unwrap();

        let trader = TxContext::new(Address::new_unique(), NOW);
        service.faucet(trader, 0, 500, 2).await.unwrap();
        service.approve_pool(trader, Amount::MAX).await.unwrap();
        let receipt = service
            .swap_with_live_prices(trader, SwapDirection::BuyBase, 100)
            .await
            .unwrap();

        assert_eq!(receipt.oracle_fee, 2);
        assert_eq!(receipt.quote_amount, 201);
        let balances = service.balances(trader.sender).await.unwrap();
        assert_eq!((balances.base, balances.quote, balances.native), (100, 299, 0));
    }

    #[tokio::test]
    async fn test_live_swap_needs_a_source() {
        let (host, _) = Host::deploy(&setup());
        let service = ExchangeService::new(host);
        let ctx = TxContext::new(Address::new_unique(), NOW);
        let err = service
            .swap_with_live_prices(ctx, SwapDirection::SellBase, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
