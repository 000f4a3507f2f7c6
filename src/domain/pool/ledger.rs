//! Liquidity ledger: proportional deposit/withdrawal math and provider positions

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Reserves;
use crate::shared::errors::{LiquidityError, MathError, PoolError};
use crate::shared::math::mul_div_floor;
use crate::shared::types::{Address, Amount};

/// Amounts an `add_liquidity` call will pull, and the shares it will mint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositPlan {
    pub base: Amount,
    pub quote: Amount,
    pub shares: Amount,
}

/// Amounts a `remove_liquidity` call will pay out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalPlan {
    pub base: Amount,
    pub quote: Amount,
}

/// Size a deposit so it keeps the current reserve ratio.
///
/// An empty side takes the offer as-is. Otherwise the binding side is
/// deposited in full and the other side is floored to match. The first
/// depositor receives one share per unit of base.
pub fn plan_deposit(
    reserves: Reserves,
    total_supply: Amount,
    base_desired: Amount,
    quote_desired: Amount,
) -> Result<DepositPlan, PoolError> {
    let (base, quote) = if reserves.is_empty() {
        (base_desired, quote_desired)
    } else {
        let ideal_quote = mul_div_floor(base_desired, reserves.quote, reserves.base)?;
        if quote_desired >= ideal_quote {
            (base_desired, ideal_quote)
        } else {
            (mul_div_floor(quote_desired, reserves.base, reserves.quote)?, quote_desired)
        }
    };

    if base == 0 || quote == 0 {
        return Err(LiquidityError::ZeroAmount("deposit").into());
    }

    let shares = if total_supply > 0 {
        if reserves.base == 0 {
            return Err(LiquidityError::DrainedReserves.into());
        }
        mul_div_floor(base, total_supply, reserves.base)?
    } else {
        base
    };

    if shares == 0 {
        return Err(LiquidityError::ZeroAmount("minted shares").into());
    }

    Ok(DepositPlan { base, quote, shares })
}

/// Proportional payout for burning `shares` out of `total_supply`, priced
/// against reserves and supply as they stand before the burn.
pub fn plan_withdrawal(
    reserves: Reserves,
    total_supply: Amount,
    shares: Amount,
) -> Result<WithdrawalPlan, PoolError> {
    if shares == 0 {
        return Err(LiquidityError::ZeroAmount("withdrawal").into());
    }
    if shares > total_supply {
        return Err(LiquidityError::InsufficientShares {
            held: total_supply,
            requested: shares,
        }
        .into());
    }

    let base = mul_div_floor(shares, reserves.base, total_supply)?;
    let quote = mul_div_floor(shares, reserves.quote, total_supply)?;

    if base > reserves.base || quote > reserves.quote {
        return Err(LiquidityError::PayoutExceedsReserves {
            base_out: base,
            quote_out: quote,
            base_reserve: reserves.base,
            quote_reserve: reserves.quote,
        }
        .into());
    }

    Ok(WithdrawalPlan { base, quote })
}

/// Shares contributed by each provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityLedger {
    positions: BTreeMap<Address, Amount>,
}

impl LiquidityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position_of(&self, provider: &Address) -> Amount {
        self.positions.get(provider).copied().unwrap_or_default()
    }

    pub fn positions(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.positions.iter()
    }

    /// Sum of all recorded positions
    pub fn total(&self) -> Result<Amount, MathError> {
        self.positions
            .values()
            .try_fold(0u128, |acc, shares| acc.checked_add(*shares))
            .ok_or(MathError::Overflow)
    }

    pub fn credit(&mut self, provider: Address, shares: Amount) -> Result<(), MathError> {
        let position = self.positions.entry(provider).or_default();
        *position = position.checked_add(shares).ok_or(MathError::Overflow)?;
        Ok(())
    }

    /// Fails before mutating if the position can't cover `shares`
    pub fn debit(&mut self, provider: Address, shares: Amount) -> Result<(), LiquidityError> {
        let held = self.position_of(&provider);
        let remaining = held
            .checked_sub(shares)
            .ok_or(LiquidityError::InsufficientShares { held, requested: shares })?;
        // Zero is a valid terminal position; the entry stays
        self.positions.insert(provider, remaining);
        Ok(())
    }
}
