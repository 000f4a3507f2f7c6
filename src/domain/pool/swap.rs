//! Swap engine: prices a one-sided trade against oracle prices

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::oracle::PairPrice;
use crate::shared::errors::{MathError, PoolError, SwapError};
use crate::shared::math::{bips_of, mul_div_floor};
use crate::shared::types::{Amount, Bips};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapDirection {
    /// Caller pays QUOTE, receives `size` BASE
    BuyBase,
    /// Caller pays `size` BASE, receives QUOTE
    SellBase,
}

impl SwapDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwapDirection::BuyBase => "buy",
            SwapDirection::SellBase => "sell",
        }
    }
}

impl fmt::Display for SwapDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SwapDirection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "buy" | "buy_base" | "buy-base" => Ok(SwapDirection::BuyBase),
            "sell" | "sell_base" | "sell-base" => Ok(SwapDirection::SellBase),
            _ => Err(anyhow::anyhow!("Unknown swap direction: {}", s)),
        }
    }
}

/// Priced trade, before any tokens move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapQuote {
    pub direction: SwapDirection,
    /// BASE amount traded
    pub size: Amount,
    pub fee: Amount,
    pub size_after_fee: Amount,
    /// QUOTE amount settled; already rounded up by one on buys
    pub quote_size: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapEngine {
    pub fee_rate_bips: Bips,
}

impl SwapEngine {
    pub fn new(fee_rate_bips: Bips) -> Self {
        Self { fee_rate_bips }
    }

    /// fee = floor(size * bips / 10000), then
    /// quote_size = floor((size - fee) * base_price / quote_price).
    ///
    /// Buys add one unit of QUOTE so the floor never favours the taker.
    /// Sells are left floored, which already rounds toward the pool.
    pub fn quote(&self, direction: SwapDirection, size: Amount, price: PairPrice) -> Result<SwapQuote, PoolError> {
        if size == 0 {
            return Err(SwapError::ZeroSize.into());
        }
        if price.quote == 0 {
            return Err(SwapError::ZeroQuotePrice.into());
        }

        let fee = bips_of(size, self.fee_rate_bips)?;
        let size_after_fee = size.checked_sub(fee).ok_or(MathError::Overflow)?;
        let mut quote_size = mul_div_floor(size_after_fee, price.base, price.quote)?;

        if direction == SwapDirection::BuyBase {
            quote_size = quote_size.checked_add(1).ok_or(MathError::Overflow)?;
        }

        Ok(SwapQuote {
            direction,
            size,
            fee,
            size_after_fee,
            quote_size,
        })
    }
}
