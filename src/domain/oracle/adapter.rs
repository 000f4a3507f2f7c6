//! Pool-side oracle adapter: pays update fees, fetches quotes, and
//! normalizes exponent-scaled prices to a fixed decimal base.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{PriceOracle, PriceQuote};
use crate::domain::token::{FungibleToken, TokenRegistry};
use crate::shared::errors::{OracleError, PoolError};
use crate::shared::math::{scale_down, scale_up};
use crate::shared::types::{Address, Amount, Bips, FeedId, BIPS_SCALE, PRICE_DECIMALS};

/// Most negative exponent a usable quote may carry
pub const MIN_EXPO: i32 = -255;

/// Convert a quote's mantissa to `target_decimals` fixed point.
///
/// Narrowing (more source decimals than target) floors; it is not rounded.
pub fn convert_to_decimals(quote: &PriceQuote, target_decimals: u8) -> Result<u128, OracleError> {
    if quote.price < 0 || quote.expo > 0 || quote.expo < MIN_EXPO {
        return Err(OracleError::InvalidQuote {
            price: quote.price,
            expo: quote.expo,
        });
    }

    let mantissa = quote.price as u128;
    let source = quote.expo.unsigned_abs();
    let target = target_decimals as u32;

    let converted = if target >= source {
        scale_up(mantissa, target - source)?
    } else {
        scale_down(mantissa, source - target)?
    };
    Ok(converted)
}

/// BASE and QUOTE prices against the common unit, both at 18 decimals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairPrice {
    pub base: u128,
    pub quote: u128,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleAdapter {
    /// Reject quotes whose confidence exceeds this share of the price
    pub max_confidence_bips: Option<Bips>,
}

impl OracleAdapter {
    pub fn new(max_confidence_bips: Option<Bips>) -> Self {
        Self { max_confidence_bips }
    }

    /// Pay the update fee out of `budget` held by `payer` and publish `updates`.
    /// Returns the fee paid.
    pub fn refresh(
        &self,
        oracle: &mut dyn PriceOracle,
        tokens: &mut TokenRegistry,
        payer: Address,
        budget: Amount,
        updates: &[Vec<u8>],
    ) -> Result<Amount, PoolError> {
        let fee = oracle.update_fee(updates);
        if budget < fee {
            return Err(OracleError::InsufficientFee {
                required: fee,
                provided: budget,
            }
            .into());
        }

        tokens.native_mut().transfer(payer, oracle.address(), fee)?;
        oracle.update_price_feeds(updates, fee)?;
        debug!(updates = updates.len(), fee, "oracle refreshed");
        Ok(fee)
    }

    fn check_confidence(&self, quote: &PriceQuote) -> Result<(), OracleError> {
        let Some(max_bips) = self.max_confidence_bips else {
            return Ok(());
        };
        // price is non-negative here, convert_to_decimals ran first
        let spread = quote.conf as u128 * BIPS_SCALE;
        let bound = quote.price as u128 * max_bips as u128;
        if spread > bound {
            return Err(OracleError::ConfidenceTooWide {
                price: quote.price,
                conf: quote.conf,
            });
        }
        Ok(())
    }

    /// Current price of `feed` at 18 decimals
    pub fn price(&self, oracle: &dyn PriceOracle, feed: &FeedId, now: i64) -> Result<u128, OracleError> {
        let quote = oracle.price(feed, now)?;
        let normalized = convert_to_decimals(&quote, PRICE_DECIMALS)?;
        self.check_confidence(&quote)?;
        Ok(normalized)
    }

    pub fn pair_price(
        &self,
        oracle: &dyn PriceOracle,
        base_feed: &FeedId,
        quote_feed: &FeedId,
        now: i64,
    ) -> Result<PairPrice, OracleError> {
        Ok(PairPrice {
            base: self.price(oracle, base_feed, now)?,
            quote: self.price(oracle, quote_feed, now)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::oracle::{encode_payload, LocalOracle, PriceFeedMessage};
    use crate::shared::errors::{MathError, TokenError};

    #[test]
    fn test_convert_widens_to_target() {
        // 2.00000000 at expo -8
        let quote = PriceQuote::new(200_000_000, 0, -8, 0);
        assert_eq!(convert_to_decimals(&quote, 18).unwrap(), 2_000_000_000_000_000_000);

        let integer = PriceQuote::new(3, 0, 0, 0);
        assert_eq!(convert_to_decimals(&integer, 18).unwrap(), 3_000_000_000_000_000_000);
    }

    #[test]
    fn test_convert_narrowing_floors() {
        // 0.1999...9 with 19 decimals loses its last digit at 18 decimals
        let quote = PriceQuote::new(1_999_999_999_999_999_999, 0, -19, 0);
        assert_eq!(convert_to_decimals(&quote, 18).unwrap(), 199_999_999_999_999_999);

        let tiny = PriceQuote::new(i64::MAX, 0, -255, 0);
        assert_eq!(convert_to_decimals(&tiny, 18), Err(OracleError::Conversion(MathError::Overflow)));
        let small = PriceQuote::new(i64::MAX, 0, -90, 0);
        assert_eq!(convert_to_decimals(&small, 18).unwrap(), 0);
    }

    #[test]
    fn test_convert_rejects_invalid_quotes() {
        for (price, expo) in [(-1, -8), (100, 1), (100, -256)] {
            let quote = PriceQuote::new(price, 0, expo, 0);
            assert_eq!(
                convert_to_decimals(&quote, 18),
                Err(OracleError::InvalidQuote { price, expo })
            );
        }
        // Boundaries are inclusive
        assert!(convert_to_decimals(&PriceQuote::new(0, 0, 0, 0), 18).is_ok());
    }

    #[test]
    fn test_confidence_bound() {
        let id = FeedId::new([9; 32]);
        let mut oracle = LocalOracle::new(Address::new_unique(), 0, 60);
        let quote = PriceQuote::new(1_000, 20, -2, 100);
        oracle
            .update_price_feeds(&[encode_payload(&PriceFeedMessage { id, price: quote })], 0)
            .unwrap();

        // conf is 2% of the price
        assert!(OracleAdapter::new(None).price(&oracle, &id, 100).is_ok());
        assert!(OracleAdapter::new(Some(200)).price(&oracle, &id, 100).is_ok());
        assert_eq!(
            OracleAdapter::new(Some(199)).price(&oracle, &id, 100),
            Err(OracleError::ConfidenceTooWide { price: 1_000, conf: 20 })
        );
    }

    #[test]
    fn test_refresh_pays_fee_from_payer() {
        let id = FeedId::new([9; 32]);
        let oracle_address = Address::new_unique();
        let mut oracle = LocalOracle::new(oracle_address, 2, 60);
        let mut tokens = TokenRegistry::new();
        let pool = Address::new_unique();
        tokens.native_mut().mint(pool, pool, 10).unwrap();

        let payload = encode_payload(&PriceFeedMessage {
            id,
            price: PriceQuote::new(5, 0, 0, 1),
        });
        let adapter = OracleAdapter::default();

        let err = adapter
            .refresh(&mut oracle, &mut tokens, pool, 1, &[payload.clone()])
            .unwrap_err();
        assert_eq!(err, PoolError::Oracle(OracleError::InsufficientFee { required: 2, provided: 1 }));

        let fee = adapter.refresh(&mut oracle, &mut tokens, pool, 10, &[payload.clone()]).unwrap();
        assert_eq!(fee, 2);
        assert_eq!(tokens.native().balance_of(&pool), 8);
        assert_eq!(tokens.native().balance_of(&oracle_address), 2);

        let broke = Address::new_unique();
        let err = adapter.refresh(&mut oracle, &mut tokens, broke, 10, &[payload]).unwrap_err();
        assert!(matches!(err, PoolError::Token(TokenError::InsufficientBalance { .. })));
    }
}
