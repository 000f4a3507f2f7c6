//! In-process price oracle with per-update fees and a staleness window

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use super::{decode_payload, PriceOracle, PriceQuote};
use crate::shared::errors::OracleError;
use crate::shared::types::{Address, Amount, FeedId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalOracle {
    address: Address,
    single_update_fee: Amount,
    valid_time_period: u64,
    feeds: BTreeMap<FeedId, PriceQuote>,
}

impl LocalOracle {
    pub fn new(address: Address, single_update_fee: Amount, valid_time_period: u64) -> Self {
        Self {
            address,
            single_update_fee,
            valid_time_period,
            feeds: BTreeMap::new(),
        }
    }

    pub fn single_update_fee(&self) -> Amount {
        self.single_update_fee
    }

    /// Stored quote regardless of age
    pub fn price_unchecked(&self, id: &FeedId) -> Option<PriceQuote> {
        self.feeds.get(id).copied()
    }
}

impl PriceOracle for LocalOracle {
    fn address(&self) -> Address {
        self.address
    }

    fn update_fee(&self, updates: &[Vec<u8>]) -> Amount {
        self.single_update_fee.saturating_mul(updates.len() as Amount)
    }

    fn update_price_feeds(&mut self, updates: &[Vec<u8>], fee_paid: Amount) -> Result<(), OracleError> {
        let required = self.update_fee(updates);
        if fee_paid < required {
            return Err(OracleError::InsufficientFee {
                required,
                provided: fee_paid,
            });
        }

        // Decode everything first so a bad payload leaves no partial update
        let messages = updates
            .iter()
            .map(|bytes| decode_payload(bytes))
            .collect::<Result<Vec<_>, _>>()?;

        for message in messages {
            let newer = self
                .feeds
                .get(&message.id)
                .map_or(true, |stored| message.price.publish_time > stored.publish_time);
            if newer {
                debug!(feed = %message.id, price = message.price.price, expo = message.price.expo, "price updated");
                self.feeds.insert(message.id, message.price);
            }
        }
        Ok(())
    }

    fn price_no_older_than(&self, id: &FeedId, max_age: u64, now: i64) -> Result<PriceQuote, OracleError> {
        let quote = self.feeds.get(id).copied().ok_or(OracleError::PriceFeedNotFound(*id))?;
        if now.abs_diff(quote.publish_time) > max_age {
            return Err(OracleError::StalePrice {
                feed_id: *id,
                publish_time: quote.publish_time,
                now,
                max_age,
            });
        }
        Ok(quote)
    }

    fn valid_time_period(&self) -> u64 {
        self.valid_time_period
    }
}
