//! Oracle domain - price quotes, update payloads and the pool-side adapter

mod adapter;
mod local;
mod payload;

pub use adapter::{convert_to_decimals, OracleAdapter, PairPrice};
pub use local::LocalOracle;
pub use payload::{decode_payload, encode_payload, PAYLOAD_MAGIC};

use serde::{Deserialize, Serialize};

use crate::shared::errors::OracleError;
use crate::shared::types::{Address, Amount, FeedId};

/// Exponent-scaled price: `price * 10^expo`, with a confidence interval in
/// the same units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub price: i64,
    pub conf: u64,
    pub expo: i32,
    /// Unix seconds
    pub publish_time: i64,
}

impl PriceQuote {
    pub fn new(price: i64, conf: u64, expo: i32, publish_time: i64) -> Self {
        Self {
            price,
            conf,
            expo,
            publish_time,
        }
    }
}

/// One feed's quote as carried by an update payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceFeedMessage {
    pub id: FeedId,
    pub price: PriceQuote,
}

/// The external price oracle service
pub trait PriceOracle {
    /// Account that receives update fees
    fn address(&self) -> Address;

    /// Fee required to publish `updates`
    fn update_fee(&self, updates: &[Vec<u8>]) -> Amount;

    /// Publish `updates`; `fee_paid` is the native value forwarded with the call
    fn update_price_feeds(&mut self, updates: &[Vec<u8>], fee_paid: Amount) -> Result<(), OracleError>;

    /// Stored quote for `id`, rejected if older than `max_age` seconds at `now`
    fn price_no_older_than(&self, id: &FeedId, max_age: u64, now: i64) -> Result<PriceQuote, OracleError>;

    /// The oracle's own staleness window
    fn valid_time_period(&self) -> u64;

    /// Stored quote for `id` under the oracle's own staleness policy
    fn price(&self, id: &FeedId, now: i64) -> Result<PriceQuote, OracleError> {
        self.price_no_older_than(id, self.valid_time_period(), now)
    }
}
