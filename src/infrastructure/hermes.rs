//! Pyth Hermes client: fetches the latest prices and re-encodes them as
//! local oracle update payloads

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::domain::oracle::{encode_payload, PriceFeedMessage, PriceQuote};
use crate::shared::types::FeedId;

pub const DEFAULT_HERMES_URL: &str = "https://hermes.pyth.network";

const HERMES_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Latest quotes for a set of feeds plus the upstream signed blobs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceUpdates {
    pub messages: Vec<PriceFeedMessage>,
    /// Raw upstream update data; kept for inspection, not verified here
    pub upstream: Vec<Vec<u8>>,
}

impl PriceUpdates {
    /// Payloads the local oracle accepts
    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.messages.iter().map(encode_payload).collect()
    }
}

/// Source of fresh price quotes
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn latest(&self, ids: &[FeedId]) -> Result<PriceUpdates>;

    async fn is_available(&self) -> bool;
}

#[derive(Debug, Clone, Deserialize)]
enum BlobEncoding {
    #[serde(rename = "hex")]
    Hex,
    #[serde(rename = "base64")]
    Base64,
}

#[derive(Debug, Clone, Deserialize)]
struct BinaryBlob {
    encoding: BlobEncoding,
    data: Vec<String>,
}

impl TryFrom<BinaryBlob> for Vec<Vec<u8>> {
    type Error = anyhow::Error;

    fn try_from(blob: BinaryBlob) -> Result<Self> {
        blob.data
            .iter()
            .map(|datum| match blob.encoding {
                BlobEncoding::Hex => hex::decode(datum).context("decode hex update blob"),
                BlobEncoding::Base64 => BASE64.decode(datum).context("decode base64 update blob"),
            })
            .collect()
    }
}

/// Hermes renders the integer fields as strings
#[derive(Debug, Clone, Deserialize)]
struct HermesPrice {
    price: String,
    conf: String,
    expo: i32,
    publish_time: i64,
}

#[derive(Debug, Clone, Deserialize)]
struct HermesPriceFeed {
    id: String,
    price: HermesPrice,
}

#[derive(Debug, Clone, Deserialize)]
struct HermesResponse {
    binary: BinaryBlob,
    #[serde(default)]
    parsed: Vec<HermesPriceFeed>,
}

impl TryFrom<HermesPriceFeed> for PriceFeedMessage {
    type Error = anyhow::Error;

    fn try_from(feed: HermesPriceFeed) -> Result<Self> {
        let id: FeedId = feed.id.parse()?;
        let price: i64 = feed
            .price
            .price
            .parse()
            .with_context(|| format!("parse price of {}", id))?;
        let conf: u64 = feed
            .price
            .conf
            .parse()
            .with_context(|| format!("parse confidence of {}", id))?;
        Ok(PriceFeedMessage {
            id,
            price: PriceQuote::new(price, conf, feed.price.expo, feed.price.publish_time),
        })
    }
}

impl TryFrom<HermesResponse> for PriceUpdates {
    type Error = anyhow::Error;

    fn try_from(response: HermesResponse) -> Result<Self> {
        Ok(PriceUpdates {
            messages: response
                .parsed
                .into_iter()
                .map(PriceFeedMessage::try_from)
                .collect::<Result<_>>()?,
            upstream: response.binary.try_into()?,
        })
    }
}

pub struct HermesClient {
    http_client: Client,
    base_url: String,
}

impl HermesClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl Default for HermesClient {
    fn default() -> Self {
        Self::new(DEFAULT_HERMES_URL)
    }
}

#[async_trait]
impl PriceSource for HermesClient {
    async fn latest(&self, ids: &[FeedId]) -> Result<PriceUpdates> {
        let url = format!("{}/v2/updates/price/latest", self.base_url);
        info!("🔍 Fetching {} Hermes price feeds from {}", ids.len(), url);

        let mut request = self
            .http_client
            .get(&url)
            .timeout(HERMES_REQUEST_TIMEOUT)
            .query(&[("encoding", "hex"), ("parsed", "true")]);
        for id in ids {
            request = request.query(&[("ids[]", id.to_string())]);
        }

        let response = request.send().await.context("Hermes request")?;
        if !response.status().is_success() {
            return Err(anyhow!("Hermes request failed with status: {}", response.status()));
        }

        let body: HermesResponse = response.json().await.context("decode Hermes response")?;
        let updates = PriceUpdates::try_from(body)?;

        for id in ids {
            if !updates.messages.iter().any(|m| m.id == *id) {
                return Err(anyhow!("Hermes returned no price for {}", id));
            }
        }
        info!("✅ Received {} price updates", updates.messages.len());
        Ok(updates)
    }

    async fn is_available(&self) -> bool {
        match self.http_client.get(format!("{}/live", self.base_url)).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!("⚠️ Hermes is not available: {}", e);
                false
            }
        }
    }
}
