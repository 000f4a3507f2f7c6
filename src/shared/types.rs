//! Common types used across the application

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Token amounts in their smallest unit
pub type Amount = u128;

/// Fee rate in basis points (1 bip = 0.01%)
pub type Bips = u16;

/// 10_000 bips = 100%
pub const BIPS_SCALE: u128 = 10_000;

/// Decimal base every oracle price is normalized to before pricing a swap
pub const PRICE_DECIMALS: u8 = 18;

/// Account identifier, rendered in base58
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; 32]);

impl Address {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Fresh random address, used for wallets and deployments
    pub fn new_unique() -> Self {
        Self(rand::random())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s.trim())
            .into_vec()
            .map_err(|e| anyhow::anyhow!("Invalid address {}: {}", s, e))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| anyhow::anyhow!("Address must be 32 bytes, got {}", v.len()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Oracle price feed identifier, rendered as 0x-prefixed hex
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FeedId([u8; 32]);

impl FeedId {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FeedId({})", self)
    }
}

impl FromStr for FeedId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| anyhow::anyhow!("Invalid feed id {}: {}", s, e))?;
        Ok(Self(bytes))
    }
}

impl Serialize for FeedId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FeedId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Transaction context: who is calling, what they attached, and when
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxContext {
    pub sender: Address,
    /// Native coin attached to the call (pays oracle update fees)
    pub value: Amount,
    /// Block time in unix seconds
    pub block_time: i64,
}

impl TxContext {
    pub fn new(sender: Address, block_time: i64) -> Self {
        Self {
            sender,
            value: 0,
            block_time,
        }
    }

    pub fn with_value(mut self, value: Amount) -> Self {
        self.value = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_base58_roundtrip() {
        let address = Address::new_unique();
        let parsed: Address = address.to_string().parse().unwrap();
        assert_eq!(parsed, address);
        assert!("not-base58-0OIl".parse::<Address>().is_err());
        assert!("abc".parse::<Address>().is_err());
    }

    #[test]
    fn test_feed_id_accepts_optional_prefix() {
        let id = "ff61491a931112ddf1bd8147cd1b641375f79f5825126d665480874634fd0ace";
        let with_prefix: FeedId = format!("0x{}", id).parse().unwrap();
        let without_prefix: FeedId = id.parse().unwrap();
        assert_eq!(with_prefix, without_prefix);
        assert_eq!(with_prefix.to_string(), format!("0x{}", id));
        assert!("0x1234".parse::<FeedId>().is_err());
    }

    #[test]
    fn test_ids_serialize_as_strings() {
        let feed: FeedId = "0x0101010101010101010101010101010101010101010101010101010101010101"
            .parse()
            .unwrap();
        let json = serde_json::to_string(&feed).unwrap();
        assert_eq!(json, format!("\"{}\"", feed));
        let back: FeedId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, feed);
    }
}
