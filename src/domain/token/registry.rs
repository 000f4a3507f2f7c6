//! Registry of the external token ledgers a pool talks to

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use super::{FungibleToken, TokenInfo, TokenLedger};
use crate::shared::errors::TokenError;
use crate::shared::types::{Address, Amount};

/// Native coin decimals (wei-style)
pub const NATIVE_DECIMALS: u8 = 18;

/// Every fungible token on the host plus the native coin used for fees
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRegistry {
    native: TokenLedger,
    tokens: BTreeMap<Address, TokenLedger>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self {
            native: TokenLedger::new(Address::default(), TokenInfo::new("NATIVE", NATIVE_DECIMALS), None),
            tokens: BTreeMap::new(),
        }
    }

    /// Deploy a new open-mint token and return its address
    pub fn register(&mut self, info: TokenInfo) -> Address {
        let address = Address::new_unique();
        info!("Registered token {} at {}", info.symbol, address);
        self.tokens.insert(address, TokenLedger::new(address, info, None));
        address
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.tokens.contains_key(address)
    }

    pub fn token(&self, address: &Address) -> Result<&TokenLedger, TokenError> {
        self.tokens.get(address).ok_or(TokenError::UnknownToken(*address))
    }

    pub fn token_mut(&mut self, address: &Address) -> Result<&mut TokenLedger, TokenError> {
        self.tokens.get_mut(address).ok_or(TokenError::UnknownToken(*address))
    }

    pub fn tokens(&self) -> impl Iterator<Item = &TokenLedger> {
        self.tokens.values()
    }

    pub fn native(&self) -> &TokenLedger {
        &self.native
    }

    pub fn native_mut(&mut self) -> &mut TokenLedger {
        &mut self.native
    }

    pub fn balance_of(&self, token: &Address, owner: &Address) -> Result<Amount, TokenError> {
        Ok(self.token(token)?.balance_of(owner))
    }
}

impl Default for TokenRegistry {
    fn default() -> Self {
        Self::new()
    }
}
