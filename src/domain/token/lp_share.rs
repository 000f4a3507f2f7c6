//! LP share token

use serde::{Deserialize, Serialize};

use super::{FungibleToken, TokenInfo, TokenLedger};
use crate::shared::errors::TokenError;
use crate::shared::types::{Address, Amount};

/// Shares are minted 1:1 against base units on bootstrap
pub const LP_DECIMALS: u8 = 18;

/// Fungible claim on pool reserves. Only the owning pool may mint or burn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LpShareToken {
    ledger: TokenLedger,
}

impl LpShareToken {
    pub fn new(address: Address, pool: Address, symbol: impl Into<String>) -> Self {
        Self {
            ledger: TokenLedger::new(address, TokenInfo::new(symbol, LP_DECIMALS), Some(pool)),
        }
    }

    pub fn address(&self) -> Address {
        self.ledger.address()
    }

    pub fn mint(&mut self, authority: Address, to: Address, amount: Amount) -> Result<(), TokenError> {
        self.ledger.mint(authority, to, amount)
    }

    /// Burns without an allowance; the pool is the only authority
    pub fn burn_from(&mut self, authority: Address, from: Address, amount: Amount) -> Result<(), TokenError> {
        self.ledger.burn(authority, from, amount)
    }

    pub fn holders(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.ledger.holders()
    }
}

impl FungibleToken for LpShareToken {
    fn info(&self) -> &TokenInfo {
        self.ledger.info()
    }

    fn total_supply(&self) -> Amount {
        self.ledger.total_supply()
    }

    fn balance_of(&self, owner: &Address) -> Amount {
        self.ledger.balance_of(owner)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.ledger.allowance(owner, spender)
    }

    fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> Result<(), TokenError> {
        self.ledger.transfer(from, to, amount)
    }

    fn approve(&mut self, owner: Address, spender: Address, amount: Amount) {
        self.ledger.approve(owner, spender, amount)
    }

    fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        self.ledger.transfer_from(spender, from, to, amount)
    }
}
