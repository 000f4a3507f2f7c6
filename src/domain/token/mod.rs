//! Token domain - fungible token ledgers

mod ledger;
mod lp_share;
mod registry;

pub use ledger::TokenLedger;
pub use lp_share::{LpShareToken, LP_DECIMALS};
pub use registry::TokenRegistry;

use serde::{Deserialize, Serialize};

use crate::shared::errors::TokenError;
use crate::shared::types::{Address, Amount};

/// Display metadata of a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub symbol: String,
    pub decimals: u8,
}

impl TokenInfo {
    pub fn new(symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            symbol: symbol.into(),
            decimals,
        }
    }
}

/// Standard fungible token interface (ERC-20 style)
pub trait FungibleToken {
    fn info(&self) -> &TokenInfo;

    fn total_supply(&self) -> Amount;

    fn balance_of(&self, owner: &Address) -> Amount;

    fn allowance(&self, owner: &Address, spender: &Address) -> Amount;

    fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> Result<(), TokenError>;

    fn approve(&mut self, owner: Address, spender: Address, amount: Amount);

    /// Move `amount` from `from` to `to`, spending `spender`'s allowance
    fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), TokenError>;
}
