//! In-memory ERC-20 style token ledger

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use super::{FungibleToken, TokenInfo};
use crate::shared::errors::TokenError;
use crate::shared::types::{Address, Amount};

/// Balances, allowances and supply of one token.
///
/// `minter` restricts `mint`/`burn` to a single authority; `None` leaves
/// minting open, which is how the demo BASE/QUOTE faucet tokens behave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLedger {
    address: Address,
    info: TokenInfo,
    minter: Option<Address>,
    total_supply: Amount,
    balances: BTreeMap<Address, Amount>,
    allowances: BTreeMap<Address, BTreeMap<Address, Amount>>,
}

impl TokenLedger {
    pub fn new(address: Address, info: TokenInfo, minter: Option<Address>) -> Self {
        Self {
            address,
            info,
            minter,
            total_supply: 0,
            balances: BTreeMap::new(),
            allowances: BTreeMap::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn minter(&self) -> Option<Address> {
        self.minter
    }

    /// Iterate over every non-zero balance
    pub fn holders(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.balances.iter().filter(|(_, amount)| **amount > 0)
    }

    fn ensure_minter(&self, caller: Address) -> Result<(), TokenError> {
        match self.minter {
            Some(minter) if minter != caller => Err(TokenError::Unauthorized { caller }),
            _ => Ok(()),
        }
    }

    pub fn mint(&mut self, caller: Address, to: Address, amount: Amount) -> Result<(), TokenError> {
        self.ensure_minter(caller)?;
        let total_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::SupplyOverflow)?;
        // Balance can't exceed supply, so this add can't overflow once supply didn't
        *self.balances.entry(to).or_default() += amount;
        self.total_supply = total_supply;
        debug!(token = %self.info.symbol, %to, amount, "mint");
        Ok(())
    }

    pub fn burn(&mut self, caller: Address, from: Address, amount: Amount) -> Result<(), TokenError> {
        self.ensure_minter(caller)?;
        self.debit(from, amount)?;
        self.total_supply -= amount;
        debug!(token = %self.info.symbol, %from, amount, "burn");
        Ok(())
    }

    fn debit(&mut self, owner: Address, amount: Amount) -> Result<(), TokenError> {
        let available = self.balance_of(&owner);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                owner,
                available,
                required: amount,
            });
        }
        self.balances.insert(owner, available - amount);
        Ok(())
    }
}

impl FungibleToken for TokenLedger {
    fn info(&self) -> &TokenInfo {
        &self.info
    }

    fn total_supply(&self) -> Amount {
        self.total_supply
    }

    fn balance_of(&self, owner: &Address) -> Amount {
        self.balances.get(owner).copied().unwrap_or_default()
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or_default()
    }

    fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> Result<(), TokenError> {
        self.debit(from, amount)?;
        *self.balances.entry(to).or_default() += amount;
        debug!(token = %self.info.symbol, %from, %to, amount, "transfer");
        Ok(())
    }

    fn approve(&mut self, owner: Address, spender: Address, amount: Amount) {
        self.allowances.entry(owner).or_default().insert(spender, amount);
        debug!(token = %self.info.symbol, %owner, %spender, amount, "approve");
    }

    fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        let available = self.allowance(&from, &spender);
        if available < amount {
            return Err(TokenError::InsufficientAllowance {
                owner: from,
                spender,
                available,
                required: amount,
            });
        }
        self.transfer(from, to, amount)?;
        if available != Amount::MAX {
            self.approve(from, spender, available - amount);
        }
        Ok(())
    }
}
