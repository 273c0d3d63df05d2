//! In-memory asset ledger for tests and tooling.
//!
//! [`MemoryAssetLedger`] implements [`AssetLedger`] with plain balance and
//! allowance maps and no persistence. Total supply is conserved by
//! construction: every successful transfer moves value, every failed one
//! leaves both accounts untouched.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::error::AssetError;
use crate::traits::AssetLedger;
use crate::types::AccountId;

struct AssetBook {
    balances: HashMap<AccountId, u64>,
    /// Owner → amount the ledger holder may pull via `transfer_from`.
    allowances: HashMap<AccountId, u64>,
}

/// In-memory fungible-asset ledger.
///
/// `holder` is the account the ledger acts as: [`AssetLedger::transfer`]
/// debits it, and approvals granted with [`approve`](Self::approve) authorize
/// it to pull funds via [`AssetLedger::transfer_from`].
pub struct MemoryAssetLedger {
    holder: AccountId,
    inner: Mutex<AssetBook>,
}

impl MemoryAssetLedger {
    /// Create an empty ledger acting as `holder`.
    pub fn new(holder: AccountId) -> Self {
        Self {
            holder,
            inner: Mutex::new(AssetBook { balances: HashMap::new(), allowances: HashMap::new() }),
        }
    }

    /// Credit `amount` to `account` out of thin air. Test setup only.
    pub fn mint(&self, account: &AccountId, amount: u64) {
        let mut book = self.inner.lock();
        let balance = book.balances.entry(*account).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    /// Authorize the holder to pull up to `amount` from `owner`.
    pub fn approve(&self, owner: &AccountId, amount: u64) {
        self.inner.lock().allowances.insert(*owner, amount);
    }

    pub fn balance_of(&self, account: &AccountId) -> u64 {
        *self.inner.lock().balances.get(account).unwrap_or(&0)
    }

    pub fn allowance_of(&self, owner: &AccountId) -> u64 {
        *self.inner.lock().allowances.get(owner).unwrap_or(&0)
    }

    /// Sum of all balances. Constant across transfers.
    pub fn total_supply(&self) -> u64 {
        self.inner.lock().balances.values().sum()
    }

    fn move_value(
        book: &mut AssetBook,
        from: &AccountId,
        to: &AccountId,
        amount: u64,
    ) -> Result<(), AssetError> {
        let have = *book.balances.get(from).unwrap_or(&0);
        if have < amount {
            return Err(AssetError::InsufficientBalance { have, need: amount });
        }
        let to_balance = *book.balances.get(to).unwrap_or(&0);
        let credited = to_balance.checked_add(amount).ok_or(AssetError::BalanceOverflow)?;
        book.balances.insert(*from, have - amount);
        book.balances.insert(*to, credited);
        Ok(())
    }
}

impl AssetLedger for MemoryAssetLedger {
    fn transfer(&self, to: &AccountId, amount: u64) -> Result<(), AssetError> {
        let mut book = self.inner.lock();
        let holder = self.holder;
        Self::move_value(&mut book, &holder, to, amount)
    }

    fn transfer_from(
        &self,
        from: &AccountId,
        to: &AccountId,
        amount: u64,
    ) -> Result<(), AssetError> {
        let mut book = self.inner.lock();
        let allowed = *book.allowances.get(from).unwrap_or(&0);
        if allowed < amount {
            return Err(AssetError::InsufficientAllowance { have: allowed, need: amount });
        }
        Self::move_value(&mut book, from, to, amount)?;
        book.allowances.insert(*from, allowed - amount);
        Ok(())
    }
}
