//! Transactional view of chain state
//!
//! An invocation never writes to the host's providers directly. Every write
//! lands in a [`StateOverlay`] journal first; reads consult the journal and
//! fall back to the providers. When the contract method returns cleanly the
//! host calls [`StateOverlay::commit`], otherwise [`StateOverlay::rollback`]
//! drops the journal and the providers are exactly as they were.

use crate::{
    error::{BridgeError, Result},
    numeric::Decimal,
    storage::{AccountProvider, NoOpAccounts, NoOpStorage, StorageProvider},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The host-owned backends an invocation runs against
pub struct ChainState {
    /// Contract storage backend
    pub storage: Box<dyn StorageProvider>,
    /// Ledger backend
    pub accounts: Box<dyn AccountProvider>,
}

impl ChainState {
    /// Bundles the two providers
    pub fn new(storage: Box<dyn StorageProvider>, accounts: Box<dyn AccountProvider>) -> Self {
        Self { storage, accounts }
    }

    /// A placeholder backed by the no-op providers
    pub fn detached() -> Self {
        Self::new(Box::new(NoOpStorage), Box::new(NoOpAccounts))
    }
}

/// One flat storage write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryChange {
    /// Owning contract
    pub contract: String,
    /// Storage key
    pub key: Vec<u8>,
    /// New value, `None` for a deletion
    pub value: Option<Vec<u8>>,
}

/// One map field write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    /// Owning contract
    pub contract: String,
    /// Map key
    pub key: Vec<u8>,
    /// Map field
    pub field: Vec<u8>,
    /// New value, `None` for a deletion
    pub value: Option<Vec<u8>>,
}

/// One final account balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceChange {
    /// Account name
    pub account: String,
    /// Balance after the invocation
    pub balance: Decimal,
}

/// Everything an invocation changed, in deterministic order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Flat storage writes
    pub entries: Vec<EntryChange>,
    /// Map field writes
    pub fields: Vec<FieldChange>,
    /// Ledger writes
    pub balances: Vec<BalanceChange>,
}

impl ChangeSet {
    /// `true` when the invocation wrote nothing
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.fields.is_empty() && self.balances.is_empty()
    }

    /// Binary encoding handed to the host's persistence layer
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decodes [`ChangeSet::to_bytes`] output
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

type EntryKey = (String, Vec<u8>);
type FieldKey = (String, Vec<u8>, Vec<u8>);

/// Journal of pending writes layered over [`ChainState`]
pub struct StateOverlay {
    base: ChainState,
    entries: BTreeMap<EntryKey, Option<Vec<u8>>>,
    fields: BTreeMap<FieldKey, Option<Vec<u8>>>,
    balances: BTreeMap<String, Decimal>,
}

impl StateOverlay {
    /// Starts an empty journal over `base`
    pub fn new(base: ChainState) -> Self {
        Self {
            base,
            entries: BTreeMap::new(),
            fields: BTreeMap::new(),
            balances: BTreeMap::new(),
        }
    }

    /// `true` when at least one write is pending
    pub fn is_dirty(&self) -> bool {
        !(self.entries.is_empty() && self.fields.is_empty() && self.balances.is_empty())
    }

    /// Reads a flat entry
    pub fn get(&self, contract: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.entries.get(&(contract.to_string(), key.to_vec())) {
            Some(pending) => Ok(pending.clone()),
            None => self.base.storage.get(contract, key),
        }
    }

    /// Upserts a flat entry
    pub fn set(&mut self, contract: &str, key: &[u8], value: &[u8]) {
        self.entries
            .insert((contract.to_string(), key.to_vec()), Some(value.to_vec()));
    }

    /// Removes a flat entry; returns whether it existed
    pub fn delete(&mut self, contract: &str, key: &[u8]) -> Result<bool> {
        let existed = self.get(contract, key)?.is_some();
        self.entries.insert((contract.to_string(), key.to_vec()), None);
        Ok(existed)
    }

    /// Reads a map field
    pub fn map_get(&self, contract: &str, key: &[u8], field: &[u8]) -> Result<Option<Vec<u8>>> {
        match self
            .fields
            .get(&(contract.to_string(), key.to_vec(), field.to_vec()))
        {
            Some(pending) => Ok(pending.clone()),
            None => self.base.storage.map_get(contract, key, field),
        }
    }

    /// Upserts a map field
    pub fn map_set(&mut self, contract: &str, key: &[u8], field: &[u8], value: &[u8]) {
        self.fields.insert(
            (contract.to_string(), key.to_vec(), field.to_vec()),
            Some(value.to_vec()),
        );
    }

    /// Removes a map field; returns whether it existed
    pub fn map_delete(&mut self, contract: &str, key: &[u8], field: &[u8]) -> Result<bool> {
        let existed = self.map_get(contract, key, field)?.is_some();
        self.fields
            .insert((contract.to_string(), key.to_vec(), field.to_vec()), None);
        Ok(existed)
    }

    /// Lists the live fields of a map entry
    pub fn map_fields(&self, contract: &str, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        let mut fields: BTreeSet<Vec<u8>> =
            self.base.storage.map_fields(contract, key)?.into_iter().collect();
        for ((c, k, field), pending) in &self.fields {
            if c != contract || k.as_slice() != key {
                continue;
            }
            match pending {
                Some(_) => fields.insert(field.clone()),
                None => fields.remove(field),
            };
        }
        Ok(fields.into_iter().collect())
    }

    /// Current balance, `None` for an account the ledger has never seen
    pub fn balance(&self, account: &str) -> Result<Option<Decimal>> {
        match self.balances.get(account) {
            Some(pending) => Ok(Some(pending.clone())),
            None => self.base.accounts.balance(account),
        }
    }

    /// Moves `amount` from `from` to `to` as a single unit
    ///
    /// Every check runs before either balance is touched, so a rejected
    /// transfer leaves the journal exactly as it was. Unknown destination
    /// accounts are created with the credited amount.
    pub fn transfer(&mut self, from: &str, to: &str, amount: &Decimal) -> Result<()> {
        if from.is_empty() || to.is_empty() {
            return Err(BridgeError::InvalidAccount.into());
        }
        if !amount.is_positive() {
            return Err(BridgeError::InvalidAmount(amount.clone()).into());
        }
        let from_balance = self
            .balance(from)?
            .ok_or_else(|| BridgeError::UnknownAccount(from.to_string()))?;
        if from_balance.less_than(amount) {
            return Err(BridgeError::InsufficientBalance {
                account: from.to_string(),
                balance: from_balance,
                amount: amount.clone(),
            }
            .into());
        }
        if from == to {
            return Ok(());
        }
        let to_balance = self.balance(to)?.unwrap_or_else(Decimal::zero);

        self.balances
            .insert(from.to_string(), from_balance.subtract(amount));
        self.balances.insert(to.to_string(), to_balance.add(amount));
        Ok(())
    }

    /// Snapshot of the pending writes
    pub fn changes(&self) -> ChangeSet {
        ChangeSet {
            entries: self
                .entries
                .iter()
                .map(|((contract, key), value)| EntryChange {
                    contract: contract.clone(),
                    key: key.clone(),
                    value: value.clone(),
                })
                .collect(),
            fields: self
                .fields
                .iter()
                .map(|((contract, key, field), value)| FieldChange {
                    contract: contract.clone(),
                    key: key.clone(),
                    field: field.clone(),
                    value: value.clone(),
                })
                .collect(),
            balances: self
                .balances
                .iter()
                .map(|(account, balance)| BalanceChange {
                    account: account.clone(),
                    balance: balance.clone(),
                })
                .collect(),
        }
    }

    /// Applies the journal to the providers and hands them back
    pub fn commit(mut self) -> Result<(ChainState, ChangeSet)> {
        let changes = self.changes();
        for change in &changes.entries {
            match &change.value {
                Some(value) => self.base.storage.set(&change.contract, &change.key, value)?,
                None => {
                    self.base.storage.delete(&change.contract, &change.key)?;
                }
            }
        }
        for change in &changes.fields {
            match &change.value {
                Some(value) => {
                    self.base
                        .storage
                        .map_set(&change.contract, &change.key, &change.field, value)?
                }
                None => {
                    self.base
                        .storage
                        .map_delete(&change.contract, &change.key, &change.field)?;
                }
            }
        }
        for change in &changes.balances {
            self.base
                .accounts
                .set_balance(&change.account, &change.balance)?;
        }
        Ok((self.base, changes))
    }

    /// Discards the journal and hands the untouched providers back
    pub fn rollback(self) -> ChainState {
        self.base
    }
}
