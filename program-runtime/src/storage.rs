//! Storage and account provider traits and implementations
//!
//! This module defines the abstraction layer that lets the sandbox run on
//! top of any persistence backend. The runtime itself never persists
//! anything; it reads through these traits and writes back only when an
//! invocation commits (see [`crate::state::StateOverlay`]).

use crate::{error::Result, numeric::Decimal};
use std::collections::BTreeMap;

/// Storage provider trait
///
/// Implemented by the host to give contracts key/value storage. Every call
/// carries the owning contract's name so backends can keep contracts
/// isolated from each other.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use tos_sandbox_runtime::{StorageProvider, Result};
///
/// struct ChainStorage {
///     // Your storage implementation
/// }
///
/// impl StorageProvider for ChainStorage {
///     fn get(&self, contract: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
///         // Read from your storage backend
///         todo!()
///     }
///     // ...
/// }
/// ```
pub trait StorageProvider {
    /// Read a value from contract storage
    ///
    /// # Returns
    /// * `Some(value)` if the key exists
    /// * `None` if the key doesn't exist
    fn get(&self, contract: &str, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Write a value to contract storage, replacing any previous value
    fn set(&mut self, contract: &str, key: &[u8], value: &[u8]) -> Result<()>;

    /// Delete a key from contract storage
    ///
    /// # Returns
    /// * `true` if the key existed and was deleted
    /// * `false` if the key didn't exist
    fn delete(&mut self, contract: &str, key: &[u8]) -> Result<bool>;

    /// Read one field of a map entry
    fn map_get(&self, contract: &str, key: &[u8], field: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Write one field of a map entry
    fn map_set(&mut self, contract: &str, key: &[u8], field: &[u8], value: &[u8]) -> Result<()>;

    /// Delete one field of a map entry
    fn map_delete(&mut self, contract: &str, key: &[u8], field: &[u8]) -> Result<bool>;

    /// List the fields of a map entry. No particular order is promised.
    fn map_fields(&self, contract: &str, key: &[u8]) -> Result<Vec<Vec<u8>>>;
}

/// Account provider trait
///
/// Implemented by the host to expose ledger balances. Value movement rules
/// (positive amounts, sufficient funds, atomicity) are enforced by the
/// runtime before anything reaches the provider.
pub trait AccountProvider {
    /// Get the balance of an account
    ///
    /// # Returns
    /// * `Some(balance)` for a known account
    /// * `None` if the ledger has never seen the account
    fn balance(&self, account: &str) -> Result<Option<Decimal>>;

    /// Overwrite the balance of an account, creating it when unknown
    fn set_balance(&mut self, account: &str, balance: &Decimal) -> Result<()>;
}

/// No-op storage provider for testing
///
/// This implementation does nothing and is useful for:
/// - Unit tests that don't need storage
/// - Standing in for the real backend while it is lent to an invocation
pub struct NoOpStorage;

impl StorageProvider for NoOpStorage {
    fn get(&self, _contract: &str, _key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    fn set(&mut self, _contract: &str, _key: &[u8], _value: &[u8]) -> Result<()> {
        Ok(())
    }

    fn delete(&mut self, _contract: &str, _key: &[u8]) -> Result<bool> {
        Ok(false)
    }

    fn map_get(&self, _contract: &str, _key: &[u8], _field: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    fn map_set(&mut self, _contract: &str, _key: &[u8], _field: &[u8], _value: &[u8]) -> Result<()> {
        Ok(())
    }

    fn map_delete(&mut self, _contract: &str, _key: &[u8], _field: &[u8]) -> Result<bool> {
        Ok(false)
    }

    fn map_fields(&self, _contract: &str, _key: &[u8]) -> Result<Vec<Vec<u8>>> {
        Ok(Vec::new())
    }
}

/// No-op account provider for testing
pub struct NoOpAccounts;

impl AccountProvider for NoOpAccounts {
    fn balance(&self, _account: &str) -> Result<Option<Decimal>> {
        Ok(None)
    }

    fn set_balance(&mut self, _account: &str, _balance: &Decimal) -> Result<()> {
        Ok(())
    }
}

type EntryKey = (String, Vec<u8>);
type FieldKey = (String, Vec<u8>, Vec<u8>);

/// In-memory storage backend
///
/// Used by the sample host and by tests. Map fields come back in byte order.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: BTreeMap<EntryKey, Vec<u8>>,
    fields: BTreeMap<FieldKey, Vec<u8>>,
}

impl MemoryStorage {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of flat entries across all contracts
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when neither flat entries nor map fields exist
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.fields.is_empty()
    }
}

impl StorageProvider for MemoryStorage {
    fn get(&self, contract: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(&(contract.to_string(), key.to_vec())).cloned())
    }

    fn set(&mut self, contract: &str, key: &[u8], value: &[u8]) -> Result<()> {
        self.entries
            .insert((contract.to_string(), key.to_vec()), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, contract: &str, key: &[u8]) -> Result<bool> {
        Ok(self
            .entries
            .remove(&(contract.to_string(), key.to_vec()))
            .is_some())
    }

    fn map_get(&self, contract: &str, key: &[u8], field: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self
            .fields
            .get(&(contract.to_string(), key.to_vec(), field.to_vec()))
            .cloned())
    }

    fn map_set(&mut self, contract: &str, key: &[u8], field: &[u8], value: &[u8]) -> Result<()> {
        self.fields.insert(
            (contract.to_string(), key.to_vec(), field.to_vec()),
            value.to_vec(),
        );
        Ok(())
    }

    fn map_delete(&mut self, contract: &str, key: &[u8], field: &[u8]) -> Result<bool> {
        Ok(self
            .fields
            .remove(&(contract.to_string(), key.to_vec(), field.to_vec()))
            .is_some())
    }

    fn map_fields(&self, contract: &str, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        Ok(self
            .fields
            .keys()
            .filter(|(c, k, _)| c == contract && k.as_slice() == key)
            .map(|(_, _, field)| field.clone())
            .collect())
    }
}

/// In-memory ledger backend
#[derive(Debug, Default, Clone)]
pub struct MemoryLedger {
    balances: BTreeMap<String, Decimal>,
}

impl MemoryLedger {
    /// Creates an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens (or resets) an account with an initial balance
    pub fn open(&mut self, account: &str, balance: Decimal) {
        self.balances.insert(account.to_string(), balance);
    }
}

impl AccountProvider for MemoryLedger {
    fn balance(&self, account: &str) -> Result<Option<Decimal>> {
        Ok(self.balances.get(account).cloned())
    }

    fn set_balance(&mut self, account: &str, balance: &Decimal) -> Result<()> {
        self.balances.insert(account.to_string(), balance.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_storage() {
        let mut storage = NoOpStorage;
        let key = b"test_key";
        let value = b"test_value";

        // Read non-existent key
        assert_eq!(storage.get("token", key).unwrap(), None);

        // Write
        assert!(storage.set("token", key, value).is_ok());

        // Delete
        assert!(!storage.delete("token", key).unwrap());
        assert!(storage.map_fields("token", key).unwrap().is_empty());
    }

    #[test]
    fn test_noop_accounts() {
        let mut accounts = NoOpAccounts;
        assert_eq!(accounts.balance("alice").unwrap(), None);
        assert!(accounts.set_balance("alice", &Decimal::zero()).is_ok());
    }

    #[test]
    fn test_memory_storage_isolates_contracts() {
        let mut storage = MemoryStorage::new();
        storage.set("token", b"k", b"v").unwrap();

        assert_eq!(storage.get("token", b"k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(storage.get("other", b"k").unwrap(), None);

        assert!(storage.delete("token", b"k").unwrap());
        assert!(!storage.delete("token", b"k").unwrap());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_memory_storage_map_fields() {
        let mut storage = MemoryStorage::new();
        storage.map_set("token", b"m", b"b", b"2").unwrap();
        storage.map_set("token", b"m", b"a", b"1").unwrap();
        storage.map_set("token", b"n", b"c", b"3").unwrap();

        assert_eq!(
            storage.map_fields("token", b"m").unwrap(),
            vec![b"a".to_vec(), b"b".to_vec()]
        );
        assert!(storage.map_delete("token", b"m", b"a").unwrap());
        assert_eq!(storage.map_get("token", b"m", b"a").unwrap(), None);
        assert_eq!(storage.map_get("token", b"m", b"b").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn test_memory_ledger() {
        let mut ledger = MemoryLedger::new();
        ledger.open("alice", Decimal::parse("10.5").unwrap());
        assert_eq!(ledger.balance("alice").unwrap(), Some(Decimal::parse("10.5").unwrap()));
        assert_eq!(ledger.balance("bob").unwrap(), None);
    }
}
