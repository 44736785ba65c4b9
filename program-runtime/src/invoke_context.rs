//! Invocation context for sandboxed contracts
//!
//! The context holds the read-only blockchain snapshot, the compute meter the
//! host enforces, and the transactional state every bridge call goes
//! through. One context lives for exactly one contract method call.

use crate::{
    config::RuntimeConfig,
    error::{BridgeError, Result, RuntimeError},
    numeric::Decimal,
    state::{ChainState, ChangeSet, StateOverlay},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Block document returned by `BlockChain.blockInfo()`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockInfo {
    /// Block height
    pub number: u64,
    /// Hash of the parent block
    pub parent_hash: String,
    /// Producer of the block
    pub witness: String,
    /// Block timestamp (nanoseconds)
    pub time: i64,
}

/// Transaction document returned by `BlockChain.txInfo()`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxInfo {
    /// Transaction timestamp (nanoseconds)
    pub time: i64,
    /// Transaction hash
    pub hash: String,
    /// Expiration timestamp (nanoseconds)
    pub expiration: i64,
    /// Gas limit declared by the transaction
    pub gas_limit: u64,
    /// Gas price declared by the transaction
    pub gas_ratio: u64,
    /// Signers and their permission weight
    pub auth_list: BTreeMap<String, u32>,
    /// Account that published the transaction
    pub publisher: String,
}

/// Execution document returned by `BlockChain.contextInfo()`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextInfo {
    /// Contract being executed
    pub contract_name: String,
    /// Method being executed
    pub abi_name: String,
    /// Account that published the transaction
    pub publisher: String,
    /// Immediate caller (account or contract)
    pub caller: String,
}

/// Read-only blockchain snapshot for one transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockContext {
    /// Enclosing block
    pub block: BlockInfo,
    /// Enclosing transaction
    pub tx: TxInfo,
    /// Immediate caller, the publisher when empty
    pub caller: String,
}

/// Program invocation context
///
/// This is the `&mut` receiver every bridge syscall gets. All writes go to
/// the [`StateOverlay`]; [`InvokeContext::finish`] decides whether they
/// reach the host.
pub struct InvokeContext {
    // === Compute Budget Tracking ===
    /// Initial compute budget allocated for this execution
    compute_budget: u64,

    /// Current remaining compute units
    compute_meter: u64,

    // === Blockchain State ===
    /// Name of the contract being executed
    contract_name: String,

    /// Name of the method being executed
    abi_name: String,

    /// Block and transaction snapshot
    block_context: BlockContext,

    // === Storage Access ===
    state: StateOverlay,

    config: RuntimeConfig,

    // === Debug and Logging ===
    /// Debug mode (enables console output)
    pub debug_mode: bool,
}

impl InvokeContext {
    /// Creates a new invocation context
    ///
    /// # Arguments
    /// * `config` - Limits for this invocation
    /// * `contract_name` - Contract being executed
    /// * `abi_name` - Method being executed
    /// * `block_context` - Block and transaction snapshot
    /// * `state` - Host backends, journaled until [`InvokeContext::finish`]
    pub fn new(
        config: RuntimeConfig,
        contract_name: impl Into<String>,
        abi_name: impl Into<String>,
        block_context: BlockContext,
        state: ChainState,
    ) -> Self {
        Self {
            compute_budget: config.compute_budget,
            compute_meter: config.compute_budget,
            contract_name: contract_name.into(),
            abi_name: abi_name.into(),
            block_context,
            state: StateOverlay::new(state),
            debug_mode: config.debug,
            config,
        }
    }

    /// Enable debug mode (allows console output)
    pub fn enable_debug(&mut self) {
        self.debug_mode = true;
    }

    /// Limits in force
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    // === Compute Budget ===

    /// Get the initial compute budget
    pub fn get_compute_budget(&self) -> u64 {
        self.compute_budget
    }

    /// Get remaining compute units
    pub fn get_remaining(&self) -> u64 {
        self.compute_meter
    }

    /// Get compute units consumed so far
    pub fn get_compute_units_consumed(&self) -> u64 {
        self.compute_budget.saturating_sub(self.compute_meter)
    }

    /// Consume compute units with checked arithmetic
    ///
    /// Returns an error if not enough compute units remain; the meter is
    /// left unchanged in that case.
    pub fn consume_checked(&mut self, amount: u64) -> Result<()> {
        if self.compute_meter < amount {
            return Err(RuntimeError::OutOfComputeUnits);
        }
        self.compute_meter = self.compute_meter.saturating_sub(amount);
        Ok(())
    }

    // === Blockchain Context ===

    /// Name of the executing contract
    pub fn contract_name(&self) -> &str {
        &self.contract_name
    }

    /// Account that published the transaction
    pub fn publisher(&self) -> &str {
        &self.block_context.tx.publisher
    }

    /// Block height
    pub fn block_number(&self) -> u64 {
        self.block_context.block.number
    }

    /// Block timestamp
    pub fn block_time(&self) -> i64 {
        self.block_context.block.time
    }

    /// Transaction timestamp
    pub fn tx_time(&self) -> i64 {
        self.block_context.tx.time
    }

    /// Transaction hash
    pub fn tx_hash(&self) -> &str {
        &self.block_context.tx.hash
    }

    /// `blockInfo()` document
    pub fn block_info_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.block_context.block)?)
    }

    /// `txInfo()` document
    pub fn tx_info_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.block_context.tx)?)
    }

    /// `contextInfo()` document
    pub fn context_info_json(&self) -> Result<String> {
        let caller = if self.block_context.caller.is_empty() {
            self.publisher().to_string()
        } else {
            self.block_context.caller.clone()
        };
        let info = ContextInfo {
            contract_name: self.contract_name.clone(),
            abi_name: self.abi_name.clone(),
            publisher: self.publisher().to_string(),
            caller,
        };
        Ok(serde_json::to_string(&info)?)
    }

    // === Storage ===

    /// Load data from this contract's storage
    pub fn get_storage(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.state.get(&self.contract_name, key)
    }

    /// Store data to this contract's storage
    pub fn set_storage(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.state.set(&self.contract_name, key, value);
        Ok(())
    }

    /// Delete data from this contract's storage
    pub fn delete_storage(&mut self, key: &[u8]) -> Result<bool> {
        let contract = self.contract_name.clone();
        self.state.delete(&contract, key)
    }

    /// Read a map field of this contract
    pub fn map_get(&self, key: &[u8], field: &[u8]) -> Result<Option<Vec<u8>>> {
        self.state.map_get(&self.contract_name, key, field)
    }

    /// Write a map field of this contract
    pub fn map_set(&mut self, key: &[u8], field: &[u8], value: &[u8]) -> Result<()> {
        self.state.map_set(&self.contract_name, key, field, value);
        Ok(())
    }

    /// Delete a map field of this contract
    pub fn map_delete(&mut self, key: &[u8], field: &[u8]) -> Result<bool> {
        let contract = self.contract_name.clone();
        self.state.map_delete(&contract, key, field)
    }

    /// List the fields of one of this contract's maps
    pub fn map_fields(&self, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        self.state.map_fields(&self.contract_name, key)
    }

    /// Read another contract's flat entry
    pub fn global_get(&self, contract: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.state.get(contract, key)
    }

    /// Read another contract's map field
    pub fn global_map_get(&self, contract: &str, key: &[u8], field: &[u8]) -> Result<Option<Vec<u8>>> {
        self.state.map_get(contract, key, field)
    }

    /// List another contract's map fields
    pub fn global_map_fields(&self, contract: &str, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        self.state.map_fields(contract, key)
    }

    // === Ledger ===

    /// Get account balance, zero for accounts the ledger has never seen
    pub fn get_balance(&self, account: &str) -> Result<Decimal> {
        Ok(self.state.balance(account)?.unwrap_or_else(Decimal::zero))
    }

    fn check_memo(&self, memo: &str) -> Result<()> {
        if memo.len() > self.config.max_memo_size {
            return Err(BridgeError::MemoTooLong(memo.len(), self.config.max_memo_size).into());
        }
        Ok(())
    }

    /// Move `amount` between two accounts
    pub fn transfer(&mut self, from: &str, to: &str, amount: &Decimal, memo: &str) -> Result<()> {
        self.check_memo(memo)?;
        self.state.transfer(from, to, amount)
    }

    /// Move `amount` from `account` into this contract's account
    pub fn deposit(&mut self, account: &str, amount: &Decimal, memo: &str) -> Result<()> {
        let contract = self.contract_name.clone();
        self.transfer(account, &contract, amount, memo)
    }

    /// Move `amount` from this contract's account to `account`
    pub fn withdraw(&mut self, account: &str, amount: &Decimal, memo: &str) -> Result<()> {
        let contract = self.contract_name.clone();
        self.transfer(&contract, account, amount, memo)
    }

    // === Completion ===

    /// Ends the invocation
    ///
    /// With `commit == true` the journal is applied to the host backends and
    /// the applied changes are returned; otherwise everything is discarded.
    pub fn finish(self, commit: bool) -> Result<(ChainState, Option<ChangeSet>)> {
        if commit {
            let (state, changes) = self.state.commit()?;
            Ok((state, Some(changes)))
        } else {
            if self.state.is_dirty() {
                let pending = self.state.changes();
                log::warn!(
                    "Rolling back {}.{}: discarding {} entry, {} field and {} balance writes",
                    self.contract_name,
                    self.abi_name,
                    pending.entries.len(),
                    pending.fields.len(),
                    pending.balances.len()
                );
            }
            Ok((self.state.rollback(), None))
        }
    }

    /// Ends the invocation without touching the host backends
    pub fn into_state(self) -> ChainState {
        self.state.rollback()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryLedger, MemoryStorage};

    fn test_context(budget: u64) -> InvokeContext {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut ledger = MemoryLedger::new();
        ledger.open("alice", Decimal::parse("100").unwrap());
        let config = RuntimeConfig {
            compute_budget: budget,
            ..RuntimeConfig::default()
        };
        let block_context = BlockContext {
            block: BlockInfo {
                number: 12345,
                parent_hash: "parent".into(),
                witness: "producer".into(),
                time: 1_500_000_000,
            },
            tx: TxInfo {
                time: 1_500_000_001,
                hash: "txhash".into(),
                publisher: "alice".into(),
                ..TxInfo::default()
            },
            caller: String::new(),
        };
        InvokeContext::new(
            config,
            "token",
            "test",
            block_context,
            ChainState::new(Box::new(MemoryStorage::new()), Box::new(ledger)),
        )
    }

    #[test]
    fn test_invoke_context_creation() {
        let context = test_context(100_000);
        assert_eq!(context.get_compute_budget(), 100_000);
        assert_eq!(context.get_remaining(), 100_000);
        assert_eq!(context.get_compute_units_consumed(), 0);
        assert_eq!(context.contract_name(), "token");
        assert_eq!(context.block_number(), 12345);
        assert_eq!(context.tx_hash(), "txhash");
        assert_eq!(context.publisher(), "alice");
    }

    #[test]
    fn test_consume_checked() {
        let mut context = test_context(100);

        // Should succeed
        assert!(context.consume_checked(50).is_ok());
        assert_eq!(context.get_remaining(), 50);

        // Should fail - not enough units
        assert_eq!(context.consume_checked(100), Err(RuntimeError::OutOfComputeUnits));
        assert_eq!(context.get_remaining(), 50); // Unchanged

        // Should succeed with exact remaining amount
        assert!(context.consume_checked(50).is_ok());
        assert_eq!(context.get_remaining(), 0);
    }

    #[test]
    fn test_debug_mode() {
        let mut context = test_context(100_000);
        assert!(!context.debug_mode);

        context.enable_debug();
        assert!(context.debug_mode);
    }

    #[test]
    fn test_context_documents() {
        let context = test_context(100_000);
        let block: serde_json::Value = serde_json::from_str(&context.block_info_json().unwrap()).unwrap();
        assert_eq!(block["number"], 12345);
        assert_eq!(block["parentHash"], "parent");

        let info: serde_json::Value = serde_json::from_str(&context.context_info_json().unwrap()).unwrap();
        assert_eq!(info["contractName"], "token");
        assert_eq!(info["abiName"], "test");
        assert_eq!(info["caller"], "alice");
    }

    #[test]
    fn test_deposit_and_withdraw_use_contract_account() {
        let mut context = test_context(100_000);
        let ten = Decimal::parse("10").unwrap();
        context.deposit("alice", &ten, "").unwrap();
        assert_eq!(context.get_balance("token").unwrap(), ten);
        context.withdraw("bob", &Decimal::parse("4").unwrap(), "thanks").unwrap();
        assert_eq!(context.get_balance("token").unwrap().to_string(), "6");
        assert_eq!(context.get_balance("bob").unwrap().to_string(), "4");
    }

    #[test]
    fn test_memo_limit() {
        let mut context = test_context(100_000);
        let memo = "x".repeat(513);
        let err = context
            .transfer("alice", "bob", &Decimal::parse("1").unwrap(), &memo)
            .unwrap_err();
        assert_eq!(err, RuntimeError::Bridge(BridgeError::MemoTooLong(513, 512)));
    }

    #[test]
    fn test_finish_commits_or_discards() {
        let mut context = test_context(100_000);
        context.set_storage(b"k", b"v").unwrap();
        let (state, changes) = context.finish(false).unwrap();
        assert!(changes.is_none());
        assert_eq!(state.storage.get("token", b"k").unwrap(), None);

        let mut context = InvokeContext::new(
            RuntimeConfig::default(),
            "token",
            "test",
            BlockContext::default(),
            state,
        );
        context.set_storage(b"k", b"v").unwrap();
        let (state, changes) = context.finish(true).unwrap();
        assert_eq!(changes.unwrap().entries.len(), 1);
        assert_eq!(state.storage.get("token", b"k").unwrap(), Some(b"v".to_vec()));
    }
}
