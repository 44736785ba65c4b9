//! Contract host
//!
//! The host owns one hardened isolate, the chain state and the deployed
//! contracts. Every deployment and every method call gets a fresh
//! [`InvokeContext`] over the state; the context's journal is committed when
//! the contract returns cleanly and discarded on any error, so a call takes
//! effect completely or not at all.

use std::collections::BTreeMap;
use std::mem;

use log::{debug, warn};
use serde::Serialize;
use tos_sandbox_environment::json::{from_json, to_json};
use tos_sandbox_environment::{Isolate, ScriptError, Scope, Value};
use tos_sandbox_runtime::{BlockContext, ChainState, ChangeSet, InvokeContext, RuntimeConfig};
use tos_sandbox_syscalls::register_syscalls;

use crate::contract::{Contract, INIT_METHOD};
use crate::error::{HostError, Result};

/// Outcome of a committed call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Receipt {
    /// Contract that ran
    pub contract: String,
    /// Method that ran, `init` for a deployment
    pub method: String,
    /// Return value as JSON, `null` when the method returned nothing
    pub value: serde_json::Value,
    /// Compute units the call consumed
    pub compute_units: u64,
    /// Writes applied to the chain state
    pub changes: ChangeSet,
}

/// Runs sandboxed contracts against a chain state
pub struct ContractHost {
    isolate: Isolate<InvokeContext>,
    config: RuntimeConfig,
    state: ChainState,
    contracts: BTreeMap<String, Box<dyn Contract>>,
}

impl ContractHost {
    /// Validates `config` and hardens a fresh isolate with the native bridge
    pub fn new(config: RuntimeConfig, state: ChainState) -> Result<Self> {
        config.validate().map_err(HostError::Config)?;
        let isolate = Isolate::new();
        isolate
            .harden(register_syscalls)
            .map_err(HostError::Environment)?;
        debug!("contract host ready on isolate {}", isolate.id());
        Ok(Self {
            isolate,
            config,
            state,
            contracts: BTreeMap::new(),
        })
    }

    /// Limits every call runs under
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Current chain state
    pub fn state(&self) -> &ChainState {
        &self.state
    }

    /// Returns true if a contract is deployed under `name`
    pub fn is_deployed(&self, name: &str) -> bool {
        self.contracts.contains_key(name)
    }

    /// Deploys `contract` under `name`, running its `init`
    ///
    /// When `init` fails nothing is deployed and its writes are discarded.
    pub fn deploy(
        &mut self,
        name: &str,
        contract: Box<dyn Contract>,
        block: BlockContext,
    ) -> Result<Receipt> {
        if name.is_empty() {
            return Err(HostError::InvalidName);
        }
        if self.contracts.contains_key(name) {
            return Err(HostError::AlreadyDeployed(name.to_string()));
        }
        let receipt = self.execute(name, INIT_METHOD, block, |scope| {
            contract.init(scope).map(|()| Value::Undefined)
        })?;
        debug!("deployed contract {} ({} CU)", name, receipt.compute_units);
        self.contracts.insert(name.to_string(), contract);
        Ok(receipt)
    }

    /// Calls a public method of a deployed contract
    ///
    /// Arguments are converted to script values; numbers that do not fit a
    /// 64-bit integer arrive as `Decimal`s.
    pub fn invoke(
        &mut self,
        name: &str,
        method: &str,
        args: &[serde_json::Value],
        block: BlockContext,
    ) -> Result<Receipt> {
        let contract = self
            .contracts
            .remove(name)
            .ok_or_else(|| HostError::UnknownContract(name.to_string()))?;
        let result = if method == INIT_METHOD || !contract.abi().iter().any(|m| *m == method) {
            Err(HostError::UnknownMethod {
                contract: name.to_string(),
                method: method.to_string(),
            })
        } else {
            self.execute(name, method, block, |scope| {
                let args = args.iter().map(from_json).collect::<std::result::Result<Vec<_>, _>>()?;
                contract.call(scope, method, &args)
            })
        };
        self.contracts.insert(name.to_string(), contract);
        result
    }

    /// Tears the isolate down and hands the chain state back
    pub fn into_state(self) -> ChainState {
        self.isolate.dispose();
        self.state
    }

    fn execute<F>(&mut self, contract: &str, method: &str, block: BlockContext, body: F) -> Result<Receipt>
    where
        F: FnOnce(&mut Scope<'_, InvokeContext>) -> std::result::Result<Value, ScriptError>,
    {
        let environment = self.isolate.environment().map_err(HostError::Environment)?;
        let state = mem::replace(&mut self.state, ChainState::detached());
        let mut ctx = InvokeContext::new(self.config.clone(), contract, method, block, state);

        let outcome = body(&mut Scope::new(&environment, &mut ctx))
            .and_then(|value| Ok(to_json(&value)?.unwrap_or(serde_json::Value::Null)));
        let compute_units = ctx.get_compute_units_consumed();

        match outcome {
            Ok(value) => {
                // A provider failure here leaves the host detached from its backends
                let (state, changes) = ctx.finish(true).map_err(HostError::Commit)?;
                self.state = state;
                let changes = changes.unwrap_or_default();
                debug!(
                    "{}.{} committed: {} CU, {} entry, {} field and {} balance writes",
                    contract,
                    method,
                    compute_units,
                    changes.entries.len(),
                    changes.fields.len(),
                    changes.balances.len()
                );
                Ok(Receipt {
                    contract: contract.to_string(),
                    method: method.to_string(),
                    value,
                    compute_units,
                    changes,
                })
            }
            Err(err) => {
                let (state, _) = ctx.finish(false).map_err(HostError::Commit)?;
                self.state = state;
                warn!("{}.{} aborted after {} CU: {}", contract, method, compute_units, err);
                Err(HostError::from(&err))
            }
        }
    }
}
