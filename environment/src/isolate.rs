//! Isolate lifecycle
//!
//! An isolate owns exactly one restricted environment. Hardening builds it
//! before any contract code runs; hardening again is a no-op that returns the
//! environment built the first time, so no binding is ever wrapped twice.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use log::debug;

use crate::adapter::{CallHook, TraceHook};
use crate::error::{Result, ScriptError};
use crate::global::{EnvironmentBuilder, GlobalEnvironment};

static NEXT_ISOLATE_ID: AtomicU64 = AtomicU64::new(1);

/// One independent engine instance
pub struct Isolate<C> {
    id: u64,
    hook: Arc<dyn CallHook>,
    environment: OnceLock<Arc<GlobalEnvironment<C>>>,
    // Held for the whole build so concurrent callers cannot both install
    hardening: Mutex<()>,
}

impl<C> Isolate<C> {
    /// Creates an isolate whose adapters trace calls at `trace` level
    pub fn new() -> Self {
        Self::with_hook(Arc::new(TraceHook))
    }

    /// Creates an isolate whose adapters report to `hook`
    pub fn with_hook(hook: Arc<dyn CallHook>) -> Self {
        let id = NEXT_ISOLATE_ID.fetch_add(1, Ordering::Relaxed);
        debug!("isolate {} created", id);
        Self {
            id,
            hook,
            environment: OnceLock::new(),
            hardening: Mutex::new(()),
        }
    }

    /// Process-unique identifier
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns true once `harden` has succeeded
    pub fn is_hardened(&self) -> bool {
        self.environment.get().is_some()
    }

    /// Builds the restricted environment, running `install` to add host bindings
    ///
    /// Later calls return the first environment and never run `install`;
    /// concurrent callers wait for the first build to finish. A failing
    /// installer leaves the isolate unhardened. `install` must not harden the
    /// isolate it is installing into.
    pub fn harden<F>(&self, install: F) -> Result<Arc<GlobalEnvironment<C>>>
    where
        F: FnOnce(&mut EnvironmentBuilder<C>) -> Result<()>,
    {
        if let Some(env) = self.environment.get() {
            debug!("isolate {} already hardened", self.id);
            return Ok(Arc::clone(env));
        }
        let _guard = self.hardening.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(env) = self.environment.get() {
            debug!("isolate {} hardened concurrently", self.id);
            return Ok(Arc::clone(env));
        }
        let mut builder = EnvironmentBuilder::new(Arc::clone(&self.hook));
        install(&mut builder)?;
        let env = Arc::new(builder.build());
        if self.environment.set(Arc::clone(&env)).is_err() {
            return Err(ScriptError::Registration(format!(
                "isolate {} was hardened twice",
                self.id
            )));
        }
        debug!("isolate {} hardened", self.id);
        Ok(env)
    }

    /// The hardened environment
    pub fn environment(&self) -> Result<Arc<GlobalEnvironment<C>>> {
        self.environment.get().cloned().ok_or(ScriptError::NotHardened)
    }

    /// Tears the isolate down
    pub fn dispose(self) {
        debug!("isolate {} disposed", self.id);
    }
}

impl<C> Default for Isolate<C> {
    fn default() -> Self {
        Self::new()
    }
}
