//! Contract interface

use tos_sandbox_environment::{ScriptError, Scope, Value};
use tos_sandbox_runtime::InvokeContext;

/// Method name `init` runs under; it can never be invoked directly
pub const INIT_METHOD: &str = "init";

/// A sandboxed contract
///
/// Implementations keep no state of their own between calls: everything
/// that must survive an invocation goes through the `storage` bridge.
pub trait Contract {
    /// Public methods callers may invoke
    fn abi(&self) -> &[&'static str];

    /// Runs once at deployment; a failure aborts the deployment
    fn init(&self, scope: &mut Scope<'_, InvokeContext>) -> Result<(), ScriptError> {
        let _ = scope;
        Ok(())
    }

    /// Runs one public method
    fn call(
        &self,
        scope: &mut Scope<'_, InvokeContext>,
        method: &str,
        args: &[Value],
    ) -> Result<Value, ScriptError>;
}
