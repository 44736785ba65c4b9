//! Pass-through adapter around allowed primitives
//!
//! Every allowed method and bridge function is reached through a
//! [`PassThrough`]. The adapter hands the receiver and arguments to the
//! primitive untouched and returns its result untouched; the only thing it
//! adds is a [`CallHook`] notification, which is where tracing lives today
//! and where metering can be attached without changing observable results.

use std::fmt;
use std::sync::Arc;

use log::trace;

use crate::error::Result;
use crate::value::Value;

/// Signature of every native primitive: context, receiver, arguments
pub type NativeFn<C> = fn(&mut C, &Value, &[Value]) -> Result<Value>;

/// Observer notified before each adapted call
pub trait CallHook: Send + Sync {
    /// Called with the qualified target name, e.g. `String.prototype.slice`
    fn on_call(&self, target: &str, argc: usize);
}

/// Hook that records calls at trace level
#[derive(Debug, Default, Clone, Copy)]
pub struct TraceHook;

impl CallHook for TraceHook {
    fn on_call(&self, target: &str, argc: usize) {
        trace!("call {} ({} args)", target, argc);
    }
}

/// Forwards a call to a native primitive
pub struct PassThrough<C> {
    target: String,
    native: NativeFn<C>,
    hook: Arc<dyn CallHook>,
}

impl<C> PassThrough<C> {
    /// Wraps `native` under the qualified name `target`
    pub fn new(target: impl Into<String>, native: NativeFn<C>, hook: Arc<dyn CallHook>) -> Self {
        Self {
            target: target.into(),
            native,
            hook,
        }
    }

    /// Qualified name of the wrapped primitive
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The unwrapped primitive
    pub fn native(&self) -> NativeFn<C> {
        self.native
    }

    /// Notifies the hook and forwards to the primitive
    pub fn call(&self, ctx: &mut C, this: &Value, args: &[Value]) -> Result<Value> {
        self.hook.on_call(&self.target, args.len());
        (self.native)(ctx, this, args)
    }
}

impl<C> Clone for PassThrough<C> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            native: self.native,
            hook: Arc::clone(&self.hook),
        }
    }
}

impl<C> fmt::Debug for PassThrough<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassThrough").field("target", &self.target).finish()
    }
}
