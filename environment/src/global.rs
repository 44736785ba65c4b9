//! Restricted global environment
//!
//! The environment is constructed from scratch by [`EnvironmentBuilder`]:
//! only allow-listed bindings are inserted, every denied name is inserted as
//! [`Binding::Inert`], and nothing can be added or re-enabled once
//! [`EnvironmentBuilder::build`] has run.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;

use crate::adapter::{CallHook, NativeFn, PassThrough};
use crate::capability::{Capability, CapabilityTable, Family, DENIED_GLOBALS, JSON_METHODS};
use crate::error::{Result, ScriptError};
use crate::value::{len_i64, Value};
use crate::{json, numeric, sequence, text};

/// Member of a namespace object
pub enum Member<C> {
    /// Called as `namespace.method(args)`
    Method(PassThrough<C>),
    /// Read as `namespace.property`
    Property(PassThrough<C>),
}

/// Global object holding methods and properties, e.g. `storage` or `JSON`
pub struct Namespace<C> {
    name: String,
    members: BTreeMap<String, Member<C>>,
}

impl<C> Namespace<C> {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            members: BTreeMap::new(),
        }
    }

    /// Name the namespace is bound under
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up a member
    pub fn member(&self, name: &str) -> Option<&Member<C>> {
        self.members.get(name)
    }

    /// Member names in lexical order
    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }
}

/// What a global name resolves to
pub enum Binding<C> {
    /// Callable as `name(args)`
    Function(PassThrough<C>),
    /// Object with methods and properties
    Namespace(Namespace<C>),
    /// Present but unusable; every use is a capability violation
    Inert,
}

/// Method table of one prototype family
struct Prototype<C> {
    table: CapabilityTable,
    methods: BTreeMap<&'static str, PassThrough<C>>,
}

impl<C> Prototype<C> {
    fn build(
        table: CapabilityTable,
        primitive: fn(&str) -> Option<NativeFn<C>>,
        hook: &Arc<dyn CallHook>,
    ) -> Self {
        let family = table.family();
        let methods = table
            .allowed()
            .filter_map(|name| {
                let native = primitive(name)?;
                Some((name, PassThrough::new(family.qualify(name), native, Arc::clone(hook))))
            })
            .collect();
        Self { table, methods }
    }
}

/// The complete, immutable set of bindings contract code can reach
pub struct GlobalEnvironment<C> {
    globals: BTreeMap<String, Binding<C>>,
    prototypes: BTreeMap<Family, Prototype<C>>,
}

impl<C> GlobalEnvironment<C> {
    /// Resolves a global name
    pub fn global(&self, name: &str) -> Result<&Binding<C>> {
        self.globals
            .get(name)
            .ok_or_else(|| ScriptError::NotDefined(name.to_string()))
    }

    /// Returns true when `name` is bound to something other than an inert value
    pub fn is_usable(&self, name: &str) -> bool {
        matches!(
            self.globals.get(name),
            Some(Binding::Function(_) | Binding::Namespace(_))
        )
    }

    /// Global names in lexical order
    pub fn global_names(&self) -> impl Iterator<Item = &str> {
        self.globals.keys().map(String::as_str)
    }

    /// Capability table governing a prototype family
    pub fn capabilities(&self, family: Family) -> Option<&CapabilityTable> {
        self.prototypes.get(&family).map(|proto| &proto.table)
    }

    /// Calls a global function, e.g. `Decimal("1.5")`
    pub fn call(&self, ctx: &mut C, name: &str, args: &[Value]) -> Result<Value> {
        match self.global(name)? {
            Binding::Function(adapter) => adapter.call(ctx, &Value::Undefined, args),
            Binding::Namespace(_) | Binding::Inert => Err(ScriptError::NotCallable(name.to_string())),
        }
    }

    /// Calls a namespace method, e.g. `storage.put(key, value)`
    pub fn call_method(&self, ctx: &mut C, namespace: &str, method: &str, args: &[Value]) -> Result<Value> {
        let target = format!("{namespace}.{method}");
        match self.namespace(namespace)?.member(method) {
            Some(Member::Method(adapter)) => adapter.call(ctx, &Value::Undefined, args),
            Some(Member::Property(_)) | None => Err(ScriptError::NotCallable(target)),
        }
    }

    /// Reads a namespace property, e.g. `block.number`
    pub fn read(&self, ctx: &mut C, namespace: &str, property: &str) -> Result<Value> {
        match self.namespace(namespace)?.member(property) {
            Some(Member::Property(adapter)) => adapter.call(ctx, &Value::Undefined, &[]),
            Some(Member::Method(_)) | None => Ok(Value::Undefined),
        }
    }

    /// Calls a method on a value through its prototype, e.g. `"abc".slice(1)`
    ///
    /// Object receivers call the function stored under `method`.
    pub fn invoke(&self, ctx: &mut C, receiver: &Value, method: &str, args: &[Value]) -> Result<Value> {
        if let Value::Object(obj) = receiver {
            return match obj.get(method) {
                Some(Value::Function(callback)) => callback.call(args),
                _ => Err(ScriptError::NotCallable(format!("object.{method}"))),
            };
        }
        let family = receiver.family().ok_or_else(|| {
            ScriptError::Type(format!(
                "Cannot read properties of {} (reading '{method}')",
                receiver.type_name()
            ))
        })?;
        if family == Family::Sequence && method == "length" {
            return Err(ScriptError::NotCallable(family.qualify(method)));
        }
        let proto = self
            .prototypes
            .get(&family)
            .ok_or_else(|| ScriptError::NotCallable(family.qualify(method)))?;
        if let Some(adapter) = proto.methods.get(method) {
            return adapter.call(ctx, receiver, args);
        }
        match proto.table.capability(method) {
            Some(Capability::Denied | Capability::Allowed) => {
                Err(ScriptError::NotCallable(family.qualify(method)))
            }
            None => Err(ScriptError::NotDefined(family.qualify(method))),
        }
    }

    /// Reads a value's intrinsic property; only `length` exists
    pub fn property(&self, ctx: &mut C, receiver: &Value, name: &str) -> Result<Value> {
        match (receiver, name) {
            (Value::Sequence(seq), "length") => Ok(Value::Int(len_i64(seq.len()))),
            (Value::Text(_), "length") => self.invoke(ctx, receiver, name, &[]),
            (Value::Object(obj), _) => Ok(obj.get(name).unwrap_or_default()),
            _ => Ok(Value::Undefined),
        }
    }

    fn namespace(&self, name: &str) -> Result<&Namespace<C>> {
        match self.global(name)? {
            Binding::Namespace(ns) => Ok(ns),
            Binding::Function(_) | Binding::Inert => Err(ScriptError::NotCallable(name.to_string())),
        }
    }
}

/// Assembles a [`GlobalEnvironment`]
///
/// A new builder already holds the restricted prototypes, the `JSON`
/// namespace, the `String`/`Array`/`Decimal`/`Integer` constructors and every
/// denied global. Hosts add their bridge namespaces before calling `build`.
pub struct EnvironmentBuilder<C> {
    hook: Arc<dyn CallHook>,
    globals: BTreeMap<String, Binding<C>>,
    prototypes: BTreeMap<Family, Prototype<C>>,
}

impl<C> EnvironmentBuilder<C> {
    /// Creates a builder whose adapters report to `hook`
    pub fn new(hook: Arc<dyn CallHook>) -> Self {
        let mut builder = Self {
            hook,
            globals: BTreeMap::new(),
            prototypes: BTreeMap::new(),
        };
        builder.install_prototypes();
        builder.install_builtins();
        for name in DENIED_GLOBALS {
            builder.globals.insert((*name).to_string(), Binding::Inert);
        }
        builder
    }

    fn install_prototypes(&mut self) {
        let tables: [(CapabilityTable, fn(&str) -> Option<NativeFn<C>>); 4] = [
            (CapabilityTable::text(), text::native::<C>),
            (CapabilityTable::sequence(), sequence::native::<C>),
            (CapabilityTable::numeric(Family::Decimal), numeric::decimal::native::<C>),
            (CapabilityTable::numeric(Family::Integer), numeric::integer::native::<C>),
        ];
        for (table, primitive) in tables {
            let family = table.family();
            self.prototypes
                .insert(family, Prototype::build(table, primitive, &self.hook));
        }
    }

    fn install_builtins(&mut self) {
        let constructors: [(&str, NativeFn<C>); 4] = [
            ("String", text::construct::<C>),
            ("Array", sequence::construct::<C>),
            ("Decimal", numeric::construct_decimal::<C>),
            ("Integer", numeric::construct_integer::<C>),
        ];
        for (name, native) in constructors {
            let adapter = PassThrough::new(name, native, Arc::clone(&self.hook));
            self.globals.insert(name.to_string(), Binding::Function(adapter));
        }

        let mut namespace = Namespace::new("JSON");
        for name in JSON_METHODS {
            if let Some(native) = json::native::<C>(name) {
                let adapter = PassThrough::new(format!("JSON.{name}"), native, Arc::clone(&self.hook));
                namespace.members.insert((*name).to_string(), Member::Method(adapter));
            }
        }
        self.globals.insert("JSON".to_string(), Binding::Namespace(namespace));
    }

    /// Binds a global function
    pub fn register_function(&mut self, name: &str, native: NativeFn<C>) -> Result<()> {
        self.check_free(name)?;
        let adapter = PassThrough::new(name, native, Arc::clone(&self.hook));
        self.globals.insert(name.to_string(), Binding::Function(adapter));
        Ok(())
    }

    /// Adds a method to a namespace, creating the namespace on first use
    pub fn register_method(&mut self, namespace: &str, method: &str, native: NativeFn<C>) -> Result<()> {
        self.register_member(namespace, method, native, Member::Method)
    }

    /// Adds a read-only property to a namespace, creating the namespace on first use
    pub fn register_property(&mut self, namespace: &str, property: &str, native: NativeFn<C>) -> Result<()> {
        self.register_member(namespace, property, native, Member::Property)
    }

    fn register_member(
        &mut self,
        namespace: &str,
        name: &str,
        native: NativeFn<C>,
        kind: fn(PassThrough<C>) -> Member<C>,
    ) -> Result<()> {
        if !self.globals.contains_key(namespace) {
            self.check_free(namespace)?;
            self.globals
                .insert(namespace.to_string(), Binding::Namespace(Namespace::new(namespace)));
        }
        let target = format!("{namespace}.{name}");
        let Some(Binding::Namespace(ns)) = self.globals.get_mut(namespace) else {
            return Err(ScriptError::Registration(format!(
                "{namespace} is not a namespace"
            )));
        };
        if namespace == "JSON" || ns.members.contains_key(name) {
            return Err(ScriptError::Registration(format!("{target} is already bound")));
        }
        let adapter = PassThrough::new(target, native, Arc::clone(&self.hook));
        ns.members.insert(name.to_string(), kind(adapter));
        Ok(())
    }

    /// Denied and built-in names can never be rebound
    fn check_free(&self, name: &str) -> Result<()> {
        match self.globals.get(name) {
            Some(Binding::Inert) => Err(ScriptError::Registration(format!("{name} is denied"))),
            Some(_) => Err(ScriptError::Registration(format!("{name} is already bound"))),
            None => Ok(()),
        }
    }

    /// Freezes the bindings
    pub fn build(self) -> GlobalEnvironment<C> {
        debug!(
            "global environment built: {} globals, {} prototypes",
            self.globals.len(),
            self.prototypes.len()
        );
        GlobalEnvironment {
            globals: self.globals,
            prototypes: self.prototypes,
        }
    }
}

/// Contract's view of the environment during one invocation
///
/// The invocation context is only reachable through bridge bindings.
pub struct Scope<'a, C> {
    env: &'a GlobalEnvironment<C>,
    ctx: &'a mut C,
}

impl<'a, C> Scope<'a, C> {
    /// Pairs an environment with the context of the current invocation
    pub fn new(env: &'a GlobalEnvironment<C>, ctx: &'a mut C) -> Self {
        Self { env, ctx }
    }

    /// The environment this scope resolves names in
    pub fn environment(&self) -> &GlobalEnvironment<C> {
        self.env
    }

    /// `name(args)`
    pub fn call(&mut self, name: &str, args: &[Value]) -> Result<Value> {
        self.env.call(self.ctx, name, args)
    }

    /// `namespace.method(args)`
    pub fn call_method(&mut self, namespace: &str, method: &str, args: &[Value]) -> Result<Value> {
        self.env.call_method(self.ctx, namespace, method, args)
    }

    /// `namespace.property`
    pub fn read(&mut self, namespace: &str, property: &str) -> Result<Value> {
        self.env.read(self.ctx, namespace, property)
    }

    /// `receiver.method(args)`
    pub fn invoke(&mut self, receiver: &Value, method: &str, args: &[Value]) -> Result<Value> {
        self.env.invoke(self.ctx, receiver, method, args)
    }

    /// `receiver.name`
    pub fn property(&mut self, receiver: &Value, name: &str) -> Result<Value> {
        self.env.property(self.ctx, receiver, name)
    }

    /// `Decimal(text)`
    pub fn decimal(&mut self, text: &str) -> Result<Value> {
        self.call("Decimal", &[Value::from(text)])
    }

    /// `Integer(text)`
    pub fn integer(&mut self, text: &str) -> Result<Value> {
        self.call("Integer", &[Value::from(text)])
    }
}
