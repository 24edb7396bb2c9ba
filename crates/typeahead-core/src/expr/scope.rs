use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::source::CandidateSource;

/// Extra bindings layered over a scope for one evaluation
/// (`$viewValue`, the item variable, `$model`, ...).
pub type Locals = Map<String, Value>;

/// A value that settles later, e.g. a remote lookup.
pub type Deferred = BoxFuture<'static, Result<Value>>;

/// Result of calling a scope function.
pub enum Completion {
    Ready(Value),
    Deferred(Deferred),
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

pub type Function = Arc<dyn Fn(&[Value]) -> Result<Completion> + Send + Sync>;
pub type FilterFn = Arc<dyn Fn(&Value, &[Value]) -> Result<Value> + Send + Sync>;

/// The host-side environment expressions are evaluated against: plain
/// values plus callable functions and filters.
#[derive(Clone, Default)]
pub struct Scope {
    values: Map<String, Value>,
    functions: HashMap<String, Function>,
    filters: HashMap<String, FilterFn>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style value binding.
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.values
    }

    /// Register a synchronous function.
    pub fn define_fn<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.functions
            .insert(name.into(), Arc::new(move |args| f(args).map(Completion::Ready)));
    }

    /// Register a function whose result settles asynchronously.
    pub fn define_deferred<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&[Value]) -> Deferred + Send + Sync + 'static,
    {
        self.functions
            .insert(name.into(), Arc::new(move |args| Ok(Completion::Deferred(f(args)))));
    }

    /// Expose a candidate source as `name(query)`.
    pub fn define_source(&mut self, name: impl Into<String>, source: Arc<dyn CandidateSource>) {
        self.define_deferred(name, move |args| {
            let source = Arc::clone(&source);
            let query = args.first().map(super::eval::to_display).unwrap_or_default();
            Box::pin(async move { source.candidates(&query).await.map(Value::Array) })
        });
    }

    pub fn define_filter<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&Value, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.filters.insert(name.into(), Arc::new(f));
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn filter(&self, name: &str) -> Option<&FilterFn> {
        self.filters.get(name)
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut functions: Vec<_> = self.functions.keys().collect();
        functions.sort();
        let mut filters: Vec<_> = self.filters.keys().collect();
        filters.sort();
        f.debug_struct("Scope")
            .field("values", &self.values)
            .field("functions", &functions)
            .field("filters", &filters)
            .finish()
    }
}
