//! Expression language used by match specifications and bindings.
//!
//! ```text
//! state.name                    → member access
//! state.name + ' (' + s.abbr + ')'
//! states | filter:$viewValue | limitTo:8
//! lookup($viewValue)            → may settle later
//! ```

pub mod eval;
pub mod filters;
pub mod lexer;
pub mod parser;
pub mod scope;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;
use eval::Env;
use parser::Expr;
pub use scope::{Completion, Deferred, Locals, Scope};

/// A compiled expression: evaluate it against a scope plus locals, or
/// assign through it when it names a location.
#[derive(Clone)]
pub struct Accessor {
    source: Arc<str>,
    expr: Arc<Expr>,
}

impl Accessor {
    pub fn compile(source: &str) -> Result<Self> {
        let expr = parser::parse(source)?;
        Ok(Self {
            source: Arc::from(source.trim()),
            expr: Arc::new(expr),
        })
    }

    /// Expression text as written.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn evaluate(&self, scope: &Scope, locals: &Locals) -> Result<Value> {
        eval::evaluate(&self.expr, &self.env(scope, locals))
    }

    /// Like [`evaluate`](Self::evaluate) but lets a top-level call hand back
    /// a deferred value instead of failing.
    pub fn evaluate_deferred(&self, scope: &Scope, locals: &Locals) -> Result<Completion> {
        eval::evaluate_root(&self.expr, &self.env(scope, locals))
    }

    pub fn is_assignable(&self) -> bool {
        eval::is_assignable(&self.expr)
    }

    pub fn assign(&self, scope: &mut Scope, value: Value) -> Result<()> {
        eval::assign(&self.expr, scope, value, &self.source)
    }

    fn env<'a>(&'a self, scope: &'a Scope, locals: &'a Locals) -> Env<'a> {
        Env {
            scope,
            locals,
            source: &self.source,
        }
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Accessor").field(&self.source).finish()
    }
}

impl PartialEq for Accessor {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}
