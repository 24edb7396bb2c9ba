//! Fixtures shared by the widget tests.

use std::sync::{Arc, Mutex};

use serde_json::{Value, json};
use tokio::sync::oneshot;
use typeahead_core::{Result, Scope, TypeaheadConfig, TypeaheadError};

use crate::Typeahead;

pub fn states() -> Value {
    json!([
        {"name": "Nevada", "abbr": "NV"},
        {"name": "New York", "abbr": "NY"},
        {"name": "Ohio", "abbr": "OH"},
        {"name": "Oregon", "abbr": "OR"},
    ])
}

pub fn states_scope() -> Scope {
    Scope::new().with_value("states", states())
}

pub fn widget(config: TypeaheadConfig) -> Typeahead {
    widget_with(config, states_scope())
}

pub fn widget_with(config: TypeaheadConfig, scope: Scope) -> Typeahead {
    Typeahead::new(config, scope).unwrap()
}

/// A `lookup(query)` scope function whose calls stay pending until the
/// test settles them, in any order.
#[derive(Clone, Default)]
pub struct ManualSource {
    calls: Arc<Mutex<Vec<(String, oneshot::Sender<Result<Value>>)>>>,
    history: Arc<Mutex<Vec<String>>>,
}

impl ManualSource {
    pub fn install(&self, scope: &mut Scope) {
        let calls = Arc::clone(&self.calls);
        let history = Arc::clone(&self.history);
        scope.define_deferred("lookup", move |args| {
            let query = args.first().and_then(Value::as_str).unwrap_or_default().to_string();
            let (tx, rx) = oneshot::channel();
            history.lock().unwrap().push(query.clone());
            calls.lock().unwrap().push((query, tx));
            Box::pin(async move {
                rx.await
                    .unwrap_or_else(|_| Err(TypeaheadError::SourceRejected("dropped".into())))
            })
        });
    }

    /// Every query looked up so far, settled or not.
    pub fn queries(&self) -> Vec<String> {
        self.history.lock().unwrap().clone()
    }

    pub fn pending(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Settle the pending call for `query`.
    pub fn settle(&self, query: &str, result: Result<Value>) {
        let mut calls = self.calls.lock().unwrap();
        let position = calls.iter().position(|(q, _)| q == query).unwrap();
        let (_, tx) = calls.remove(position);
        let _ = tx.send(result);
    }
}

pub fn manual_widget(config: TypeaheadConfig) -> (Typeahead, ManualSource) {
    let source = ManualSource::default();
    let mut scope = states_scope();
    source.install(&mut scope);
    (widget_with(config, scope), source)
}
