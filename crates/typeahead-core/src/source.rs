use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Result, TypeaheadError};
use crate::expr::eval::to_display;

/// A data source producing candidates for a typed query, e.g. a remote
/// lookup. Register one in a scope with
/// [`Scope::define_source`](crate::expr::Scope::define_source).
#[async_trait]
pub trait CandidateSource: Send + Sync {
    fn name(&self) -> &str;

    async fn candidates(&self, query: &str) -> Result<Vec<Value>>;
}

/// In-memory candidates filtered by case-insensitive substring, with an
/// optional artificial latency.
#[derive(Debug, Clone)]
pub struct StaticSource {
    name: String,
    items: Vec<Value>,
    field: Option<String>,
    latency: Duration,
    limit: Option<usize>,
}

impl StaticSource {
    pub fn new(name: impl Into<String>, items: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            items,
            field: None,
            latency: Duration::ZERO,
            limit: None,
        }
    }

    /// Load a JSON array of candidates.
    pub fn from_json(name: impl Into<String>, json: &str) -> Result<Self> {
        match serde_json::from_str(json)? {
            Value::Array(items) => Ok(Self::new(name, items)),
            other => Err(TypeaheadError::ConfigError(format!(
                "candidate data must be a JSON array, got {}",
                kind(&other)
            ))),
        }
    }

    /// Match only against this property of object items.
    pub fn search_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    fn haystack(&self, item: &Value) -> String {
        match (&self.field, item) {
            (Some(field), Value::Object(fields)) => {
                fields.get(field).map(to_display).unwrap_or_default()
            }
            _ => to_display(item),
        }
    }
}

#[async_trait]
impl CandidateSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn candidates(&self, query: &str) -> Result<Vec<Value>> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let needle = query.to_lowercase();
        let found = self
            .items
            .iter()
            .filter(|item| self.haystack(item).to_lowercase().contains(&needle))
            .take(self.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(found)
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
