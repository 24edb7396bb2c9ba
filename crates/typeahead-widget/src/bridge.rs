use serde_json::Value;
use tracing::warn;
use typeahead_core::{
    Accessor, BindingConfig, Completion, Deferred, Locals, MatchSpec, Result, Scope,
    TypeaheadError, to_display,
};
use typeahead_core::expr::eval::truthy;

/// Model write requested by a user edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelUpdate {
    /// Editable widget: the typed text becomes the model.
    Commit(String),
    /// Non-editable widget: typing never commits, the model is cleared.
    Clear,
}

impl ModelUpdate {
    pub fn into_value(self) -> Value {
        match self {
            Self::Commit(text) => Value::String(text),
            Self::Clear => Value::Null,
        }
    }
}

/// Compiled scope bindings the widget reads and writes.
#[derive(Debug, Clone)]
pub(crate) struct Bindings {
    model: Accessor,
    loading: Option<Accessor>,
    force_open: Option<Accessor>,
    on_select: Option<Accessor>,
    input_formatter: Option<Accessor>,
}

impl Bindings {
    pub fn compile(config: &BindingConfig) -> Result<Self> {
        let model = assignable(&config.model)?;
        let loading = config.loading.as_deref().map(assignable).transpose()?;
        let force_open = config.force_open.as_deref().map(assignable).transpose()?;
        let on_select = config.on_select.as_deref().map(Accessor::compile).transpose()?;
        let input_formatter = config
            .input_formatter
            .as_deref()
            .map(Accessor::compile)
            .transpose()?;
        Ok(Self {
            model,
            loading,
            force_open,
            on_select,
            input_formatter,
        })
    }

    pub fn model(&self, scope: &Scope) -> Value {
        self.model.evaluate(scope, &Locals::new()).unwrap_or_else(|e| {
            warn!("typeahead: reading model {:?} failed: {}", self.model.source(), e);
            Value::Null
        })
    }

    pub fn set_model(&self, scope: &mut Scope, value: Value) {
        write(&self.model, scope, value);
    }

    pub fn set_loading(&self, scope: &mut Scope, loading: bool) {
        if let Some(binding) = &self.loading {
            write(binding, scope, Value::Bool(loading));
        }
    }

    pub fn set_force_open(&self, scope: &mut Scope, open: bool) {
        if let Some(binding) = &self.force_open {
            write(binding, scope, Value::Bool(open));
        }
    }

    /// Current value of the force-open binding, if one is configured.
    pub fn force_open(&self, scope: &Scope) -> Option<bool> {
        let binding = self.force_open.as_ref()?;
        match binding.evaluate(scope, &Locals::new()) {
            Ok(value) => Some(truthy(&value)),
            Err(e) => {
                warn!("typeahead: reading force-open {:?} failed: {}", binding.source(), e);
                None
            }
        }
    }

    /// Evaluate the on-select expression. A deferred result is handed back
    /// for the caller to drive.
    pub fn notify_select(
        &self,
        scope: &Scope,
        item: &Value,
        model: &Value,
        label: &str,
    ) -> Option<Deferred> {
        let callback = self.on_select.as_ref()?;
        let mut locals = Locals::new();
        locals.insert("$item".to_string(), item.clone());
        locals.insert("$model".to_string(), model.clone());
        locals.insert("$label".to_string(), Value::String(label.to_string()));
        match callback.evaluate_deferred(scope, &locals) {
            Ok(Completion::Ready(_)) => None,
            Ok(Completion::Deferred(deferred)) => Some(deferred),
            Err(e) => {
                warn!("typeahead: on-select {:?} failed: {}", callback.source(), e);
                None
            }
        }
    }

    /// Render the model as field text. `None` means an empty field.
    pub fn format(&self, spec: &MatchSpec, scope: &Scope) -> Option<String> {
        let model = self.model(scope);
        let formatted = match self.format_value(spec, scope, &model) {
            Ok(value) => value,
            Err(e) => {
                warn!("typeahead: formatting model failed: {}", e);
                model
            }
        };
        match formatted {
            Value::Null => None,
            value => Some(to_display(&value)),
        }
    }

    fn format_value(&self, spec: &MatchSpec, scope: &Scope, model: &Value) -> Result<Value> {
        if let Some(formatter) = &self.input_formatter {
            let mut locals = Locals::new();
            locals.insert("$model".to_string(), model.clone());
            return formatter.evaluate(scope, &locals);
        }

        let candidate = spec.label_of(scope, model)?;
        let empty = spec.label_of(scope, &Value::Null)?;
        if candidate != empty {
            Ok(candidate)
        } else {
            Ok(model.clone())
        }
    }
}

fn assignable(source: &str) -> Result<Accessor> {
    let accessor = Accessor::compile(source)?;
    if accessor.is_assignable() {
        Ok(accessor)
    } else {
        Err(TypeaheadError::NotAssignable(source.to_string()))
    }
}

fn write(binding: &Accessor, scope: &mut Scope, value: Value) {
    if let Err(e) = binding.assign(scope, value) {
        warn!("typeahead: writing {:?} failed: {}", binding.source(), e);
    }
}
