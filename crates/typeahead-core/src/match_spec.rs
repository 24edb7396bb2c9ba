/// Match specification parser.
///
/// Supports the following syntax:
/// ```text
/// state for state in states                              → model and label are the item
/// state.abbr as state.name for state in states           → separate model and label
/// c as c.name for c in colors | filter:$viewValue        → filtered source
/// addr.formatted for addr in lookup($viewValue)          → deferred source
/// ```
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::{Result, TypeaheadError};
use crate::expr::{Accessor, Completion, Locals, Scope};

static MATCH_SPEC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(.*?)(?:\s+as\s+(.*?))?\s+for\s+([$A-Za-z_][$A-Za-z0-9_]*)\s+in\s+(.*?)\s*$")
        .expect("valid regex")
});

/// Compiled `model (as label)? for item in source` specification.
#[derive(Debug, Clone)]
pub struct MatchSpec {
    item_name: String,
    source: Accessor,
    label: Accessor,
    model: Accessor,
}

impl MatchSpec {
    pub fn parse(input: &str) -> Result<Self> {
        let caps = MATCH_SPEC_RE
            .captures(input)
            .ok_or_else(|| TypeaheadError::MalformedSpec(input.to_string()))?;

        let model_src = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        if model_src.trim().is_empty() {
            return Err(TypeaheadError::MalformedSpec(input.to_string()));
        }
        let model = Accessor::compile(model_src)?;
        let label = match caps.get(2) {
            Some(label) => Accessor::compile(label.as_str())?,
            None => model.clone(),
        };
        let source = Accessor::compile(caps.get(4).map(|m| m.as_str()).unwrap_or_default())?;

        Ok(Self {
            item_name: caps[3].to_string(),
            source,
            label,
            model,
        })
    }

    pub fn item_name(&self) -> &str {
        &self.item_name
    }

    pub fn source(&self) -> &Accessor {
        &self.source
    }

    pub fn label(&self) -> &Accessor {
        &self.label
    }

    pub fn model(&self) -> &Accessor {
        &self.model
    }

    /// Evaluate the source with `$viewValue` bound to the typed text.
    pub fn candidates(&self, scope: &Scope, view_value: &str) -> Result<Completion> {
        let mut locals = Locals::new();
        locals.insert("$viewValue".to_string(), Value::String(view_value.to_string()));
        self.source.evaluate_deferred(scope, &locals)
    }

    /// Locals binding the item variable to `item`.
    pub fn item_locals(&self, item: Value) -> Locals {
        let mut locals = Locals::new();
        locals.insert(self.item_name.clone(), item);
        locals
    }

    pub fn label_of(&self, scope: &Scope, item: &Value) -> Result<Value> {
        self.label.evaluate(scope, &self.item_locals(item.clone()))
    }

    pub fn model_of(&self, scope: &Scope, item: &Value) -> Result<Value> {
        self.model.evaluate(scope, &self.item_locals(item.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_full_form() {
        let spec = MatchSpec::parse("color as color.name for color in colors | filter:$viewValue").unwrap();
        assert_eq!(spec.item_name(), "color");
        assert_eq!(spec.model().source(), "color");
        assert_eq!(spec.label().source(), "color.name");
        assert_eq!(spec.source().source(), "colors | filter:$viewValue");
    }

    #[test]
    fn test_label_defaults_to_model() {
        let spec = MatchSpec::parse("state for state in states").unwrap();
        assert_eq!(spec.label(), spec.model());
        assert_eq!(spec.source().source(), "states");
    }

    #[test]
    fn test_parse_evaluates_sub_expressions() {
        let spec = MatchSpec::parse("color as color.name for color in colors | filter:$viewValue").unwrap();
        let scope = Scope::new().with_value(
            "colors",
            json!([{"name": "black"}, {"name": "white"}, {"name": "blue"}]),
        );

        let Completion::Ready(found) = spec.candidates(&scope, "bl").unwrap() else {
            panic!("expected ready source");
        };
        assert_eq!(found, json!([{"name": "black"}, {"name": "blue"}]));

        let item = json!({"name": "black"});
        assert_eq!(spec.label_of(&scope, &item).unwrap(), json!("black"));
        assert_eq!(spec.model_of(&scope, &item).unwrap(), item);
    }

    #[test]
    fn test_surrounding_whitespace_ignored() {
        let spec = MatchSpec::parse("  s.id as s.name   for   s   in   states  ").unwrap();
        assert_eq!(spec.item_name(), "s");
        assert_eq!(spec.source().source(), "states");
    }

    #[test]
    fn test_dollar_and_underscore_item_names() {
        assert_eq!(MatchSpec::parse("$x for $x in xs").unwrap().item_name(), "$x");
        assert_eq!(MatchSpec::parse("_a1 for _a1 in xs").unwrap().item_name(), "_a1");
    }

    #[test]
    fn test_malformed_spec() {
        let err = MatchSpec::parse("foo bar baz").unwrap_err();
        assert!(matches!(err, TypeaheadError::MalformedSpec(ref s) if s == "foo bar baz"));
        assert!(err.to_string().contains("but got 'foo bar baz'"));
    }

    #[test]
    fn test_item_name_cannot_start_with_digit() {
        assert!(matches!(
            MatchSpec::parse("x for 1x in xs"),
            Err(TypeaheadError::MalformedSpec(_))
        ));
    }

    #[test]
    fn test_non_ascii_item_name_is_malformed() {
        assert!(matches!(
            MatchSpec::parse("café.name for café in items"),
            Err(TypeaheadError::MalformedSpec(_))
        ));
    }

    #[test]
    fn test_bad_sub_expression_is_syntax_error() {
        assert!(matches!(
            MatchSpec::parse("x.( for x in xs"),
            Err(TypeaheadError::Syntax { .. })
        ));
    }
}
