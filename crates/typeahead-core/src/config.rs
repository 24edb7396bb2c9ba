use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TypeaheadError};

/// Widget configuration, loaded from `~/.config/typeahead/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeaheadConfig {
    pub behavior: BehaviorConfig,
    pub bindings: BindingConfig,
}

/// Timing and gating options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Characters required before a lookup runs.
    pub min_length: usize,
    /// Debounce wait after the last keystroke; 0 looks up immediately.
    pub wait_ms: u64,
    /// When false the model only ever holds values picked from the list.
    pub editable: bool,
    pub blur_clear_delay_ms: u64,
    pub focus_restore_delay_ms: u64,
}

/// Expressions binding the widget to the host scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingConfig {
    /// `_model_ (as _label_)? for _item_ in _source_`
    pub expression: String,
    /// Assignable expression holding the committed model.
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loading: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_open: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_select: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_formatter: Option<String>,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            min_length: 1,
            wait_ms: 0,
            editable: true,
            blur_clear_delay_ms: 100,
            focus_restore_delay_ms: 100,
        }
    }
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            expression: String::new(),
            model: "selected".to_string(),
            loading: None,
            force_open: None,
            on_select: None,
            input_formatter: None,
        }
    }
}

impl BehaviorConfig {
    pub fn wait(&self) -> Duration {
        Duration::from_millis(self.wait_ms)
    }

    pub fn blur_clear_delay(&self) -> Duration {
        Duration::from_millis(self.blur_clear_delay_ms)
    }

    pub fn focus_restore_delay(&self) -> Duration {
        Duration::from_millis(self.focus_restore_delay_ms)
    }
}

// ─── Builders ──────────────────────────────────────────────

impl TypeaheadConfig {
    /// Config for the given match expression with default behavior.
    pub fn with_expression(expression: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.bindings.expression = expression.into();
        config
    }

    pub fn min_length(mut self, min_length: usize) -> Self {
        self.behavior.min_length = min_length;
        self
    }

    pub fn wait_ms(mut self, wait_ms: u64) -> Self {
        self.behavior.wait_ms = wait_ms;
        self
    }

    pub fn editable(mut self, editable: bool) -> Self {
        self.behavior.editable = editable;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.bindings.model = model.into();
        self
    }

    pub fn loading(mut self, loading: impl Into<String>) -> Self {
        self.bindings.loading = Some(loading.into());
        self
    }

    pub fn force_open(mut self, force_open: impl Into<String>) -> Self {
        self.bindings.force_open = Some(force_open.into());
        self
    }

    pub fn on_select(mut self, on_select: impl Into<String>) -> Self {
        self.bindings.on_select = Some(on_select.into());
        self
    }

    pub fn input_formatter(mut self, formatter: impl Into<String>) -> Self {
        self.bindings.input_formatter = Some(formatter.into());
        self
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl TypeaheadConfig {
    /// Standard config file path: `~/.config/typeahead/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("TYPEAHEAD_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("typeahead")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        Self::load_from(&path)
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    /// Reject configs that cannot drive a widget.
    pub fn validate(&self) -> Result<()> {
        if self.bindings.expression.trim().is_empty() {
            return Err(TypeaheadError::ConfigError(
                "bindings.expression must not be empty".to_string(),
            ));
        }
        if self.bindings.model.trim().is_empty() {
            return Err(TypeaheadError::ConfigError(
                "bindings.model must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let cfg = TypeaheadConfig::default();
        assert_eq!(cfg.behavior.min_length, 1);
        assert_eq!(cfg.behavior.wait_ms, 0);
        assert!(cfg.behavior.editable);
        assert_eq!(cfg.bindings.model, "selected");
        assert!(cfg.bindings.force_open.is_none());
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let cfg = TypeaheadConfig::with_expression("s for s in states")
            .wait_ms(250)
            .editable(false)
            .loading("isLoading");
        cfg.save_to(&path).unwrap();

        let loaded = TypeaheadConfig::load_from(&path).unwrap();
        assert_eq!(loaded.bindings.expression, "s for s in states");
        assert_eq!(loaded.behavior.wait_ms, 250);
        assert!(!loaded.behavior.editable);
        assert_eq!(loaded.bindings.loading.as_deref(), Some("isLoading"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg: TypeaheadConfig = toml::from_str(
            r#"
            [behavior]
            wait_ms = 300

            [bindings]
            expression = "c for c in colors"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.behavior.wait_ms, 300);
        assert_eq!(cfg.behavior.min_length, 1);
        assert_eq!(cfg.behavior.blur_clear_delay_ms, 100);
        assert_eq!(cfg.bindings.model, "selected");
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let cfg = TypeaheadConfig::load_from(Path::new("/tmp/nonexistent_typeahead_config.toml")).unwrap();
        assert_eq!(cfg.behavior.min_length, 1);
    }

    #[test]
    fn test_validate_requires_expression() {
        assert!(TypeaheadConfig::default().validate().is_err());
        assert!(TypeaheadConfig::with_expression("c for c in colors").validate().is_ok());
    }
}
