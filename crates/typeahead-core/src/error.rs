use thiserror::Error;

/// All errors that can occur in typeahead-core.
#[derive(Debug, Error)]
pub enum TypeaheadError {
    #[error(
        "Expected typeahead specification in form of '_modelValue_ (as _label_)? for _item_ in _collection_' but got '{0}'."
    )]
    MalformedSpec(String),

    #[error("Syntax error in expression '{expr}' at column {column}: {message}")]
    Syntax {
        expr: String,
        column: usize,
        message: String,
    },

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Unknown filter: {0}")]
    UnknownFilter(String),

    #[error("Expression is not assignable: {0}")]
    NotAssignable(String),

    #[error("Type error: {0}")]
    Type(String),

    #[error("Deferred value used inside expression '{0}'")]
    UnexpectedDeferred(String),

    #[error("Data source rejected the lookup: {0}")]
    SourceRejected(String),

    #[error("No match at index {0}")]
    NoSuchMatch(usize),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl TypeaheadError {
    /// Only a malformed match specification stops a widget from working;
    /// everything else is recovered locally.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::MalformedSpec(_) | Self::Syntax { .. })
    }
}

pub type Result<T> = std::result::Result<T, TypeaheadError>;
