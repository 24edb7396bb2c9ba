//! Typeahead core: expression language, match specifications,
//! highlighting and configuration.

pub mod config;
pub mod error;
pub mod expr;
pub mod highlight;
pub mod match_spec;
pub mod source;

pub use config::{BehaviorConfig, BindingConfig, TypeaheadConfig};
pub use error::{Result, TypeaheadError};
pub use expr::{Accessor, Completion, Deferred, Locals, Scope};
pub use expr::eval::to_display;
pub use highlight::{TrustedHtml, highlight, trust_html};
pub use match_spec::MatchSpec;
pub use source::{CandidateSource, StaticSource};
