//! Typeahead widget: debounce gate, lookup race arbitration and the
//! popup interaction state machine over a host [`Scope`](typeahead_core::Scope).

pub mod bridge;
pub mod event;
pub mod gate;
pub mod keys;
pub mod resolve;
pub mod state;
pub mod widget;

#[cfg(test)]
pub(crate) mod testing;

pub use bridge::ModelUpdate;
pub use event::WidgetEvent;
pub use gate::GateDecision;
pub use keys::{KeyOutcome, PointerTarget};
pub use resolve::Resolution;
pub use state::{InteractionState, Match};
pub use widget::{SelectCallback, Selection, Typeahead};
