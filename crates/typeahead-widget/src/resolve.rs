//! Match resolution: run the source for one lookup cycle and apply its
//! settlement if it is still current.

use serde_json::Value;
use tracing::{debug, warn};
use typeahead_core::expr::eval::strict_eq;
use typeahead_core::{Completion, Result, to_display};

use crate::state::Match;
use crate::widget::Typeahead;

/// What a settlement did to the interaction state.
///
/// Every outcome, `Stale` included, retires its cycle. `loading` stays set
/// while any other cycle is still outstanding and clears with the last one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Still awaiting a deferred source.
    Pending,
    /// Matches replaced; `auto_selected` when the sole exact match was
    /// committed.
    Applied { count: usize, auto_selected: bool },
    /// No candidates; the list was reset.
    Empty,
    /// Source failed or a candidate could not be mapped; the list was reset.
    Rejected,
    /// The field text moved on; discarded without touching state.
    Stale,
}

impl Typeahead {
    /// Start a lookup cycle for `input`. Ready sources settle before this
    /// returns; deferred ones report back through the event channel.
    pub(crate) fn resolve(&mut self, input: String) -> Resolution {
        self.next_cycle += 1;
        let cycle = self.next_cycle;
        self.in_flight += 1;
        self.set_loading(true);
        debug!("typeahead: cycle {} looking up {:?}", cycle, input);

        match self.spec.candidates(&self.scope, &input) {
            Ok(Completion::Ready(value)) => self.settle(cycle, input, Ok(value)),
            Ok(Completion::Deferred(deferred)) => {
                self.scheduler.settle(cycle, input, deferred);
                Resolution::Pending
            }
            Err(e) => self.settle(cycle, input, Err(e)),
        }
    }

    /// Apply a settled lookup. Only the text that is current now decides
    /// whether it still matters, so late responses for older text are
    /// dropped regardless of arrival order.
    pub(crate) fn settle(&mut self, cycle: u64, input: String, result: Result<Value>) -> Resolution {
        let current = self.view_value.as_deref().unwrap_or("");
        let outcome = if input != current {
            debug!("typeahead: cycle {} for {:?} is stale (now {:?})", cycle, input, current);
            Resolution::Stale
        } else {
            match result {
                Ok(value) => self.apply(input, value),
                Err(e) => {
                    self.notify_failure("lookup", &e);
                    self.reset_matches();
                    Resolution::Rejected
                }
            }
        };

        self.in_flight = self.in_flight.saturating_sub(1);
        if self.in_flight == 0 {
            self.set_loading(false);
        }
        outcome
    }

    fn apply(&mut self, input: String, value: Value) -> Resolution {
        let items = match value {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => {
                warn!("typeahead: source returned {} instead of a list", other);
                Vec::new()
            }
        };

        if items.is_empty() {
            if !self.behavior.editable {
                self.clear_model();
            }
            self.reset_matches();
            return Resolution::Empty;
        }

        let mapped: Result<Vec<Match>> = items.into_iter().map(|item| self.to_match(item)).collect();
        let matches = match mapped {
            Ok(matches) => matches,
            Err(e) => {
                self.notify_failure("mapping candidates", &e);
                self.reset_matches();
                return Resolution::Rejected;
            }
        };

        let count = matches.len();
        let auto_select = matches!(
            matches.as_slice(),
            [only] if only.label == input && !strict_eq(&only.select_value, &self.model())
        );
        self.state.replace(matches);
        self.state.query = Some(input);

        if auto_select {
            if let Err(e) = self.select(0) {
                self.notify_failure("auto-select", &e);
            }
        }
        Resolution::Applied {
            count,
            auto_selected: auto_select,
        }
    }

    fn to_match(&self, item: Value) -> Result<Match> {
        let label = to_display(&self.spec.label_of(&self.scope, &item)?);
        let select_value = self.spec.model_of(&self.scope, &item)?;
        Ok(Match {
            label,
            select_value,
            item,
        })
    }
}
