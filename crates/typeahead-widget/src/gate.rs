use std::time::Duration;

use crate::event::{Scheduler, TimerHandle, WidgetEvent};

/// What the gate decided for one view-value change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Shorter than the minimum length; nothing happens.
    Skip,
    /// No debounce configured; resolve right away.
    Immediate(String),
    /// A lookup is scheduled after the wait, replacing any earlier one.
    Scheduled { timer: u64 },
}

/// Minimum-length check plus trailing-edge debounce. At most one lookup
/// timer is pending; a new keystroke cancels the previous one.
#[derive(Debug)]
pub(crate) struct DebounceGate {
    min_length: usize,
    wait: Duration,
    pending: Option<TimerHandle>,
}

impl DebounceGate {
    pub fn new(min_length: usize, wait: Duration) -> Self {
        Self {
            min_length,
            wait,
            pending: None,
        }
    }

    pub fn on_view_value_changed(&mut self, text: &str, scheduler: &mut Scheduler) -> GateDecision {
        // A short text leaves an already scheduled lookup alone; its result
        // is discarded as stale when it lands.
        if text.chars().count() < self.min_length {
            return GateDecision::Skip;
        }
        if self.wait.is_zero() {
            return GateDecision::Immediate(text.to_string());
        }

        self.cancel();
        let text = text.to_string();
        let timer = scheduler.after(self.wait, move |id| WidgetEvent::DebounceElapsed { timer: id, text });
        let id = timer.id();
        self.pending = Some(timer);
        GateDecision::Scheduled { timer: id }
    }

    /// Claim an elapsed timer. False when it was superseded.
    pub fn fire(&mut self, timer: u64) -> bool {
        match &self.pending {
            Some(pending) if pending.id() == timer => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
