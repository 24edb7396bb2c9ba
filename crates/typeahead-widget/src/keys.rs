use crossterm::event::KeyCode;
use tracing::trace;

use crate::widget::Typeahead;

/// Keys the popup reacts to; everything else passes through.
const HOT_KEYS: [KeyCode; 5] = [
    KeyCode::Tab,
    KeyCode::Enter,
    KeyCode::Esc,
    KeyCode::Up,
    KeyCode::Down,
];

/// What the host should do with a key after the widget saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyOutcome {
    /// The widget acted on the key.
    pub handled: bool,
    /// Suppress the key's default action (Enter submitting a form).
    pub prevent_default: bool,
    /// Do not let the key reach outer handlers (Esc closing a dialog).
    pub stop_propagation: bool,
}

impl KeyOutcome {
    fn ignored() -> Self {
        Self::default()
    }

    fn handled() -> Self {
        Self {
            handled: true,
            ..Self::default()
        }
    }
}

/// Where a pointer press landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    Input,
    Outside,
}

impl Typeahead {
    pub fn key_down(&mut self, code: KeyCode) -> KeyOutcome {
        if !self.is_open() || !HOT_KEYS.contains(&code) {
            if self.state.force_open {
                self.state.force_open = false;
                self.bindings.set_force_open(&mut self.scope, false);
            }
            return KeyOutcome::ignored();
        }
        trace!("typeahead: key {:?} at {:?}", code, self.state.active_index());

        match code {
            KeyCode::Down => {
                self.state.move_down();
                KeyOutcome::handled()
            }
            KeyCode::Up => {
                self.state.move_up();
                KeyOutcome::handled()
            }
            KeyCode::Enter | KeyCode::Tab => {
                if let Some(index) = self.state.active_index() {
                    if let Err(e) = self.select(index) {
                        self.notify_failure("select", &e);
                    }
                }
                KeyOutcome {
                    prevent_default: code == KeyCode::Enter,
                    ..KeyOutcome::handled()
                }
            }
            KeyCode::Esc => {
                self.reset_matches();
                KeyOutcome {
                    stop_propagation: true,
                    ..KeyOutcome::handled()
                }
            }
            _ => KeyOutcome::ignored(),
        }
    }

    /// Global pointer press. A press outside the field closes the list,
    /// except right after force-open was switched on by that same press.
    pub fn pointer_down(&mut self, target: PointerTarget) {
        if target == PointerTarget::Outside && !self.force_open_changed {
            self.reset_matches();
        }
    }
}
