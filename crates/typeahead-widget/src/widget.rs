use std::fmt;

use serde_json::Value;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, trace, warn};
use typeahead_core::{
    BehaviorConfig, MatchSpec, Result, Scope, TypeaheadConfig, TypeaheadError, to_display,
};

use crate::bridge::{Bindings, ModelUpdate};
use crate::event::{Scheduler, TimerHandle, WidgetEvent};
use crate::gate::{DebounceGate, GateDecision};
use crate::state::{InteractionState, Match};

/// Payload of the on-select notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub item: Value,
    pub model: Value,
    pub label: String,
}

pub type SelectCallback = Box<dyn FnMut(&Selection) + Send>;

/// One typeahead input: the match specification, the host scope it reads
/// candidates from and writes the model into, and the interaction state
/// machine driving the popup.
///
/// Everything runs on the owning task. Timers and deferred lookups come
/// back as [`WidgetEvent`]s; drive them with [`process_next`](Self::process_next)
/// or feed them to [`handle_event`](Self::handle_event).
pub struct Typeahead {
    pub(crate) spec: MatchSpec,
    pub(crate) behavior: BehaviorConfig,
    pub(crate) bindings: Bindings,
    pub(crate) scope: Scope,
    pub(crate) state: InteractionState,
    pub(crate) view_value: Option<String>,
    pub(crate) focused: bool,
    pub(crate) gate: DebounceGate,
    pub(crate) scheduler: Scheduler,
    events: UnboundedReceiver<WidgetEvent>,
    pub(crate) next_cycle: u64,
    pub(crate) in_flight: usize,
    blur_timer: Option<TimerHandle>,
    bypass_reopen: bool,
    pub(crate) force_open_changed: bool,
    on_select: Option<SelectCallback>,
}

impl Typeahead {
    /// Build a widget. Only a malformed match specification or an
    /// unassignable binding is fatal.
    pub fn new(config: TypeaheadConfig, scope: Scope) -> Result<Self> {
        let spec = MatchSpec::parse(&config.bindings.expression)?;
        let bindings = Bindings::compile(&config.bindings)?;
        let (scheduler, events) = Scheduler::new();
        let gate = DebounceGate::new(config.behavior.min_length, config.behavior.wait());

        let mut widget = Self {
            spec,
            behavior: config.behavior,
            bindings,
            scope,
            state: InteractionState::new(),
            view_value: None,
            focused: false,
            gate,
            scheduler,
            events,
            next_cycle: 0,
            in_flight: 0,
            blur_timer: None,
            bypass_reopen: false,
            force_open_changed: false,
            on_select: None,
        };
        widget.reset_matches();
        widget.view_value = widget.bindings.format(&widget.spec, &widget.scope);
        Ok(widget)
    }

    pub fn with_on_select<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&Selection) + Send + 'static,
    {
        self.on_select = Some(Box::new(callback));
        self
    }

    // ─── Accessors ────────────────────────────────────────

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn matches(&self) -> &[Match] {
        self.state.matches()
    }

    pub fn active_index(&self) -> Option<usize> {
        self.state.active_index()
    }

    pub fn query(&self) -> Option<&str> {
        self.state.query()
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open(self.view_value.as_deref())
    }

    pub fn view_value(&self) -> Option<&str> {
        self.view_value.as_deref()
    }

    /// Field text as rendered; an unset view is an empty field.
    pub fn display_text(&self) -> &str {
        self.view_value.as_deref().unwrap_or("")
    }

    pub fn model(&self) -> Value {
        self.bindings.model(&self.scope)
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn spec(&self) -> &MatchSpec {
        &self.spec
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Host access to the scope. Call [`sync_bindings`](Self::sync_bindings)
    /// or [`model_changed`](Self::model_changed) after writing bound values.
    pub fn scope_mut(&mut self) -> &mut Scope {
        &mut self.scope
    }

    /// No debounce timer pending and no lookup in flight.
    pub fn is_idle(&self) -> bool {
        !self.gate.is_pending() && self.in_flight == 0
    }

    // ─── Field Events ─────────────────────────────────────

    /// The user edited the field text.
    pub fn input(&mut self, text: impl Into<String>) {
        self.view_value = Some(text.into());
        let (update, decision) = self.on_view_value_changed();
        self.bindings.set_model(&mut self.scope, update.into_value());
        self.run(decision);
    }

    pub fn focus(&mut self) {
        self.focused = true;
        self.cancel_blur_clear();
        if !self.bypass_reopen {
            let (_, decision) = self.on_view_value_changed();
            self.run(decision);
        }
        self.bypass_reopen = false;
    }

    pub fn blur(&mut self) {
        self.focused = false;
        if !self.clears_on_blur() {
            return;
        }
        self.cancel_blur_clear();
        let timer = self
            .scheduler
            .after(self.behavior.blur_clear_delay(), |id| WidgetEvent::BlurElapsed { timer: id });
        self.blur_timer = Some(timer);
    }

    /// Host wrote the model directly; re-render the field text.
    pub fn model_changed(&mut self) {
        self.view_value = self.bindings.format(&self.spec, &self.scope);
    }

    // ─── Selection ────────────────────────────────────────

    /// Commit the match at `index`: write the model, show its label and
    /// close the popup.
    pub fn select(&mut self, index: usize) -> Result<Selection> {
        let item = self
            .state
            .matches()
            .get(index)
            .map(|m| m.item.clone())
            .ok_or(TypeaheadError::NoSuchMatch(index))?;
        let model = self.spec.model_of(&self.scope, &item)?;
        let label = to_display(&self.spec.label_of(&self.scope, &item)?);

        self.cancel_blur_clear();
        self.bindings.set_model(&mut self.scope, model.clone());
        self.view_value = Some(label.clone());
        debug!("typeahead: selected {:?}", label);

        let selection = Selection { item, model, label };
        if let Some(callback) = self.on_select.as_mut() {
            callback(&selection);
        }
        if let Some(deferred) = self.bindings.notify_select(
            &self.scope,
            &selection.item,
            &selection.model,
            &selection.label,
        ) {
            self.scheduler.detach("on-select", deferred);
        }
        self.reset_matches();
        Ok(selection)
    }

    /// Pointer selection from the popup. The field lost focus to the
    /// click, so the pending blur clear is dropped and focus comes back
    /// without reopening the list.
    pub fn select_clicked(&mut self, index: usize) -> Result<Selection> {
        self.cancel_blur_clear();
        self.scheduler.after(self.behavior.focus_restore_delay(), |id| {
            WidgetEvent::RestoreFocus {
                timer: id,
                bypass_reopen: true,
            }
        });
        self.select(index)
    }

    /// Pointer hover highlights an entry.
    pub fn hover(&mut self, index: usize) {
        if !self.state.set_active(index) {
            trace!("typeahead: hover outside the list ({})", index);
        }
    }

    // ─── Force Open ───────────────────────────────────────

    pub fn set_force_open(&mut self, open: bool) {
        if self.state.force_open == open {
            return;
        }
        self.state.force_open = open;
        self.bindings.set_force_open(&mut self.scope, open);
        self.force_open_transition(open);
    }

    /// Pick up host writes to the force-open binding.
    pub fn sync_bindings(&mut self) {
        let Some(open) = self.bindings.force_open(&self.scope) else {
            return;
        };
        if self.state.force_open != open {
            self.state.force_open = open;
            self.force_open_transition(open);
        }
    }

    fn force_open_transition(&mut self, open: bool) {
        if open {
            // Outside clicks are ignored until focus is back.
            self.force_open_changed = true;
            self.scheduler.after(self.behavior.focus_restore_delay(), |id| {
                WidgetEvent::RestoreFocus {
                    timer: id,
                    bypass_reopen: false,
                }
            });
        } else {
            self.reset_matches();
        }
    }

    // ─── Event Loop ───────────────────────────────────────

    pub fn handle_event(&mut self, event: WidgetEvent) {
        match event {
            WidgetEvent::DebounceElapsed { timer, text } => {
                if self.gate.fire(timer) {
                    self.resolve(text);
                } else {
                    trace!("typeahead: superseded debounce timer {}", timer);
                }
            }
            WidgetEvent::SourceSettled { cycle, input, result } => {
                self.settle(cycle, input, result);
            }
            WidgetEvent::BlurElapsed { timer } => {
                if self.blur_timer.as_ref().is_some_and(|t| t.id() == timer) {
                    self.blur_timer = None;
                    // A commit may have landed while the timer was queued.
                    if !self.clears_on_blur() {
                        return;
                    }
                    debug!("typeahead: clearing uncommitted text after blur");
                    self.view_value = None;
                }
            }
            WidgetEvent::RestoreFocus { bypass_reopen, .. } => {
                // Focusing an already focused field fires nothing.
                if !self.focused {
                    self.bypass_reopen = bypass_reopen;
                    self.focus();
                }
                if !bypass_reopen {
                    self.force_open_changed = false;
                }
            }
        }
    }

    /// Wait for the next timer or settlement and apply it.
    pub async fn process_next(&mut self) {
        if let Some(event) = self.events.recv().await {
            self.handle_event(event);
        }
    }

    /// Apply everything already delivered without waiting.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Process events until no lookup is pending or in flight.
    pub async fn run_until_idle(&mut self) {
        while !self.is_idle() {
            self.process_next().await;
        }
    }

    // ─── Internals ────────────────────────────────────────

    /// Parse direction of the binding bridge: gate the text and decide the
    /// model write. Callers that must not write the model drop the update.
    pub(crate) fn on_view_value_changed(&mut self) -> (ModelUpdate, GateDecision) {
        let text = self.view_value.clone().unwrap_or_default();
        let decision = self.gate.on_view_value_changed(&text, &mut self.scheduler);
        let update = if self.behavior.editable {
            ModelUpdate::Commit(text)
        } else {
            ModelUpdate::Clear
        };
        (update, decision)
    }

    fn run(&mut self, decision: GateDecision) {
        if let GateDecision::Immediate(text) = decision {
            self.resolve(text);
        }
    }

    /// Non-editable with nothing committed: leaving the field drops its text.
    fn clears_on_blur(&self) -> bool {
        !self.behavior.editable && self.model().is_null()
    }

    fn cancel_blur_clear(&mut self) {
        if let Some(timer) = self.blur_timer.take() {
            timer.cancel();
        }
    }

    pub(crate) fn reset_matches(&mut self) {
        self.state.reset();
        self.bindings.set_force_open(&mut self.scope, false);
    }

    pub(crate) fn set_loading(&mut self, loading: bool) {
        self.state.loading = loading;
        self.bindings.set_loading(&mut self.scope, loading);
    }

    pub(crate) fn clear_model(&mut self) {
        self.bindings.set_model(&mut self.scope, Value::Null);
    }

    pub(crate) fn notify_failure(&self, what: &str, error: &TypeaheadError) {
        warn!("typeahead: {} failed for {:?}: {}", what, self.spec.source().source(), error);
    }
}

impl fmt::Debug for Typeahead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Typeahead")
            .field("spec", &self.spec)
            .field("state", &self.state)
            .field("view_value", &self.view_value)
            .field("focused", &self.focused)
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crossterm::event::KeyCode;
    use serde_json::json;

    use super::*;
    use crate::testing::{states_scope, widget, widget_with};

    #[tokio::test]
    async fn test_malformed_spec_is_fatal() {
        let err = Typeahead::new(TypeaheadConfig::with_expression("just words"), Scope::new()).unwrap_err();
        assert!(matches!(err, TypeaheadError::MalformedSpec(_)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_initial_text_from_model() {
        let scope = states_scope().with_value("selected", json!({"name": "Ohio", "abbr": "OH"}));
        let ta = Typeahead::new(
            TypeaheadConfig::with_expression("s as s.name for s in states"),
            scope,
        )
        .unwrap();
        assert_eq!(ta.view_value(), Some("Ohio"));
        assert!(!ta.is_open());
    }

    #[tokio::test]
    async fn test_editable_input_commits_text() {
        let mut ta = widget(TypeaheadConfig::with_expression(
            "s.abbr as s.name for s in states | filter:$viewValue",
        ));
        ta.input("Ne");
        assert_eq!(ta.model(), json!("Ne"));
        let labels: Vec<_> = ta.matches().iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, ["Nevada", "New York"]);
        assert!(ta.is_open());
        assert_eq!(ta.active_index(), Some(0));
        assert_eq!(ta.query(), Some("Ne"));
    }

    #[tokio::test]
    async fn test_select_commits_and_closes() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let picked = Arc::new(Mutex::new(Vec::new()));
        let record = Arc::clone(&picked);
        let mut scope = states_scope();
        scope.define_fn("picked", move |args| {
            record.lock().unwrap().push(args.to_vec());
            Ok(Value::Null)
        });
        let mut ta = widget_with(
            TypeaheadConfig::with_expression("s.abbr as s.name for s in states | filter:$viewValue")
                .on_select("picked($model, $label, $item.name)"),
            scope,
        )
        .with_on_select(move |s| sink.lock().unwrap().push(s.clone()));

        ta.input("Ne");
        let selection = ta.select(1).unwrap();
        assert_eq!(selection.model, json!("NY"));
        assert_eq!(selection.label, "New York");
        assert_eq!(ta.model(), json!("NY"));
        assert_eq!(ta.view_value(), Some("New York"));
        assert!(ta.matches().is_empty());
        assert_eq!(ta.active_index(), None);
        assert!(!ta.is_open());
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(seen.lock().unwrap()[0].item["abbr"], "NY");
        assert_eq!(
            *picked.lock().unwrap(),
            vec![vec![json!("NY"), json!("New York"), json!("New York")]]
        );
    }

    #[tokio::test]
    async fn test_select_out_of_range() {
        let mut ta = widget(TypeaheadConfig::with_expression("s.name for s in states"));
        assert!(matches!(ta.select(0), Err(TypeaheadError::NoSuchMatch(0))));
    }

    #[tokio::test]
    async fn test_hover_moves_active() {
        let mut ta = widget(TypeaheadConfig::with_expression(
            "s.name for s in states | filter:$viewValue",
        ));
        ta.input("o");
        ta.hover(2);
        assert_eq!(ta.active_index(), Some(2));
        ta.hover(99);
        assert_eq!(ta.active_index(), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_editable_blur_clears_text() {
        let mut ta = widget(
            TypeaheadConfig::with_expression("s.abbr as s.name for s in states | filter:$viewValue")
                .editable(false),
        );
        ta.focus();
        ta.input("zzz");
        assert_eq!(ta.model(), Value::Null);
        assert_eq!(ta.view_value(), Some("zzz"));

        ta.blur();
        ta.process_next().await;
        assert_eq!(ta.view_value(), None);
        assert_eq!(ta.display_text(), "");
        assert_eq!(ta.model(), Value::Null);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refocus_and_commit_keeps_text_after_blur_delay() {
        let mut ta = widget(
            TypeaheadConfig::with_expression("s.abbr as s.name for s in states | filter:$viewValue")
                .editable(false),
        );
        ta.focus();
        ta.input("Ne");
        ta.blur();
        ta.focus();
        ta.key_down(KeyCode::Enter);
        assert_eq!(ta.model(), json!("NV"));

        tokio::time::sleep(Duration::from_millis(200)).await;
        ta.process_pending();
        assert_eq!(ta.model(), json!("NV"));
        assert_eq!(ta.view_value(), Some("Nevada"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_blur_clear_skipped_once_model_committed() {
        let mut ta = widget(
            TypeaheadConfig::with_expression("s.abbr as s.name for s in states | filter:$viewValue")
                .editable(false),
        );
        ta.input("Ne");
        ta.blur();
        tokio::time::sleep(Duration::from_millis(200)).await;

        // The host commits before the queued clear is applied.
        ta.scope_mut().set("selected", "NY");
        ta.process_pending();
        assert_eq!(ta.view_value(), Some("Ne"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deferred_on_select_runs() {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&fired);
        let mut scope = states_scope();
        scope.define_deferred("remember", move |args| {
            let sink = Arc::clone(&sink);
            let args = args.to_vec();
            Box::pin(async move {
                sink.lock().unwrap().extend(args);
                Ok(Value::Null)
            })
        });
        let mut ta = widget_with(
            TypeaheadConfig::with_expression("s.abbr as s.name for s in states | filter:$viewValue")
                .on_select("remember($model)"),
            scope,
        );
        ta.input("Ne");
        ta.select(0).unwrap();

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(*fired.lock().unwrap(), vec![json!("NV")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pointer_select_cancels_blur_and_skips_reopen() {
        let mut ta = widget(
            TypeaheadConfig::with_expression("s.abbr as s.name for s in states | filter:$viewValue")
                .editable(false),
        );
        ta.focus();
        ta.input("Ne");
        ta.blur();
        ta.select_clicked(0).unwrap();

        ta.process_next().await;
        assert!(ta.is_focused());
        assert_eq!(ta.view_value(), Some("Nevada"));
        assert_eq!(ta.model(), json!("NV"));
        // The restored focus did not reopen the list.
        assert!(ta.matches().is_empty());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(ta.process_pending(), 0);
        assert_eq!(ta.view_value(), Some("Nevada"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_focus_reopens() {
        let mut ta = widget(TypeaheadConfig::with_expression(
            "s.name for s in states | filter:$viewValue",
        ));
        ta.input("Ne");
        ta.select(0).unwrap();
        ta.input("New");
        ta.blur();
        ta.focus();
        assert_eq!(ta.matches().len(), 1);
        assert!(ta.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_open_shows_all_and_survives_outside_click() {
        let mut ta = widget(
            TypeaheadConfig::with_expression("s.name for s in states")
                .min_length(0)
                .force_open("ui.open"),
        );
        ta.set_force_open(true);
        assert_eq!(ta.scope().get("ui"), Some(&json!({"open": true})));

        // The click that toggled force-open must not close it.
        ta.pointer_down(crate::PointerTarget::Outside);
        ta.process_next().await;
        assert!(ta.is_focused());
        assert_eq!(ta.matches().len(), 4);
        assert!(ta.is_open());

        ta.pointer_down(crate::PointerTarget::Outside);
        assert!(!ta.is_open());
        assert!(!ta.state().force_open());
        assert_eq!(ta.scope().get("ui"), Some(&json!({"open": false})));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_bindings_reads_host_force_open() {
        let mut ta = widget(
            TypeaheadConfig::with_expression("s.name for s in states")
                .min_length(0)
                .force_open("open"),
        );
        ta.scope_mut().set("open", true);
        ta.sync_bindings();
        assert!(ta.state().force_open());
        ta.process_next().await;
        assert!(ta.is_open());

        ta.scope_mut().set("open", false);
        ta.sync_bindings();
        assert!(ta.matches().is_empty());
    }

    #[tokio::test]
    async fn test_model_changed_reformats() {
        let mut ta = widget(TypeaheadConfig::with_expression("s as s.name for s in states"));
        ta.scope_mut().set("selected", json!({"name": "Texas"}));
        ta.model_changed();
        assert_eq!(ta.view_value(), Some("Texas"));
    }
}
