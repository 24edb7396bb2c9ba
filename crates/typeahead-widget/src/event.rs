use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::warn;
use typeahead_core::{Deferred, Result};

/// Asynchronous completions fed back into the widget. Everything that
/// settles later (timers, deferred lookups) arrives as one of these and is
/// applied by [`Typeahead::handle_event`](crate::Typeahead::handle_event)
/// on the owning task.
#[derive(Debug)]
pub enum WidgetEvent {
    /// The debounce wait after the last keystroke elapsed.
    DebounceElapsed { timer: u64, text: String },
    /// A deferred lookup settled.
    SourceSettled {
        cycle: u64,
        input: String,
        result: Result<Value>,
    },
    /// The delayed clear after a non-editable blur is due.
    BlurElapsed { timer: u64 },
    /// Focus should return to the input.
    RestoreFocus { timer: u64, bypass_reopen: bool },
}

/// A scheduled timer; cancelling aborts the sleeping task. Events already
/// queued are told apart by `id`.
#[derive(Debug)]
pub(crate) struct TimerHandle {
    id: u64,
    handle: JoinHandle<()>,
}

impl TimerHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn cancel(self) {
        self.handle.abort();
    }
}

/// Spawns timers and lookups that report back through the widget's channel.
#[derive(Debug)]
pub(crate) struct Scheduler {
    tx: UnboundedSender<WidgetEvent>,
    next_timer: u64,
}

impl Scheduler {
    pub fn new() -> (Self, UnboundedReceiver<WidgetEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, next_timer: 0 }, rx)
    }

    /// Send the event built by `make` once `delay` has passed.
    pub fn after<F>(&mut self, delay: Duration, make: F) -> TimerHandle
    where
        F: FnOnce(u64) -> WidgetEvent + Send + 'static,
    {
        self.next_timer += 1;
        let id = self.next_timer;
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(make(id));
        });
        TimerHandle { id, handle }
    }

    /// Await a deferred lookup and report its settlement. Lookups are never
    /// aborted; stale results are discarded when they arrive.
    pub fn settle(&self, cycle: u64, input: String, deferred: Deferred) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = deferred.await;
            let _ = tx.send(WidgetEvent::SourceSettled { cycle, input, result });
        });
    }

    /// Drive a deferred side effect to completion; only failures are reported.
    pub fn detach(&self, what: &'static str, deferred: Deferred) {
        tokio::spawn(async move {
            if let Err(e) = deferred.await {
                warn!("typeahead: {} failed: {}", what, e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_with_id() {
        let (mut scheduler, mut rx) = Scheduler::new();
        let timer = scheduler.after(Duration::from_millis(50), |id| WidgetEvent::BlurElapsed { timer: id });
        let id = timer.id();
        match rx.recv().await {
            Some(WidgetEvent::BlurElapsed { timer }) => assert_eq!(timer, id),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_never_fires() {
        let (mut scheduler, mut rx) = Scheduler::new();
        let first = scheduler.after(Duration::from_millis(50), |id| WidgetEvent::BlurElapsed { timer: id });
        first.cancel();
        let second = scheduler.after(Duration::from_millis(80), |id| WidgetEvent::BlurElapsed { timer: id });
        match rx.recv().await {
            Some(WidgetEvent::BlurElapsed { timer }) => assert_eq!(timer, second.id()),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_settle_reports_result() {
        let (scheduler, mut rx) = Scheduler::new();
        scheduler.settle(7, "ab".into(), Box::pin(async { Ok(Value::Array(vec![])) }));
        match rx.recv().await {
            Some(WidgetEvent::SourceSettled { cycle, input, result }) => {
                assert_eq!(cycle, 7);
                assert_eq!(input, "ab");
                assert!(result.is_ok());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
