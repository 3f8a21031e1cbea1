//! # Two-phase event fan-out to multiple subscribers.
//!
//! Provides [`SubscriberSet`] — an explicit logger object that distributes
//! events to multiple subscribers concurrently without blocking the publisher.
//!
//! ## Architecture
//! ```text
//! emit(event)
//!     │
//!     ├──► [backlog] (only until mark_ready)
//!     │
//!     ├──► [queue 1] ──► worker 1 ──► subscriber1.on_event()
//!     │    (bounded)         └──────► panic → SubscriberPanicked
//!     ├──► [queue 2] ──► worker 2 ──► subscriber2.on_event()
//!     │    (bounded)
//!     └──► [queue N] ──► worker N ──► subscriberN.on_event()
//!          (bounded)
//! ```
//!
//! ## Two-phase initialization
//! The set starts in a buffering state: every emitted event is also kept in a
//! startup backlog. A subscriber attached while buffering receives the backlog
//! first, so sinks wired up late still observe everything from the start of
//! the run. [`mark_ready`](SubscriberSet::mark_ready) ends the phase and drops
//! the backlog; subscribers attached after that only see subsequent events.
//!
//! ## Rules
//! - **No cross-subscriber ordering**: subscriber A may process event N while
//!   B processes N+5
//! - **Overflow**: event dropped for that subscriber only, `SubscriberOverflow`
//!   published (never re-published for overflow events themselves)
//! - **Non-blocking**: `emit()` returns immediately (uses `try_send`)
//! - **Isolation**: a slow or panicking subscriber doesn't affect others
//! - **Per-subscriber FIFO**: each subscriber sees events in order
//!
//! ## Panic handling
//! Worker tasks use `catch_unwind` to isolate panics: the panic is converted
//! to a `SubscriberPanicked` event and the worker continues with the next
//! event.

use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::events::Event;
use crate::subscribers::Subscribe;

/// Per-subscriber channel metadata.
struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

struct Fanout {
    /// Startup backlog; `Some` while buffering, `None` once ready.
    backlog: Option<Vec<Arc<Event>>>,
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
}

/// Fan-out coordinator for multiple event subscribers.
///
/// Cheap to clone; all clones share the same state, so the dispatch loop and
/// the binary can hold their own handles.
///
/// Lifecycle: [`buffering`](Self::buffering) → [`attach`](Self::attach) sinks →
/// [`mark_ready`](Self::mark_ready) → `emit` during the run →
/// [`shutdown`](Self::shutdown) to flush.
#[derive(Clone)]
pub struct SubscriberSet {
    inner: Arc<Mutex<Fanout>>,
}

impl SubscriberSet {
    /// Creates a new set in the buffering state with no subscribers.
    ///
    /// Events emitted before [`mark_ready`](Self::mark_ready) are kept in a
    /// backlog and replayed to subscribers attached while buffering.
    #[must_use]
    pub fn buffering() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Fanout {
                backlog: Some(Vec::new()),
                channels: Vec::new(),
                workers: Vec::new(),
            })),
        }
    }

    /// Attaches a subscriber and spawns its worker task.
    ///
    /// ### Per-subscriber setup
    /// - Bounded mpsc queue (capacity from [`Subscribe::queue_capacity`], min 1)
    /// - Dedicated worker task (runs until the queue is closed)
    /// - Panic isolation via `catch_unwind`
    ///
    /// If the set is still buffering, the current backlog is replayed into the
    /// new subscriber's queue before any live event is delivered to it.
    pub fn attach(&self, sub: Arc<dyn Subscribe>) {
        let cap = sub.queue_capacity().max(1);
        let name = sub.name();
        let (tx, mut rx) = mpsc::channel::<Arc<Event>>(cap);

        let set = self.clone();
        let worker = tokio::spawn(async move {
            while let Some(ev) = rx.recv().await {
                let fut = sub.on_event(ev.as_ref());

                if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                    let info = {
                        let any = &*panic_err;
                        if let Some(msg) = any.downcast_ref::<&'static str>() {
                            (*msg).to_string()
                        } else if let Some(msg) = any.downcast_ref::<String>() {
                            msg.clone()
                        } else {
                            "unknown panic".to_string()
                        }
                    };
                    set.emit(Event::subscriber_panicked(sub.name(), info));
                }
            }
        });

        let mut inner = self.lock();
        if let Some(backlog) = &inner.backlog {
            for ev in backlog {
                // Replay cannot overflow a freshly created queue unless the
                // backlog already exceeds its capacity; drop silently then.
                let _ = tx.try_send(Arc::clone(ev));
            }
        }
        inner.channels.push(SubscriberChannel { name, sender: tx });
        inner.workers.push(worker);
    }

    /// Ends the buffering phase and discards the backlog.
    ///
    /// Subscribers attached after this point only observe subsequent events.
    pub fn mark_ready(&self) {
        self.lock().backlog = None;
    }

    /// Emits an event to all subscribers (non-blocking).
    pub fn emit(&self, event: Event) {
        self.emit_arc(Arc::new(event));
    }

    /// Emits a pre-allocated `Arc<Event>` to all subscribers.
    ///
    /// - Appends to the backlog while buffering
    /// - Uses `try_send` per queue (never blocks)
    /// - On a full or closed queue: drops the event for that subscriber and
    ///   publishes `SubscriberOverflow` — unless the event itself is an
    ///   overflow event, which prevents infinite loops.
    pub fn emit_arc(&self, event: Arc<Event>) {
        let is_overflow_evt = event.is_subscriber_overflow();

        let dropped: Vec<(&'static str, &'static str)> = {
            let mut inner = self.lock();
            if let Some(backlog) = inner.backlog.as_mut() {
                backlog.push(Arc::clone(&event));
            }

            let mut dropped = Vec::new();
            for channel in &inner.channels {
                match channel.sender.try_send(Arc::clone(&event)) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        dropped.push((channel.name, "full"));
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        dropped.push((channel.name, "closed"));
                    }
                }
            }
            dropped
        };

        if !is_overflow_evt {
            for (name, reason) in dropped {
                self.emit_arc(Arc::new(Event::subscriber_overflow(name, reason)));
            }
        }
    }

    /// Gracefully shuts down all subscriber workers.
    ///
    /// 1. Drops all queue senders (workers see the channel closed once they
    ///    have drained it)
    /// 2. Awaits all worker tasks
    ///
    /// Everything emitted before this call is delivered before it returns.
    pub async fn shutdown(&self) {
        let (channels, workers) = {
            let mut inner = self.lock();
            (
                std::mem::take(&mut inner.channels),
                std::mem::take(&mut inner.workers),
            )
        };
        drop(channels);

        for h in workers {
            let _ = h.await;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Fanout> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
