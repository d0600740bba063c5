//! Typed publish/subscribe primitive with listener lifecycle.
//!
//! Mirrors the teacher's habit of broadcasting to a snapshot of receivers
//! before doing any I/O (see `Room::broadcast_except` in
//! `server/src/voice/sfu.rs`, which clones sender handles out from under the
//! lock before sending) — here the snapshot prevents listener registration
//! changes made *during* an emit from affecting that emit's delivery list.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

/// Default listener-count threshold above which [`EventEmitter::on`] logs a warning.
pub const DEFAULT_MAX_LISTENERS: usize = 10;

/// Opaque token returned by [`EventEmitter::on`]; invoking [`EventEmitter::off_token`]
/// removes exactly the registration that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerToken(u64);

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Registration<E> {
    token: ListenerToken,
    callback: Listener<E>,
}

/// A typed emitter for events of type `E`. `E` is expected to be an enum
/// discriminated by event name (this crate's [`crate::protocol::PulseEvent`]
/// plays that role for the room/adaptive-bitrate observable events in
/// spec.md §6).
pub struct EventEmitter<E> {
    listeners: Mutex<Vec<Registration<E>>>,
    next_token: AtomicU64,
    max_listeners: usize,
}

impl<E> fmt::Debug for EventEmitter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("listener_count", &self.listeners.lock().len())
            .field("max_listeners", &self.max_listeners)
            .finish()
    }
}

impl<E> Default for EventEmitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventEmitter<E> {
    /// Create an emitter with the default `maxListeners` threshold.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_listeners(DEFAULT_MAX_LISTENERS)
    }

    /// Create an emitter with a custom `maxListeners` threshold.
    #[must_use]
    pub fn with_max_listeners(max_listeners: usize) -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            next_token: AtomicU64::new(0),
            max_listeners,
        }
    }

    /// Register a listener. Returns a token that unregisters exactly this
    /// registration when passed to [`Self::off_token`].
    pub fn on<F>(&self, callback: F) -> ListenerToken
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let token = ListenerToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        let mut listeners = self.listeners.lock();
        listeners.push(Registration {
            token,
            callback: Arc::new(callback),
        });
        if listeners.len() > self.max_listeners {
            warn!(
                count = listeners.len(),
                max = self.max_listeners,
                "EventEmitter exceeded maxListeners; possible leak"
            );
        }
        token
    }

    /// Register a listener that unregisters itself before its first invocation.
    pub fn once<F>(self: &Arc<Self>, callback: F) -> ListenerToken
    where
        F: Fn(&E) + Send + Sync + 'static,
        E: 'static,
    {
        let emitter = Arc::downgrade(self);
        let token_cell: Arc<Mutex<Option<ListenerToken>>> = Arc::new(Mutex::new(None));
        let token_cell_for_closure = token_cell.clone();
        let token = self.on(move |event: &E| {
            if let Some(emitter) = emitter.upgrade() {
                if let Some(token) = *token_cell_for_closure.lock() {
                    emitter.off_token(token);
                }
            }
            callback(event);
        });
        *token_cell.lock() = Some(token);
        token
    }

    /// Remove the registration identified by `token`, if still present.
    pub fn off_token(&self, token: ListenerToken) {
        self.listeners.lock().retain(|r| r.token != token);
    }

    /// Remove all listeners.
    pub fn remove_all(&self) {
        self.listeners.lock().clear();
    }

    /// Number of currently registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Invoke a snapshot of current listeners with `event`. Listener
    /// registrations added or removed by a callback invoked during this pass
    /// do not affect this pass (P2 in spec.md §8); per-listener panics are
    /// caught and logged, never propagated.
    pub fn emit(&self, event: &E)
    where
        E: fmt::Debug,
    {
        let snapshot: Vec<Listener<E>> = {
            let listeners = self.listeners.lock();
            listeners.iter().map(|r| r.callback.clone()).collect()
        };

        debug!(listener_count = snapshot.len(), event = ?event, "emitting event");

        for callback in snapshot {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                callback(event);
            }));
            if let Err(panic) = result {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "listener panicked".to_string());
                warn!(error = %message, "event listener panicked; continuing delivery");
            }
        }
    }
}
