//! Handler registry and dispatch.
//!
//! Grounded in `server/src/voice/ws_handler.rs`'s `handle_voice_event` (a
//! total, non-throwing dispatcher that matches on an event tag and
//! delegates to a handler, logging and swallowing handler-local failures)
//! generalized from the teacher's fixed `match` to spec.md §4.3's
//! extensible `type → handler` table so tests can register doubles.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::warn;

use crate::carrier::Carrier;
use crate::emitter::EventEmitter;
use crate::error::DomainError;
use crate::protocol::{InboundMessage, PulseEvent};
use crate::room::RoomState;
use crate::transport::TransportController;

/// Everything a handler needs to mutate state and signal back out, per
/// spec.md §4.4's "context exposes the RoomState store, the local
/// participant, the transport controller, the carrier's send, and the
/// top-level event emitter."
pub struct HandlerContext {
    pub room: RoomState,
    pub transport: Arc<dyn TransportController>,
    pub carrier: Arc<dyn Carrier>,
    pub events: Arc<EventEmitter<PulseEvent>>,
    /// `autoSubscribe` option (spec.md §6), default `true`.
    pub auto_subscribe: bool,
}

impl HandlerContext {
    #[must_use]
    pub fn new(
        transport: Arc<dyn TransportController>,
        carrier: Arc<dyn Carrier>,
        events: Arc<EventEmitter<PulseEvent>>,
    ) -> Self {
        Self {
            room: RoomState::new(),
            transport,
            carrier,
            events,
            auto_subscribe: true,
        }
    }
}

/// A single message-type handler (spec.md §4.3/§4.4). `message_type` names
/// the key this handler is registered under; it need not match
/// `message.type_tag()` exactly (tests may register a handler under an
/// arbitrary key to act as a double).
#[async_trait]
pub trait MessageHandler: Send + Sync {
    fn message_type(&self) -> &'static str;
    async fn handle(&self, ctx: &mut HandlerContext, message: &InboundMessage) -> Result<(), DomainError>;
}

/// Maps message-type tag to handler and dispatches with total error
/// containment (spec.md §4.3). Never panics or propagates a handler's
/// error out of `dispatch` (P5, spec.md §8).
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<&'static str, Arc<dyn MessageHandler>>>,
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert keyed by `handler.message_type()`. Re-registration overwrites
    /// — a predictable override, not a duplicate-registration error, so
    /// tests can inject doubles (spec.md §4.3).
    pub fn register(&self, handler: Arc<dyn MessageHandler>) {
        self.handlers.write().insert(handler.message_type(), handler);
    }

    pub fn unregister(&self, message_type: &str) {
        self.handlers.write().remove(message_type);
    }

    #[must_use]
    pub fn get(&self, message_type: &str) -> Option<Arc<dyn MessageHandler>> {
        self.handlers.read().get(message_type).cloned()
    }

    #[must_use]
    pub fn has(&self, message_type: &str) -> bool {
        self.handlers.read().contains_key(message_type)
    }

    #[must_use]
    pub fn get_types(&self) -> Vec<&'static str> {
        self.handlers.read().keys().copied().collect()
    }

    pub fn clear(&self) {
        self.handlers.write().clear();
    }

    /// Dispatch a raw JSON frame. Total: malformed or unrecognized frames
    /// are logged and dropped (step 1/2); a handler's own failure is logged
    /// and does not escalate (step 3). This function itself never returns
    /// an error.
    #[tracing::instrument(skip(self, ctx, raw))]
    pub async fn dispatch(&self, ctx: &mut HandlerContext, raw: serde_json::Value) {
        let Some(message) = InboundMessage::parse(raw) else {
            warn!("dropping frame: missing or unrecognized `type`");
            return;
        };

        let Some(handler) = self.get(message.type_tag()) else {
            warn!(message_type = message.type_tag(), "no handler registered for message type");
            return;
        };

        if let Err(err) = handler.handle(ctx, &message).await {
            warn!(
                message_type = message.type_tag(),
                code = err.code(),
                error = err.message(),
                "handler returned an error; dropping"
            );
        }
    }
}
