//! `transport_created`, `transport_connected`, and `error` handlers.
//!
//! Grounded in `server/src/voice/ws_handler.rs`'s `_ => Ok(())` catch-all
//! arms for purely informational events — these three have no state to
//! mutate per spec.md §4.4, only logging or a pass-through event.

use async_trait::async_trait;
use tracing::debug;

use crate::error::DomainError;
use crate::handlers::registry::{HandlerContext, MessageHandler};
use crate::protocol::{InboundKind, InboundMessage, PulseEvent};

pub struct TransportCreatedHandler;

#[async_trait]
impl MessageHandler for TransportCreatedHandler {
    fn message_type(&self) -> &'static str {
        "transport_created"
    }

    async fn handle(&self, _ctx: &mut HandlerContext, _message: &InboundMessage) -> Result<(), DomainError> {
        debug!("transport_created received");
        Ok(())
    }
}

pub struct TransportConnectedHandler;

#[async_trait]
impl MessageHandler for TransportConnectedHandler {
    fn message_type(&self) -> &'static str {
        "transport_connected"
    }

    async fn handle(&self, _ctx: &mut HandlerContext, _message: &InboundMessage) -> Result<(), DomainError> {
        debug!("transport_connected received");
        Ok(())
    }
}

pub struct ErrorFrameHandler;

#[async_trait]
impl MessageHandler for ErrorFrameHandler {
    fn message_type(&self) -> &'static str {
        "error"
    }

    async fn handle(&self, ctx: &mut HandlerContext, message: &InboundMessage) -> Result<(), DomainError> {
        let InboundKind::Error { message: error_message } = &message.kind else {
            unreachable!("registry only routes \"error\" frames to ErrorFrameHandler");
        };
        let message = error_message.clone().unwrap_or_else(|| "Unknown error".to_string());
        ctx.events.emit(&PulseEvent::Error { message });
        Ok(())
    }
}
