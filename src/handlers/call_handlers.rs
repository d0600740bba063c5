//! `call_received`, `call_accepted`, `call_rejected` handlers.
//!
//! Per spec.md §4.4's handler table, each handler upserts a placeholder
//! participant then assembles a fresh `CallInfo` directly in its row's
//! target state — there is no persisted `call_id → CallInfo` record here,
//! so these handlers do not call `CallInfo::apply` and do not themselves
//! enforce terminal-state immutability against a prior call record (see
//! DESIGN.md's call-handler note). `CallInfo::apply`'s transition guard
//! remains available as a library primitive for a caller that keeps its own
//! call registry.

use async_trait::async_trait;

use crate::call::{CallInfo, CallState};
use crate::error::DomainError;
use crate::handlers::registry::{HandlerContext, MessageHandler};
use crate::participant::{Participant, ParticipantInfo};
use crate::protocol::{InboundKind, InboundMessage, PulseEvent};

/// Insert a bare participant placeholder if `sid` is not already present —
/// "upsert caller/target participant" per spec.md §4.4's call handlers.
fn upsert_placeholder(ctx: &mut HandlerContext, sid: &str) {
    if ctx.room.remote_participant(sid).is_some() {
        return;
    }
    struct NoopSubscribe;
    impl crate::participant::SubscribeCallback for NoopSubscribe {
        fn subscribe(&self, _track_sid: &str) {}
        fn unsubscribe(&self, _track_sid: &str) {}
    }
    let placeholder = Participant::new_remote(
        ParticipantInfo {
            sid: sid.to_string(),
            identity: sid.to_string(),
            name: None,
            metadata: std::collections::HashMap::new(),
            tracks: vec![],
        },
        Box::new(NoopSubscribe),
    );
    // A placeholder loses a true identity/sid race only if the real
    // `participant_joined` for this sid arrives first, in which case this
    // upsert is a no-op (checked above) — never overwrites a real entry.
    let _ = ctx.room.add_remote_participant(placeholder);
}

pub struct CallReceivedHandler;

#[async_trait]
impl MessageHandler for CallReceivedHandler {
    fn message_type(&self) -> &'static str {
        "call_received"
    }

    async fn handle(&self, ctx: &mut HandlerContext, message: &InboundMessage) -> Result<(), DomainError> {
        let InboundKind::CallReceived { call_id, caller_sid, target_sid, metadata } = &message.kind else {
            unreachable!("registry only routes \"call_received\" frames to CallReceivedHandler");
        };
        upsert_placeholder(ctx, caller_sid);
        let call = CallInfo::new_pending(call_id.clone(), caller_sid.clone(), target_sid.clone(), metadata.clone(), chrono::Utc::now());
        let state = call.state;
        ctx.events.emit(&PulseEvent::CallReceived { call_id: call_id.clone(), state });
        Ok(())
    }
}

pub struct CallAcceptedHandler;

#[async_trait]
impl MessageHandler for CallAcceptedHandler {
    fn message_type(&self) -> &'static str {
        "call_accepted"
    }

    async fn handle(&self, ctx: &mut HandlerContext, message: &InboundMessage) -> Result<(), DomainError> {
        let InboundKind::CallAccepted { call_id, target_sid } = &message.kind else {
            unreachable!("registry only routes \"call_accepted\" frames to CallAcceptedHandler");
        };
        upsert_placeholder(ctx, target_sid);
        let now = chrono::Utc::now();
        let call = CallInfo::new(
            call_id.clone(),
            String::new(),
            target_sid.clone(),
            std::collections::HashMap::new(),
            CallState::Accepted,
            now,
            None,
        );
        ctx.events.emit(&PulseEvent::CallAccepted { call_id: call_id.clone(), state: call.state });
        Ok(())
    }
}

pub struct CallRejectedHandler;

#[async_trait]
impl MessageHandler for CallRejectedHandler {
    fn message_type(&self) -> &'static str {
        "call_rejected"
    }

    async fn handle(&self, ctx: &mut HandlerContext, message: &InboundMessage) -> Result<(), DomainError> {
        let InboundKind::CallRejected { call_id, target_sid, reason } = &message.kind else {
            unreachable!("registry only routes \"call_rejected\" frames to CallRejectedHandler");
        };
        upsert_placeholder(ctx, target_sid);
        let now = chrono::Utc::now();
        let mut metadata = std::collections::HashMap::new();
        if let Some(reason) = reason {
            metadata.insert("reason".to_string(), serde_json::Value::from(reason.clone()));
        }
        let call = CallInfo::new(
            call_id.clone(),
            String::new(),
            target_sid.clone(),
            metadata,
            CallState::Rejected,
            now,
            Some(now),
        );
        ctx.events.emit(&PulseEvent::CallRejected { call_id: call_id.clone(), state: call.state });
        Ok(())
    }
}
