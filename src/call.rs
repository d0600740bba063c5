//! 1-to-1 call signaling overlay.
//!
//! Grounded directly on `server/src/voice/call.rs`'s `CallState::apply`
//! state machine: a `match (self, event)` that returns `Result<Self, _>`,
//! rejects any transition once `Ended`, and rejects any transition the
//! matrix doesn't name. The teacher's event-sourced `Started`/`Joined`/
//! `Left`/`Declined`/`Ended` shape is adapted to spec.md §3's simpler
//! pending/accepted/rejected/ended overlay (no multi-party ringing).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

/// Terminal-state or invalid-transition rejection from [`CallInfo::apply`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CallStateError {
    #[error("call already ended")]
    CallAlreadyEnded,
    #[error("invalid call transition: {from:?} + {event:?}")]
    InvalidTransition { from: CallState, event: CallEvent },
}

/// The call's state tag (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Pending,
    Accepted,
    Rejected,
    Ended,
}

/// An event driving a [`CallInfo`] transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    Accept,
    Reject { reason: Option<String> },
    End,
}

/// 1-to-1 call signaling record. Immutable once `state == Ended` (spec.md §3).
#[derive(Debug, Clone)]
pub struct CallInfo {
    pub call_id: String,
    pub caller_sid: String,
    pub target_sid: String,
    pub metadata: HashMap<String, Value>,
    pub state: CallState,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

impl CallInfo {
    /// Construct a new call in `Pending` state (spec.md §4.4, `call_received`).
    #[must_use]
    pub fn new_pending(
        call_id: impl Into<String>,
        caller_sid: impl Into<String>,
        target_sid: impl Into<String>,
        metadata: HashMap<String, Value>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            caller_sid: caller_sid.into(),
            target_sid: target_sid.into(),
            metadata,
            state: CallState::Pending,
            start_time: now,
            end_time: None,
        }
    }

    /// Construct a `CallInfo` directly in a given state, for handlers that
    /// assemble a fresh record rather than transition an existing one
    /// (spec.md §4.4's `call_accepted`/`call_rejected` entries build the
    /// record in its target state outright).
    #[must_use]
    pub fn new(
        call_id: impl Into<String>,
        caller_sid: impl Into<String>,
        target_sid: impl Into<String>,
        metadata: HashMap<String, Value>,
        state: CallState,
        start_time: DateTime<Utc>,
        end_time: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            caller_sid: caller_sid.into(),
            target_sid: target_sid.into(),
            metadata,
            state,
            start_time,
            end_time,
        }
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self.state, CallState::Ended)
    }

    /// Apply an event, producing the next `CallInfo` or rejecting the
    /// transition. Mirrors the teacher's `CallState::apply(self, event) ->
    /// Result<Self, CallStateError>` — terminal states are immutable, and
    /// any (state, event) pair not named below is an error rather than a
    /// silent no-op.
    pub fn apply(self, now: DateTime<Utc>, event: CallEvent) -> Result<Self, CallStateError> {
        match (self.state, &event) {
            (CallState::Ended, _) => Err(CallStateError::CallAlreadyEnded),
            (CallState::Pending, CallEvent::Accept) => Ok(Self {
                state: CallState::Accepted,
                start_time: now,
                ..self
            }),
            (CallState::Pending, CallEvent::Reject { reason }) => {
                let call_id = self.call_id;
                let caller_sid = self.caller_sid;
                let target_sid = self.target_sid;
                let mut metadata = self.metadata;
                if let Some(reason) = reason {
                    metadata.insert("reason".to_string(), Value::from(reason.clone()));
                }
                Ok(Self {
                    call_id,
                    caller_sid,
                    target_sid,
                    metadata,
                    state: CallState::Rejected,
                    start_time: now,
                    end_time: Some(now),
                })
            }
            (CallState::Pending | CallState::Accepted, CallEvent::End) => Ok(Self {
                state: CallState::Ended,
                end_time: Some(now),
                ..self
            }),
            (from, event) => Err(CallStateError::InvalidTransition {
                from,
                event: event.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn pending() -> CallInfo {
        CallInfo::new_pending("c1", "A", "B", HashMap::new(), now())
    }

    #[test]
    fn pending_accept_transitions_to_accepted() {
        let call = pending().apply(now(), CallEvent::Accept).unwrap();
        assert_eq!(call.state, CallState::Accepted);
    }

    #[test]
    fn pending_reject_carries_reason_into_metadata() {
        let call = pending()
            .apply(now(), CallEvent::Reject { reason: Some("busy".into()) })
            .unwrap();
        assert_eq!(call.state, CallState::Rejected);
        assert_eq!(call.metadata.get("reason").unwrap(), "busy");
        assert!(call.end_time.is_some());
    }

    #[test]
    fn accepted_end_transitions_to_ended() {
        let call = pending().apply(now(), CallEvent::Accept).unwrap();
        let ended = call.apply(now(), CallEvent::End).unwrap();
        assert_eq!(ended.state, CallState::Ended);
        assert!(ended.is_terminal());
    }

    #[test]
    fn ended_is_immutable() {
        let call = pending()
            .apply(now(), CallEvent::Accept)
            .unwrap()
            .apply(now(), CallEvent::End)
            .unwrap();
        let result = call.apply(now(), CallEvent::Accept);
        assert_eq!(result.unwrap_err(), CallStateError::CallAlreadyEnded);
    }

    #[test]
    fn rejected_cannot_be_accepted() {
        let call = pending()
            .apply(now(), CallEvent::Reject { reason: None })
            .unwrap();
        let result = call.apply(now(), CallEvent::Accept);
        assert!(matches!(result, Err(CallStateError::InvalidTransition { .. })));
    }
}
