//! Wire message shapes and the observable event enum.
//!
//! Grounded in `shared/vc-common/src/types/user.rs`'s plain serde-derived
//! struct style, generalized to spec.md §6's message envelope ("every frame
//! is an object with a required string `type` field and message-specific
//! additional fields"). `InboundMessage` intentionally keeps every payload
//! field optional so a handler can tolerate both the fully-typed shape and
//! the "opaque key-value shape" tolerance spec.md §4.4(c) demands —
//! unrecognized or missing fields degrade to `None`, never a parse error.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::call::CallState;
use crate::participant::ParticipantInfo;
use crate::track::TrackKind;

/// A single track descriptor as carried in `otherParticipants[].tracks` or
/// `track_published.track`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackDescriptor {
    pub sid: String,
    pub kind: TrackKind,
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// Outbound data kinds, mirrored from spec.md §6's `data {kind: "reliable"|"lossy"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    Reliable,
    Lossy,
}

/// Decoded payload delivered with `data-received` (spec.md §4.4, `data_consumer_created`).
#[derive(Debug, Clone)]
pub struct DataPacket {
    pub kind: DataKind,
    pub value: Value,
    pub participant_sid: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Sum type of every inbound (server→client) message named in spec.md §6.
/// `raw` retains the original object so handlers needing fields this enum
/// does not model (schema evolution) can still reach them.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub kind: InboundKind,
    pub raw: Value,
}

impl InboundMessage {
    /// Parse a JSON frame. Returns `None` (never an error) when `type` is
    /// absent or unrecognized — spec.md §4.3 step 1 requires dispatch to
    /// drop such frames with a warning, not fail.
    #[must_use]
    pub fn parse(raw: Value) -> Option<Self> {
        let type_str = raw.get("type")?.as_str()?;
        let kind = InboundKind::from_wire(type_str, &raw)?;
        Some(Self { kind, raw })
    }

    #[must_use]
    pub fn type_tag(&self) -> &'static str {
        self.kind.type_tag()
    }
}

#[derive(Debug, Clone)]
pub enum InboundKind {
    Joined {
        room_id: String,
        room_name: Option<String>,
        rtp_capabilities: Option<Value>,
        participant: ParticipantInfo,
        other_participants: Vec<ParticipantInfo>,
        auto_subscribe: Option<bool>,
    },
    ParticipantJoined {
        participant: ParticipantInfo,
    },
    ParticipantLeft {
        participant_sid: String,
    },
    TrackPublished {
        participant_sid: String,
        track: TrackDescriptor,
        auto_subscribe: Option<bool>,
    },
    TrackUnpublished {
        participant_sid: String,
        track_sid: String,
    },
    TrackSubscribed {
        participant_sid: String,
        track_sid: String,
    },
    TrackUnsubscribed {
        participant_sid: String,
        track_sid: String,
    },
    TrackMuted {
        participant_sid: String,
        track_sid: String,
    },
    TrackUnmuted {
        participant_sid: String,
        track_sid: String,
    },
    TransportCreated,
    TransportConnected,
    Data {
        participant_sid: String,
        payload: Value,
    },
    DataConsumerCreated {
        producer_id: String,
        consumer_id: String,
        sctp_stream_parameters: Value,
        participant_sid: String,
        label: String,
        ordered: bool,
    },
    DataConsumerClosed,
    DataProducerCreated,
    CallReceived {
        call_id: String,
        caller_sid: String,
        target_sid: String,
        metadata: HashMap<String, Value>,
    },
    CallAccepted {
        call_id: String,
        target_sid: String,
    },
    CallRejected {
        call_id: String,
        target_sid: String,
        reason: Option<String>,
    },
    Error {
        message: Option<String>,
    },
}

impl InboundKind {
    #[must_use]
    pub const fn type_tag(&self) -> &'static str {
        match self {
            Self::Joined { .. } => "joined",
            Self::ParticipantJoined { .. } => "participant_joined",
            Self::ParticipantLeft { .. } => "participant_left",
            Self::TrackPublished { .. } => "track_published",
            Self::TrackUnpublished { .. } => "track_unpublished",
            Self::TrackSubscribed { .. } => "track_subscribed",
            Self::TrackUnsubscribed { .. } => "track_unsubscribed",
            Self::TrackMuted { .. } => "track_muted",
            Self::TrackUnmuted { .. } => "track_unmuted",
            Self::TransportCreated => "transport_created",
            Self::TransportConnected => "transport_connected",
            Self::Data { .. } => "data",
            Self::DataConsumerCreated { .. } => "data_consumer_created",
            Self::DataConsumerClosed => "data_consumer_closed",
            Self::DataProducerCreated => "data_producer_created",
            Self::CallReceived { .. } => "call_received",
            Self::CallAccepted { .. } => "call_accepted",
            Self::CallRejected { .. } => "call_rejected",
            Self::Error { .. } => "error",
        }
    }

    fn from_wire(type_str: &str, raw: &Value) -> Option<Self> {
        let field = |name: &str| raw.get(name).cloned();
        let field_str = |name: &str| raw.get(name).and_then(Value::as_str).map(str::to_string);

        Some(match type_str {
            "joined" => Self::Joined {
                room_id: raw.pointer("/room/id")?.as_str()?.to_string(),
                room_name: raw
                    .pointer("/room/name")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                rtp_capabilities: field("rtpCapabilities"),
                participant: serde_json::from_value(field("participant")?).ok()?,
                other_participants: field("otherParticipants")
                    .and_then(|v| serde_json::from_value(v).ok())
                    .unwrap_or_default(),
                auto_subscribe: raw.get("autoSubscribe").and_then(Value::as_bool),
            },
            "participant_joined" => Self::ParticipantJoined {
                participant: serde_json::from_value(field("participant")?).ok()?,
            },
            "participant_left" => Self::ParticipantLeft {
                participant_sid: field_str("participantSid")?,
            },
            "track_published" => Self::TrackPublished {
                participant_sid: field_str("participantSid")?,
                track: serde_json::from_value(field("track")?).ok()?,
                auto_subscribe: raw.get("autoSubscribe").and_then(Value::as_bool),
            },
            "track_unpublished" => Self::TrackUnpublished {
                participant_sid: field_str("participantSid")?,
                track_sid: field_str("trackSid")?,
            },
            "track_subscribed" => Self::TrackSubscribed {
                participant_sid: field_str("participantSid")?,
                track_sid: field_str("trackSid")?,
            },
            "track_unsubscribed" => Self::TrackUnsubscribed {
                participant_sid: field_str("participantSid")?,
                track_sid: field_str("trackSid")?,
            },
            "track_muted" => Self::TrackMuted {
                participant_sid: field_str("participantSid")?,
                track_sid: field_str("trackSid")?,
            },
            "track_unmuted" => Self::TrackUnmuted {
                participant_sid: field_str("participantSid")?,
                track_sid: field_str("trackSid")?,
            },
            "transport_created" => Self::TransportCreated,
            "transport_connected" => Self::TransportConnected,
            "data" => Self::Data {
                participant_sid: field_str("participantSid").unwrap_or_default(),
                payload: field("value").unwrap_or(Value::Null),
            },
            "data_consumer_created" => Self::DataConsumerCreated {
                producer_id: field_str("producerId").unwrap_or_default(),
                consumer_id: field_str("id")?,
                sctp_stream_parameters: field("sctpStreamParameters").unwrap_or(Value::Null),
                participant_sid: field_str("participantSid")?,
                label: field_str("label").unwrap_or_default(),
                ordered: raw.get("ordered").and_then(Value::as_bool).unwrap_or(true),
            },
            "data_consumer_closed" => Self::DataConsumerClosed,
            "data_producer_created" => Self::DataProducerCreated,
            "call_received" => Self::CallReceived {
                call_id: field_str("callId")?,
                caller_sid: field_str("callerSid")?,
                target_sid: field_str("targetSid")?,
                metadata: field("metadata")
                    .and_then(|v| serde_json::from_value(v).ok())
                    .unwrap_or_default(),
            },
            "call_accepted" => Self::CallAccepted {
                call_id: field_str("callId")?,
                target_sid: field_str("targetSid")?,
            },
            "call_rejected" => Self::CallRejected {
                call_id: field_str("callId")?,
                target_sid: field_str("targetSid")?,
                reason: field_str("reason"),
            },
            "error" => Self::Error {
                message: field_str("message"),
            },
            _ => return None,
        })
    }
}

/// Top-level observable events, emitted via the crate's [`crate::emitter::EventEmitter`].
#[derive(Debug, Clone)]
pub enum PulseEvent {
    LocalParticipantJoined { sid: String },
    ParticipantJoined { sid: String },
    ParticipantLeft { sid: String },
    TrackPublished { participant_sid: String, track_sid: String },
    TrackUnpublished { participant_sid: String, track_sid: String },
    TrackMuted { participant_sid: String, track_sid: String },
    TrackUnmuted { participant_sid: String, track_sid: String },
    TrackUnsubscribed { participant_sid: String, track_sid: String },
    DataReceived { packet: DataPacket },
    CallReceived { call_id: String, state: CallState },
    CallAccepted { call_id: String, state: CallState },
    CallRejected { call_id: String, state: CallState },
    Error { message: String },
    LayerChanged { consumer_sid: String, spatial: u8, temporal: u8 },
    QualityAdjusted { consumer_sid: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_returns_none_for_missing_type() {
        assert!(InboundMessage::parse(json!({"foo": 1})).is_none());
    }

    #[test]
    fn parse_returns_none_for_unknown_type() {
        assert!(InboundMessage::parse(json!({"type": "wat", "foo": 1})).is_none());
    }

    #[test]
    fn parse_recognizes_participant_left() {
        let msg = InboundMessage::parse(json!({
            "type": "participant_left",
            "participantSid": "B",
        }))
        .unwrap();
        assert_eq!(msg.type_tag(), "participant_left");
        assert!(matches!(
            msg.kind,
            InboundKind::ParticipantLeft { participant_sid } if participant_sid == "B"
        ));
    }

    #[test]
    fn parse_recognizes_track_published_with_descriptor() {
        let msg = InboundMessage::parse(json!({
            "type": "track_published",
            "participantSid": "B",
            "track": {"sid": "t1", "kind": "audio", "muted": false},
        }))
        .unwrap();
        match msg.kind {
            InboundKind::TrackPublished { track, .. } => {
                assert_eq!(track.sid, "t1");
                assert_eq!(track.kind, TrackKind::Audio);
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn data_message_defaults_missing_fields() {
        let msg = InboundMessage::parse(json!({"type": "data", "value": {"x": 1}})).unwrap();
        match msg.kind {
            InboundKind::Data { participant_sid, payload } => {
                assert_eq!(participant_sid, "");
                assert_eq!(payload, json!({"x": 1}));
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }
}
